use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which detector produced a finding.
///
/// Declaration order is the intrinsic precedence used when everything else
/// ties: anomalies are the most immediately actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Anomaly,
    Trend,
    Benchmark,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Anomaly, Category::Trend, Category::Benchmark];

    /// Lower value wins ties.
    pub fn precedence(self) -> u8 {
        match self {
            Category::Anomaly => 0,
            Category::Trend => 1,
            Category::Benchmark => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Anomaly => "anomaly",
            Category::Trend => "trend",
            Category::Benchmark => "benchmark",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "anomaly" => Ok(Category::Anomaly),
            "trend" => Ok(Category::Trend),
            "benchmark" => Ok(Category::Benchmark),
            other => Err(format!("unknown insight category: '{}'", other)),
        }
    }
}

/// Insight priority. Ordered so that `Critical` is the greatest value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Highest first.
    pub const DESCENDING: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            other => Err(format!("unknown priority: '{}'", other)),
        }
    }
}

/// Polarity of a finding: above/below baseline, increasing/decreasing,
/// top/bottom of the peer population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Direction of a signed deviation. Zero counts as `Up`.
    pub fn of(delta: f64) -> Self {
        if delta < 0.0 {
            Direction::Down
        } else {
            Direction::Up
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(format!("unknown direction: '{}'", other)),
        }
    }
}
