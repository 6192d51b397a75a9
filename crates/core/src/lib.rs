pub mod config;
pub mod error;
pub mod record;
pub mod taxonomy;
pub mod window;

pub use config::Config;
pub use error::*;
pub use record::*;
pub use taxonomy::*;
pub use window::*;
