mod config;
mod error;
mod index;
mod log;
mod record;
mod segment;
mod store;

pub use self::log::AppendListener;
pub use self::log::Log;
pub use self::log::LogReader;
pub use config::SegmentConfig;
pub use error::LogError;
pub use record::Record;
