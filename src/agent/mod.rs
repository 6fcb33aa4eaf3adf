mod agent;
mod config;
mod error;

pub use agent::Agent;
pub use config::config_file;
pub use config::AgentConfig;
pub use error::AgentError;
