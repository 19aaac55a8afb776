pub mod config;
mod mood_vault;
mod requests_logging;
pub mod server;
mod session;
pub mod state;

pub use config::ServerConfig;
pub use requests_logging::{log_requests, RequestsLoggingLevel};
pub use server::run_server;
