//! deployhook - deployment webhook listener
//!
//! Accepts `POST /deploy` with a JSON body carrying a shared secret and, when
//! the secret matches, launches a deployment script in the background.

pub mod config;
pub mod deploy;
pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{AppConfig, ConfigError};
pub use deploy::{DeployTrigger, ScriptTrigger};
pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
