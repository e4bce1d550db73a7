//! Shared application state for request handlers.

use std::sync::Arc;

use crate::config::DeployConfig;
use crate::deploy::DeployTrigger;

/// Shared application state, cloneable across handlers via Arc-wrapped fields.
///
/// Holds the deploy endpoint configuration and the collaborator that launches
/// deployments. Nothing in here is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub deploy: Arc<DeployConfig>,
    pub trigger: Arc<dyn DeployTrigger>,
}

impl AppState {
    /// Creates a new application state from the deploy configuration and trigger.
    pub fn new(deploy: DeployConfig, trigger: Arc<dyn DeployTrigger>) -> Self {
        Self {
            deploy: Arc::new(deploy),
            trigger,
        }
    }
}
