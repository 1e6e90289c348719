//! Post-condition waits with bounded timeouts

use crate::{errors::ActionError, types::PostCondition};
use async_trait::async_trait;
use cdp_adapter::Page;
use std::time::Duration;
use tracing::{debug, warn};

/// Waiting strategy trait
#[async_trait]
pub trait WaitStrategy: Send + Sync {
    /// Block until the post-condition holds or its bound elapses
    async fn wait(&self, page: &dyn Page, condition: PostCondition) -> Result<(), ActionError>;
}

/// Default waiting strategy implementation
#[derive(Debug, Clone)]
pub struct DefaultWaitStrategy {
    /// Bound for the network-idle wait (milliseconds)
    pub network_idle_timeout_ms: u64,

    /// Bound for the DOM-stable wait (milliseconds)
    pub dom_stable_timeout_ms: u64,

    /// Network quiet period (milliseconds)
    pub network_quiet_ms: u64,

    /// DOM quiet period (milliseconds)
    pub dom_quiet_ms: u64,
}

impl Default for DefaultWaitStrategy {
    fn default() -> Self {
        Self {
            network_idle_timeout_ms: 30000, // 30 seconds for network idle
            dom_stable_timeout_ms: 5000,    // 5 seconds for DOM stable
            network_quiet_ms: 500,
            dom_quiet_ms: 300,
        }
    }
}

impl DefaultWaitStrategy {
    pub fn with_timeouts(network_idle_timeout_ms: u64, dom_stable_timeout_ms: u64) -> Self {
        Self {
            network_idle_timeout_ms,
            dom_stable_timeout_ms,
            ..Self::default()
        }
    }
}

#[async_trait]
impl WaitStrategy for DefaultWaitStrategy {
    async fn wait(&self, page: &dyn Page, condition: PostCondition) -> Result<(), ActionError> {
        let (bound_ms, label) = match condition {
            PostCondition::None => {
                debug!("PostCondition::None - no waiting");
                return Ok(());
            }
            PostCondition::NetworkIdle => (self.network_idle_timeout_ms, "network idle"),
            PostCondition::DomStable => (self.dom_stable_timeout_ms, "DOM stable"),
        };

        debug!("Waiting for {} (bound {}ms)", label, bound_ms);
        let settled = match condition {
            PostCondition::NetworkIdle => {
                let quiet = Duration::from_millis(self.network_quiet_ms);
                tokio::time::timeout(
                    Duration::from_millis(bound_ms),
                    page.wait_for_network_idle(quiet),
                )
                .await
            }
            _ => {
                let quiet = Duration::from_millis(self.dom_quiet_ms);
                tokio::time::timeout(
                    Duration::from_millis(bound_ms),
                    page.wait_for_dom_stable(quiet),
                )
                .await
            }
        };

        match settled {
            Ok(result) => result.map_err(ActionError::from),
            Err(_) => {
                warn!("{} not reached within {}ms", label, bound_ms);
                Err(ActionError::ActionTimeout(format!(
                    "{} not reached within {}ms",
                    label, bound_ms
                )))
            }
        }
    }
}
