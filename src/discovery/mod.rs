//! Cluster topology discovery
//!
//! A `TopologySource` produces the full node list; the refresh loop feeds it
//! into the shared `NodeRegistry` on a fixed interval.

pub mod source;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::Result;
use crate::nodes::{Node, NodeRegistry};

pub use source::{FileTopology, StaticTopology};

/// Something that knows the current cluster membership
#[async_trait]
pub trait TopologySource: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Fetch the complete node list
    ///
    /// # Errors
    ///
    /// Returns error if the membership cannot be read
    async fn fetch(&self) -> Result<Vec<Node>>;
}

/// Pull once from the source and swap the result into the registry
///
/// On failure the previous topology is kept.
///
/// # Errors
///
/// Returns the source error after logging it
pub async fn refresh_once(registry: &NodeRegistry, source: &dyn TopologySource) -> Result<usize> {
    match source.fetch().await {
        Ok(nodes) => {
            registry.replace(nodes);
            let count = registry.len();
            tracing::info!(source = source.name(), nodes = count, "topology refreshed");
            Ok(count)
        }
        Err(e) => {
            tracing::warn!(
                source = source.name(),
                error = %e,
                "topology refresh failed, keeping previous snapshot"
            );
            Err(e)
        }
    }
}

/// Spawn the periodic refresh loop
///
/// The first refresh happens one interval after spawning; callers populate the
/// registry at startup with `refresh_once`.
#[must_use]
pub fn spawn_refresh_loop(
    registry: Arc<NodeRegistry>,
    source: Arc<dyn TopologySource>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let _ = refresh_once(&registry, source.as_ref()).await;
        }
    })
}
