//! Dissemination task: engine stream → hub.

use std::sync::Arc;

use tracing::info;

use matching_engine::EventReceiver;

use crate::hub::MarketDataHub;

/// Consume the engine's event stream until it closes, applying each
/// committed operation's batch to the hub in order. When the engine shuts
/// down and the stream drains, every subscriber channel is closed.
pub async fn run_dissemination(mut events: EventReceiver, hub: Arc<MarketDataHub>) {
    info!("dissemination task running");
    while let Some(batch) = events.recv().await {
        hub.apply_batch(batch);
    }
    hub.close_all();
    info!("engine stream closed, dissemination task done");
}
