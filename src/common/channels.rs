//! Channel type definitions for handing order intents to another task

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use super::errors::{Result, SchedulerError};
use super::traits::OrderSink;
use super::types::OrderIntent;

/// Default channel buffer size
pub const DEFAULT_CHANNEL_SIZE: usize = 1000;

/// Create a new order intent channel with the default buffer size
pub fn create_intent_channel() -> (mpsc::Sender<OrderIntent>, mpsc::Receiver<OrderIntent>) {
    mpsc::channel(DEFAULT_CHANNEL_SIZE)
}

/// Create a new order intent channel with a custom buffer size
pub fn create_intent_channel_with_size(
    size: usize,
) -> (mpsc::Sender<OrderIntent>, mpsc::Receiver<OrderIntent>) {
    mpsc::channel(size)
}

/// Order sink that forwards intents to whoever holds the receiver
///
/// Submission waits for buffer space. A dropped receiver rejects the intent.
#[derive(Debug, Clone)]
pub struct ChannelOrderSink {
    tx: mpsc::Sender<OrderIntent>,
}

impl ChannelOrderSink {
    pub fn new(tx: mpsc::Sender<OrderIntent>) -> Self {
        Self { tx }
    }

    /// A sink and the receiving end of a fresh default-sized channel
    pub fn channel() -> (Self, mpsc::Receiver<OrderIntent>) {
        let (tx, rx) = create_intent_channel();
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl OrderSink for ChannelOrderSink {
    async fn submit(&self, intent: &OrderIntent) -> Result<()> {
        self.tx.send(intent.clone()).await.map_err(|e| {
            SchedulerError::OrderRejected(format!("{}: receiver closed", e.0.symbol))
        })?;
        debug!(symbol = %intent.symbol, "Intent forwarded");
        Ok(())
    }
}
