use crate::{DescriptorMessage, Result};
use async_trait::async_trait;

/// Trait for queue publishers.
#[async_trait]
pub trait MessageQueue: Send {
    /// Publish a descriptor message, lazily opening a connection if none
    /// is open. Connection failures surface as `Error::Connection`.
    async fn publish(&mut self, message: &DescriptorMessage) -> Result<()>;

    /// Close the underlying connection. Idempotent when not connected;
    /// callers invoke this on success and failure paths alike.
    async fn close(&mut self) -> Result<()>;
}
