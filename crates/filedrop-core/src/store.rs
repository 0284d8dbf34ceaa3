use crate::{Result, StoredObject};
use async_trait::async_trait;
use std::path::Path;

/// Trait for object storage backends.
///
/// Implementations must validate their own configuration and fail with
/// `Error::Configuration` before attempting any network call, so callers
/// can distinguish "not configured" from "server unreachable".
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Upload a local file, returning a receipt for where it landed.
    async fn upload(&self, local_path: &Path) -> Result<StoredObject>;

    /// Connectivity probe. Follows the same validate-then-connect contract
    /// as `upload` but transfers nothing. Never used by the main workflow.
    async fn check_access(&self) -> Result<()>;
}
