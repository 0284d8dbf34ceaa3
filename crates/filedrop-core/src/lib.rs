mod error;
mod message;
mod queue;
mod store;
mod workflow;

pub use error::{Error, Result};
pub use message::{file_basename, DescriptorMessage, StoredObject, UploadDescriptor};
pub use queue::MessageQueue;
pub use store::FileStore;
pub use workflow::{
    progress, NoopObserver, PublishRequest, PublishWorkflow, WorkflowObserver, WorkflowOutcome,
    WorkflowState,
};
