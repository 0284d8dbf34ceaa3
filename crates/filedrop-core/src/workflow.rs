use crate::{file_basename, DescriptorMessage, Error, FileStore, MessageQueue, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// States of a single publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Validating,
    Uploading,
    Uploaded,
    Publishing,
    Done,
    UploadFailed,
    PublishFailed,
}

/// Discrete progress ticks surfaced to the caller as each phase starts or
/// ends. Not a true percentage.
pub mod progress {
    pub const UPLOAD_STARTED: u8 = 20;
    pub const UPLOAD_FAILED: u8 = 30;
    pub const UPLOADED: u8 = 50;
    pub const PUBLISH_FAILED: u8 = 80;
    pub const PUBLISHED: u8 = 100;
}

/// Observer for state transitions and progress ticks. All methods default
/// to no-ops; a UI advances its progress bar here, the CLI ignores it.
pub trait WorkflowObserver: Send {
    fn on_state(&mut self, _state: WorkflowState) {}
    fn on_progress(&mut self, _percent: u8) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {}

/// Field values for one publish attempt, collected from the CLI (or any
/// other frontend) before the workflow runs.
#[derive(Debug, Clone, Default)]
pub struct PublishRequest {
    pub local_path: PathBuf,
    pub company_name: String,
    pub file_type: String,
    pub data_type: String,
    pub load_id: i64,
    pub file_sub_type: String,
    pub original_file_name: String,
    pub extras: BTreeMap<String, String>,
}

/// Terminal result of a publish attempt.
///
/// `StoredNotQueued` is deliberate: a failed publish does not undo the
/// completed upload and there is no automatic retry. The file stays in
/// object storage and a human reconciles the missed notification.
#[derive(Debug)]
pub enum WorkflowOutcome {
    /// Upload and publish both succeeded.
    Completed { message: DescriptorMessage },

    /// The file reached object storage but the queue publish failed.
    StoredNotQueued {
        message: DescriptorMessage,
        error: Error,
    },

    /// The upload failed; no publish was attempted.
    UploadFailed { error: Error },

    /// Input validation failed before any network call.
    Invalid { error: Error },
}

impl WorkflowOutcome {
    /// True when the caller should prompt for reconfiguration instead of
    /// reporting a plain failure.
    pub fn needs_configuration(&self) -> bool {
        matches!(self, WorkflowOutcome::UploadFailed { error } if error.is_configuration())
    }

    /// True when the file reached object storage, whether or not the
    /// notification went out.
    pub fn file_stored(&self) -> bool {
        matches!(
            self,
            WorkflowOutcome::Completed { .. } | WorkflowOutcome::StoredNotQueued { .. }
        )
    }
}

/// Orchestrates one publish attempt: validate, upload, build the
/// descriptor, publish, report. Runs synchronously on a single control
/// path; the queue connection is closed on every exit path after the
/// publish phase starts.
pub struct PublishWorkflow<S, Q> {
    store: S,
    queue: Q,
    state: WorkflowState,
}

impl<S: FileStore, Q: MessageQueue> PublishWorkflow<S, Q> {
    pub fn new(store: S, queue: Q) -> Self {
        Self {
            store,
            queue,
            state: WorkflowState::Idle,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    fn transition(&mut self, state: WorkflowState, observer: &mut dyn WorkflowObserver) {
        self.state = state;
        observer.on_state(state);
    }

    /// Run the attempt to completion. Never returns Err: every failure is
    /// folded into the outcome with enough context to tell which step
    /// failed and why.
    pub async fn run(
        &mut self,
        request: &PublishRequest,
        observer: &mut dyn WorkflowObserver,
    ) -> WorkflowOutcome {
        self.transition(WorkflowState::Validating, observer);

        if let Err(error) = validate(request) {
            warn!(error = %error, "publish request rejected");
            return WorkflowOutcome::Invalid { error };
        }

        self.transition(WorkflowState::Uploading, observer);
        observer.on_progress(progress::UPLOAD_STARTED);

        let stored = match self.store.upload(&request.local_path).await {
            Ok(stored) => stored,
            Err(error) => {
                observer.on_progress(progress::UPLOAD_FAILED);
                self.transition(WorkflowState::UploadFailed, observer);
                error!(error = %error, path = %request.local_path.display(), "upload failed");
                return WorkflowOutcome::UploadFailed { error };
            }
        };

        info!(
            bucket = %stored.bucket,
            key = %stored.key,
            "file uploaded"
        );
        observer.on_progress(progress::UPLOADED);
        self.transition(WorkflowState::Uploaded, observer);

        // The message carries the bucket/folder the upload actually used,
        // not a configuration snapshot.
        let message = DescriptorMessage {
            file_name: file_basename(&request.local_path),
            company_name: request.company_name.clone(),
            file_type: request.file_type.clone(),
            data_type: request.data_type.clone(),
            load_id: request.load_id,
            file_sub_type: request.file_sub_type.clone(),
            bucket_name: stored.bucket.clone(),
            folder_name: stored.folder.clone(),
            original_file_name: request.original_file_name.clone(),
            extras: request.extras.clone(),
        };

        self.transition(WorkflowState::Publishing, observer);
        let published = self.queue.publish(&message).await;

        if let Err(error) = self.queue.close().await {
            warn!(error = %error, "failed to close queue connection");
        }

        match published {
            Ok(()) => {
                observer.on_progress(progress::PUBLISHED);
                self.transition(WorkflowState::Done, observer);
                info!(queue_message = %message.file_name, "descriptor published");
                WorkflowOutcome::Completed { message }
            }
            Err(error) => {
                observer.on_progress(progress::PUBLISH_FAILED);
                self.transition(WorkflowState::PublishFailed, observer);
                error!(error = %error, "publish failed, file remains in storage");
                WorkflowOutcome::StoredNotQueued { message, error }
            }
        }
    }
}

fn validate(request: &PublishRequest) -> Result<()> {
    if request.local_path.as_os_str().is_empty() {
        return Err(Error::Validation("no input file selected".to_string()));
    }
    if !request.local_path.exists() {
        return Err(Error::Validation(format!(
            "input file does not exist: {}",
            request.local_path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoredObject;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeStore {
        fail_with: Option<fn() -> Error>,
        connection_attempts: Arc<AtomicUsize>,
    }

    impl FakeStore {
        fn ok() -> Self {
            Self {
                fail_with: None,
                connection_attempts: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing(fail_with: fn() -> Error) -> Self {
            Self {
                fail_with: Some(fail_with),
                connection_attempts: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl FileStore for FakeStore {
        async fn upload(&self, local_path: &Path) -> crate::Result<StoredObject> {
            if let Some(make_error) = self.fail_with {
                let error = make_error();
                // A configuration failure happens before any connection
                if !error.is_configuration() {
                    self.connection_attempts.fetch_add(1, Ordering::SeqCst);
                }
                return Err(error);
            }
            self.connection_attempts.fetch_add(1, Ordering::SeqCst);
            Ok(StoredObject {
                bucket: "data-bucket".to_string(),
                folder: "incoming".to_string(),
                key: format!("incoming/{}", file_basename(local_path)),
            })
        }

        async fn check_access(&self) -> crate::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeQueue {
        fail: bool,
        published: Vec<DescriptorMessage>,
        closed: usize,
    }

    #[async_trait]
    impl MessageQueue for FakeQueue {
        async fn publish(&mut self, message: &DescriptorMessage) -> crate::Result<()> {
            if self.fail {
                return Err(Error::Connection("broker unreachable".to_string()));
            }
            self.published.push(message.clone());
            Ok(())
        }

        async fn close(&mut self) -> crate::Result<()> {
            self.closed += 1;
            Ok(())
        }
    }

    fn request_for(path: &Path) -> PublishRequest {
        PublishRequest {
            local_path: path.to_path_buf(),
            company_name: "generic".to_string(),
            file_type: "sales".to_string(),
            load_id: 1,
            ..Default::default()
        }
    }

    fn temp_input(name: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(name), b"a,b\n1,2\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn completed_attempt_publishes_basename_and_receipt_fields() {
        let dir = temp_input("report.csv");
        let mut workflow = PublishWorkflow::new(FakeStore::ok(), FakeQueue::default());

        let outcome = workflow
            .run(&request_for(&dir.path().join("report.csv")), &mut NoopObserver)
            .await;

        match outcome {
            WorkflowOutcome::Completed { message } => {
                assert_eq!(message.file_name, "report.csv");
                assert_eq!(message.bucket_name, "data-bucket");
                assert_eq!(message.folder_name, "incoming");
            }
            other => panic!("expected Completed, got {:?}", other),
        }
        assert_eq!(workflow.state(), WorkflowState::Done);
        assert_eq!(workflow.queue.closed, 1);
    }

    #[tokio::test]
    async fn publish_failure_leaves_file_stored() {
        let dir = temp_input("report.csv");
        let queue = FakeQueue {
            fail: true,
            ..Default::default()
        };
        let mut workflow = PublishWorkflow::new(FakeStore::ok(), queue);

        let outcome = workflow
            .run(&request_for(&dir.path().join("report.csv")), &mut NoopObserver)
            .await;

        assert!(outcome.file_stored());
        assert!(matches!(outcome, WorkflowOutcome::StoredNotQueued { .. }));
        assert_eq!(workflow.state(), WorkflowState::PublishFailed);
        // The connection is still closed on the failure path
        assert_eq!(workflow.queue.closed, 1);
        // Exactly one upload, no re-upload on publish failure
        assert_eq!(workflow.store.connection_attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn configuration_failure_skips_publish_and_prompts() {
        let dir = temp_input("report.csv");
        let store = FakeStore::failing(|| Error::Configuration("bucket name missing".to_string()));
        let attempts = store.connection_attempts.clone();
        let mut workflow = PublishWorkflow::new(store, FakeQueue::default());

        let outcome = workflow
            .run(&request_for(&dir.path().join("report.csv")), &mut NoopObserver)
            .await;

        assert!(outcome.needs_configuration());
        assert!(!outcome.file_stored());
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
        assert!(workflow.queue.published.is_empty());
    }

    #[tokio::test]
    async fn missing_file_fails_validation_before_any_call() {
        let store = FakeStore::ok();
        let attempts = store.connection_attempts.clone();
        let mut workflow = PublishWorkflow::new(store, FakeQueue::default());

        let outcome = workflow
            .run(&request_for(Path::new("/nonexistent/report.csv")), &mut NoopObserver)
            .await;

        assert!(matches!(outcome, WorkflowOutcome::Invalid { .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
        assert!(workflow.queue.published.is_empty());
    }

    #[tokio::test]
    async fn progress_ticks_follow_phase_boundaries() {
        struct Recorder(Vec<u8>);
        impl WorkflowObserver for Recorder {
            fn on_progress(&mut self, percent: u8) {
                self.0.push(percent);
            }
        }

        let dir = temp_input("report.csv");
        let queue = FakeQueue {
            fail: true,
            ..Default::default()
        };
        let mut workflow = PublishWorkflow::new(FakeStore::ok(), queue);
        let mut recorder = Recorder(Vec::new());

        workflow
            .run(&request_for(&dir.path().join("report.csv")), &mut recorder)
            .await;

        assert_eq!(
            recorder.0,
            vec![
                progress::UPLOAD_STARTED,
                progress::UPLOADED,
                progress::PUBLISH_FAILED
            ]
        );
    }
}
