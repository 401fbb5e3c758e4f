use std::{fmt, future::Future, time::Duration};

use parse_display::Display;

use super::{Clean, Notification, NotificationType, NotificationsStore, WorkerStore};
use crate::{ModelError, Validable};


/// Which pending counter a request occupies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Pending {
    /// The store-wide counter.
    #[default]
    Default,
    /// No counter.
    Off,
    /// A named task counter.
    Task(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Passed to the error notification.
    pub notification_timeout: Option<Duration>,
    pub pending: Pending,
    /// Do not add a notification when the request fails.
    pub disable_notifications: bool,
    /// Delete error notifications before the request starts.
    pub delete_errors: bool,
    /// Delete all notifications before the request starts.
    pub delete_notifications: bool,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_pending(mut self, pending: Pending) -> Self {
        self.pending = pending;
        self
    }
    pub fn with_notification_timeout(mut self, timeout: Duration) -> Self {
        self.notification_timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Display)]
pub enum RequestError<E> {
    /// The model did not pass validation, so the request was not started.
    #[display("`model` is in invalid state.")]
    InvalidSubmission,
    #[display("{0}")]
    Validation(ModelError),
    #[display("{0}")]
    Failed(E),
}

impl<E> RequestError<E> {
    pub fn is_invalid_submission(&self) -> bool {
        matches!(self, RequestError::InvalidSubmission)
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RequestError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::InvalidSubmission => None,
            RequestError::Validation(e) => Some(e),
            RequestError::Failed(e) => Some(e),
        }
    }
}

/// Runs asynchronous work while keeping pending counters and notifications up to date.
///
/// Clones share their stores, so several requests can run at once and the counters can
/// be read while they do.
#[derive(Clone, Debug, Default)]
pub struct RequestableStore {
    pub notifications: NotificationsStore,
    pub worker: WorkerStore,
}

impl RequestableStore {
    pub fn new(notifications: NotificationsStore, worker: WorkerStore) -> Self {
        Self {
            notifications,
            worker,
        }
    }

    /// Awaits `work`.
    ///
    /// The pending counter is held while the work runs, and is also released if the
    /// returned future is dropped. A failure is logged and, unless disabled, added to
    /// the notifications.
    pub async fn request<R, E, F>(
        &self,
        work: F,
        options: &RequestOptions,
    ) -> Result<R, RequestError<E>>
    where
        E: fmt::Display,
        F: Future<Output = Result<R, E>>,
    {
        if options.delete_notifications {
            self.notifications.delete_all(None);
        } else if options.delete_errors {
            self.notifications.delete_all(Some(NotificationType::Error));
        }

        let result = {
            let _pending = PendingGuard::new(&self.worker, &options.pending);
            work.await
        };
        result.map_err(|e| {
            self.on_request_error(&e, options);
            RequestError::Failed(e)
        })
    }

    /// Validates `model` and runs `work` only if it is valid.
    ///
    /// An invalid model yields [`RequestError::InvalidSubmission`]; `work` is never polled.
    pub async fn submit<R, E, F>(
        &self,
        model: &mut impl Validable,
        work: F,
        options: &RequestOptions,
    ) -> Result<R, RequestError<E>>
    where
        E: fmt::Display,
        F: Future<Output = Result<R, E>>,
    {
        if !model.validate_all().map_err(RequestError::Validation)? {
            log::warn!("submission rejected: model is invalid");
            return Err(RequestError::InvalidSubmission);
        }
        self.request(work, options).await
    }

    fn on_request_error(&self, error: &impl fmt::Display, options: &RequestOptions) {
        log::error!("request failed: {error}");
        if !options.disable_notifications {
            self.notifications.add(
                Notification::new(NotificationType::Error, error.to_string())
                    .with_timeout(options.notification_timeout),
            );
        }
    }
}

impl Clean for RequestableStore {
    fn clean(&self) {
        self.notifications.clean();
        self.worker.clean();
    }
}

struct PendingGuard {
    worker: WorkerStore,
    task: Option<String>,
    active: bool,
}

impl PendingGuard {
    fn new(worker: &WorkerStore, pending: &Pending) -> Self {
        let (active, task) = match pending {
            Pending::Default => (true, None),
            Pending::Off => (false, None),
            Pending::Task(task) => (true, Some(task.clone())),
        };
        if active {
            worker.push(task.as_deref());
        }
        Self {
            worker: worker.clone(),
            task,
            active,
        }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.active {
            self.worker.pop(self.task.as_deref());
        }
    }
}
