use tokio::sync::oneshot;

use crate::domain::{ClassSnapshot, ClassSpec, CrawlError, Credentials};

/// One scheduled crawl for one user.
///
/// Carries a copy of the user's stored classes taken at enqueue time. The
/// worker diffs against that copy and merges into it, so two jobs for the
/// same user never share state.
#[derive(Debug)]
pub struct CrawlJob {
    pub user_id: String,
    pub user_name: String,
    pub credentials: Credentials,
    pub classes: Vec<ClassSpec>,
    pub previous: Vec<ClassSnapshot>,
    pub notification_email: Option<String>,
    pub done: Option<DoneSignal>,
}

impl CrawlJob {
    pub fn new(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        credentials: Credentials,
        previous: Vec<ClassSnapshot>,
        notification_email: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            credentials,
            classes: previous.iter().map(|c| c.spec.clone()).collect(),
            previous,
            notification_email: notification_email.filter(|e| !e.trim().is_empty()),
            done: None,
        }
    }

    pub fn with_done(mut self, done: Option<DoneSignal>) -> Self {
        self.done = done;
        self
    }
}

/// Summary of one finished job, delivered through its done signal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunReport {
    pub user_id: String,
    /// Classes that failed this run, by class index.
    pub errors: Vec<(usize, CrawlError)>,
    pub changed_classes: usize,
    pub notified: bool,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Single-use completion notice for a job.
///
/// `fire` consumes the signal, so a job can complete its waiter at most once.
#[derive(Debug)]
pub struct DoneSignal(oneshot::Sender<RunReport>);

impl DoneSignal {
    pub fn channel() -> (Self, oneshot::Receiver<RunReport>) {
        let (tx, rx) = oneshot::channel();
        (Self(tx), rx)
    }

    /// Returns false if the waiter is gone.
    pub fn fire(self, report: RunReport) -> bool {
        self.0.send(report).is_ok()
    }
}
