//! Scheduler core: a polling loop and a worker pool joined by one bounded
//! queue.
//!
//! ```text
//! polling tick ─┐
//! queue()      ─┼─→ [bounded queue] ─→ worker × N ─→ Agent → diff → notify → store
//! queue_async()─┘                                              └─→ DoneSignal
//! ```
//!
//! Each worker owns one [`Agent`]. `stop()` sends one shutdown signal per
//! listening task and does not wait for in-flight jobs. Jobs still queued at
//! that point are dropped, so their waiters see `DoneSignalDropped`.

mod error;
mod job;
mod schedule;

pub use error::SchedulerError;
pub use job::{CrawlJob, DoneSignal, RunReport};
pub use schedule::RefreshSchedule;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::diff;
use crate::domain::{User, UserResults};
use crate::notify::{Notifier, Renderer, DEFAULT_SUBJECT};
use crate::scraper::Agent;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Timing and queue settings.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Raised to the worker count when smaller.
    pub queue_capacity: usize,
    pub check_interval: Duration,
    pub refresh_interval: Duration,
    pub subject: String,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 0,
            check_interval: Duration::from_secs(30),
            refresh_interval: Duration::from_secs(30 * 60),
            subject: DEFAULT_SUBJECT.to_string(),
        }
    }
}

/// Everything a scheduler is built from. One worker runs per agent.
pub struct SchedulerConfig {
    pub agents: Vec<Arc<dyn Agent>>,
    pub store: Arc<dyn Store>,
    pub notifier: Arc<dyn Notifier>,
    pub renderer: Arc<dyn Renderer>,
    pub options: SchedulerOptions,
}

pub struct Scheduler {
    agents: Vec<Arc<dyn Agent>>,
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    renderer: Arc<dyn Renderer>,
    options: SchedulerOptions,
    sender: Mutex<Option<mpsc::Sender<CrawlJob>>>,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<CrawlJob>>>,
    state: Mutex<SchedulerState>,
    shutdown: Mutex<Vec<oneshot::Sender<()>>>,
    closed: watch::Sender<bool>,
    schedule: Mutex<RefreshSchedule>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let capacity = config
            .options
            .queue_capacity
            .max(config.agents.len())
            .max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let (closed, _) = watch::channel(false);

        Self {
            agents: config.agents,
            store: config.store,
            notifier: config.notifier,
            renderer: config.renderer,
            options: config.options,
            sender: Mutex::new(Some(sender)),
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
            state: Mutex::new(SchedulerState::Idle),
            shutdown: Mutex::new(Vec::new()),
            closed,
            schedule: Mutex::new(RefreshSchedule::new()),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *lock(&self.state)
    }

    pub fn worker_count(&self) -> usize {
        self.agents.len()
    }

    /// Launch the workers, then run the polling loop until `stop()`.
    pub async fn start(self: &Arc<Self>) -> Result<(), SchedulerError> {
        let (poll_stop, worker_stops) = {
            let mut state = lock(&self.state);
            match *state {
                SchedulerState::Idle => {}
                SchedulerState::Running => return Err(SchedulerError::AlreadyStarted),
                SchedulerState::Stopped => return Err(SchedulerError::Stopped),
            }
            *state = SchedulerState::Running;

            // Registered under the state lock so a concurrent stop() sees
            // every listener.
            let mut shutdown = lock(&self.shutdown);
            let (tx, poll_stop) = oneshot::channel();
            shutdown.push(tx);
            let worker_stops: Vec<_> = self
                .agents
                .iter()
                .map(|_| {
                    let (tx, rx) = oneshot::channel();
                    shutdown.push(tx);
                    rx
                })
                .collect();
            (poll_stop, worker_stops)
        };

        self.seed_schedule();

        for (id, (agent, stop)) in self.agents.iter().zip(worker_stops).enumerate() {
            let scheduler = Arc::clone(self);
            let agent = Arc::clone(agent);
            tokio::spawn(async move { scheduler.work(id, agent, stop).await });
        }

        info!(
            workers = self.agents.len(),
            check_interval = ?self.options.check_interval,
            refresh_interval = ?self.options.refresh_interval,
            "Scheduler started"
        );

        self.poll(poll_stop).await;
        self.drain_queue().await;

        info!("Scheduler stopped");
        Ok(())
    }

    /// Signal the polling loop and every worker to exit.
    ///
    /// Returns the number of signals delivered, one per listening task.
    /// Jobs already being processed run to completion. Queued jobs are
    /// dropped, here when no worker holds the queue, otherwise by `start()`
    /// once the polling loop has exited.
    pub fn stop(&self) -> usize {
        let mut state = lock(&self.state);
        *state = SchedulerState::Stopped;
        lock(&self.sender).take();
        self.closed.send_replace(true);

        if let Ok(mut receiver) = self.receiver.try_lock() {
            Self::close_and_drop(&mut receiver);
        }

        let signals: Vec<_> = lock(&self.shutdown).drain(..).collect();
        let sent = signals
            .into_iter()
            .filter_map(|tx| tx.send(()).ok())
            .count();
        debug!(signals = sent, "Shutdown signals sent");
        sent
    }

    async fn drain_queue(&self) {
        let mut receiver = self.receiver.lock().await;
        Self::close_and_drop(&mut receiver);
    }

    fn close_and_drop(receiver: &mut mpsc::Receiver<CrawlJob>) {
        receiver.close();
        let mut dropped = 0;
        while receiver.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            warn!(dropped, "Dropped queued jobs at shutdown");
        }
    }

    /// Queue a run for `user` and wait for it to finish.
    pub async fn queue(&self, user: &User) -> Result<RunReport, SchedulerError> {
        let (signal, done) = DoneSignal::channel();
        self.queue_async(user, Some(signal)).await?;
        done.await.map_err(|_| SchedulerError::DoneSignalDropped)
    }

    /// Queue a run for `user` and return once it is in the queue.
    ///
    /// Waits only for queue space. `done` fires when a worker finishes the job.
    pub async fn queue_async(&self, user: &User, done: Option<DoneSignal>) -> Result<(), SchedulerError> {
        self.enqueue(user, done, Utc::now()).await
    }

    /// One polling tick: queue every enabled user whose last check is older
    /// than the refresh interval. Returns how many users were queued.
    pub async fn refresh_due(&self, now: DateTime<Utc>) -> usize {
        let users = match self.store.list_users() {
            Ok(users) => users,
            Err(e) => {
                error!("Failed to list users: {}", e);
                return 0;
            }
        };

        let mut queued = 0;
        for user in users {
            match self.store.get_crawler_config(&user.id) {
                Ok(Some(config)) if config.enabled => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!(user_id = %user.id, "Failed to read crawler config: {}", e);
                    continue;
                }
            }

            if !self.is_due(&user.id, now) {
                continue;
            }

            match self.enqueue(&user, None, now).await {
                Ok(()) => queued += 1,
                Err(SchedulerError::Stopped) => break,
                Err(e) => warn!(user_id = %user.id, "Failed to queue user: {}", e),
            }
        }

        if queued > 0 {
            debug!(queued, "Polling tick queued users");
        }
        queued
    }

    fn is_due(&self, user_id: &str, now: DateTime<Utc>) -> bool {
        if !lock(&self.schedule).contains(user_id) {
            let last_update = self
                .store
                .get_results(user_id)
                .map(|r| r.last_update)
                .unwrap_or_else(|e| {
                    warn!(user_id = %user_id, "Failed to read results: {}", e);
                    None
                });
            lock(&self.schedule).seed(user_id, last_update);
        }
        lock(&self.schedule).is_due(user_id, now, self.options.refresh_interval)
    }

    fn seed_schedule(&self) {
        let users = match self.store.list_users() {
            Ok(users) => users,
            Err(e) => {
                error!("Failed to list users: {}", e);
                return;
            }
        };
        for user in users {
            match self.store.get_results(&user.id) {
                Ok(results) => lock(&self.schedule).seed(&user.id, results.last_update),
                Err(e) => warn!(user_id = %user.id, "Failed to read results: {}", e),
            }
        }
    }

    fn build_job(&self, user: &User) -> Result<CrawlJob, SchedulerError> {
        let results = self.store.get_results(&user.id)?;
        let config = self
            .store
            .get_crawler_config(&user.id)?
            .ok_or_else(|| SchedulerError::NotConfigured(user.id.clone()))?;

        Ok(CrawlJob::new(
            user.id.clone(),
            user.display_name(),
            config.credentials.clone(),
            results.classes,
            config.notification_address().map(str::to_string),
        ))
    }

    async fn enqueue(
        &self,
        user: &User,
        done: Option<DoneSignal>,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        let sender = lock(&self.sender).clone().ok_or(SchedulerError::Stopped)?;
        let job = self.build_job(user)?.with_done(done);

        debug!(user_id = %user.id, classes = job.classes.len(), "Queueing user");
        let mut closed = self.closed.subscribe();
        tokio::select! {
            biased;
            _ = closed.wait_for(|stopped| *stopped) => return Err(SchedulerError::Stopped),
            sent = sender.send(job) => sent.map_err(|_| SchedulerError::Stopped)?,
        }
        lock(&self.schedule).record(&user.id, now);
        Ok(())
    }

    async fn poll(&self, mut stop: oneshot::Receiver<()>) {
        let period = self.options.check_interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    self.refresh_due(Utc::now()).await;
                }
            }
        }
    }

    async fn work(&self, id: usize, agent: Arc<dyn Agent>, mut stop: oneshot::Receiver<()>) {
        debug!(worker = id, "Worker started");
        loop {
            let job = tokio::select! {
                biased;
                _ = &mut stop => break,
                job = self.next_job() => match job {
                    Some(job) => job,
                    None => break,
                },
            };
            self.process(agent.as_ref(), job).await;
        }
        debug!(worker = id, "Worker exiting");
    }

    async fn next_job(&self) -> Option<CrawlJob> {
        self.receiver.lock().await.recv().await
    }

    /// Crawl, diff, notify, merge, persist, then complete the waiter.
    ///
    /// Store and notifier failures are logged; later steps still run.
    async fn process(&self, agent: &dyn Agent, mut job: CrawlJob) {
        let done = job.done.take();
        let outcomes = agent.run(&job).await;
        let changed = diff::diff(&job.previous, &outcomes);

        let mut report = RunReport {
            user_id: job.user_id.clone(),
            errors: outcomes
                .iter()
                .filter_map(|o| o.error().map(|e| (o.class_index, e.clone())))
                .collect(),
            changed_classes: changed.len(),
            notified: false,
        };

        if !changed.is_empty() {
            info!(user_id = %job.user_id, classes = changed.len(), "New results");
            if let Some(address) = job.notification_email.as_deref() {
                let body = self.renderer.render(&job.user_name, &changed);
                match self.notifier.send(address, &self.options.subject, &body).await {
                    Ok(()) => report.notified = true,
                    Err(e) => error!(user_id = %job.user_id, "Failed to send notification: {}", e),
                }
            }
        }

        let mut classes = std::mem::take(&mut job.previous);
        diff::merge(&mut classes, &outcomes);
        let results = UserResults {
            user_id: job.user_id.clone(),
            last_update: Some(Utc::now()),
            classes,
        };
        if let Err(e) = self.store.update_results(&results) {
            error!(user_id = %job.user_id, "Failed to store results: {}", e);
        }

        debug!(
            user_id = %job.user_id,
            errors = report.errors.len(),
            changed = report.changed_classes,
            notified = report.notified,
            "Job finished"
        );

        if let Some(done) = done {
            done.fire(report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::app::{GradewatchError, Result};
    use crate::domain::{ClassOutcome, ClassSnapshot, ClassSpec, CrawlError, CrawlerConfig, Credentials, ResultEntry};
    use crate::notify::HtmlRenderer;
    use crate::store::{CredentialStore, MemoryStore, ResultsStore, UserStore};

    /// Returns the same entries for every class of every job.
    struct FakeAgent {
        entries: Vec<ResultEntry>,
        fail_class: Option<usize>,
        delay_ms: u64,
        runs: AtomicUsize,
    }

    impl FakeAgent {
        fn new(entries: Vec<ResultEntry>) -> Self {
            Self {
                entries,
                fail_class: None,
                delay_ms: 0,
                runs: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Agent for FakeAgent {
        async fn run(&self, job: &CrawlJob) -> Vec<ClassOutcome> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst) as u64;
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms + run % 7)).await;
            }
            job.classes
                .iter()
                .enumerate()
                .map(|(i, spec)| {
                    if self.fail_class == Some(i) {
                        ClassOutcome::failure(i, CrawlError::NoResults)
                    } else {
                        ClassOutcome::success(
                            i,
                            ClassSnapshot::with_results(spec.clone(), self.entries.clone()),
                        )
                    }
                })
                .collect()
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String, String)>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, address: &str, subject: &str, body: &str) -> Result<()> {
            if self.fail {
                return Err(GradewatchError::Notify("smtp down".into()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((address.to_string(), subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    struct Harness {
        scheduler: Arc<Scheduler>,
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
    }

    /// A `MemoryStore` that fails the calls it is told to.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_list_users: bool,
        fail_update_results: bool,
    }

    impl UserStore for FlakyStore {
        fn add_user(&self, user: &User) -> Result<()> {
            self.inner.add_user(user)
        }

        fn get_user(&self, id: &str) -> Result<Option<User>> {
            self.inner.get_user(id)
        }

        fn list_users(&self) -> Result<Vec<User>> {
            if self.fail_list_users {
                return Err(GradewatchError::Other("database is locked".into()));
            }
            self.inner.list_users()
        }
    }

    impl CredentialStore for FlakyStore {
        fn get_crawler_config(&self, user_id: &str) -> Result<Option<CrawlerConfig>> {
            self.inner.get_crawler_config(user_id)
        }

        fn update_crawler_config(&self, config: &CrawlerConfig) -> Result<()> {
            self.inner.update_crawler_config(config)
        }
    }

    impl ResultsStore for FlakyStore {
        fn get_results(&self, user_id: &str) -> Result<UserResults> {
            self.inner.get_results(user_id)
        }

        fn update_results(&self, results: &UserResults) -> Result<()> {
            if self.fail_update_results {
                return Err(GradewatchError::Other("disk full".into()));
            }
            self.inner.update_results(results)
        }
    }

    fn scheduler_over(
        store: Arc<dyn Store>,
        agent: FakeAgent,
        workers: usize,
        notifier: Arc<RecordingNotifier>,
        options: SchedulerOptions,
    ) -> Arc<Scheduler> {
        let agent: Arc<dyn Agent> = Arc::new(agent);
        Arc::new(Scheduler::new(SchedulerConfig {
            agents: vec![agent; workers],
            store,
            notifier,
            renderer: Arc::new(HtmlRenderer::new()),
            options,
        }))
    }

    fn slow_polling() -> SchedulerOptions {
        SchedulerOptions {
            check_interval: Duration::from_secs(3600),
            ..Default::default()
        }
    }

    fn fast_polling() -> SchedulerOptions {
        SchedulerOptions {
            check_interval: Duration::from_millis(10),
            ..Default::default()
        }
    }

    fn harness(agent: FakeAgent, workers: usize, notifier: RecordingNotifier) -> Harness {
        harness_with(agent, workers, notifier, slow_polling())
    }

    fn harness_with(
        agent: FakeAgent,
        workers: usize,
        notifier: RecordingNotifier,
        options: SchedulerOptions,
    ) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(notifier);
        let scheduler = scheduler_over(store.clone(), agent, workers, notifier.clone(), options);
        Harness {
            scheduler,
            store,
            notifier,
        }
    }

    async fn wait_running(scheduler: &Scheduler) {
        while scheduler.state() != SchedulerState::Running {
            tokio::task::yield_now().await;
        }
    }

    fn add_user(store: &MemoryStore, email: &str, classes: Vec<ClassSnapshot>) -> User {
        let user = User::new(email, "Test", "User");
        store.add_user(&user).unwrap();
        let mut config = CrawlerConfig::new(&user.id, Credentials::new("aaaaaa", "zzzzzzz"));
        config.notification_email = email.to_string();
        store.update_crawler_config(&config).unwrap();
        let mut results = UserResults::new(&user.id);
        results.classes = classes;
        store.update_results(&results).unwrap();
        user
    }

    fn one_class() -> Vec<ClassSnapshot> {
        vec![ClassSnapshot::empty(ClassSpec::new("INF1120", "40", "20143"))]
    }

    fn midterm() -> ResultEntry {
        ResultEntry::new("Midterm", "85", "78")
    }

    fn spawn_start(scheduler: &Arc<Scheduler>) -> tokio::task::JoinHandle<std::result::Result<(), SchedulerError>> {
        let scheduler = Arc::clone(scheduler);
        tokio::spawn(async move { scheduler.start().await })
    }

    #[tokio::test]
    async fn test_new_results_are_notified_and_stored() {
        let h = harness(FakeAgent::new(vec![midterm()]), 2, RecordingNotifier::default());
        let user = add_user(&h.store, "random@user.com", one_class());
        let handle = spawn_start(&h.scheduler);

        let report = h.scheduler.queue(&user).await.unwrap();
        assert_eq!(report.changed_classes, 1);
        assert!(report.notified);
        assert!(report.is_clean());

        let sent = h.notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "random@user.com");
        assert_eq!(sent[0].1, DEFAULT_SUBJECT);
        assert!(sent[0].2.contains("Midterm"));

        let stored = h.store.get_results(&user.id).unwrap();
        assert_eq!(stored.classes[0].results, vec![midterm()]);
        assert!(stored.last_update.is_some());

        assert_eq!(h.scheduler.stop(), 3);
        handle.await.unwrap().unwrap();
        assert_eq!(h.scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_no_new_results_sends_nothing() {
        let h = harness(FakeAgent::new(vec![midterm()]), 1, RecordingNotifier::default());
        let mut classes = one_class();
        classes[0].results = vec![midterm()];
        let user = add_user(&h.store, "random@user.com", classes);
        let _handle = spawn_start(&h.scheduler);

        let report = h.scheduler.queue(&user).await.unwrap();
        assert_eq!(report.changed_classes, 0);
        assert!(!report.notified);
        assert_eq!(h.notifier.count(), 0);

        let stored = h.store.get_results(&user.id).unwrap();
        assert_eq!(stored.classes[0].results.len(), 1);
        assert!(stored.last_update.is_some());
        h.scheduler.stop();
    }

    #[tokio::test]
    async fn test_second_identical_run_is_not_notified_again() {
        let h = harness(FakeAgent::new(vec![midterm()]), 1, RecordingNotifier::default());
        let user = add_user(&h.store, "random@user.com", one_class());
        let _handle = spawn_start(&h.scheduler);

        let first = h.scheduler.queue(&user).await.unwrap();
        let second = h.scheduler.queue(&user).await.unwrap();
        assert_eq!(first.changed_classes, 1);
        assert_eq!(second.changed_classes, 0);
        assert_eq!(h.notifier.count(), 1);
        h.scheduler.stop();
    }

    #[tokio::test]
    async fn test_failed_class_keeps_stored_snapshot() {
        let mut agent = FakeAgent::new(vec![midterm()]);
        agent.fail_class = Some(1);
        let h = harness(agent, 1, RecordingNotifier::default());

        let mut classes = one_class();
        let mut kept = ClassSnapshot::empty(ClassSpec::new("INF2120", "10", "20143"));
        kept.results = vec![ResultEntry::new("TP1", "17", "14")];
        classes.push(kept.clone());
        let user = add_user(&h.store, "random@user.com", classes);
        let _handle = spawn_start(&h.scheduler);

        let report = h.scheduler.queue(&user).await.unwrap();
        assert_eq!(report.errors, vec![(1, CrawlError::NoResults)]);
        assert_eq!(report.changed_classes, 1);

        let stored = h.store.get_results(&user.id).unwrap();
        assert_eq!(stored.classes[0].results, vec![midterm()]);
        assert_eq!(stored.classes[1], kept);
        h.scheduler.stop();
    }

    #[tokio::test]
    async fn test_no_address_skips_notification() {
        let h = harness(FakeAgent::new(vec![midterm()]), 1, RecordingNotifier::default());
        let user = add_user(&h.store, "random@user.com", one_class());
        let mut config = h.store.get_crawler_config(&user.id).unwrap().unwrap();
        config.notification_email.clear();
        h.store.update_crawler_config(&config).unwrap();
        let _handle = spawn_start(&h.scheduler);

        let report = h.scheduler.queue(&user).await.unwrap();
        assert_eq!(report.changed_classes, 1);
        assert!(!report.notified);
        assert_eq!(h.notifier.count(), 0);
        assert_eq!(h.store.get_results(&user.id).unwrap().classes[0].results.len(), 1);
        h.scheduler.stop();
    }

    #[tokio::test]
    async fn test_notifier_failure_still_persists() {
        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        let h = harness(FakeAgent::new(vec![midterm()]), 1, notifier);
        let user = add_user(&h.store, "random@user.com", one_class());
        let _handle = spawn_start(&h.scheduler);

        let report = h.scheduler.queue(&user).await.unwrap();
        assert!(!report.notified);
        let stored = h.store.get_results(&user.id).unwrap();
        assert_eq!(stored.classes[0].results, vec![midterm()]);
        assert!(stored.last_update.is_some());
        h.scheduler.stop();
    }

    #[tokio::test]
    async fn test_load_100_queues_on_10_workers() {
        let mut agent = FakeAgent::new(vec![midterm()]);
        agent.delay_ms = 5;
        let h = harness(agent, 10, RecordingNotifier::default());
        let user = add_user(&h.store, "random@user.com", one_class());
        let _handle = spawn_start(&h.scheduler);

        let mut handles = Vec::new();
        for _ in 0..100 {
            let scheduler = Arc::clone(&h.scheduler);
            let user = user.clone();
            handles.push(tokio::spawn(async move { scheduler.queue(&user).await }));
        }
        for handle in handles {
            let report = handle.await.unwrap().unwrap();
            assert_eq!(report.user_id, user.id);
        }

        assert!(h.store.get_results(&user.id).unwrap().last_update.is_some());
        assert_eq!(h.scheduler.stop(), 11);
    }

    #[tokio::test]
    async fn test_queue_after_stop_fails() {
        let h = harness(FakeAgent::new(vec![]), 1, RecordingNotifier::default());
        let user = add_user(&h.store, "random@user.com", one_class());
        let handle = spawn_start(&h.scheduler);
        wait_running(&h.scheduler).await;

        assert_eq!(h.scheduler.stop(), 2);
        handle.await.unwrap().unwrap();

        assert_eq!(h.scheduler.queue(&user).await, Err(SchedulerError::Stopped));
        assert_eq!(h.scheduler.queue_async(&user, None).await, Err(SchedulerError::Stopped));
        assert_eq!(h.scheduler.start().await, Err(SchedulerError::Stopped));
    }

    #[tokio::test]
    async fn test_stop_before_start() {
        let h = harness(FakeAgent::new(vec![]), 3, RecordingNotifier::default());
        assert_eq!(h.scheduler.state(), SchedulerState::Idle);
        assert_eq!(h.scheduler.stop(), 0);
        assert_eq!(h.scheduler.start().await, Err(SchedulerError::Stopped));
    }

    #[tokio::test]
    async fn test_unconfigured_user_is_rejected() {
        let h = harness(FakeAgent::new(vec![]), 1, RecordingNotifier::default());
        let user = User::new("nobody@example.com", "No", "Body");
        h.store.add_user(&user).unwrap();
        assert_eq!(
            h.scheduler.queue_async(&user, None).await,
            Err(SchedulerError::NotConfigured(user.id.clone()))
        );
    }

    #[tokio::test]
    async fn test_queue_async_fires_done_signal() {
        let h = harness(FakeAgent::new(vec![midterm()]), 1, RecordingNotifier::default());
        let user = add_user(&h.store, "random@user.com", one_class());
        let _handle = spawn_start(&h.scheduler);

        let (signal, done) = DoneSignal::channel();
        h.scheduler.queue_async(&user, Some(signal)).await.unwrap();
        let report = done.await.unwrap();
        assert_eq!(report.changed_classes, 1);
        h.scheduler.stop();
    }

    #[tokio::test]
    async fn test_refresh_due_skips_disabled_and_recent() {
        let h = harness(FakeAgent::new(vec![]), 1, RecordingNotifier::default());
        let due = add_user(&h.store, "due@example.com", one_class());
        let disabled = add_user(&h.store, "disabled@example.com", one_class());
        let recent = add_user(&h.store, "recent@example.com", one_class());

        let mut config = h.store.get_crawler_config(&disabled.id).unwrap().unwrap();
        config.enabled = false;
        h.store.update_crawler_config(&config).unwrap();

        let now = Utc::now();
        let mut results = h.store.get_results(&recent.id).unwrap();
        results.last_update = Some(now - chrono::Duration::minutes(5));
        h.store.update_results(&results).unwrap();

        // Not started: jobs wait in the queue, which holds one per worker.
        assert_eq!(h.scheduler.refresh_due(now).await, 1);
        assert_eq!(
            lock(&h.scheduler.schedule).last_checked(&due.id),
            Some(now)
        );

        // Just queued, so nothing is due until the interval has passed.
        let _handle = spawn_start(&h.scheduler);
        assert_eq!(h.scheduler.refresh_due(now).await, 0);
        h.scheduler.stop();
    }

    #[tokio::test]
    async fn test_refresh_due_after_interval() {
        let h = harness(FakeAgent::new(vec![]), 2, RecordingNotifier::default());
        add_user(&h.store, "a@example.com", one_class());
        add_user(&h.store, "b@example.com", one_class());

        let now = Utc::now();
        assert_eq!(h.scheduler.refresh_due(now).await, 2);
        let later = now + chrono::Duration::minutes(31);
        let _handle = spawn_start(&h.scheduler);
        assert_eq!(h.scheduler.refresh_due(later).await, 2);
        h.scheduler.stop();
    }

    #[tokio::test]
    async fn test_stop_drops_queued_jobs_and_wakes_waiters() {
        let mut agent = FakeAgent::new(vec![midterm()]);
        agent.delay_ms = 200;
        let h = harness(agent, 1, RecordingNotifier::default());
        let user = add_user(&h.store, "random@user.com", one_class());
        let handle = spawn_start(&h.scheduler);
        wait_running(&h.scheduler).await;

        // The queue holds one job: the second send waits until the worker
        // has taken the first.
        h.scheduler.queue_async(&user, None).await.unwrap();
        let (signal, done) = DoneSignal::channel();
        h.scheduler.queue_async(&user, Some(signal)).await.unwrap();

        assert_eq!(h.scheduler.stop(), 2);
        let waited = tokio::time::timeout(Duration::from_secs(2), done).await;
        assert!(matches!(waited, Ok(Err(_))));

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_queue_waiter_sees_dropped_signal_when_stopped_before_start() {
        let h = harness(FakeAgent::new(vec![]), 1, RecordingNotifier::default());
        let user = add_user(&h.store, "random@user.com", one_class());

        let waiter = {
            let scheduler = Arc::clone(&h.scheduler);
            let user = user.clone();
            tokio::spawn(async move { scheduler.queue(&user).await })
        };
        while lock(&h.scheduler.schedule).last_checked(&user.id).is_none() {
            tokio::task::yield_now().await;
        }

        assert_eq!(h.scheduler.stop(), 0);
        let result = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, Err(SchedulerError::DoneSignalDropped));
    }

    #[tokio::test]
    async fn test_stop_unblocks_polling_tick_on_full_queue() {
        let mut agent = FakeAgent::new(vec![]);
        agent.delay_ms = 500;
        let h = harness_with(agent, 1, RecordingNotifier::default(), fast_polling());
        for i in 0..5 {
            add_user(&h.store, &format!("user{}@example.com", i), one_class());
        }
        let handle = spawn_start(&h.scheduler);

        // One job running, one queued, the tick waiting on the third.
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.scheduler.stop();

        let finished = tokio::time::timeout(Duration::from_secs(3), handle).await;
        assert!(finished.is_ok(), "start() did not return after stop()");
        assert_eq!(h.scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_list_users_failure_skips_tick() {
        let store = Arc::new(FlakyStore {
            fail_list_users: true,
            ..Default::default()
        });
        add_user(&store.inner, "random@user.com", one_class());
        let scheduler = scheduler_over(
            store.clone(),
            FakeAgent::new(vec![midterm()]),
            1,
            Arc::new(RecordingNotifier::default()),
            fast_polling(),
        );

        assert_eq!(scheduler.refresh_due(Utc::now()).await, 0);

        let handle = spawn_start(&scheduler);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(scheduler.state(), SchedulerState::Running);
        assert!(!handle.is_finished());

        assert_eq!(scheduler.stop(), 2);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_store_failure_still_completes_waiter() {
        let store = Arc::new(FlakyStore {
            fail_update_results: true,
            ..Default::default()
        });
        let user = add_user(&store.inner, "random@user.com", one_class());
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = scheduler_over(
            store.clone(),
            FakeAgent::new(vec![midterm()]),
            1,
            notifier.clone(),
            slow_polling(),
        );
        let _handle = spawn_start(&scheduler);

        let report = tokio::time::timeout(Duration::from_secs(2), scheduler.queue(&user))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.changed_classes, 1);
        assert_eq!(notifier.count(), 1);

        let stored = store.inner.get_results(&user.id).unwrap();
        assert!(stored.classes[0].results.is_empty());
        assert!(stored.last_update.is_none());
        scheduler.stop();
    }
}
