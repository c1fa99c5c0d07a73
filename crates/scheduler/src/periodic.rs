//! PeriodicScheduler - run an async action on a fixed interval until stopped

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::config::SchedulerConfig;

type Action = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    Idle = 0,
    Running = 1,
    Stopping = 2,
}

impl SchedulerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SchedulerState::Running,
            2 => SchedulerState::Stopping,
            _ => SchedulerState::Idle,
        }
    }
}

/// State shared between the handle and the loop task
#[derive(Debug)]
struct Shared {
    state: AtomicU8,
    tick_count: AtomicU64,
    failure_count: AtomicU64,
}

impl Shared {
    fn set_state(&self, state: SchedulerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }
}

/// Loop task plus its stop channel
struct RunningJob {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Runs a caller-supplied async action once per interval
///
/// Idle → Running → Stopping → Idle. Exactly one tick is in flight at a
/// time; a tick that overruns the interval delays the next one. A tick
/// returning `Err` or panicking is logged and the loop continues.
pub struct PeriodicScheduler {
    name: String,
    config: SchedulerConfig,
    action: Action,
    shared: Arc<Shared>,
    running: Mutex<Option<RunningJob>>,
}

impl fmt::Debug for PeriodicScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicScheduler")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

impl PeriodicScheduler {
    /// Create an idle scheduler
    pub fn new<F, Fut>(name: impl Into<String>, config: SchedulerConfig, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let action: Action = Arc::new(move || action().boxed());

        Self {
            name: name.into(),
            config,
            action,
            shared: Arc::new(Shared {
                state: AtomicU8::new(SchedulerState::Idle as u8),
                tick_count: AtomicU64::new(0),
                failure_count: AtomicU64::new(0),
            }),
            running: Mutex::new(None),
        }
    }

    /// Begin background execution
    ///
    /// No-op unless Idle. Must be called inside a tokio runtime.
    pub fn start(&self) {
        let mut running = self.lock_running();
        if running.is_some() || self.state() != SchedulerState::Idle {
            debug!(job = %self.name, state = ?self.state(), "Scheduler already started");
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            self.name.clone(),
            self.config.clone(),
            Arc::clone(&self.action),
            Arc::clone(&self.shared),
            stop_rx,
        ));

        self.shared.set_state(SchedulerState::Running);
        *running = Some(RunningJob { stop_tx, handle });

        info!(
            job = %self.name,
            interval_secs = self.config.interval.as_secs_f64(),
            send_on_start = self.config.send_on_start,
            "Scheduler started"
        );
    }

    /// Signal termination and wait for the loop to exit
    ///
    /// Waits for the in-flight tick up to the grace period, then cancels
    /// it. Safe to call repeatedly and from any task.
    #[instrument(name = "scheduler_stop", skip(self), fields(job = %self.name))]
    pub async fn stop(&self) {
        let job = self.lock_running().take();
        let Some(job) = job else {
            debug!(job = %self.name, "Scheduler not running");
            return;
        };

        self.shared.set_state(SchedulerState::Stopping);
        // Receiver gone means the loop already exited
        let _ = job.stop_tx.send(true);

        let mut handle = job.handle;
        match timeout(self.config.grace_period, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(job = %self.name, error = %e, "Scheduler loop ended abnormally"),
            Err(_) => {
                warn!(
                    job = %self.name,
                    grace_secs = self.config.grace_period.as_secs_f64(),
                    "In-flight tick exceeded grace period, cancelling"
                );
                handle.abort();
                let _ = handle.await;
            }
        }

        self.shared.set_state(SchedulerState::Idle);
        info!(
            job = %self.name,
            ticks = self.tick_count(),
            failures = self.failure_count(),
            "Scheduler stopped"
        );
    }

    /// Current lifecycle state
    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.shared.state.load(Ordering::SeqCst))
    }

    /// Completed ticks (successful or not)
    pub fn tick_count(&self) -> u64 {
        self.shared.tick_count.load(Ordering::Relaxed)
    }

    /// Ticks that returned an error or panicked
    pub fn failure_count(&self) -> u64 {
        self.shared.failure_count.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<RunningJob>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PeriodicScheduler {
    fn drop(&mut self) {
        if let Some(job) = self.lock_running().take() {
            let _ = job.stop_tx.send(true);
            job.handle.abort();
        }
    }
}

/// Aborts the tick task if the loop future is dropped mid-tick
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn run_loop(
    name: String,
    config: SchedulerConfig,
    action: Action,
    shared: Arc<Shared>,
    mut stop_rx: watch::Receiver<bool>,
) {
    debug!(job = %name, "Scheduler loop started");

    // stop() may land before the loop is first polled
    if config.send_on_start && !*stop_rx.borrow() {
        run_tick(&name, &action, &shared).await;
    }

    loop {
        tokio::select! {
            biased;
            // Err means every sender is gone: treat like a stop request
            _ = stop_rx.changed() => break,
            _ = sleep(config.interval) => {}
        }

        if *stop_rx.borrow() {
            break;
        }

        run_tick(&name, &action, &shared).await;
    }

    debug!(job = %name, "Scheduler loop exited");
}

/// Run one tick in its own task so a panic stays inside it
///
/// The action itself is called inside the task too: a closure that panics
/// while building its future counts as a failed tick.
async fn run_tick(name: &str, action: &Action, shared: &Shared) {
    let started = Instant::now();
    let action = Arc::clone(action);
    let task = tokio::spawn(async move { action().await });
    let _guard = AbortOnDrop(task.abort_handle());

    let status = match task.await {
        Ok(Ok(())) => "success",
        Ok(Err(e)) => {
            error!(job = %name, error = %format!("{e:#}"), "Scheduled tick failed");
            "failure"
        }
        Err(e) if e.is_panic() => {
            error!(job = %name, "Scheduled tick panicked");
            "panic"
        }
        Err(_) => "cancelled",
    };

    shared.tick_count.fetch_add(1, Ordering::Relaxed);
    if status == "failure" || status == "panic" {
        shared.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    observability::record_tick(name, status, elapsed_ms);
    debug!(job = %name, status, elapsed_ms, "Tick finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;

    fn counting_action(counter: Arc<AtomicUsize>) -> impl Fn() -> std::future::Ready<anyhow::Result<()>> {
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(()))
        }
    }

    fn every_second() -> SchedulerConfig {
        SchedulerConfig::new(Duration::from_secs(1)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_at_each_interval_not_before() {
        let start = Instant::now();
        let fired = Arc::new(Mutex::new(Vec::new()));
        let fired_clone = Arc::clone(&fired);

        let scheduler = PeriodicScheduler::new("test", every_second(), move || {
            fired_clone.lock().unwrap().push(start.elapsed());
            async { Ok(()) }
        });
        scheduler.start();

        sleep(Duration::from_millis(999)).await;
        assert!(fired.lock().unwrap().is_empty(), "fired before first interval");

        sleep(Duration::from_millis(2_100)).await;
        let fired = fired.lock().unwrap().clone();
        assert_eq!(fired.len(), 3);
        for (i, at) in fired.iter().enumerate() {
            let expected = Duration::from_secs(i as u64 + 1);
            assert!(*at >= expected && *at < expected + Duration::from_millis(50), "tick {i} at {at:?}");
        }

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_mid_wait_prevents_further_ticks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scheduler = PeriodicScheduler::new("test", every_second(), counting_action(Arc::clone(&counter)));
        scheduler.start();
        assert_eq!(scheduler.state(), SchedulerState::Running);

        sleep(Duration::from_millis(1_500)).await;
        scheduler.stop().await;
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_on_start_ticks_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let config = every_second().with_send_on_start(true);
        let scheduler = PeriodicScheduler::new("test", config, counting_action(Arc::clone(&counter)));
        scheduler.start();

        sleep(Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(1)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_ticks_do_not_stop_loop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let scheduler = PeriodicScheduler::new("failing", every_second(), move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            async { Err(anyhow::anyhow!("sink unreachable")) }
        });
        scheduler.start();

        sleep(Duration::from_millis(3_500)).await;
        scheduler.stop().await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.tick_count(), 3);
        assert_eq!(scheduler.failure_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_tick_is_isolated() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let scheduler = PeriodicScheduler::new("panicky", every_second(), move || {
            let n = counter_clone.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    panic!("first tick blows up");
                }
                Ok(())
            }
        });
        scheduler.start();

        sleep(Duration::from_millis(2_500)).await;
        scheduler.stop().await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.failure_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closure_panicking_before_future_is_isolated() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let scheduler = PeriodicScheduler::new("eager_panic", every_second(), move || {
            if calls_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("cannot build first tick");
            }
            std::future::ready(Ok(()))
        });
        scheduler.start();

        sleep(Duration::from_millis(3_500)).await;
        assert_eq!(scheduler.state(), SchedulerState::Running);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.tick_count(), 3);
        assert_eq!(scheduler.failure_count(), 1);

        scheduler.stop().await;
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_poll_skips_start_tick() {
        let counter = Arc::new(AtomicUsize::new(0));
        let config = every_second().with_send_on_start(true);
        let scheduler = PeriodicScheduler::new("early_stop", config, counting_action(Arc::clone(&counter)));

        scheduler.start();
        scheduler.stop().await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.tick_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrunning_tick_delays_next_without_overlap() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let started = Arc::new(AtomicUsize::new(0));

        let (in_flight_c, max_c, started_c) =
            (Arc::clone(&in_flight), Arc::clone(&max_in_flight), Arc::clone(&started));
        let scheduler = PeriodicScheduler::new("slow", every_second(), move || {
            let (in_flight, max_in_flight) = (Arc::clone(&in_flight_c), Arc::clone(&max_c));
            started_c.fetch_add(1, Ordering::SeqCst);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(2_500)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        });
        scheduler.start();

        // ticks start at 1.0s and 4.5s
        sleep(Duration::from_millis(5_000)).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_tick_after_grace_period() {
        let finished = Arc::new(AtomicBool::new(false));
        let finished_clone = Arc::clone(&finished);
        let config = every_second()
            .with_send_on_start(true)
            .with_grace_period(Duration::from_secs(1));

        let scheduler = PeriodicScheduler::new("stuck", config, move || {
            let finished = Arc::clone(&finished_clone);
            async move {
                sleep(Duration::from_secs(60)).await;
                finished.store(true, Ordering::SeqCst);
                Ok(())
            }
        });
        scheduler.start();
        sleep(Duration::from_millis(100)).await;

        let before = Instant::now();
        scheduler.stop().await;
        let waited = before.elapsed();

        assert!(waited >= Duration::from_secs(1) && waited < Duration::from_secs(2));
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        sleep(Duration::from_secs(120)).await;
        assert!(!finished.load(Ordering::SeqCst), "cancelled tick kept running");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_waits_for_in_flight_tick() {
        let finished = Arc::new(AtomicBool::new(false));
        let finished_clone = Arc::clone(&finished);
        let config = every_second().with_grace_period(Duration::from_secs(5));

        let scheduler = PeriodicScheduler::new("graceful", config, move || {
            let finished = Arc::clone(&finished_clone);
            async move {
                sleep(Duration::from_secs(2)).await;
                finished.store(true, Ordering::SeqCst);
                Ok(())
            }
        });
        scheduler.start();

        sleep(Duration::from_millis(1_500)).await;
        scheduler.stop().await;

        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(scheduler.tick_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_stop_are_idempotent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scheduler = PeriodicScheduler::new("test", every_second(), counting_action(Arc::clone(&counter)));

        scheduler.stop().await;
        scheduler.start();
        scheduler.start();

        sleep(Duration::from_millis(1_500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1, "second start spawned another loop");

        scheduler.stop().await;
        scheduler.stop().await;
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_from_another_task_and_restart() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scheduler = Arc::new(PeriodicScheduler::new(
            "shared",
            every_second(),
            counting_action(Arc::clone(&counter)),
        ));
        scheduler.start();
        sleep(Duration::from_millis(1_500)).await;

        let remote = Arc::clone(&scheduler);
        tokio::spawn(async move { remote.stop().await }).await.unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        scheduler.start();
        sleep(Duration::from_millis(1_500)).await;
        scheduler.stop().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
