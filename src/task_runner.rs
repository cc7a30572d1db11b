/// Cycle scheduler
///
/// Runs the trading cycle forever. After a successful cycle it sleeps the
/// normal interval; after a failed one it logs the error and sleeps the
/// (shorter) backoff interval before trying again. There is no terminal
/// state: failures never stop the loop.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Delay after a successful cycle
    pub interval: Duration,
    /// Delay after a failed cycle
    pub backoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            backoff: Duration::from_secs(300),
        }
    }
}

/// What the scheduler is doing between cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    RunningCycle,
    BackingOff,
}

#[derive(Debug)]
struct SchedulerTracker {
    state: SchedulerState,
    consecutive_failures: u32,
}

impl SchedulerTracker {
    fn new() -> Self {
        Self {
            state: SchedulerState::RunningCycle,
            consecutive_failures: 0,
        }
    }

    /// Record a cycle result and return the delay before the next cycle
    fn record(&mut self, succeeded: bool, config: &SchedulerConfig) -> Duration {
        if succeeded {
            self.consecutive_failures = 0;
            self.state = SchedulerState::RunningCycle;
            config.interval
        } else {
            self.consecutive_failures += 1;
            self.state = SchedulerState::BackingOff;
            config.backoff
        }
    }
}

/// Run `cycle_fn` forever with interval/backoff sleeps
///
/// # Arguments
/// * `task_name` - Name used in log lines
/// * `config` - Interval and backoff durations
/// * `cycle_fn` - Async function that runs one cycle
pub async fn run_scheduler<F, Fut, E>(task_name: &str, config: SchedulerConfig, mut cycle_fn: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let mut tracker = SchedulerTracker::new();

    loop {
        let result = cycle_fn().await;
        let failures_before = tracker.consecutive_failures;
        let delay = tracker.record(result.is_ok(), &config);

        match result {
            Ok(()) => {
                if failures_before > 0 {
                    warn!(
                        "Task '{}' recovered after {} failures",
                        task_name, failures_before
                    );
                }
                info!("Task '{}' complete, next run in {:?}", task_name, delay);
            }
            Err(e) => {
                error!(
                    "Task '{}' failed ({} in a row): {}",
                    task_name, tracker.consecutive_failures, e
                );
                warn!("Task '{}' backing off for {:?}", task_name, delay);
            }
        }

        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn config(interval_ms: u64, backoff_ms: u64) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_millis(interval_ms),
            backoff: Duration::from_millis(backoff_ms),
        }
    }

    #[test]
    fn test_tracker_transitions() {
        let config = config(1000, 10);
        let mut tracker = SchedulerTracker::new();
        assert_eq!(tracker.state, SchedulerState::RunningCycle);

        assert_eq!(tracker.record(false, &config), Duration::from_millis(10));
        assert_eq!(tracker.state, SchedulerState::BackingOff);
        assert_eq!(tracker.record(false, &config), Duration::from_millis(10));
        assert_eq!(tracker.consecutive_failures, 2);

        assert_eq!(tracker.record(true, &config), Duration::from_millis(1000));
        assert_eq!(tracker.state, SchedulerState::RunningCycle);
        assert_eq!(tracker.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_failures_retry_after_backoff_and_never_stop() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let handle = tokio::spawn(async move {
            run_scheduler("failing_cycle", config(10_000, 5), || {
                attempts_clone.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("exchange unreachable".to_string()) }
            })
            .await;
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!handle.is_finished());
        handle.abort();

        assert!(attempts.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_success_waits_full_interval() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let handle = tokio::spawn(async move {
            run_scheduler("healthy_cycle", config(10_000, 5), || {
                attempts_clone.fetch_add(1, Ordering::SeqCst);
                async { Ok::<(), String>(()) }
            })
            .await;
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let handle = tokio::spawn(async move {
            run_scheduler("flaky_cycle", config(10_000, 5), || {
                let count = attempts_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count < 2 {
                        Err("Simulated failure".to_string())
                    } else {
                        Ok(())
                    }
                }
            })
            .await;
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        // Two failures, one success, then a long interval
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
