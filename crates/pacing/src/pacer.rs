//! Fixed-rate loop driver.

use std::time::Duration;

use contracts::RelayError;
use observability::RunningStats;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::ticker::Ticker;
use crate::TickAction;

/// Outcome summary of a finished pacing loop
#[derive(Debug, Default, Clone)]
pub struct PacingReport {
    /// Tick iterations attempted
    pub ticks: u64,
    /// Transient failures swallowed
    pub transient_failures: u64,
    /// Wake lag behind each deadline, in milliseconds
    pub lag_ms: RunningStats,
}

/// Fatal loop termination, keeping the progress made before it
///
/// A loop that dies after hours of healthy ticking still hands its counts
/// to the end-of-run summary.
#[derive(Debug)]
pub struct PacingAbort {
    /// The error that terminated the loop
    pub error: RelayError,
    /// Counts accumulated up to the failing tick
    pub report: PacingReport,
}

impl From<PacingAbort> for RelayError {
    fn from(abort: PacingAbort) -> Self {
        abort.error
    }
}

impl std::fmt::Display for PacingAbort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for PacingAbort {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Fixed-rate absolute-deadline loop
///
/// Each iteration waits for the next deadline of an arithmetic sequence,
/// then runs the action once. An overrunning tick is followed by a zero
/// wait, never by a shifted schedule. Transient action errors are logged
/// and swallowed until `failure_threshold` of them occur back to back,
/// which escalates to a fatal `RepeatedFailure`.
#[derive(Debug, Clone)]
pub struct PacingLoop {
    role: String,
    interval: Duration,
    failure_threshold: u32,
    max_ticks: Option<u64>,
}

impl PacingLoop {
    /// Create a loop driver
    ///
    /// # Arguments
    /// * `role` - Label for logs and metrics ("sender" / "receiver")
    /// * `interval` - Tick period
    /// * `failure_threshold` - Consecutive transient failures before escalation
    pub fn new(role: impl Into<String>, interval: Duration, failure_threshold: u32) -> Self {
        Self {
            role: role.into(),
            interval,
            failure_threshold: failure_threshold.max(1),
            max_ticks: None,
        }
    }

    /// Stop after at most `max_ticks` iterations
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Tick interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Drive `action` until stop, tick budget exhaustion, or a fatal error
    ///
    /// The stop flag is checked at the top of every iteration and also
    /// interrupts the deadline wait, so shutdown latency is bounded by one
    /// tick of work, not one interval.
    #[instrument(name = "pacing_run", skip(self, action, stop), fields(role = %self.role, stream = %action.stream()))]
    pub async fn run<A: TickAction>(
        &self,
        action: &mut A,
        mut stop: watch::Receiver<bool>,
    ) -> Result<PacingReport, PacingAbort> {
        let mut ticker = Ticker::new(self.interval);
        let mut report = PacingReport::default();
        let mut consecutive_failures = 0u32;

        info!(
            interval_ms = self.interval.as_millis() as u64,
            failure_threshold = self.failure_threshold,
            "pacing loop started"
        );

        loop {
            if *stop.borrow() {
                info!(ticks = report.ticks, "pacing loop stopped");
                return Ok(report);
            }
            if self.max_ticks.is_some_and(|max| report.ticks >= max) {
                debug!(ticks = report.ticks, "tick budget exhausted");
                return Ok(report);
            }

            let deadline = ticker.advance();
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {}
                stopped = wait_for_stop(&mut stop) => {
                    if stopped {
                        info!(ticks = report.ticks, "pacing loop stopped");
                        return Ok(report);
                    }
                }
            }

            let lag = Ticker::lag(deadline);
            report.lag_ms.push(lag.as_secs_f64() * 1000.0);
            metrics::histogram!("stream_relay_tick_lag_ms", "role" => self.role.clone())
                .record(lag.as_secs_f64() * 1000.0);
            if lag > self.interval {
                warn!(lag_ms = lag.as_millis() as u64, tick = ticker.tick(), "tick overran its interval");
            }

            report.ticks += 1;
            match action.tick(ticker.tick()).await {
                Ok(()) => {
                    consecutive_failures = 0;
                    metrics::counter!("stream_relay_ticks_total", "role" => self.role.clone())
                        .increment(1);
                }
                Err(err) if err.is_transient() => {
                    consecutive_failures += 1;
                    report.transient_failures += 1;
                    metrics::counter!(
                        "stream_relay_transient_failures_total",
                        "role" => self.role.clone()
                    )
                    .increment(1);
                    warn!(
                        error = %err,
                        consecutive = consecutive_failures,
                        threshold = self.failure_threshold,
                        "transient tick failure"
                    );

                    if consecutive_failures >= self.failure_threshold {
                        let escalated = RelayError::RepeatedFailure {
                            stream: action.stream().to_string(),
                            count: consecutive_failures,
                        };
                        error!(error = %escalated, "escalating repeated transient failures");
                        return Err(PacingAbort {
                            error: escalated,
                            report,
                        });
                    }
                }
                Err(err) => {
                    error!(error = %err, tick = ticker.tick(), "fatal tick failure");
                    return Err(PacingAbort { error: err, report });
                }
            }
        }
    }
}

/// Wait until the stop flag becomes true; a dropped sender counts as stop
async fn wait_for_stop(stop: &mut watch::Receiver<bool>) -> bool {
    loop {
        if stop.changed().await.is_err() {
            return true;
        }
        if *stop.borrow_and_update() {
            return true;
        }
    }
}
