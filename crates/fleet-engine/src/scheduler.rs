//! Periodic evaluation scheduler

use crate::engine::FleetEngine;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Runs a fleet-wide evaluation cycle on a fixed interval
pub struct EvaluationScheduler {
    engine: Arc<FleetEngine>,
    interval: Duration,
}

impl EvaluationScheduler {
    /// Create a scheduler using the engine's configured interval
    pub fn new(engine: Arc<FleetEngine>) -> Self {
        let interval = Duration::from_millis(engine.config().scheduler.evaluation_interval_ms);
        Self { engine, interval }
    }

    /// Override the cycle interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until `shutdown` turns true or its sender is dropped
    ///
    /// A cycle already in progress finishes before the loop exits.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "Starting evaluation scheduler");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.engine.evaluate_all().await;
                    counter!("fleet_evaluation_cycles_total").increment(1);
                    if report.timed_out > 0 || report.failed > 0 {
                        warn!(
                            timed_out = report.timed_out,
                            failed = report.failed,
                            "Evaluation cycle incomplete"
                        );
                    }
                    debug!(
                        evaluated = report.evaluated,
                        unchanged = report.unchanged,
                        "Evaluation cycle finished"
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Evaluation scheduler stopped");
    }
}
