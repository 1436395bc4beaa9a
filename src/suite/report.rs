/// Check outcomes and the run summary
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use super::Marker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(String),
    Skipped(String),
}

#[derive(Debug, Clone)]
pub struct CheckReport {
    pub name: &'static str,
    pub marker: Marker,
    pub outcome: Outcome,
    pub duration: Duration,
}

/// Results of one suite run
#[derive(Debug)]
pub struct SuiteReport {
    started_at: DateTime<Utc>,
    clock: Instant,
    results: Vec<CheckReport>,
    deselected: usize,
}

impl SuiteReport {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            clock: Instant::now(),
            results: Vec::new(),
            deselected: 0,
        }
    }

    pub fn record(&mut self, result: CheckReport) {
        self.results.push(result);
    }

    pub fn deselect(&mut self) {
        self.deselected += 1;
    }

    pub fn results(&self) -> &[CheckReport] {
        &self.results
    }

    fn count(&self, pick: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| pick(&r.outcome)).count()
    }

    pub fn passed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    pub fn deselected(&self) -> usize {
        self.deselected
    }

    /// Process exit status: non-zero when any selected check failed
    pub fn exit_code(&self) -> i32 {
        if self.failed() == 0 {
            0
        } else {
            1
        }
    }

    /// One-line tally, e.g. `5 passed, 1 failed, 2 skipped in 3.20s`
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} passed", self.passed())];
        if self.failed() > 0 {
            parts.push(format!("{} failed", self.failed()));
        }
        if self.skipped() > 0 {
            parts.push(format!("{} skipped", self.skipped()));
        }
        if self.deselected() > 0 {
            parts.push(format!("{} deselected", self.deselected()));
        }
        format!(
            "{} in {:.2}s",
            parts.join(", "),
            self.clock.elapsed().as_secs_f64()
        )
    }

    /// Log failures, skips and the tally
    pub fn log_summary(&self) {
        info!("");
        info!(
            "Run started {}",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        for result in self.results() {
            match &result.outcome {
                Outcome::Passed => debug!(
                    "  PASSED [{}] {} ({:.2}s)",
                    result.marker,
                    result.name,
                    result.duration.as_secs_f64()
                ),
                Outcome::Skipped(reason) => {
                    info!("  SKIPPED [{}] {}: {}", result.marker, result.name, reason)
                }
                Outcome::Failed(reason) => {
                    error!("  FAILED [{}] {}: {}", result.marker, result.name, reason)
                }
            }
        }

        if self.failed() == 0 {
            info!("✓ {}", self.summary());
        } else {
            error!("✗ {}", self.summary());
        }
    }
}
