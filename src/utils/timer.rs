//! Stage timing for pipeline runs

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Timer for measuring pipeline stages
#[derive(Debug)]
pub struct Timer {
    name: String,
    start: Instant,
    last: Duration,
    stages: Vec<StageTiming>,
}

/// Duration of one completed stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub secs: f64,
}

impl Timer {
    /// Create and start a new timer
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
            last: Duration::ZERO,
            stages: Vec::new(),
        }
    }

    /// Close the current stage; returns its duration in seconds
    pub fn checkpoint(&mut self, stage: impl Into<String>) -> f64 {
        let now = self.start.elapsed();
        let secs = (now - self.last).as_secs_f64();
        self.last = now;

        let stage = stage.into();
        debug!(timer = %self.name, stage = %stage, secs, "Stage finished");
        self.stages.push(StageTiming { stage, secs });
        secs
    }

    /// Stop and log every stage
    pub fn stop_with_report(self) -> Vec<StageTiming> {
        let total = self.start.elapsed().as_secs_f64();
        for s in &self.stages {
            info!(timer = %self.name, stage = %s.stage, secs = s.secs, "Stage timing");
        }
        info!(timer = %self.name, total_secs = total, "{} completed in {:.3}s", self.name, total);
        self.stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_timer_checkpoints() {
        let mut timer = Timer::start("test");

        sleep(Duration::from_millis(5));
        let first = timer.checkpoint("step1");

        sleep(Duration::from_millis(5));
        timer.checkpoint("step2");

        assert!(first >= 0.005);

        let stages = timer.stop_with_report();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0], StageTiming { stage: "step1".into(), secs: first });
        assert_eq!(stages[1].stage, "step2");
    }
}
