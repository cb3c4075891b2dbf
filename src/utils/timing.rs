use std::time::{Duration, Instant};
use log::debug;

/// Wall-clock time spent in each pipeline stage, in the order stages ran.
#[derive(Debug, Default)]
pub struct StageTimings {
    stages: Vec<(&'static str, Duration)>,
}

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_measurement(&mut self, stage: &'static str, duration: Duration) {
        debug!("{} took {:.2}ms", stage, duration.as_secs_f64() * 1000.0);
        self.stages.push((stage, duration));
    }

    #[allow(dead_code)]
    pub fn get(&self, stage: &str) -> Option<Duration> {
        self.stages.iter().find(|(name, _)| *name == stage).map(|(_, d)| *d)
    }

    pub fn total(&self) -> Duration {
        self.stages.iter().map(|(_, d)| *d).sum()
    }

    pub fn summary(&self) -> String {
        self.stages
            .iter()
            .map(|(name, d)| format!("{}={:.1}ms", name, d.as_secs_f64() * 1000.0))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Records the elapsed time of a stage into [`StageTimings`] when dropped.
pub struct ScopedTimer<'a> {
    start: Instant,
    stage: &'static str,
    timings: &'a mut StageTimings,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(timings: &'a mut StageTimings, stage: &'static str) -> Self {
        Self {
            start: Instant::now(),
            stage,
            timings,
        }
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.timings.add_measurement(self.stage, duration);
    }
}
