use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for frame-worker events.
///
/// The worker reports what it did per frame; implementations decide whether
/// and how to surface it.
pub trait ViewfinderLogger: Send {
    /// Called once per processed frame.
    fn frame_processed(&mut self, index: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. faces in this frame).
    fn metric(&mut self, name: &str, value: f64);

    /// Add to a running total (triggers, submissions, dropped frames).
    fn count(&mut self, name: &str, delta: usize);

    fn info(&mut self, message: &str);

    /// Emit the end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used by tests and embedders with their own reporting.
pub struct NullViewfinderLogger;

impl ViewfinderLogger for NullViewfinderLogger {
    fn frame_processed(&mut self, _index: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn count(&mut self, _name: &str, _delta: usize) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI logger: throttled progress lines plus a summary of stage timings,
/// metric averages and totals.
///
/// Progress is logged every `throttle_frames` frames.
pub struct StdoutViewfinderLogger {
    throttle_frames: usize,
    timings: BTreeMap<String, Vec<f64>>,
    metrics: BTreeMap<String, Vec<f64>>,
    counts: BTreeMap<String, usize>,
    start_time: Instant,
    frames: usize,
}

impl StdoutViewfinderLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            counts: BTreeMap::new(),
            start_time: Instant::now(),
            frames: 0,
        }
    }

    /// Returns the formatted summary, or `None` if no frame was processed.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Viewfinder summary ({} frames, {:.1}s):",
            self.frames,
            elapsed_ms / 1000.0
        )];

        for (stage, durations) in &self.timings {
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        for (name, values) in &self.metrics {
            let avg = values.iter().sum::<f64>() / values.len().max(1) as f64;
            lines.push(format!("  {name}: avg {avg:.1}"));
        }

        for (name, total) in &self.counts {
            lines.push(format!("  {name}: {total}"));
        }

        if elapsed_ms > 0.0 {
            let fps = self.frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }

    pub fn count_for(&self, name: &str) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }
}

impl Default for StdoutViewfinderLogger {
    fn default() -> Self {
        Self::new(30)
    }
}

impl ViewfinderLogger for StdoutViewfinderLogger {
    fn frame_processed(&mut self, index: usize) {
        self.frames += 1;
        if self.frames % self.throttle_frames == 0 {
            log::info!("Processed {} frames (last #{index})", self.frames);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn count(&mut self, name: &str, delta: usize) {
        *self.counts.entry(name.to_string()).or_default() += delta;
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_accepts_everything() {
        let mut logger = NullViewfinderLogger;
        logger.frame_processed(0);
        logger.timing("inference", 5.0);
        logger.metric("faces", 1.0);
        logger.count("triggers", 1);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_and_metric_record_values() {
        let mut logger = StdoutViewfinderLogger::new(10);
        logger.timing("inference", 20.0);
        logger.timing("inference", 30.0);
        logger.metric("faces", 1.0);
        logger.metric("faces", 2.0);

        assert_eq!(logger.timings_for("inference").unwrap(), &[20.0, 30.0]);
        let faces = logger.metrics_for("faces").unwrap();
        assert_relative_eq!(faces.iter().sum::<f64>() / faces.len() as f64, 1.5);
    }

    #[test]
    fn test_counts_accumulate() {
        let mut logger = StdoutViewfinderLogger::new(10);
        logger.count("submissions", 1);
        logger.count("submissions", 2);
        assert_eq!(logger.count_for("submissions"), 3);
        assert_eq!(logger.count_for("dropped"), 0);
    }

    #[test]
    fn test_summary_lists_stages_metrics_and_totals() {
        let mut logger = StdoutViewfinderLogger::new(10);
        for i in 0..4 {
            logger.frame_processed(i);
        }
        logger.timing("inference", 12.0);
        logger.timing("sampling", 1.0);
        logger.metric("faces", 2.0);
        logger.count("dropped", 7);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Viewfinder summary (4 frames"));
        assert!(summary.contains("inference"));
        assert!(summary.contains("sampling"));
        assert!(summary.contains("faces: avg 2.0"));
        assert!(summary.contains("dropped: 7"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(StdoutViewfinderLogger::default().summary_string().is_none());
    }
}
