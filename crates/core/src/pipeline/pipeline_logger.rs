use std::collections::HashMap;
use std::time::Instant;

use crate::events::domain::frame_alerts::AlertKind;

/// Cross-cutting logger for monitoring-loop events.
///
/// Decouples the stream use case from specific output mechanisms so each
/// caller can observe the loop without changing the orchestration code.
pub trait PipelineLogger: Send {
    /// Report how many frames have been processed so far.
    fn progress(&mut self, frames: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. people count).
    fn metric(&mut self, name: &str, value: f64);

    /// Record that a notification was sent for `kind`.
    fn alert(&mut self, kind: AlertKind);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-stream summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _frames: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn alert(&mut self, _kind: AlertKind) {}
    fn info(&mut self, _message: &str) {}
}

/// Running totals for one stage or metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunningStat {
    pub count: usize,
    pub sum: f64,
    pub max: f64,
}

impl Default for RunningStat {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            max: f64::NEG_INFINITY,
        }
    }
}

impl RunningStat {
    pub fn record(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.max = self.max.max(value);
    }

    pub fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// CLI-oriented logger that tracks per-stage timing, metrics and sent
/// alerts, and logs a summary at the end of a stream.
///
/// Progress output is throttled to every `throttle_frames` frames.
pub struct LogPipelineLogger {
    throttle_frames: usize,
    timings: HashMap<String, RunningStat>,
    metrics: HashMap<String, RunningStat>,
    alerts: HashMap<AlertKind, usize>,
    start_time: Instant,
    total_frames: usize,
}

impl LogPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            alerts: HashMap::new(),
            start_time: Instant::now(),
            total_frames: 0,
        }
    }

    /// Returns the formatted summary string, or `None` if no frame was seen.
    pub fn summary_string(&self) -> Option<String> {
        if self.total_frames == 0 && self.timings.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.total_frames;
        let mut lines = vec![format!(
            "Monitor summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let stat = &self.timings[stage];
            let total_ms = stat.sum;
            let avg_ms = stat.average();
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.2}ms  total {total_ms:7.0}ms"
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let stat = &self.metrics[name];
            lines.push(format!(
                "  {name}: avg {:.1}  max {:.0}",
                stat.average(),
                stat.max
            ));
        }

        for kind in AlertKind::ALL {
            if let Some(n) = self.alerts.get(&kind) {
                lines.push(format!("  {kind} alerts sent: {n}"));
            }
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<RunningStat> {
        self.timings.get(stage).copied()
    }

    pub fn metrics_for(&self, name: &str) -> Option<RunningStat> {
        self.metrics.get(name).copied()
    }

    pub fn alerts_sent(&self, kind: AlertKind) -> usize {
        self.alerts.get(&kind).copied().unwrap_or(0)
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn progress(&mut self, frames: usize) {
        self.total_frames = frames;
        if frames % self.throttle_frames == 0 {
            log::info!("Processed {frames} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .record(value);
    }

    fn alert(&mut self, kind: AlertKind) {
        *self.alerts.entry(kind).or_default() += 1;
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
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1);
        logger.timing("evaluate", 5.0);
        logger.metric("people", 3.0);
        logger.alert(AlertKind::Crowd);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = LogPipelineLogger::new(10);
        logger.timing("evaluate", 2.0);
        logger.timing("evaluate", 4.0);
        logger.timing("track", 1.0);

        let evaluate = logger.timings_for("evaluate").unwrap();
        assert_eq!(evaluate.count, 2);
        assert_relative_eq!(evaluate.average(), 3.0);
        assert_relative_eq!(evaluate.sum, 6.0);
        assert_eq!(logger.timings_for("track").unwrap().count, 1);
        assert!(logger.timings_for("missing").is_none());
    }

    #[test]
    fn test_metric_records_values() {
        let mut logger = LogPipelineLogger::new(10);
        logger.metric("people", 3.0);
        logger.metric("people", 4.0);
        let people = logger.metrics_for("people").unwrap();
        assert_relative_eq!(people.average(), 3.5);
        assert_relative_eq!(people.max, 4.0);
    }

    #[test]
    fn test_long_stream_keeps_constant_state() {
        let mut logger = LogPipelineLogger::new(1000);
        for frame in 0..10_000 {
            logger.timing("frame", 1.0);
            logger.metric("people", (frame % 5) as f64);
        }
        let people = logger.metrics_for("people").unwrap();
        assert_eq!(people.count, 10_000);
        assert_relative_eq!(people.average(), 2.0);
        assert_relative_eq!(people.max, 4.0);
        assert_eq!(logger.timings_for("frame").unwrap().count, 10_000);
    }

    #[test]
    fn test_empty_stat_average_is_zero() {
        assert_relative_eq!(RunningStat::default().average(), 0.0);
    }

    #[test]
    fn test_alert_counts() {
        let mut logger = LogPipelineLogger::new(10);
        logger.alert(AlertKind::Crowd);
        logger.alert(AlertKind::Crowd);
        logger.alert(AlertKind::Trespassing);
        assert_eq!(logger.alerts_sent(AlertKind::Crowd), 2);
        assert_eq!(logger.alerts_sent(AlertKind::Trespassing), 1);
        assert_eq!(logger.alerts_sent(AlertKind::Loitering), 0);
    }

    #[test]
    fn test_summary_contents() {
        let mut logger = LogPipelineLogger::new(10);
        logger.progress(20);
        logger.timing("evaluate", 1.0);
        logger.metric("people", 7.0);
        logger.alert(AlertKind::Loitering);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Monitor summary (20 frames"));
        assert!(summary.contains("evaluate"));
        assert!(summary.contains("people: avg 7.0  max 7"));
        assert!(summary.contains("loitering alerts sent: 1"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        let logger = LogPipelineLogger::new(10);
        assert!(logger.summary_string().is_none());
    }

    #[test]
    fn test_throttle_is_at_least_one() {
        let mut logger = LogPipelineLogger::new(0);
        assert_eq!(logger.throttle_frames, 1);
        logger.progress(3);
        assert_eq!(logger.total_frames, 3);
    }
}
