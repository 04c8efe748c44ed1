use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use super::domain::frame_source::{FrameSource, SourceError};
use super::monitor_session::{FrameReport, MonitorSession};
use super::pipeline_logger::PipelineLogger;

/// Totals for one processed stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub frames: usize,
    pub alerts_fired: usize,
    pub captures: usize,
    pub failed_notifications: usize,
}

type ReportCallback = Box<dyn FnMut(usize, &FrameReport) + Send>;

/// Drives one stream through a monitor session until the source ends.
///
/// Single-use: `execute` consumes the source. A source error is fatal for
/// the stream and is returned after in-flight notifications settle.
pub struct MonitorStreamUseCase {
    source: Option<Box<dyn FrameSource>>,
    on_report: Option<ReportCallback>,
    cancelled: Arc<AtomicBool>,
}

impl MonitorStreamUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        on_report: Option<ReportCallback>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            source: Some(source),
            on_report,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn execute(
        &mut self,
        input: &Path,
        session: &mut MonitorSession,
        logger: &mut dyn PipelineLogger,
    ) -> Result<StreamStats, Box<dyn std::error::Error>> {
        let mut source = self.source.take().ok_or("Stream already executed")?;
        source.open(input)?;
        logger.info(&format!("Monitoring {}", input.display()));

        let mut stats = StreamStats::default();
        let result = self.run(&mut *source, session, logger, &mut stats);
        source.close();

        session.finish();
        collect_outcomes(session, &mut stats);
        logger.summary();

        match result {
            Ok(()) => Ok(stats),
            Err(e) => {
                log::error!("Stream {} stopped after {} frames", input.display(), stats.frames);
                Err(e.into())
            }
        }
    }

    fn run(
        &mut self,
        source: &mut dyn FrameSource,
        session: &mut MonitorSession,
        logger: &mut dyn PipelineLogger,
        stats: &mut StreamStats,
    ) -> Result<(), SourceError> {
        for record in source.frames() {
            if self.cancelled.load(Ordering::Relaxed) {
                logger.info("Monitoring cancelled");
                break;
            }
            let record = record?;

            let start = Instant::now();
            let report = session.process_frame(record.input);
            logger.timing("frame", start.elapsed().as_secs_f64() * 1000.0);
            logger.metric("people", report.summary.count as f64);
            for alert in &report.fired {
                logger.alert(alert.kind);
            }

            stats.frames += 1;
            stats.alerts_fired += report.fired.len();
            stats.captures += report.captures.len();
            collect_outcomes(session, stats);
            logger.progress(stats.frames);

            if let Some(cb) = self.on_report.as_mut() {
                cb(record.index, &report);
            }
        }
        Ok(())
    }
}

/// Counts notification results that have arrived since the last call.
fn collect_outcomes(session: &MonitorSession, stats: &mut StreamStats) {
    for outcome in session.drain_outcomes() {
        if let Some(error) = &outcome.error {
            log::warn!("{} notification was not delivered: {error}", outcome.kind);
            stats.failed_notifications += 1;
        }
    }
}
