//! The per-packet inference pipeline and its session lifecycle.

use crate::{
    cwnd::CwndEstimator,
    effective::{effective_window, EffectiveWindow},
    export::{ExportConfig, ExportSink},
    flow::FlowKey,
    observation::{PacketObservation, Pass},
    scale::{scale_window, ScaleTable},
};
use std::{io::Write, sync::Mutex};

/// The sink form the engine stores: any writable destination behind
/// one type, so sessions over files and tests over in-memory writers
/// share the same slot.
type BoxedSink = ExportSink<Box<dyn Write + Send>>;

/// Resolved settings the engine reads. Loading and validating
/// preferences is the host application's job.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Append `" [EffWin:<value>]"` to the packet's summary field on
    /// the primary pass.
    pub append_info: bool,
    /// Maintain the per-flow congestion estimate. When off, the scaled
    /// receiver window stands in for the estimate and is the only
    /// limit applied.
    pub estimate_cwnd: bool,
    /// Export destination and throttle; `None` disables export.
    pub export: Option<ExportConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            append_info: true,
            estimate_cwnd: true,
            export: None,
        }
    }
}

/// The fields attached to one packet record.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub window: EffectiveWindow,
    /// The congestion estimate as displayed: rounded to an integer.
    pub cwnd_rounded: u64,
    /// Suffix for the packet's user-visible summary field. Present
    /// only on a primary pass with annotation enabled; appending it is
    /// the host's job and may fail silently there.
    pub info_suffix: Option<String>,
}

/// The export destination and its open handle, guarded together so the
/// sink can be engaged, disabled, or restarted mid-session.
struct ExportSlot {
    config: Option<ExportConfig>,
    sink: Option<BoxedSink>,
}

impl ExportSlot {
    fn open(config: Option<ExportConfig>) -> Self {
        let sink = config.as_ref().and_then(open_sink);
        Self { config, sink }
    }
}

/// The per-flow inference engine for one capture session.
///
/// Owns every piece of per-flow state: the window-scale table, the
/// congestion estimates, and the export sink. All of it is scoped to
/// one session; [`Engine::reset`] clears it atomically so nothing
/// leaks into the next capture.
pub struct Engine {
    config: EngineConfig,
    scales: ScaleTable,
    cwnd: CwndEstimator,
    export: Mutex<ExportSlot>,
}

impl Engine {
    /// Creates the engine and opens the export session if one is
    /// configured. An export destination that cannot be opened
    /// disables export for the session; it never fails construction.
    pub fn new(config: EngineConfig) -> Self {
        let export = Mutex::new(ExportSlot::open(config.export.clone()));
        Self {
            config,
            scales: ScaleTable::new(),
            cwnd: CwndEstimator::new(),
            export,
        }
    }

    /// Runs the pipeline for one observed segment.
    ///
    /// A [`Pass::Primary`] observation may learn the flow's window
    /// scale and advance its congestion estimate. A [`Pass::Replay`]
    /// observation recomputes the result from read-only lookups so a
    /// consumer that attached late (the export sink in particular)
    /// still sees it, without re-mutating any state.
    ///
    /// Returns `None` when neither a window nor bytes-in-flight was
    /// available; such packets are skipped for annotation and export.
    pub fn process(&self, observation: &PacketObservation, pass: Pass) -> Option<Annotation> {
        let key = observation.flow_key();

        let scale = match pass {
            Pass::Primary => {
                self.scales
                    .learn_or_get(&key, observation.is_syn, observation.scale_hint)
            }
            Pass::Replay => self.scales.get(&key),
        };
        let scaled_rwnd = observation.raw_window.map(|window| scale_window(window, scale));

        let cwnd_estimate = if self.config.estimate_cwnd {
            match pass {
                Pass::Primary => self.cwnd.update(&key, observation.bytes_in_flight),
                Pass::Replay => self.cwnd.peek(&key, observation.bytes_in_flight),
            }
        } else {
            // Estimation off: the receiver window is the only limit.
            scaled_rwnd.map_or(0.0, f64::from)
        };

        let window = effective_window(scaled_rwnd, cwnd_estimate, observation.bytes_in_flight)?;
        self.export_result(observation.timestamp, &key, &window);

        let info_suffix = (pass == Pass::Primary && self.config.append_info)
            .then(|| format!(" [EffWin:{}]", window.value));
        Some(Annotation {
            cwnd_rounded: window.cwnd_estimate.round() as u64,
            info_suffix,
            window,
        })
    }

    /// Clears all per-flow state and restarts the export session.
    /// Effective immediately; a new capture starts from first-
    /// observation defaults for every flow.
    pub fn reset(&self) {
        self.scales.clear();
        self.cwnd.clear();
        let mut slot = self.export.lock().unwrap();
        if let Some(sink) = slot.sink.take() {
            sink.close();
        }
        slot.sink = slot.config.as_ref().and_then(open_sink);
        tracing::debug!("Engine state reset");
    }

    /// Opens (or replaces) the export session without touching
    /// per-flow state. This is how exporting gets engaged after
    /// packets were already processed; the host follows up by
    /// replaying the capture with [`Pass::Replay`].
    pub fn engage_export(&self, config: ExportConfig) {
        let mut slot = self.export.lock().unwrap();
        if let Some(sink) = slot.sink.take() {
            sink.close();
        }
        slot.sink = open_sink(&config);
        slot.config = Some(config);
    }

    /// Closes the export session without reopening it. Per-flow state
    /// is left alone; the next [`Engine::reset`] clears it.
    pub fn end_session(&self) {
        if let Some(sink) = self.export.lock().unwrap().sink.take() {
            sink.close();
        }
    }

    /// Whether the export sink is currently open and healthy.
    pub fn export_active(&self) -> bool {
        self.export.lock().unwrap().sink.is_some()
    }

    #[cfg(test)]
    fn set_sink(&self, sink: BoxedSink) {
        self.export.lock().unwrap().sink = Some(sink);
    }

    fn export_result(&self, timestamp: f64, key: &FlowKey, window: &EffectiveWindow) {
        let mut slot = self.export.lock().unwrap();
        if let Some(sink) = slot.sink.as_mut() {
            if let Err(error) = sink.record(timestamp, key, window) {
                tracing::error!("Disabling export after write failure: {error}");
                slot.sink = None;
            }
        }
    }
}

fn open_sink(config: &ExportConfig) -> Option<BoxedSink> {
    match ExportSink::open(config) {
        Ok(sink) => Some(sink),
        Err(error) => {
            tracing::error!(
                "Could not open export destination {}: {error}",
                config.path.display()
            );
            None
        }
    }
}
