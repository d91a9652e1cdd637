//! Per-flow effective-window inference for captured TCP traffic.
//!
//! For each observed segment, the engine estimates how much additional
//! data the sender could still transmit:
//!
//! ```text
//! EffectiveWindow = max(0, min(ScaledRwnd, EstimatedCwnd) - BytesInFlight)
//! ```
//!
//! That takes learning each flow's window-scale factor from its
//! handshake segments, carrying a heuristic congestion-window estimate
//! across the packet sequence, overflow-safe scaled-window arithmetic,
//! and a throttled CSV export of the computed values. The congestion
//! estimate is a responsiveness heuristic, not a congestion-control
//! implementation; see [`cwnd`].
//!
//! # Uses
//!
//! - A capture dissector feeds [`PacketObservation`]s to an [`Engine`]
//!   in capture order and attaches the returned [`Annotation`] fields
//!   to each packet record.
//! - A consumer that attaches after packets were already processed
//!   replays them with [`Pass::Replay`], which recomputes results
//!   without touching per-flow state.
//!
//! # Organization
//!
//! - [`FlowKey`](flow::FlowKey) identifies one direction of a
//!   connection and keys all per-flow state
//! - [`scale`] learns and applies window-scale factors
//! - [`cwnd`] estimates the congestion window
//! - [`effective`] combines the pieces into the final value
//! - [`export`] records values to a CSV destination
//! - [`Engine`](engine::Engine) ties the pipeline together and owns
//!   the session lifecycle

use std::hash::BuildHasherDefault;

pub mod flow;
pub use flow::FlowKey;

pub mod observation;
pub use observation::{PacketObservation, Pass};

pub mod scale;
pub use scale::{scale_window, ScaleTable, MAX_WINDOW_SCALE};

pub mod cwnd;
pub use cwnd::CwndEstimator;

pub mod effective;
pub use effective::{effective_window, CalcKind, EffectiveWindow};

pub mod export;
pub use export::{ExportConfig, ExportError, ExportSink};

pub mod engine;
pub use engine::{Annotation, Engine, EngineConfig};

pub(crate) type FxDashMap<K, V> = dashmap::DashMap<K, V, BuildHasherDefault<rustc_hash::FxHasher>>;
