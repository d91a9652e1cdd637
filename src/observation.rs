//! The per-packet input contract from the dissection layer.

use crate::flow::FlowKey;
use std::net::SocketAddr;

/// Everything the engine needs to know about one observed segment.
///
/// All numeric fields are optional because a dissector may not be able
/// to produce them for every packet; a missing field narrows the
/// calculation rather than failing it. `scale_hint` only carries
/// meaning on SYN-flagged segments, where the window scale option is
/// negotiated.
#[derive(Debug, Clone)]
pub struct PacketObservation {
    pub stream_id: Option<u64>,
    pub src: SocketAddr,
    pub dst: SocketAddr,
    /// Raw (unscaled) window size from the TCP header.
    pub raw_window: Option<u32>,
    /// Window scale option value, if present on this segment.
    pub scale_hint: Option<u32>,
    /// Dissector's estimate of unacknowledged data on the wire.
    pub bytes_in_flight: Option<u32>,
    pub is_syn: bool,
    /// Capture-relative timestamp in seconds.
    pub timestamp: f64,
}

impl PacketObservation {
    /// Derives the directional key that scopes all per-flow state for
    /// this segment.
    pub fn flow_key(&self) -> FlowKey {
        FlowKey::new(self.stream_id, self.src, self.dst)
    }
}

/// Whether a packet is being seen for the first time in this session.
///
/// State mutation and one-shot side effects happen on the primary pass
/// only. A replay pass (a consumer re-walking already processed
/// packets, e.g. an export sink engaged late) recomputes results from
/// read-only lookups and must leave per-flow state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Primary,
    Replay,
}
