//! Window-scale learning and saturating scaled-window arithmetic.
//!
//! Window scaling is negotiated exactly once, during the handshake
//! (RFC 7323), and applies uniformly to every later segment of that
//! direction. The table below mirrors that rule: an entry is created
//! by the first SYN-flagged segment for a flow and never overwritten,
//! not even by a later SYN presenting a different option value.

use crate::{flow::FlowKey, FxDashMap};
use dashmap::mapref::entry::Entry;

/// Largest shift the window scale option permits (RFC 7323 2.3).
pub const MAX_WINDOW_SCALE: u8 = 14;

/// Per-flow cache of negotiated window-scale factors.
#[derive(Debug, Default)]
pub struct ScaleTable {
    scales: FxDashMap<FlowKey, u8>,
}

impl ScaleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the scale factor for `key`, learning it from this
    /// segment if it is the flow's first SYN.
    ///
    /// An existing entry wins unconditionally; `scale_hint` is ignored
    /// once a value has been learned. Without an entry, a non-SYN
    /// segment gets 0 and creates nothing, so the scale can still be
    /// learned from a later SYN-ACK. A missing hint on a SYN is
    /// learned as 0, and out-of-range hints clamp to
    /// [`MAX_WINDOW_SCALE`].
    pub fn learn_or_get(&self, key: &FlowKey, is_syn: bool, scale_hint: Option<u32>) -> u8 {
        if let Some(scale) = self.scales.get(key) {
            return *scale;
        }
        if !is_syn {
            return 0;
        }
        let scale = scale_hint.unwrap_or(0).min(u32::from(MAX_WINDOW_SCALE)) as u8;
        match self.scales.entry(key.clone()) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => *entry.insert(scale),
        }
    }

    /// Read-only lookup for replay passes: the learned scale, or 0 if
    /// none was ever negotiated. Never creates an entry.
    pub fn get(&self, key: &FlowKey) -> u8 {
        self.scales.get(key).map(|scale| *scale).unwrap_or(0)
    }

    pub fn clear(&self) {
        self.scales.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.scales.len()
    }
}

/// Applies a learned scale factor to a raw window value.
///
/// Doubles once per scale step, saturating at `u32::MAX` on every step
/// rather than only at the end, so the result can never wrap no matter
/// how large the shift.
pub fn scale_window(raw_window: u32, scale: u8) -> u32 {
    if scale == 0 {
        return raw_window;
    }
    let mut window = raw_window;
    for _ in 0..scale {
        window = window.saturating_mul(2);
    }
    window
}
