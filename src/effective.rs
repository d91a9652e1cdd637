//! Effective-window computation: how much more the sender could put on
//! the wire right now.

use std::fmt::{self, Display};

/// Which inputs were available for a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcKind {
    /// Both the scaled receiver window and bytes-in-flight were known.
    MinRwndCwnd,
    /// Only the scaled receiver window was known.
    RwndOnly,
    /// Only bytes-in-flight was known; without a window the sendable
    /// headroom is taken as zero.
    BytesInFlightOnly,
}

impl CalcKind {
    pub fn label(self) -> &'static str {
        match self {
            CalcKind::MinRwndCwnd => "min(Rwnd,Cwnd_est)-BytesInFlight",
            CalcKind::RwndOnly => "Rwnd Only",
            CalcKind::BytesInFlightOnly => "BytesInFlight Only",
        }
    }
}

impl Display for CalcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One computed effective-window value and the inputs that produced it.
#[derive(Debug, Clone)]
pub struct EffectiveWindow {
    pub value: u32,
    pub kind: CalcKind,
    /// Human-readable summary of the inputs used.
    pub detail: String,
    pub cwnd_estimate: f64,
    pub scaled_rwnd: Option<u32>,
    pub bytes_in_flight: Option<u32>,
}

/// Combines the scaled receiver window, the congestion estimate, and
/// bytes-in-flight into the sendable headroom.
///
/// Missing inputs narrow the calculation rather than failing it; with
/// neither a window nor bytes-in-flight there is nothing to compute and
/// the packet is skipped. The congestion estimate is used as supplied,
/// zero included (a zero estimate is a real number here, not a
/// missing-data marker).
pub fn effective_window(
    scaled_rwnd: Option<u32>,
    cwnd_estimate: f64,
    bytes_in_flight: Option<u32>,
) -> Option<EffectiveWindow> {
    let (value, kind, detail) = match (scaled_rwnd, bytes_in_flight) {
        (Some(rwnd), Some(in_flight)) => {
            let limit = f64::from(rwnd).min(cwnd_estimate);
            let headroom = (limit - f64::from(in_flight))
                .max(0.0)
                .min(f64::from(u32::MAX)) as u32;
            (
                headroom,
                CalcKind::MinRwndCwnd,
                format!("rwnd {rwnd}, cwnd_est {cwnd_estimate:.0}, in flight {in_flight}"),
            )
        }
        (Some(rwnd), None) => (
            rwnd,
            CalcKind::RwndOnly,
            format!("rwnd {rwnd}, bytes in flight unknown"),
        ),
        (None, Some(in_flight)) => (
            0,
            CalcKind::BytesInFlightOnly,
            format!("rwnd unknown, in flight {in_flight}"),
        ),
        (None, None) => return None,
    };
    Some(EffectiveWindow {
        value,
        kind,
        detail,
        cwnd_estimate,
        scaled_rwnd,
        bytes_in_flight,
    })
}
