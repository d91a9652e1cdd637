//! Directional flow identity used to key all per-flow state.

use std::fmt::{self, Display};
use std::net::SocketAddr;

/// Identifies one direction of a TCP connection. A bidirectional
/// connection yields two distinct keys; the request and response
/// directions are never merged.
///
/// The key is stable for the lifetime of a capture session. When the
/// dissector cannot supply a stream id yet, `stream` is `None` and
/// unrelated connections that reuse the same address tuple share a key
/// until stream tracking comes up. That collision is documented
/// behavior, not corrected here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowKey {
    /// Capture-assigned stream id, or `None` before stream tracking is
    /// available.
    pub stream: Option<u64>,
    pub src: SocketAddr,
    pub dst: SocketAddr,
}

impl FlowKey {
    pub fn new(stream: Option<u64>, src: SocketAddr, dst: SocketAddr) -> Self {
        Self { stream, src, dst }
    }

    /// The key for the opposite direction of the same connection.
    pub fn reverse(&self) -> Self {
        Self {
            stream: self.stream,
            src: self.dst,
            dst: self.src,
        }
    }
}

impl Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}>{}", self.src, self.dst)
    }
}
