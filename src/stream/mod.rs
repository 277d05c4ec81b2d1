//! Streaming-endpoint connection layer.
//!
//! `endpoint` owns the HTTP side (open a chunked response, classify
//! transport failures); `reassembler` owns the wire format (rebuild
//! frames from arbitrarily chopped byte chunks and emit token deltas).

pub mod endpoint;
pub mod reassembler;

pub use endpoint::{EndpointClient, EndpointError, EndpointErrorKind};
pub use reassembler::{FrameReassembler, TokenEvent};
