//! Hand-written protobuf types for the event log frames.
//!
//! Uses prost derive macros for encode/decode without prost-build.
//! Field numbers are part of the on-disk format and never change.

use prost::Message;

// ── Event Record ───────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ProtoEventRecord {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(string, tag = "2")]
    pub event_type: String,
    /// Microseconds since the Unix epoch, UTC.
    #[prost(int64, tag = "3")]
    pub timestamp_micros: i64,
    #[prost(int64, optional, tag = "4")]
    pub counter_value: Option<i64>,
}
