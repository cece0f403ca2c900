/// Diagnostic NDJSON messages emitted alongside IQ lines.
///
/// IQ records start with `$IQ`; every other line on the output stream is one
/// of these JSON objects, so a consumer can split the stream on the first byte.
/// Uses `heapless` buffers for no_std/no-alloc operation.
use heapless::Vec;
use serde::Serialize;

/// Messages sent from the locator to the host
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum LocatorMessage<'a> {
    /// Radio stack booted and scanning started
    #[serde(rename = "boot")]
    Boot {
        /// Locator address as a 48-bit integer
        locator: u64,
        /// Antenna array geometry name
        array: &'static str,
        version: &'static str,
    },
    /// A tag advertising the CTE service was found and a sync requested
    #[serde(rename = "found")]
    TagFound { tag: u64, sid: u8, sync: u16 },
    /// Periodic sync established and CTE sampling enabled
    #[serde(rename = "synced")]
    TagSynced { tag: u64, sync: u16 },
    /// Periodic sync lost; the tag is no longer tracked
    #[serde(rename = "lost")]
    TagLost { tag: u64, sync: u16 },
    /// Locator status report
    #[serde(rename = "status")]
    Status {
        /// "idle", "scanning", "syncing" or "streaming"
        phase: &'a str,
        /// Tags currently streaming IQ reports
        tags: usize,
        /// Sync requests awaiting establishment
        pending: usize,
        capacity: usize,
        /// Uptime in seconds
        uptime: u32,
        version: &'static str,
    },
}

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum size of a serialized JSON message
pub const MAX_MSG_LEN: usize = 256;

/// Buffer type for serialized JSON messages
pub type MsgBuffer = Vec<u8, MAX_MSG_LEN>;

/// Serialize a message as one NDJSON line (newline appended).
/// Returns `None` if it does not fit in the buffer.
pub fn serialize_message(msg: &LocatorMessage<'_>) -> Option<MsgBuffer> {
    let mut buf = MsgBuffer::new();
    buf.resize_default(MAX_MSG_LEN).ok()?;
    let len = serde_json_core::to_slice(msg, &mut buf).ok()?;
    if len >= MAX_MSG_LEN {
        return None;
    }
    buf[len] = b'\n';
    buf.truncate(len + 1);
    Some(buf)
}
