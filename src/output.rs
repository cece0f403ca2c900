/// Event and output plumbing between the radio stack, the locator and the
/// byte-stream sink.
///
/// Radio callbacks push [`RadioEvent`]s into an [`EventChannel`]; the
/// locator task drains it one event at a time and emits lines (IQ records
/// and NDJSON diagnostics) into an [`OutputSink`], typically the sender half
/// of an [`OutputChannel`] read by the serial writer.
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::channel::{Channel, Sender};
use heapless::Vec;

use crate::radio::RadioEvent;
use crate::report::MAX_REPORT_LEN;

/// One output line, newline included.
pub type OutputLine = Vec<u8, MAX_REPORT_LEN>;

/// Inbound radio events awaiting the locator task
pub type EventChannel = Channel<CriticalSectionRawMutex, RadioEvent, 16>;

/// Output lines awaiting the serial writer
pub type OutputChannel = Channel<CriticalSectionRawMutex, OutputLine, 8>;

/// Destination for output lines.
///
/// Implementations must not block: the locator calls `emit` from inside
/// event dispatch.
pub trait OutputSink {
    fn emit(&mut self, line: &[u8]);
}

/// Drops the line when the channel is full.
impl<M: RawMutex, const N: usize> OutputSink for Sender<'_, M, OutputLine, N> {
    fn emit(&mut self, line: &[u8]) {
        let Ok(buf) = OutputLine::from_slice(line) else {
            log::warn!("Output line of {} bytes dropped (too long)", line.len());
            return;
        };
        if self.try_send(buf).is_err() {
            log::warn!("Output channel full, line dropped");
        }
    }
}
