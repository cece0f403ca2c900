/// Boundary to the Bluetooth link-layer stack.
///
/// The stack delivers [`RadioEvent`]s (usually from a callback context, via
/// the event channel in [`crate::output`]) and accepts the commands in
/// [`RadioStack`]. Event payloads are copied into fixed-capacity buffers so
/// events can be queued without an allocator.
use core::fmt;

use heapless::Vec;

/// Maximum advertising data carried by one (extended) scan report.
pub const MAX_ADV_DATA: usize = 253;

/// Maximum raw IQ bytes carried by one CTE report (interleaved I/Q).
pub const MAX_IQ_SAMPLES: usize = 255;

/// Packet type bit marking an extended advertising report.
pub const PACKET_TYPE_EXTENDED: u8 = 0x80;

/// Bluetooth device address type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Public,
    Random,
}

impl AddressKind {
    /// Map the HCI address-type byte; identity types fold onto their base type.
    pub fn from_raw(raw: u8) -> Self {
        match raw & 0x01 {
            0 => AddressKind::Public,
            _ => AddressKind::Random,
        }
    }
}

/// A device identity: 48-bit address plus address type.
///
/// `bytes` are stored as received over the air, least significant byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    pub bytes: [u8; 6],
    pub kind: AddressKind,
}

impl Address {
    pub const fn new(bytes: [u8; 6], kind: AddressKind) -> Self {
        Self { bytes, kind }
    }

    /// The address as a 48-bit integer (byte 0 least significant).
    pub fn as_u64(&self) -> u64 {
        self.bytes
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[5], b[4], b[3], b[2], b[1], b[0]
        )
    }
}

/// Handle the stack assigns to one periodic advertising sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyncHandle(pub u16);

impl fmt::Display for SyncHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An advertising report delivered while scanning.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub packet_type: u8,
    pub address: Address,
    /// Advertising set ID of the advertiser
    pub adv_sid: u8,
    pub rssi: i8,
    pub data: Vec<u8, MAX_ADV_DATA>,
}

impl ScanReport {
    pub fn is_extended(&self) -> bool {
        self.packet_type & PACKET_TYPE_EXTENDED != 0
    }
}

/// A connectionless CTE IQ sample report for a synced tag.
#[derive(Debug, Clone, PartialEq)]
pub struct IqReport {
    pub sync: SyncHandle,
    pub rssi: i8,
    pub channel: u8,
    /// Interleaved I/Q samples: i0, q0, i1, q1, ...
    pub samples: Vec<i8, MAX_IQ_SAMPLES>,
}

/// Inbound events from the radio stack.
#[derive(Debug, Clone, PartialEq)]
pub enum RadioEvent {
    /// The stack has booted and accepts commands
    Boot,
    ScanReport(ScanReport),
    SyncOpened { sync: SyncHandle },
    SyncClosed { sync: SyncHandle },
    IqReport(IqReport),
    /// Any event the locator does not act on
    Other,
}

/// Scanner discovery mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverMode {
    /// Report all advertisers (used at boot)
    Observation,
    /// Report general discoverable advertisers (used when resuming)
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Passive,
    Active,
}

/// Parameters for connectionless CTE sampling on one sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CteParams<'a> {
    /// Sampling slot duration in µs
    pub slot_duration: u8,
    /// CTEs to sample per periodic advertising interval
    pub cte_count: u8,
    pub switching_pattern: &'a [u8],
}

/// Connection interval parameters for connection-oriented tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnParams {
    pub min_interval: u16,
    pub max_interval: u16,
    pub latency: u16,
    pub timeout: u16,
    pub min_ce_length: u16,
    pub max_ce_length: u16,
}

/// Failure reported by a radio stack command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// The stack is already in the requested state (e.g. scanner already stopped)
    InvalidState,
    /// Any other stack status code
    Status(u16),
}

impl RadioError {
    /// Whether the failure only means "already in the requested state".
    pub fn is_benign(&self) -> bool {
        matches!(self, RadioError::InvalidState)
    }
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioError::InvalidState => write!(f, "invalid state"),
            RadioError::Status(code) => write!(f, "status 0x{:04x}", code),
        }
    }
}

/// Commands the locator issues to the radio stack.
///
/// Every command either completes synchronously or reports an error; the
/// locator only changes state after a command is acknowledged.
pub trait RadioStack {
    fn identity_address(&mut self) -> Result<Address, RadioError>;

    fn set_scan_mode(&mut self, mode: ScanMode) -> Result<(), RadioError>;

    /// Interval and window in units of 0.625 ms
    fn set_scan_timing(&mut self, interval: u16, window: u16) -> Result<(), RadioError>;

    /// Skip count and supervision timeout (10 ms units) for future syncs
    fn set_sync_parameters(&mut self, skip: u16, timeout: u16) -> Result<(), RadioError>;

    fn start_scan(&mut self, mode: DiscoverMode) -> Result<(), RadioError>;

    fn stop_scan(&mut self) -> Result<(), RadioError>;

    /// Request a periodic sync; `RadioEvent::SyncOpened` follows on success.
    fn open_sync(&mut self, address: &Address, adv_sid: u8) -> Result<SyncHandle, RadioError>;

    fn enable_connectionless_cte(
        &mut self,
        sync: SyncHandle,
        params: &CteParams<'_>,
    ) -> Result<(), RadioError>;

    fn set_connection_parameters(
        &mut self,
        handle: SyncHandle,
        params: &ConnParams,
    ) -> Result<(), RadioError>;
}
