/// Scan-and-synchronize state machine.
///
/// Drives tag discovery from radio events:
/// boot → scanning → (service match) sync requested → sync opened, CTE
/// sampling enabled → IQ reports relayed → sync closed → scanning.
///
/// Events are handled one at a time to completion. A radio command failure
/// other than "already in the requested state" is returned as a fatal
/// [`LocatorError`]; the binary is expected to abort and restart.
use core::fmt;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Receiver;
use heapless::Vec;

use crate::adv;
use crate::config::{
    LocatorConfig, CONN_LATENCY, CONN_MAX_CE_LENGTH, CONN_MIN_CE_LENGTH,
    CONN_SUPERVISION_TIMEOUT, MAX_TAGS,
};
use crate::estimator::AngleEstimator;
use crate::output::OutputSink;
use crate::protocol::{self, LocatorMessage, VERSION};
use crate::radio::{
    Address, ConnParams, CteParams, DiscoverMode, IqReport, RadioError, RadioEvent, RadioStack,
    ScanMode, ScanReport, SyncHandle,
};
use crate::registry::{Registry, RegistryError, TagEntry, TagState};
use crate::report::IqRecord;

/// Radio command that failed, for fault reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    IdentityAddress,
    SetScanMode,
    SetScanTiming,
    SetSyncParameters,
    StartScan,
    StopScan,
    OpenSync,
    EnableCte,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::IdentityAddress => "get identity address",
            Command::SetScanMode => "set scanner mode",
            Command::SetScanTiming => "set scanner timing",
            Command::SetSyncParameters => "set sync parameters",
            Command::StartScan => "start scanner",
            Command::StopScan => "stop scanner",
            Command::OpenSync => "synchronize to tag",
            Command::EnableCte => "enable CTE",
        }
    }
}

/// Unrecoverable radio command failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorError {
    pub command: Command,
    pub error: RadioError,
}

impl fmt::Display for LocatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to {}: {}", self.command.as_str(), self.error)
    }
}

/// Attach the failing command to a radio result.
trait CommandResult<T> {
    fn fatal(self, command: Command) -> Result<T, LocatorError>;
    /// Treat "already in the requested state" as success.
    fn tolerate(self, command: Command) -> Result<(), LocatorError>;
}

impl<T> CommandResult<T> for Result<T, RadioError> {
    fn fatal(self, command: Command) -> Result<T, LocatorError> {
        self.map_err(|error| LocatorError { command, error })
    }

    fn tolerate(self, command: Command) -> Result<(), LocatorError> {
        match self {
            Ok(_) => Ok(()),
            Err(e) if e.is_benign() => Ok(()),
            Err(error) => Err(LocatorError { command, error }),
        }
    }
}

/// Overall locator phase, derived from boot state and tag tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the radio stack to boot
    Idle,
    /// Scanning, nothing tracked
    Scanning,
    /// At least one sync requested, none established yet
    Syncing,
    /// At least one tag streaming IQ reports
    Streaming,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Scanning => "scanning",
            Phase::Syncing => "syncing",
            Phase::Streaming => "streaming",
        }
    }
}

/// A sync request awaiting `SyncOpened`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSync {
    pub sync: SyncHandle,
    pub address: Address,
    pub adv_sid: u8,
}

/// The locator: tag registry plus the radio stack it commands.
pub struct Locator<R: RadioStack, E: AngleEstimator, const N: usize = MAX_TAGS> {
    radio: R,
    registry: Registry<E, N>,
    pending: Vec<PendingSync, N>,
    config: LocatorConfig,
    /// Own identity, known after boot
    identity: Option<Address>,
}

impl<R: RadioStack, E: AngleEstimator, const N: usize> Locator<R, E, N> {
    pub fn new(radio: R, estimator: E, config: LocatorConfig) -> Self {
        Self {
            radio,
            registry: Registry::new(estimator),
            pending: Vec::new(),
            config,
            identity: None,
        }
    }

    pub fn registry(&self) -> &Registry<E, N> {
        &self.registry
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn pending(&self) -> &[PendingSync] {
        &self.pending
    }

    pub fn identity(&self) -> Option<&Address> {
        self.identity.as_ref()
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        if self.identity.is_none() {
            Phase::Idle
        } else if !self.registry.is_empty() {
            Phase::Streaming
        } else if !self.pending.is_empty() {
            Phase::Syncing
        } else {
            Phase::Scanning
        }
    }

    /// Dispatch one radio event.
    pub fn handle_event<S: OutputSink>(
        &mut self,
        event: &RadioEvent,
        now_ms: u32,
        sink: &mut S,
    ) -> Result<(), LocatorError> {
        if self.identity.is_none() && !matches!(event, RadioEvent::Boot) {
            log::debug!("Event before boot ignored");
            return Ok(());
        }

        match event {
            RadioEvent::Boot => self.on_boot(sink),
            RadioEvent::ScanReport(report) => self.on_scan_report(report, sink),
            RadioEvent::SyncOpened { sync } => self.on_sync_opened(*sync, sink),
            RadioEvent::SyncClosed { sync } => self.on_sync_closed(*sync, sink),
            RadioEvent::IqReport(report) => {
                self.on_iq_report(report, now_ms, sink);
                Ok(())
            }
            RadioEvent::Other => Ok(()),
        }
    }

    fn on_boot<S: OutputSink>(&mut self, sink: &mut S) -> Result<(), LocatorError> {
        let identity = self
            .radio
            .identity_address()
            .fatal(Command::IdentityAddress)?;

        self.radio
            .set_scan_mode(ScanMode::Passive)
            .fatal(Command::SetScanMode)?;
        self.radio
            .set_scan_timing(self.config.scan_interval, self.config.scan_window)
            .fatal(Command::SetScanTiming)?;
        self.radio
            .set_sync_parameters(self.config.sync_skip, self.config.sync_timeout)
            .fatal(Command::SetSyncParameters)?;
        self.radio
            .start_scan(DiscoverMode::Observation)
            .fatal(Command::StartScan)?;

        self.identity = Some(identity);
        log::info!(
            "Locator {} booted, scanning for tags ({} array, {} antennas)",
            identity,
            self.config.array.name(),
            self.config.array.antenna_count()
        );

        emit_message(
            sink,
            &LocatorMessage::Boot {
                locator: identity.as_u64(),
                array: self.config.array.name(),
                version: VERSION,
            },
        );
        Ok(())
    }

    fn on_scan_report<S: OutputSink>(
        &mut self,
        report: &ScanReport,
        sink: &mut S,
    ) -> Result<(), LocatorError> {
        if !report.is_extended() {
            return Ok(());
        }
        if !adv::contains_service(&report.data, &self.config.service_uuid) {
            return Ok(());
        }

        let address = report.address;
        if self.registry.find_by_identity(&address).is_some()
            || self.pending.iter().any(|p| p.address == address)
        {
            log::debug!("Tag {} already tracked", address);
            return Ok(());
        }
        if self.registry.len() + self.pending.len() >= N {
            log::warn!("Tag {} found but tag table is full", address);
            return Ok(());
        }

        log::info!("CTE service found on tag {} (sid {})", address, report.adv_sid);

        let sync = match self.radio.open_sync(&address, report.adv_sid) {
            Ok(sync) => sync,
            Err(e) if e.is_benign() => {
                log::debug!("Sync to {} already in progress", address);
                return Ok(());
            }
            Err(error) => {
                return Err(LocatorError {
                    command: Command::OpenSync,
                    error,
                })
            }
        };

        if self.registry.find_by_handle(sync).is_some()
            || self.pending.iter().any(|p| p.sync == sync)
        {
            log::warn!("Stack reused live sync handle {}", sync);
            return Ok(());
        }

        // Capacity was checked above
        let _ = self.pending.push(PendingSync {
            sync,
            address,
            adv_sid: report.adv_sid,
        });

        emit_message(
            sink,
            &LocatorMessage::TagFound {
                tag: address.as_u64(),
                sid: report.adv_sid,
                sync: sync.0,
            },
        );
        Ok(())
    }

    fn on_sync_opened<S: OutputSink>(
        &mut self,
        sync: SyncHandle,
        sink: &mut S,
    ) -> Result<(), LocatorError> {
        self.radio.stop_scan().tolerate(Command::StopScan)?;

        let params = CteParams {
            slot_duration: self.config.cte_slot_duration,
            cte_count: self.config.cte_count,
            switching_pattern: self.config.array.switching_pattern(),
        };
        self.radio
            .enable_connectionless_cte(sync, &params)
            .fatal(Command::EnableCte)?;

        match self.pending.iter().position(|p| p.sync == sync) {
            Some(index) => {
                let pending = self.pending.remove(index);
                match self.registry.add(sync, pending.address, TagState::Running) {
                    Ok(_) => {
                        log::info!("Synced to tag {} (handle {})", pending.address, sync);
                        emit_message(
                            sink,
                            &LocatorMessage::TagSynced {
                                tag: pending.address.as_u64(),
                                sync: sync.0,
                            },
                        );
                    }
                    Err(e) => log::warn!("Tag {} not tracked: {}", pending.address, e),
                }
            }
            None => log::warn!("Sync {} opened without a pending request", sync),
        }

        self.radio
            .start_scan(DiscoverMode::Generic)
            .tolerate(Command::StartScan)
    }

    fn on_sync_closed<S: OutputSink>(
        &mut self,
        sync: SyncHandle,
        sink: &mut S,
    ) -> Result<(), LocatorError> {
        if let Some(tag) = self.registry.find_by_handle(sync).map(|e| e.identity) {
            let _ = self.registry.remove(sync);
            log::info!("Lost sync to tag {} (handle {})", tag, sync);
            emit_message(
                sink,
                &LocatorMessage::TagLost {
                    tag: tag.as_u64(),
                    sync: sync.0,
                },
            );
        } else if let Some(index) = self.pending.iter().position(|p| p.sync == sync) {
            let pending = self.pending.remove(index);
            log::info!("Sync to tag {} failed to establish", pending.address);
        } else {
            log::debug!("Sync {} closed for unknown handle", sync);
        }

        self.radio
            .start_scan(DiscoverMode::Generic)
            .tolerate(Command::StartScan)
    }

    fn on_iq_report<S: OutputSink>(&mut self, report: &IqReport, now_ms: u32, sink: &mut S) {
        let Some(locator) = self.identity else {
            return;
        };
        let Some(tag) = self.registry.find_by_handle_mut(report.sync) else {
            log::debug!("IQ report for unknown handle {}", report.sync);
            return;
        };

        tag.rssi = Some(report.rssi);
        let sequence = tag.next_sequence();

        let record = IqRecord {
            locator: &locator,
            tag: &tag.identity,
            timestamp_ms: now_ms,
            sequence,
            channel: report.channel,
            rssi: report.rssi,
            samples: &report.samples,
        };
        match record.to_line() {
            Ok(line) => sink.emit(line.as_bytes()),
            Err(e) => log::warn!("IQ report from {} dropped: {}", tag.identity, e),
        }
    }

    /// Stop tracking a tag without waiting for sync loss.
    pub fn remove_tag<S: OutputSink>(
        &mut self,
        sync: SyncHandle,
        sink: &mut S,
    ) -> Result<(), RegistryError> {
        let tag = self
            .registry
            .find_by_handle(sync)
            .map(|e| e.identity)
            .ok_or(RegistryError::NotFound)?;
        self.registry.remove(sync)?;
        log::info!("Tag {} (handle {}) removed", tag, sync);
        emit_message(
            sink,
            &LocatorMessage::TagLost {
                tag: tag.as_u64(),
                sync: sync.0,
            },
        );
        Ok(())
    }

    /// Apply `interval` (units of 1.25 ms) as the connection interval of
    /// every tracked tag. Failures are logged per tag and not fatal.
    pub fn set_link_interval(&mut self, interval: u16) {
        let params = ConnParams {
            min_interval: interval,
            max_interval: interval,
            latency: CONN_LATENCY,
            timeout: CONN_SUPERVISION_TIMEOUT,
            min_ce_length: CONN_MIN_CE_LENGTH,
            max_ce_length: CONN_MAX_CE_LENGTH,
        };
        let radio = &mut self.radio;
        self.registry.for_each_active(|tag: &mut TagEntry<E::State>| {
            if let Err(e) = radio.set_connection_parameters(tag.handle, &params) {
                log::warn!("Failed to set link interval for {}: {}", tag.identity, e);
            }
        });
    }

    /// Emit a status line.
    pub fn report_status<S: OutputSink>(&self, now_ms: u32, sink: &mut S) {
        emit_message(
            sink,
            &LocatorMessage::Status {
                phase: self.phase().as_str(),
                tags: self.registry.len(),
                pending: self.pending.len(),
                capacity: N,
                uptime: now_ms / 1000,
                version: VERSION,
            },
        );
    }

    /// Handle every event already queued, without waiting.
    /// Returns the number of events handled.
    pub fn drain<M, const Q: usize, C, S>(
        &mut self,
        events: &Receiver<'_, M, RadioEvent, Q>,
        clock: C,
        sink: &mut S,
    ) -> Result<usize, LocatorError>
    where
        M: RawMutex,
        C: Fn() -> u32,
        S: OutputSink,
    {
        let mut handled = 0;
        while let Ok(event) = events.try_receive() {
            self.handle_event(&event, clock(), sink)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Locator task body: handle events as they arrive until a fatal fault.
    pub async fn run<M, const Q: usize, C, S>(
        &mut self,
        events: Receiver<'_, M, RadioEvent, Q>,
        clock: C,
        sink: &mut S,
    ) -> LocatorError
    where
        M: RawMutex,
        C: Fn() -> u32,
        S: OutputSink,
    {
        log::info!("Locator task started");
        loop {
            let event = events.receive().await;
            if let Err(e) = self.handle_event(&event, clock(), sink) {
                log::error!("Locator fault: {}", e);
                return e;
            }
        }
    }
}

fn emit_message<S: OutputSink>(sink: &mut S, msg: &LocatorMessage<'_>) {
    match protocol::serialize_message(msg) {
        Some(buf) => sink.emit(&buf),
        None => log::warn!("Diagnostic message too long, dropped"),
    }
}
