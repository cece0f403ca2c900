/// Compile-time locator configuration.
///
/// Antenna geometry is selected at compile time via feature flags
/// (`array-3x3`, `array-1x4`; 4x4 URA otherwise). Timing values are the
/// defaults for [`LocatorConfig`], which a board binary may override.

/// Antenna array geometries supported by the locator board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayType {
    /// 4x4 uniform rectangular array
    Ura4x4,
    /// 3x3 uniform rectangular array
    Ura3x3,
    /// 1x4 uniform linear array
    Ula1x4,
}

impl ArrayType {
    pub const fn antenna_count(&self) -> usize {
        self.switching_pattern().len()
    }

    /// Antenna switching order used while sampling the CTE.
    pub const fn switching_pattern(&self) -> &'static [u8] {
        match self {
            ArrayType::Ura4x4 => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
            // Indices into the 4x4 switch matrix
            ArrayType::Ura3x3 => &[1, 2, 3, 5, 6, 7, 9, 10, 11],
            ArrayType::Ula1x4 => &[0, 1, 2, 3],
        }
    }

    /// Number of antenna snapshots the estimator expects per packet.
    pub const fn snapshots(&self) -> usize {
        match self {
            ArrayType::Ura4x4 | ArrayType::Ura3x3 => 4,
            ArrayType::Ula1x4 => 18,
        }
    }

    /// Reference period length in IQ samples.
    pub const fn ref_period_samples(&self) -> usize {
        7
    }

    pub const fn name(&self) -> &'static str {
        match self {
            ArrayType::Ura4x4 => "4x4_ura",
            ArrayType::Ura3x3 => "3x3_ura",
            ArrayType::Ula1x4 => "1x4_ula",
        }
    }
}

#[cfg(feature = "array-1x4")]
mod hw {
    pub const ARRAY_TYPE: super::ArrayType = super::ArrayType::Ula1x4;
}

#[cfg(all(feature = "array-3x3", not(feature = "array-1x4")))]
mod hw {
    pub const ARRAY_TYPE: super::ArrayType = super::ArrayType::Ura3x3;
}

#[cfg(not(any(feature = "array-3x3", feature = "array-1x4")))]
mod hw {
    pub const ARRAY_TYPE: super::ArrayType = super::ArrayType::Ura4x4;
}

pub use hw::ARRAY_TYPE;

/// Maximum number of tags tracked at the same time.
pub const MAX_TAGS: usize = 8;

/// Scan interval, units of 0.625 ms (10 ms)
pub const SCAN_INTERVAL: u16 = 16;
/// Scan window, units of 0.625 ms (10 ms)
pub const SCAN_WINDOW: u16 = 16;

/// Periodic advertising events that may be skipped
pub const SYNC_SKIP: u16 = 1;
/// Sync supervision timeout, units of 10 ms (1 s)
pub const SYNC_TIMEOUT: u16 = 100;

/// CTE sampling slot duration in µs
pub const CTE_SLOT_DURATION: u8 = 1;
/// CTEs sampled per periodic advertising interval
pub const CTE_COUNT: u8 = 1;

/// Connection parameters applied by `Locator::set_link_interval`.
pub const CONN_LATENCY: u16 = 0;
/// Supervision timeout, units of 10 ms (1 s)
pub const CONN_SUPERVISION_TIMEOUT: u16 = 100;
pub const CONN_MIN_CE_LENGTH: u16 = 0x0000;
pub const CONN_MAX_CE_LENGTH: u16 = 0xFFFF;

/// Tag transmit power at 1 m, used by distance estimation backends.
pub const TAG_TX_POWER_DBM: f32 = -45.0;

/// CTE service UUID advertised by tags, in over-the-air (little-endian) byte order.
pub const CTE_SERVICE_UUID: [u8; 16] = [
    0x50, 0x69, 0x96, 0x81, 0xb7, 0xa8, 0xad, 0x07, 0x96, 0xf2, 0x3f, 0x07, 0x64, 0x36, 0xd0, 0x0e,
];

/// Runtime locator configuration. Defaults to the compile-time constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocatorConfig {
    /// Service UUID a tag must advertise to be tracked
    pub service_uuid: [u8; 16],
    pub array: ArrayType,
    pub scan_interval: u16,
    pub scan_window: u16,
    pub sync_skip: u16,
    pub sync_timeout: u16,
    pub cte_slot_duration: u8,
    pub cte_count: u8,
}

impl LocatorConfig {
    pub const fn new() -> Self {
        Self {
            service_uuid: CTE_SERVICE_UUID,
            array: ARRAY_TYPE,
            scan_interval: SCAN_INTERVAL,
            scan_window: SCAN_WINDOW,
            sync_skip: SYNC_SKIP,
            sync_timeout: SYNC_TIMEOUT,
            cte_slot_duration: CTE_SLOT_DURATION,
            cte_count: CTE_COUNT,
        }
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn antenna_counts_match_geometry() {
        assert_eq!(ArrayType::Ura4x4.antenna_count(), 16);
        assert_eq!(ArrayType::Ura3x3.antenna_count(), 9);
        assert_eq!(ArrayType::Ula1x4.antenna_count(), 4);
    }

    #[test]
    fn switching_patterns_stay_within_4x4_footprint() {
        for array in [ArrayType::Ura4x4, ArrayType::Ura3x3, ArrayType::Ula1x4] {
            assert!(array.switching_pattern().iter().all(|&a| a < 16), "{}", array.name());
        }
    }

    #[test]
    fn linear_array_takes_more_snapshots() {
        assert_eq!(ArrayType::Ura4x4.snapshots(), 4);
        assert_eq!(ArrayType::Ula1x4.snapshots(), 18);
        assert_eq!(ArrayType::Ura3x3.ref_period_samples(), 7);
    }

    #[test]
    fn default_config_uses_compile_time_constants() {
        let config = LocatorConfig::default();
        assert_eq!(config.service_uuid, CTE_SERVICE_UUID);
        assert_eq!(config.array, ARRAY_TYPE);
        assert_eq!(config.scan_interval, 16);
        assert_eq!(config.scan_window, 16);
        assert_eq!(config.sync_skip, 1);
        assert_eq!(config.sync_timeout, 100);
        assert_eq!(config.cte_slot_duration, 1);
        assert_eq!(config.cte_count, 1);
    }

    #[cfg(not(any(feature = "array-3x3", feature = "array-1x4")))]
    #[test]
    fn default_array_is_4x4() {
        assert_eq!(ARRAY_TYPE, ArrayType::Ura4x4);
    }
}
