//! aoa-locator library: portable core of a Bluetooth angle-of-arrival locator.
//!
//! The locator scans for tags advertising the CTE service, synchronizes to
//! their periodic advertising, enables connectionless CTE sampling and relays
//! every IQ report as one `$IQ,...` text line. Diagnostics go out on the same
//! stream as NDJSON objects.
//!
//! The crate has no platform dependencies and is testable on any host with
//! `cargo test`. A platform binary provides the radio stack (see
//! [`radio::RadioStack`]), a millisecond clock and an output sink:
//! - `radio`, `adv`: stack boundary and advertising payload parsing
//! - `registry`, `estimator`: fixed-capacity tag table with per-tag estimator state
//! - `locator`: scan/sync state machine driving the above
//! - `report`, `protocol`, `output`: IQ lines, NDJSON diagnostics, channels
//! - `config`: antenna array geometry and radio timing constants

#![cfg_attr(not(test), no_std)]

pub mod adv;
pub mod config;
pub mod estimator;
pub mod locator;
pub mod output;
pub mod protocol;
pub mod radio;
pub mod registry;
pub mod report;
