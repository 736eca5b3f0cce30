//! Target selection and pin-definition tables for mbedjs.
//!
//! A build is produced for one [`TargetSelector`]. The JavaScript engine's
//! source tree ships one `pins.js` table per board under a `pin_defs/` subtree
//! whose directory names carry mbed `TARGET_*` labels. This crate finds the
//! table matching the selector and parses it into [`PinEntry`] rows.

pub mod discover;
pub mod error;
pub mod pins;
pub mod target;

pub use discover::{find_pin_table, matching_tables, PIN_TABLE_FILE};
pub use error::{Result, TargetError};
pub use pins::{load_pin_table, parse_pin_table, PinEntry};
pub use target::TargetSelector;
