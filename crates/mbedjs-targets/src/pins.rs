//! Pin table parsing.
//!
//! A pin table is line-oriented. Only lines with exactly four
//! whitespace-separated fields describe a pin, e.g. `var LED1 = 50;`: the
//! second field is the name and the fourth, minus its final character, is the
//! value. Every other line is ignored.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, TargetError};

/// One physical pin exposed by the target board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinEntry {
    /// Pin name, e.g. `LED1`.
    pub name: String,
    /// Pin value as written in the table, e.g. `50`.
    pub value: String,
}

impl PinEntry {
    /// Parse a single table line. Returns `None` for non-pin lines.
    pub fn from_line(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            return None;
        }
        let mut value = fields[3].to_string();
        value.pop();
        Some(Self {
            name: fields[1].to_string(),
            value,
        })
    }
}

/// Parse pin table text into entries, in table order.
///
/// Names are unique in the result: a repeated name keeps its first value.
pub fn parse_pin_table(text: &str) -> Vec<PinEntry> {
    let mut seen = HashSet::new();
    text.lines()
        .filter_map(PinEntry::from_line)
        .filter(|pin| {
            let fresh = seen.insert(pin.name.clone());
            if !fresh {
                warn!(pin = %pin.name, "duplicate pin name, keeping the first definition");
            }
            fresh
        })
        .collect()
}

/// Read and parse a pin table file.
pub fn load_pin_table(path: &Path) -> Result<Vec<PinEntry>> {
    let text = std::fs::read_to_string(path).map_err(|source| TargetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_pin_table(&text))
}
