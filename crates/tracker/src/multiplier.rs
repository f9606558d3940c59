use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// One step of the zoom → over-fetch multiplier function.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundsMultiplier {
    /// The entry applies when the map zoom is strictly above this value.
    pub zoom_above: f64,
    pub multiplier: f64,
}

impl BoundsMultiplier {
    pub const fn new(zoom_above: f64, multiplier: f64) -> Self {
        Self {
            zoom_above,
            multiplier,
        }
    }
}

/// Default table: fetch a wider area the closer the map is zoomed in.
pub const BOUNDARIES_MULTIPLIERS: [BoundsMultiplier; 4] = [
    BoundsMultiplier::new(16.0, 3.0),
    BoundsMultiplier::new(14.0, 2.4),
    BoundsMultiplier::new(12.0, 1.8),
    BoundsMultiplier::new(9.0, 1.2),
];

/// Step function from zoom level to fetch-bounds multiplier.
///
/// Entries are kept strictly descending by `zoom_above`; this is checked once
/// when the table is built, so [`resolve`](Self::resolve) can be a plain scan.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundsMultiplierTable {
    entries: Vec<BoundsMultiplier>,
}

impl BoundsMultiplierTable {
    pub fn new(entries: Vec<BoundsMultiplier>) -> Result<Self, ConfigError> {
        for (index, entry) in entries.iter().enumerate() {
            if !entry.zoom_above.is_finite() || !entry.multiplier.is_finite() {
                return Err(ConfigError::InvalidMultiplier {
                    index,
                    reason: "values must be finite".to_string(),
                });
            }
            if entry.multiplier <= 0.0 {
                return Err(ConfigError::InvalidMultiplier {
                    index,
                    reason: format!("multiplier {} must be positive", entry.multiplier),
                });
            }
        }
        for pair in entries.windows(2) {
            if pair[1].zoom_above >= pair[0].zoom_above {
                return Err(ConfigError::UnsortedMultipliers {
                    prev: pair[0].zoom_above,
                    next: pair[1].zoom_above,
                });
            }
        }
        Ok(Self { entries })
    }

    /// A table that never enlarges the fetch region.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[BoundsMultiplier] {
        &self.entries
    }

    /// Multiplier of the first entry whose threshold is strictly below `zoom`,
    /// or `1.0` when the zoom is at or below every threshold.
    pub fn resolve(&self, zoom: f64) -> f64 {
        self.entries
            .iter()
            .find(|entry| zoom > entry.zoom_above)
            .map_or(1.0, |entry| entry.multiplier)
    }
}

impl Default for BoundsMultiplierTable {
    fn default() -> Self {
        Self {
            entries: BOUNDARIES_MULTIPLIERS.to_vec(),
        }
    }
}

/// Free-function form of [`BoundsMultiplierTable::resolve`].
pub fn resolve_multiplier(zoom: f64, table: &BoundsMultiplierTable) -> f64 {
    table.resolve(zoom)
}

/// Parses `"16:3.0,14:2.4"`. Whitespace around items is ignored and an empty
/// string yields an empty table.
impl FromStr for BoundsMultiplierTable {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = Vec::new();
        for item in s.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            let parsed = item.split_once(':').and_then(|(zoom, multiplier)| {
                let zoom = zoom.trim().parse::<f64>().ok()?;
                let multiplier = multiplier.trim().parse::<f64>().ok()?;
                Some(BoundsMultiplier::new(zoom, multiplier))
            });
            match parsed {
                Some(entry) => entries.push(entry),
                None => return Err(ConfigError::UnparseableMultiplier(item.to_string())),
            }
        }
        Self::new(entries)
    }
}

impl fmt::Display for BoundsMultiplierTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", entry.zoom_above, entry.multiplier)?;
        }
        Ok(())
    }
}
