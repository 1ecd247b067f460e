//! Grounding statistics.
//!
//! Every erase pass reports how many records it removed; the driver folds
//! those counts, per schema, into a [`GroundingStats`] record that can be
//! printed or exported as JSON for downstream tooling.

use serde::{Deserialize, Serialize};
use std::io::Error;
use std::path::Path;
use std::{fmt, io};

/// Counts for one schema (top-level or derived).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaStats {
    /// Schema name.
    pub schema: String,
    /// True for conditional/universal children.
    pub derived: bool,
    /// Records emitted by the enumeration.
    pub enumerated: usize,
    /// Records removed as duplicates.
    pub duplicates_removed: usize,
    /// Records removed as noops.
    pub noops_removed: usize,
    /// Records removed as constant-only.
    pub constants_removed: usize,
    /// Records emitted by the direct children's expansions.
    pub children_emitted: usize,
    /// Records surviving all passes.
    pub surviving: usize,
}

/// Aggregated statistics for a grounding run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundingStats {
    schemas: Vec<SchemaStats>,
}

impl GroundingStats {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one schema's counts.
    pub fn record(&mut self, stats: SchemaStats) {
        self.schemas.push(stats);
    }

    /// Per-schema records in grounding order.
    pub fn schemas(&self) -> &[SchemaStats] {
        &self.schemas
    }

    /// Total surviving ground instantiations.
    pub fn total_surviving(&self) -> usize {
        self.schemas.iter().map(|s| s.surviving).sum()
    }

    /// Total records removed across all passes.
    pub fn total_removed(&self) -> usize {
        self.schemas
            .iter()
            .map(|s| s.duplicates_removed + s.noops_removed + s.constants_removed)
            .sum()
    }

    /// Print a per-schema summary to stdout.
    pub fn print(&self) {
        println!("=== Grounding Statistics ===");
        for s in &self.schemas {
            let tag = if s.derived { " (derived)" } else { "" };
            println!(
                "{}{}: {} enumerated, -{} dup, -{} noop, -{} const, {} children, {} surviving",
                s.schema,
                tag,
                s.enumerated,
                s.duplicates_removed,
                s.noops_removed,
                s.constants_removed,
                s.children_emitted,
                s.surviving
            );
        }
        println!(
            "total: {} surviving, {} removed",
            self.total_surviving(),
            self.total_removed()
        );
    }

    /// Export as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the statistics to a file in JSON format.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = self.to_json().map_err(Error::other)?;
        std::fs::write(path, json)
    }
}

impl fmt::Display for GroundingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GroundingStats({} schemas, {} surviving)",
            self.schemas.len(),
            self.total_surviving()
        )
    }
}
