//! Per-pass statistics
//!
//! Every pass returns its counters explicitly; nothing here is global.

use semoa_common::ReaderStats;
use serde::{Deserialize, Serialize};

/// **Primary scan statistics**
///
/// Display: "N accepted of M records (F filtered out, I without id)"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Decoded records pulled from the reader
    pub records_seen: u64,
    /// Records that passed the filter and carried an identifier
    pub accepted: u64,
    /// Records rejected by the filter
    pub filtered_out: u64,
    /// Records that passed the filter but had no identifier
    pub missing_id: u64,
    /// Lines that decoded to something other than a JSON object
    pub not_an_object: u64,
    /// Relation rows emitted, all four work relations together
    pub relations_emitted: u64,
    /// Scan stopped early on the accepted-works cap
    pub cap_reached: bool,
    /// Reader counters (files, lines, malformed lines)
    pub reader: ReaderStats,
}

impl ScanStats {
    pub fn display_string(&self) -> String {
        format!(
            "{} accepted of {} records ({} filtered out, {} without id, {} malformed){}",
            self.accepted,
            self.records_seen,
            self.filtered_out,
            self.missing_id,
            self.reader.malformed_lines + self.not_an_object,
            if self.cap_reached { ", cap reached" } else { "" }
        )
    }
}

/// **Secondary scan statistics**, one per entity kind
///
/// Display: "N matched of M records, K frontier keys (+A discovered)"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveStats {
    /// Entity kind label (`authors`, `concepts`, ...)
    pub kind: String,
    /// Decoded records pulled from the reader
    pub records_scanned: u64,
    /// Records whose key was in the frontier, including those past the cap
    pub matched: u64,
    /// Entity rows emitted
    pub emitted: u64,
    /// Matches seen after the cap that were not emitted
    pub suppressed_after_cap: u64,
    /// Records with no usable key
    pub missing_key: u64,
    /// Lines that decoded to something other than a JSON object
    pub not_an_object: u64,
    /// Side-relation rows emitted
    pub links_emitted: u64,
    /// Frontier size when the scan started
    pub frontier_initial: usize,
    /// Frontier size when the scan ended (grows for concepts)
    pub frontier_final: usize,
    /// Emission stopped on the per-kind cap
    pub cap_reached: bool,
    /// Reader counters (files, lines, malformed lines)
    pub reader: ReaderStats,
}

impl ResolveStats {
    /// Frontier keys discovered during the scan itself
    pub fn discovered(&self) -> usize {
        self.frontier_final.saturating_sub(self.frontier_initial)
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} matched of {} records, {} frontier keys (+{} discovered){}",
            self.matched,
            self.records_scanned,
            self.frontier_initial,
            self.discovered(),
            if self.cap_reached { ", cap reached" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_display() {
        let stats = ScanStats {
            records_seen: 10,
            accepted: 4,
            filtered_out: 5,
            missing_id: 1,
            cap_reached: true,
            ..Default::default()
        };
        assert_eq!(
            stats.display_string(),
            "4 accepted of 10 records (5 filtered out, 1 without id, 0 malformed), cap reached"
        );
    }

    #[test]
    fn test_resolve_discovered() {
        let stats = ResolveStats {
            kind: "concepts".into(),
            matched: 3,
            records_scanned: 7,
            frontier_initial: 2,
            frontier_final: 5,
            ..Default::default()
        };
        assert_eq!(stats.discovered(), 3);
        assert_eq!(
            stats.display_string(),
            "3 matched of 7 records, 2 frontier keys (+3 discovered)"
        );
    }
}
