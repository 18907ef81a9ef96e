//! Tracks the field numbers claimed so far by a schema under construction,
//! rejecting any descriptor whose `[field_number, field_number + repeat)`
//! range intersects one already claimed.

use crate::error::SchemaError;

/// A sorted, coalesced set of half-open `[start, end)` integer intervals.
#[derive(Debug, Default)]
pub(crate) struct IntervalSet {
    /// Sorted by `start`, pairwise disjoint and non-adjacent (adjacent
    /// ranges are merged so the set stays compact).
    intervals: Vec<(u32, u32)>,
}

impl IntervalSet {
    pub(crate) fn new() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }

    /// Claims `[start, start + len)`. Returns an error naming the offending
    /// field number (and `name`, if given) when it intersects an existing
    /// claim.
    pub(crate) fn insert(
        &mut self,
        start: u32,
        len: u32,
        name: Option<&str>,
    ) -> Result<(), SchemaError> {
        let end = start + len;

        // Binary search for the first interval whose start is >= `start`.
        let idx = self.intervals.partition_point(|&(s, _)| s < start);

        // Check overlap with the interval immediately before `idx` (the one
        // whose start is less than ours, which could still reach past `start`).
        if idx > 0 {
            let (_, prev_end) = self.intervals[idx - 1];
            if prev_end > start {
                return Err(SchemaError::OverlappingFieldNumber {
                    field_number: start,
                    name: name.map(str::to_owned),
                });
            }
        }

        // Check overlap with the interval at `idx` (the first one starting
        // at or after `start`).
        if idx < self.intervals.len() {
            let (next_start, _) = self.intervals[idx];
            if next_start < end {
                return Err(SchemaError::OverlappingFieldNumber {
                    field_number: next_start,
                    name: name.map(str::to_owned),
                });
            }
        }

        // No overlap: splice in, merging with adjacent intervals if they
        // touch so the set stays coalesced.
        let merge_left = idx > 0 && self.intervals[idx - 1].1 == start;
        let merge_right = idx < self.intervals.len() && self.intervals[idx].0 == end;

        match (merge_left, merge_right) {
            (true, true) => {
                self.intervals[idx - 1].1 = self.intervals[idx].1;
                self.intervals.remove(idx);
            }
            (true, false) => {
                self.intervals[idx - 1].1 = end;
            }
            (false, true) => {
                self.intervals[idx].0 = start;
            }
            (false, false) => {
                self.intervals.insert(idx, (start, end));
            }
        }

        Ok(())
    }
}
