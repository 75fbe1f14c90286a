//! Row ranges to delete from a destination sheet
//!
//! Deletions shift every row below them up, so ranges are applied strictly in
//! descending `start` order. Ranges must not overlap; an overlap is rejected
//! before anything is deleted.

/// Inclusive, 1-based row span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeleteRange {
    pub start: usize,
    pub end: usize,
}

impl DeleteRange {
    /// A range exists only when `start > 0` and `end >= start`
    pub fn new(start: i64, end: i64) -> Option<Self> {
        if start > 0 && end >= start {
            Some(Self {
                start: start as usize,
                end: end as usize,
            })
        } else {
            None
        }
    }

    /// Number of rows in the span
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn overlaps(&self, other: &DeleteRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

impl std::fmt::Display for DeleteRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A delete range tagged with the region it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRange {
    pub region: String,
    pub range: DeleteRange,
}

/// Two regions whose rows overlap in the same sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapError {
    pub first: RegionRange,
    pub second: RegionRange,
}

impl std::fmt::Display for OverlapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "reference rows of '{}' ({}) overlap those of '{}' ({})",
            self.first.region, self.first.range, self.second.region, self.second.range
        )
    }
}

impl std::error::Error for OverlapError {}

/// Order ranges for application (descending `start`) and reject overlaps
pub fn order_deletions(mut ranges: Vec<RegionRange>) -> Result<Vec<RegionRange>, OverlapError> {
    ranges.sort_by(|a, b| b.range.start.cmp(&a.range.start));

    // Sorted by start descending: any overlap also shows up between neighbours
    for pair in ranges.windows(2) {
        if pair[0].range.overlaps(&pair[1].range) {
            return Err(OverlapError {
                first: pair[1].clone(),
                second: pair[0].clone(),
            });
        }
    }

    Ok(ranges)
}

/// Total rows removed by a set of non-overlapping ranges
pub fn rows_removed(ranges: &[RegionRange]) -> usize {
    ranges.iter().map(|r| r.range.len()).sum()
}
