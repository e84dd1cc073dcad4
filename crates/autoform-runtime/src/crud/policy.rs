//! Placement of copied rows.

use crate::config::CopyPlacement;

/// Where copies of the selected rows are inserted.
pub trait CopyPolicy {
    /// Insertion position given the row count and the selected positions.
    fn insertion_point(&self, row_count: usize, selected: &[usize]) -> usize;
}

/// Append copies after the last row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyToEnd;

impl CopyPolicy for CopyToEnd {
    fn insertion_point(&self, row_count: usize, _selected: &[usize]) -> usize {
        row_count
    }
}

/// Insert copies before the first row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyToBeginning;

impl CopyPolicy for CopyToBeginning {
    fn insertion_point(&self, _row_count: usize, _selected: &[usize]) -> usize {
        0
    }
}

pub(crate) fn policy_for(placement: CopyPlacement) -> Box<dyn CopyPolicy> {
    match placement {
        CopyPlacement::End => Box::new(CopyToEnd),
        CopyPlacement::Beginning => Box::new(CopyToBeginning),
    }
}
