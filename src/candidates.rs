//! Candidate split evaluator.
//!
//! For a subset of rows, target statistics are accumulated per unique value of
//! every candidate column; the column whose groups have the lowest weighted
//! variance is the best split.

use std::collections::BTreeMap;

use crate::columns::EncodedRow;
use crate::fitness::{mean_delta, RunningStats};

/// Target statistics of the rows sharing one value of a column.
#[derive(Debug, Clone, Default)]
pub struct GroupStats {
    pub stats: RunningStats,
    /// Row store indices of the rows in this group.
    pub rows: Vec<usize>,
}

impl GroupStats {
    fn push(&mut self, row_index: usize, target: f64) {
        self.stats.push(target);
        self.rows.push(row_index);
    }
}

/// Groups of one column, keyed by code. Iterates in ascending code order.
pub type ColumnGroups = BTreeMap<usize, GroupStats>;

/// The column chosen for a split and the weighted average variance of its
/// groups.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestSplit {
    pub column: usize,
    pub weighted_variance: f64,
}

/// Per candidate column, per code statistics for one split attempt.
#[derive(Debug)]
pub struct CandidateStats {
    /// Kept in the order the candidates were given; ties go to the first.
    columns: Vec<(usize, ColumnGroups)>,
}

impl CandidateStats {
    pub fn new(candidates: &[usize]) -> Self {
        CandidateStats {
            columns: candidates.iter().map(|&c| (c, ColumnGroups::new())).collect(),
        }
    }

    /// Accumulates every row of `subset`.
    pub fn from_rows(candidates: &[usize], rows: &[EncodedRow], subset: &[usize]) -> Self {
        let mut cs = CandidateStats::new(candidates);
        for &index in subset.iter() {
            cs.process_row(&rows[index], index);
        }
        cs
    }

    pub fn process_row(&mut self, row: &EncodedRow, row_index: usize) {
        let target = row[row.len() - 1];
        for (col, groups) in self.columns.iter_mut() {
            let code = row[*col] as usize;
            groups.entry(code).or_default().push(row_index, target);
        }
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[cfg(test)]
    fn groups(&self, column: usize) -> Option<&ColumnGroups> {
        self.columns.iter().find(|(c, _)| *c == column).map(|(_, g)| g)
    }

    /// Moves the groups of `column` out, consuming the rest.
    pub fn into_groups(self, column: usize) -> Option<ColumnGroups> {
        self.columns.into_iter().find(|(c, _)| *c == column).map(|(_, g)| g)
    }

    /// Picks the column with the lowest weighted variance among the columns
    /// whose groups hold, on average, more than `min_avg_children_items`
    /// rows.
    pub fn select_best_split(&self, min_avg_children_items: f64) -> Option<BestSplit> {
        let mut best: Option<BestSplit> = None;
        for (col, groups) in self.columns.iter() {
            let mut size = 0;
            let mut sum = 0.0;
            let mut counter = 0;
            let mut mean_size = 0.0;
            for group in groups.values() {
                size += group.stats.size;
                counter += 1;
                mean_size += mean_delta(group.stats.size as f64, mean_size, counter);
                sum += group.stats.sum_sq_dev;
            }
            if size == 0 {
                continue;
            }
            sum /= size as f64;
            let min_sum = best.map_or(std::f64::INFINITY, |b| b.weighted_variance);
            if sum < min_sum && mean_size > min_avg_children_items {
                best = Some(BestSplit {
                    column: *col,
                    weighted_variance: sum,
                });
            }
        }
        best
    }
}
