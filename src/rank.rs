//! Rank allocation for rank-partitioned collections.
//!
//! Several rows of one slot (feature + type) may coexist as long as their
//! ranks differ. A candidate whose value is already present in the slot
//! reuses that row; otherwise it receives a rank strictly above every rank
//! in the slot. Ranks of stored rows are never reused or compacted.

use crate::matcher::Member;

/// Outcome of rank allocation for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankDecision<'a, R> {
    /// A row of the slot already carries the candidate's value.
    Existing(&'a R),
    /// The candidate must be inserted at this rank.
    Fresh(i32),
}

/// Decide where `candidate` lands among the rows of its slot.
///
/// `slot` must hold every row of the candidate's slot known to the current
/// pass (stored rows and rows inserted earlier in the pass), in insertion
/// order. The first row with an equal value wins.
pub fn allocate_rank<'a, R, I>(candidate: &R, slot: I) -> RankDecision<'a, R>
where
    R: Member,
    I: IntoIterator<Item = &'a R>,
{
    let mut rank = candidate.rank();
    for row in slot {
        if row.same_value(candidate) {
            return RankDecision::Existing(row);
        }
        rank = rank.max(row.rank().saturating_add(1));
    }
    RankDecision::Fresh(rank)
}
