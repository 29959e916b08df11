// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Adjacency Compatibility
//!
//! The predicate deciding whether two complete matches may sit next to each
//! other: the left match's right-context demand against the right match, and
//! the right match's left-context demand against the left match.
//!
//! A demand that already carries a recorded witness was checked when its
//! match was built, against a complete match at exactly this boundary, and
//! is not re-checked against the concrete neighbor; the witness and the
//! neighbor are both parses of the same frontier and need not be the same
//! match. Only a negative demand discharged by boundary absence is
//! re-validated here, since a concrete neighbor contradicts the absence it
//! was built on.

use crate::chart::Chart;
use crate::grammar::{Ex, ExtId, Grammar};
use crate::matches::MatchId;

/// Whether `left` and `right` may be adjacent, per both sides' context
/// demands. Callers guarantee `left.end == right.start`.
pub(crate) fn compatible(grammar: &Grammar, chart: &Chart, left: MatchId, right: MatchId) -> bool {
    let l = chart.complete(left);
    let r = chart.complete(right);
    debug_assert_eq!(l.end, r.start, "adjacent matches share a frontier");
    discharged(grammar.rule(l.rule).right_expect(), l.right_ctx, r.ext)
        && discharged(grammar.rule(r.rule).left_expect(), r.left_ctx, l.ext)
}

/// Whether a context demand is discharged at a boundary where `neighbor` now
/// sits: trivially when absent, by its recorded witness, or by the neighbor
/// itself.
fn discharged(demand: Option<Ex>, witness: Option<MatchId>, neighbor: ExtId) -> bool {
    match demand {
        None => true,
        Some(ex) => witness.is_some() || ex.admits(neighbor),
    }
}
