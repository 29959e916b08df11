// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Match Model
//!
//! The two kinds of chart entries and the keys that identify them.
//!
//! A [`CompleteMatch`] is a finished proof that an input span derives a rule;
//! a [`ForwardMatch`] is an in-progress derivation of a substitution rule,
//! with a dot separating completed children from awaited ones. Matches are
//! immutable once built: they live in the chart's arena and refer to other
//! matches (children, context witnesses, the left brother) by stable
//! [`MatchId`] indices, so the match graph is a DAG of small ids rather than
//! a web of shared pointers.
//!
//! Every complete match also carries its *rename chain*: the set of external
//! names reached by successive unit renames above the leafmost terminal or
//! branching descendant, as a bit set over the grammar's name table. The
//! chain is what bounds unit-rename cycles; see [`crate::ops`].

use bit_set::BitSet;
use smallvec::SmallVec;

use crate::grammar::{ExtId, RuleId};

/// Stable index of a match in the chart arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct MatchId(pub(crate) u32);

/// A proof that `[start, end)` of the input matches a rule.
///
/// `children` is empty for terminal matches. `left_ctx`/`right_ctx` are the
/// complete matches that witnessed the rule's context expectations, when it
/// had any; they abut the span but do not extend it. All references are
/// immutable after construction.
#[derive(Debug, Clone)]
pub(crate) struct CompleteMatch {
    pub(crate) rule: RuleId,
    /// Cached from the rule, read on every compatibility check.
    pub(crate) ext: ExtId,
    pub(crate) start: usize,
    pub(crate) end: usize,
    /// Length of the unit-rename chain ending here; 1 for terminals and
    /// branching matches.
    pub(crate) depth: u32,
    pub(crate) children: SmallVec<[MatchId; 4]>,
    pub(crate) left_ctx: Option<MatchId>,
    pub(crate) right_ctx: Option<MatchId>,
    /// External names in the rename chain, this match's included.
    pub(crate) chain: BitSet,
}

/// An in-progress derivation of a substitution rule.
///
/// `dot` indexes the next awaited name in the rule's action; `end` advances
/// with each fed child. A forward match whose dot has reached the end of the
/// action stays in the chart awaiting settlement against a right-context
/// witness.
#[derive(Debug, Clone)]
pub(crate) struct ForwardMatch {
    pub(crate) rule: RuleId,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) dot: usize,
    /// The complete match that satisfied the rule's left expectation, if any.
    pub(crate) left_brother: Option<MatchId>,
    pub(crate) children: SmallVec<[MatchId; 4]>,
}

#[derive(Debug, Clone)]
pub(crate) enum Match {
    Complete(CompleteMatch),
    Forward(ForwardMatch),
}

impl Match {
    /// The deduplication key: two matches with equal keys are the same
    /// chart entry. Context and child references participate, so matches
    /// that differ only in the choice of witness stay distinct.
    pub(crate) fn key(&self) -> MatchKey {
        match self {
            Self::Complete(c) => MatchKey::Complete {
                rule: c.rule,
                start: c.start,
                end: c.end,
                left: c.left_ctx,
                right: c.right_ctx,
                children: c.children.clone(),
                depth: c.depth,
            },
            Self::Forward(f) => MatchKey::Forward {
                rule: f.rule,
                start: f.start,
                end: f.end,
                dot: f.dot,
                left: f.left_brother,
                children: f.children.clone(),
            },
        }
    }
}

/// Hashable identity of a match, per the chart's deduplication contract.
///
/// The rename chain is omitted: it is a function of the rule and the child
/// key, so equal keys always carry equal chains.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum MatchKey {
    Complete {
        rule: RuleId,
        start: usize,
        end: usize,
        left: Option<MatchId>,
        right: Option<MatchId>,
        children: SmallVec<[MatchId; 4]>,
        depth: u32,
    },
    Forward {
        rule: RuleId,
        start: usize,
        end: usize,
        dot: usize,
        left: Option<MatchId>,
        children: SmallVec<[MatchId; 4]>,
    },
}

/// The rename chain of a terminal or branching match: its own name only.
pub(crate) fn base_chain(ext: ExtId) -> BitSet {
    let mut chain = BitSet::new();
    chain.insert(ext);
    chain
}
