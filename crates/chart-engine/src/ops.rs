// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Interaction Operations
//!
//! The two steps that build every non-seed match: [`feed`] advances a
//! forward match over a newly complete child; [`settle`] closes a saturated
//! forward match against a right-context witness (or against boundary
//! absence for a negative expectation).
//!
//! Both return `Option`: incompatibility is not an error, it is the normal
//! way the saturation loop discards a candidate pairing. Neither mutates the
//! chart; they produce values for the driver to insert, so deduplication
//! stays in one place.
//!
//! `settle` is also where unit-rename bounding lives. A substitution with a
//! single child is a rename: its depth is the child's plus one, and its
//! rename chain is the child's plus its own external name. A rename whose
//! external name already sits in the child's chain is refused, which
//! terminates every rename cycle at its first reappearance. Branching
//! substitutions reset the chain.

use crate::chart::Chart;
use crate::compat::compatible;
use crate::grammar::{Grammar, Polarity};
use crate::matches::{CompleteMatch, ForwardMatch, MatchId, base_chain};

/// Advance `forward` over the complete match `fed`, producing the next
/// forward match, or `None` when the pairing is rejected.
///
/// Requires the fed match to start at the forward match's frontier and carry
/// the awaited external name; when there is a previous child (or a left
/// brother at dot 0) the adjacent pair must be compatible.
pub(crate) fn feed(
    grammar: &Grammar,
    chart: &Chart,
    forward: &ForwardMatch,
    fed: MatchId,
) -> Option<ForwardMatch> {
    let rule = grammar.subst(forward.rule);
    debug_assert!(forward.dot < rule.act.len(), "fed forward match awaits a child");
    let q = chart.complete(fed);
    if q.start != forward.end || q.ext != rule.act[forward.dot] {
        return None;
    }
    let neighbor = forward.children.last().copied().or(forward.left_brother);
    if let Some(p) = neighbor {
        if !compatible(grammar, chart, p, fed) {
            return None;
        }
    }
    let mut children = forward.children.clone();
    children.push(fed);
    Some(ForwardMatch {
        rule: forward.rule,
        start: forward.start,
        end: q.end,
        dot: forward.dot + 1,
        left_brother: forward.left_brother,
        children,
    })
}

/// Close a saturated forward match into a complete match.
///
/// `witness` is the candidate right-context match; pass `None` at the input
/// boundary, where absence satisfies a negative expectation. When the rule
/// has no right expectation the witness is ignored and the produced match
/// records no right context. Returns `None` when the witness fails the
/// expectation, the last child refuses the adjacency, or the closure would
/// revisit a name in the unit-rename chain.
pub(crate) fn settle(
    grammar: &Grammar,
    chart: &Chart,
    forward: &ForwardMatch,
    witness: Option<MatchId>,
) -> Option<CompleteMatch> {
    let rule = grammar.subst(forward.rule);
    debug_assert_eq!(forward.dot, rule.act.len(), "settled forward match is saturated");
    let right_ctx = match (rule.right, witness) {
        (None, _) => None,
        (Some(ex), Some(r)) => {
            let witnessed = chart.complete(r);
            if witnessed.start != forward.end || !ex.admits(witnessed.ext) {
                return None;
            }
            let last = *forward.children.last()?;
            if !compatible(grammar, chart, last, r) {
                return None;
            }
            Some(r)
        }
        // absence at the boundary satisfies only a negative expectation
        (Some(ex), None) => match ex.polarity {
            Polarity::Not => None,
            Polarity::Is => return None,
        },
    };

    let (depth, chain) = if let [only] = forward.children.as_slice() {
        let child = chart.complete(*only);
        if child.chain.contains(rule.ext) {
            return None;
        }
        let mut chain = child.chain.clone();
        chain.insert(rule.ext);
        (child.depth + 1, chain)
    } else {
        (1, base_chain(rule.ext))
    };

    Some(CompleteMatch {
        rule: forward.rule,
        ext: rule.ext,
        start: forward.start,
        end: forward.end,
        depth,
        children: forward.children.clone(),
        left_ctx: forward.left_brother,
        right_ctx,
        chain,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grammar::{Expect, RuleDef, RuleId};
    use crate::matches::Match;
    use smallvec::SmallVec;

    fn grammar() -> Grammar {
        Grammar::try_new(vec![
            RuleDef::terminal("a", "a"),
            RuleDef::terminal("b", "b"),
            RuleDef::substitution("S", ["a", "b"]),
            RuleDef::substitution("W", ["a"]).with_right(Expect::not("a")),
            RuleDef::substitution("R", ["b"]).with_left(Expect::is("a")),
        ])
        .unwrap()
    }

    fn terminal(grammar: &Grammar, rule: u32, ext: &str, start: usize) -> Match {
        let ext = grammar.ext_id(ext).unwrap();
        Match::Complete(CompleteMatch {
            rule: RuleId(rule),
            ext,
            start,
            end: start + 1,
            depth: 1,
            children: SmallVec::new(),
            left_ctx: None,
            right_ctx: None,
            chain: base_chain(ext),
        })
    }

    fn forward0(rule: u32, start: usize) -> ForwardMatch {
        ForwardMatch {
            rule: RuleId(rule),
            start,
            end: start,
            dot: 0,
            left_brother: None,
            children: SmallVec::new(),
        }
    }

    #[test]
    fn test_feed_advances_on_awaited_ext() {
        let g = grammar();
        let mut chart = Chart::new(2);
        let a = chart.insert(&g, terminal(&g, 0, "a", 0)).unwrap();
        let fed = feed(&g, &chart, &forward0(2, 0), a).unwrap();
        assert_eq!(fed.dot, 1);
        assert_eq!(fed.end, 1);
        assert_eq!(fed.children.as_slice(), &[a]);
    }

    #[test]
    fn test_feed_rejects_wrong_ext_or_position() {
        let g = grammar();
        let mut chart = Chart::new(2);
        let b = chart.insert(&g, terminal(&g, 1, "b", 0)).unwrap();
        let a1 = chart.insert(&g, terminal(&g, 0, "a", 1)).unwrap();
        // wrong external name for the first slot of S
        assert!(feed(&g, &chart, &forward0(2, 0), b).is_none());
        // right name, wrong frontier
        assert!(feed(&g, &chart, &forward0(2, 0), a1).is_none());
    }

    #[test]
    fn test_settle_without_expectation_ignores_witness() {
        let g = grammar();
        let mut chart = Chart::new(2);
        let a = chart.insert(&g, terminal(&g, 0, "a", 0)).unwrap();
        let b = chart.insert(&g, terminal(&g, 1, "b", 1)).unwrap();
        let f = feed(&g, &chart, &forward0(2, 0), a).unwrap();
        let f = feed(&g, &chart, &f, b).unwrap();
        let closed = settle(&g, &chart, &f, None).unwrap();
        assert_eq!((closed.start, closed.end), (0, 2));
        assert_eq!(closed.depth, 1);
        assert!(closed.right_ctx.is_none());
    }

    #[test]
    fn test_settle_negative_right_expectation() {
        let g = grammar();
        let mut chart = Chart::new(2);
        let a0 = chart.insert(&g, terminal(&g, 0, "a", 0)).unwrap();
        let a1 = chart.insert(&g, terminal(&g, 0, "a", 1)).unwrap();
        let f = feed(&g, &chart, &forward0(3, 0), a0).unwrap();
        // the only witness at the frontier is an `a`, which `!a` refuses
        assert!(settle(&g, &chart, &f, Some(a1)).is_none());
        // absence at a non-boundary is the caller's responsibility; at the
        // boundary it satisfies the negative expectation
        assert!(settle(&g, &chart, &f, None).is_some());
    }

    #[test]
    fn test_settle_records_positive_witness() {
        let g = grammar();
        let mut chart = Chart::new(2);
        let a = chart.insert(&g, terminal(&g, 0, "a", 0)).unwrap();
        let b = chart.insert(&g, terminal(&g, 1, "b", 1)).unwrap();
        let f = ForwardMatch {
            left_brother: Some(a),
            ..forward0(4, 1)
        };
        let f = feed(&g, &chart, &f, b).unwrap();
        let closed = settle(&g, &chart, &f, None).unwrap();
        assert_eq!(closed.left_ctx, Some(a));
        assert_eq!((closed.start, closed.end), (1, 2));
    }

    #[test]
    fn test_rename_cycle_is_refused() {
        let g = Grammar::try_new(vec![
            RuleDef::terminal("A", "a"),
            RuleDef::substitution("B", ["A"]),
            RuleDef::substitution("A", ["B"]),
        ])
        .unwrap();
        let mut chart = Chart::new(1);
        let a = chart.insert(&g, terminal(&g, 0, "A", 0)).unwrap();

        let f = feed(&g, &chart, &forward0(1, 0), a).unwrap();
        let b = settle(&g, &chart, &f, None).unwrap();
        assert_eq!(b.depth, 2);
        let b = chart.insert(&g, Match::Complete(b)).unwrap();

        // A → B would revisit `A`, already in the chain of the terminal
        let f = feed(&g, &chart, &forward0(2, 0), b).unwrap();
        assert!(settle(&g, &chart, &f, None).is_none());
    }
}
