// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Scanner Adapter
//!
//! Applies every terminal rule at every input position, treating the regex
//! engine as an opaque scanner that reports match extents. Each hit becomes
//! a seed complete match of depth 1 with no children and no contexts.
//!
//! Patterns were compiled anchored at registration, so a rule matches at a
//! position exactly when it matches a prefix of the remaining input.
//! Zero-width hits are rejected: every match must cover at least one byte.

use crate::grammar::Grammar;
use crate::matches::{CompleteMatch, base_chain};

use smallvec::SmallVec;

/// Seed matches for `input`, every terminal rule at every char boundary.
/// Returns the seeds and the number of positions scanned.
pub(crate) fn seeds(grammar: &Grammar, input: &str) -> (Vec<CompleteMatch>, usize) {
    let mut out = Vec::new();
    let mut positions = 0;
    for pos in boundaries(input) {
        positions += 1;
        for (id, rule) in grammar.terminal_rules() {
            let Some(hit) = rule.pattern.find(&input[pos..]) else {
                continue;
            };
            debug_assert_eq!(hit.start(), 0, "terminal patterns are anchored");
            if hit.is_empty() {
                continue;
            }
            out.push(CompleteMatch {
                rule: id,
                ext: rule.ext,
                start: pos,
                end: pos + hit.end(),
                depth: 1,
                children: SmallVec::new(),
                left_ctx: None,
                right_ctx: None,
                chain: base_chain(rule.ext),
            });
        }
    }
    (out, positions)
}

/// Char boundaries of `input`, including the end position.
fn boundaries(input: &str) -> impl Iterator<Item = usize> + '_ {
    input
        .char_indices()
        .map(|(pos, _)| pos)
        .chain(std::iter::once(input.len()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grammar::RuleDef;

    #[test]
    fn test_seeds_at_every_position() {
        let g = Grammar::try_new(vec![RuleDef::terminal("a", "a+")]).unwrap();
        let (seeds, positions) = seeds(&g, "aab");
        assert_eq!(positions, 4);
        let spans: Vec<_> = seeds.iter().map(|s| (s.start, s.end)).collect();
        // greedy from each position, nothing at or after `b`
        assert_eq!(spans, vec![(0, 2), (1, 2)]);
    }

    #[test]
    fn test_zero_width_hits_are_rejected() {
        let g = Grammar::try_new(vec![RuleDef::terminal("a", "a*")]).unwrap();
        let (seeds, _) = seeds(&g, "ba");
        let spans: Vec<_> = seeds.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(spans, vec![(1, 2)]);
    }

    #[test]
    fn test_multibyte_boundaries() {
        let g = Grammar::try_new(vec![RuleDef::terminal("x", "é")]).unwrap();
        let (seeds, positions) = seeds(&g, "éé");
        assert_eq!(positions, 3);
        let spans: Vec<_> = seeds.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(spans, vec![(0, 2), (2, 4)]);
    }
}
