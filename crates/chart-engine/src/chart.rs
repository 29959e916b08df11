// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Chart and Indexes
//!
//! The chart is the per-parse set of matches: an arena of immutable entries,
//! a deduplication table over match keys, and the secondary indexes the
//! saturation loop drives on.
//!
//! ## Indexes
//!
//! - complete matches by start position, by end position, and by
//!   `(external name, position)` for both
//! - forward matches by `(next awaited name, end position)`
//! - saturated forward matches awaiting a right-context witness, by end
//!   position
//!
//! Positions are dense (bounded by the input length), so by-position buckets
//! are plain vectors; the keyed indexes and the dedup table hash small id
//! tuples in rapidhash maps.
//!
//! Insertion is idempotent: a match whose key is already present is dropped
//! silently, which is what makes the saturation loop's re-derivations
//! harmless and the final chart a function of (grammar, input) alone.

use weft_utils::{RapidMap, get_map};

use crate::grammar::{ExtId, Grammar, Rule};
use crate::matches::{CompleteMatch, ForwardMatch, Match, MatchId, MatchKey};

use std::fmt;

#[derive(Debug)]
pub(crate) struct Chart {
    arena: Vec<Match>,
    dedup: RapidMap<MatchKey, MatchId>,
    input_len: usize,
    complete_by_start: Vec<Vec<MatchId>>,
    complete_by_end: Vec<Vec<MatchId>>,
    complete_by_ext_start: RapidMap<(ExtId, usize), Vec<MatchId>>,
    complete_by_ext_end: RapidMap<(ExtId, usize), Vec<MatchId>>,
    forward_by_need: RapidMap<(ExtId, usize), Vec<MatchId>>,
    pending_settle: Vec<Vec<MatchId>>,
}

const EMPTY: &[MatchId] = &[];

impl Chart {
    pub(crate) fn new(input_len: usize) -> Self {
        Self {
            arena: Vec::new(),
            dedup: get_map(),
            input_len,
            complete_by_start: vec![Vec::new(); input_len + 1],
            complete_by_end: vec![Vec::new(); input_len + 1],
            complete_by_ext_start: get_map(),
            complete_by_ext_end: get_map(),
            forward_by_need: get_map(),
            pending_settle: vec![Vec::new(); input_len + 1],
        }
    }

    /// Insert a match, returning its id, or `None` if an identical match is
    /// already present.
    pub(crate) fn insert(&mut self, grammar: &Grammar, m: Match) -> Option<MatchId> {
        let key = m.key();
        if self.dedup.contains_key(&key) {
            return None;
        }
        let id = MatchId(self.arena.len() as u32);
        match &m {
            Match::Complete(c) => {
                self.check_complete(grammar, c);
                self.complete_by_start[c.start].push(id);
                self.complete_by_end[c.end].push(id);
                self.complete_by_ext_start
                    .entry((c.ext, c.start))
                    .or_default()
                    .push(id);
                self.complete_by_ext_end
                    .entry((c.ext, c.end))
                    .or_default()
                    .push(id);
            }
            Match::Forward(f) => {
                let rule = grammar.subst(f.rule);
                debug_assert!(f.dot <= rule.act.len(), "forward dot within the action");
                debug_assert!(f.children.len() == f.dot, "children fill the action up to the dot");
                if f.dot < rule.act.len() {
                    self.forward_by_need
                        .entry((rule.act[f.dot], f.end))
                        .or_default()
                        .push(id);
                } else if rule.right.is_some() {
                    self.pending_settle[f.end].push(id);
                }
            }
        }
        self.arena.push(m);
        self.dedup.insert(key, id);
        Some(id)
    }

    fn check_complete(&self, grammar: &Grammar, c: &CompleteMatch) {
        debug_assert!(c.start < c.end, "complete match spans at least one byte");
        debug_assert!(c.end <= self.input_len, "complete match within the input");
        if let Rule::Substitution(rule) = grammar.rule(c.rule) {
            debug_assert!(
                rule.left.is_none_or(|ex| match c.left_ctx {
                    Some(l) => ex.admits(self.complete(l).ext) && self.complete(l).end == c.start,
                    None => ex.polarity == crate::grammar::Polarity::Not && c.start == 0,
                }),
                "left expectation witnessed",
            );
            debug_assert!(
                rule.right.is_none_or(|ex| match c.right_ctx {
                    Some(r) =>
                        ex.admits(self.complete(r).ext) && self.complete(r).start == c.end,
                    None =>
                        ex.polarity == crate::grammar::Polarity::Not && c.end == self.input_len,
                }),
                "right expectation witnessed",
            );
        }
    }

    pub(crate) fn get(&self, id: MatchId) -> &Match {
        &self.arena[id.0 as usize]
    }

    /// The complete match behind `id`. Only called on ids the engine
    /// recorded in a complete-match index.
    pub(crate) fn complete(&self, id: MatchId) -> &CompleteMatch {
        match self.get(id) {
            Match::Complete(c) => c,
            Match::Forward(_) => unreachable!("id of a complete match"),
        }
    }

    pub(crate) fn forward(&self, id: MatchId) -> &ForwardMatch {
        match self.get(id) {
            Match::Forward(f) => f,
            Match::Complete(_) => unreachable!("id of a forward match"),
        }
    }

    pub(crate) fn completes_starting(&self, pos: usize) -> &[MatchId] {
        &self.complete_by_start[pos]
    }

    pub(crate) fn completes_ending(&self, pos: usize) -> &[MatchId] {
        &self.complete_by_end[pos]
    }

    pub(crate) fn completes_ext_starting(&self, ext: ExtId, pos: usize) -> &[MatchId] {
        self.complete_by_ext_start
            .get(&(ext, pos))
            .map_or(EMPTY, Vec::as_slice)
    }

    pub(crate) fn completes_ext_ending(&self, ext: ExtId, pos: usize) -> &[MatchId] {
        self.complete_by_ext_end
            .get(&(ext, pos))
            .map_or(EMPTY, Vec::as_slice)
    }

    /// Forward matches whose next awaited name is `ext` and whose frontier
    /// sits at `pos`.
    pub(crate) fn forwards_needing(&self, ext: ExtId, pos: usize) -> &[MatchId] {
        self.forward_by_need
            .get(&(ext, pos))
            .map_or(EMPTY, Vec::as_slice)
    }

    /// Saturated forward matches at `pos` still awaiting a right-context
    /// witness.
    pub(crate) fn pending_at(&self, pos: usize) -> &[MatchId] {
        &self.pending_settle[pos]
    }

    /// Complete matches covering the whole input.
    pub(crate) fn spanning(&self) -> impl Iterator<Item = MatchId> + '_ {
        self.completes_starting(0)
            .iter()
            .copied()
            .filter(|&id| self.complete(id).end == self.input_len)
    }

    pub(crate) fn display<'a>(&'a self, grammar: &'a Grammar, id: MatchId) -> DisplayMatch<'a> {
        DisplayMatch {
            grammar,
            chart: self,
            id,
        }
    }
}

/// Renders a match in the display contract:
///
/// - terminal: `((a → /a/))<1> [0:1]`
/// - substitution: `*A<1> ((S → a B C))<1> *C<1> [0:3]` with the context
///   witnesses, when present, as `*EXT<depth>`
/// - forward: `*A<1> (S → a • B C) &C [0:2]` with the dot splitting done
///   from awaited children and the right expectation trailing
pub(crate) struct DisplayMatch<'a> {
    grammar: &'a Grammar,
    chart: &'a Chart,
    id: MatchId,
}

impl DisplayMatch<'_> {
    fn write_ctx(&self, f: &mut fmt::Formatter<'_>, id: MatchId) -> fmt::Result {
        let ctx = self.chart.complete(id);
        write!(f, "*{}<{}>", self.grammar.ext_name(ctx.ext), ctx.depth)
    }
}

impl fmt::Display for DisplayMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grammar = self.grammar;
        match self.chart.get(self.id) {
            Match::Complete(c) => {
                if let Some(l) = c.left_ctx {
                    self.write_ctx(f, l)?;
                    write!(f, " ")?;
                }
                match grammar.rule(c.rule) {
                    Rule::Terminal(t) => write!(
                        f,
                        "(({} → /{}/))<{}>",
                        grammar.ext_name(t.ext),
                        t.source,
                        c.depth
                    )?,
                    Rule::Substitution(s) => {
                        write!(f, "(({} →", grammar.ext_name(s.ext))?;
                        for &ext in &s.act {
                            write!(f, " {}", grammar.ext_name(ext))?;
                        }
                        write!(f, "))<{}>", c.depth)?;
                    }
                }
                if let Some(r) = c.right_ctx {
                    write!(f, " ")?;
                    self.write_ctx(f, r)?;
                }
                write!(f, " [{}:{}]", c.start, c.end)
            }
            Match::Forward(fwd) => {
                if let Some(l) = fwd.left_brother {
                    self.write_ctx(f, l)?;
                    write!(f, " ")?;
                }
                let rule = grammar.subst(fwd.rule);
                write!(f, "({} →", grammar.ext_name(rule.ext))?;
                for (i, &ext) in rule.act.iter().enumerate() {
                    if i == fwd.dot {
                        write!(f, " •")?;
                    }
                    write!(f, " {}", grammar.ext_name(ext))?;
                }
                if fwd.dot == rule.act.len() {
                    write!(f, " •")?;
                }
                write!(f, ")")?;
                if let Some(ex) = rule.right {
                    write!(f, " {}{}", ex.polarity.sigil(), grammar.ext_name(ex.ext))?;
                }
                write!(f, " [{}:{}]", fwd.start, fwd.end)
            }
        }
    }
}
