// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Parser Driver
//!
//! Seeds the chart by scanning terminals at every position, saturates the
//! agenda, and harvests the complete matches spanning the whole input.
//!
//! ## Saturation
//!
//! The agenda is a FIFO queue of newly inserted matches. Popping a complete
//! match spawns forward matches for every rule awaiting its external name
//! first (choosing left brothers per the rule's left expectation), offers it
//! to waiting forward matches as a child, and to saturated forward matches
//! as a right-context witness. Popping a forward match feeds it every
//! already-known child at its frontier, or, once saturated, settles it
//! against every known witness. Every pairing is attempted from whichever
//! side arrives second, so the loop never misses an interaction, and the
//! chart's deduplication makes the overlap harmless.
//!
//! Termination: spans are bounded by the input, rules are finite, and unit
//! renaming is bounded by the rename chain, so the set of possible matches
//! is finite and each is inserted at most once.
//!
//! ## Results
//!
//! [`Parser::parse`] returns a [`Forest`]: the saturated chart plus the
//! statistics of the run. An empty harvest is the normal negative result,
//! not an error. [`MatchRef`] handles navigate the match graph and render in
//! the display notation.
//!
//! ## Example
//!
//! ```rust
//! use weft_chart_engine::{Expect, Parser, RuleDef};
//!
//! let parser = Parser::try_new(vec![
//!     RuleDef::terminal("a", "a"),
//!     RuleDef::terminal("b", "b"),
//!     RuleDef::substitution("B", ["b"]).with_left(Expect::is("a")),
//!     RuleDef::substitution("S", ["a", "B"]),
//! ])
//! .unwrap();
//!
//! let forest = parser.parse("ab");
//! let spanning = forest.spanning_ext("S");
//! assert_eq!(spanning.len(), 1);
//! assert_eq!(spanning[0].to_string(), "((S → a B))<1> [0:2]");
//! ```

use smallvec::SmallVec;
use thiserror::Error;

use crate::chart::Chart;
use crate::compat::compatible;
use crate::grammar::{
    Ex, Expect, Grammar, GrammarError, GrammarWarning, Polarity, Rule, RuleDef, RuleId,
};
use crate::matches::{CompleteMatch, ForwardMatch, Match, MatchId};
use crate::ops;
use crate::scan;
use crate::trace::{ParseTrace, TraceSink};

use std::collections::VecDeque;
use std::fmt;
use std::io::Write;

/// Errors a bounded parse can report.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The saturation loop hit the caller's work budget.
    #[error("Parse exceeded its work budget of {budget} agenda steps.")]
    BudgetExhausted { budget: usize },
}

/// Counters collected over one parse.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseStats {
    /// Input positions offered to the scanner.
    pub positions_scanned: usize,
    /// Terminal matches seeded by the scanner.
    pub seeds: usize,
    /// Matches inserted into the chart, seeds included.
    pub inserted: usize,
    /// Duplicate candidates dropped by the chart.
    pub duplicates: usize,
    /// Matches popped off the agenda.
    pub agenda_steps: usize,
}

/// A parser compiled from a rule list.
///
/// The grammar is immutable after construction and may be shared across any
/// number of parses; each parse owns its chart.
pub struct Parser {
    grammar: Grammar,
}

impl Parser {
    /// Compile a rule list. See [`crate::grammar::GrammarError`] for the
    /// rejected shapes; consumed-but-unproduced names are recorded as
    /// warnings instead.
    pub fn try_new(rules: impl IntoIterator<Item = RuleDef>) -> Result<Self, GrammarError> {
        Ok(Self {
            grammar: Grammar::try_new(rules.into_iter().collect())?,
        })
    }

    /// Non-fatal findings from compilation.
    #[must_use]
    pub fn warnings(&self) -> &[GrammarWarning] {
        self.grammar.warnings()
    }

    /// Parse `input` to saturation and return the forest.
    #[must_use]
    pub fn parse(&self, input: &str) -> Forest<'_> {
        match self.run(input, None, None) {
            Ok(forest) => forest,
            Err(_) => unreachable!("unbounded parses terminate without error"),
        }
    }

    /// Like [`Parser::parse`], bounded to at most `budget` agenda steps.
    pub fn parse_bounded(&self, input: &str, budget: usize) -> Result<Forest<'_>, ParseError> {
        self.run(input, Some(budget), None)
    }

    /// Like [`Parser::parse`], reporting progress into `trace`.
    pub fn parse_traced<W: Write>(&self, input: &str, trace: &ParseTrace<W>) -> Forest<'_> {
        let forest = match self.run(input, None, Some(trace)) {
            Ok(forest) => forest,
            Err(_) => unreachable!("unbounded parses terminate without error"),
        };
        trace.summary(&forest.stats);
        forest
    }

    fn run(
        &self,
        input: &str,
        budget: Option<usize>,
        trace: Option<&dyn TraceSink>,
    ) -> Result<Forest<'_>, ParseError> {
        let grammar = &self.grammar;
        let mut chart = Chart::new(input.len());
        let mut agenda: VecDeque<MatchId> = VecDeque::new();
        let mut stats = ParseStats::default();

        let (seeds, positions) = scan::seeds(grammar, input);
        stats.positions_scanned = positions;
        stats.seeds = seeds.len();
        for seed in seeds {
            insert(grammar, &mut chart, &mut agenda, &mut stats, trace, Match::Complete(seed));
        }

        while let Some(id) = agenda.pop_front() {
            if let Some(limit) = budget {
                if stats.agenda_steps >= limit {
                    return Err(ParseError::BudgetExhausted { budget: limit });
                }
            }
            stats.agenda_steps += 1;
            for m in self.react(&chart, id, input.len()) {
                insert(grammar, &mut chart, &mut agenda, &mut stats, trace, m);
            }
        }

        Ok(Forest {
            grammar,
            chart,
            stats,
        })
    }

    /// Every new match the popped match enables against the current chart.
    fn react(&self, chart: &Chart, id: MatchId, input_len: usize) -> Vec<Match> {
        let grammar = &self.grammar;
        let mut news = Vec::new();
        match chart.get(id) {
            Match::Complete(x) => {
                // spawn rules awaiting x's name as their first child
                for &rule_id in grammar.rules_by_first_ext(x.ext) {
                    match grammar.subst(rule_id).left {
                        None => news.push(forward_at(rule_id, x.start, None)),
                        Some(ex) => {
                            let brothers: &[MatchId] = if ex.polarity == Polarity::Is {
                                chart.completes_ext_ending(ex.ext, x.start)
                            } else {
                                chart.completes_ending(x.start)
                            };
                            for &l in brothers {
                                if ex.admits(chart.complete(l).ext)
                                    && compatible(grammar, chart, l, id)
                                {
                                    news.push(forward_at(rule_id, x.start, Some(l)));
                                }
                            }
                            if ex.polarity == Polarity::Not && x.start == 0 {
                                news.push(forward_at(rule_id, 0, None));
                            }
                        }
                    }
                }
                // x as the left brother of matches already starting at x.end
                for &y in chart.completes_starting(x.end) {
                    for &rule_id in grammar.rules_by_first_ext(chart.complete(y).ext) {
                        if let Some(ex) = grammar.subst(rule_id).left {
                            if ex.admits(x.ext) && compatible(grammar, chart, id, y) {
                                news.push(forward_at(rule_id, x.end, Some(id)));
                            }
                        }
                    }
                }
                // x as the awaited child of forward matches at its start
                for &f in chart.forwards_needing(x.ext, x.start) {
                    if let Some(advanced) = ops::feed(grammar, chart, chart.forward(f), id) {
                        news.push(Match::Forward(advanced));
                    }
                }
                // x as the right-context witness of pending settlements
                for &f in chart.pending_at(x.start) {
                    if let Some(closed) = ops::settle(grammar, chart, chart.forward(f), Some(id)) {
                        news.push(Match::Complete(closed));
                    }
                }
            }
            Match::Forward(f) => {
                let rule = grammar.subst(f.rule);
                if f.dot < rule.act.len() {
                    for &q in chart.completes_ext_starting(rule.act[f.dot], f.end) {
                        if let Some(advanced) = ops::feed(grammar, chart, f, q) {
                            news.push(Match::Forward(advanced));
                        }
                    }
                } else {
                    match rule.right {
                        None => {
                            if let Some(closed) = ops::settle(grammar, chart, f, None) {
                                news.push(Match::Complete(closed));
                            }
                        }
                        Some(ex) => {
                            let witnesses: &[MatchId] = if ex.polarity == Polarity::Is {
                                chart.completes_ext_starting(ex.ext, f.end)
                            } else {
                                chart.completes_starting(f.end)
                            };
                            for &r in witnesses {
                                if let Some(closed) = ops::settle(grammar, chart, f, Some(r)) {
                                    news.push(Match::Complete(closed));
                                }
                            }
                            if ex.polarity == Polarity::Not && f.end == input_len {
                                if let Some(closed) = ops::settle(grammar, chart, f, None) {
                                    news.push(Match::Complete(closed));
                                }
                            }
                        }
                    }
                }
            }
        }
        news
    }
}

fn forward_at(rule: RuleId, start: usize, left_brother: Option<MatchId>) -> Match {
    Match::Forward(ForwardMatch {
        rule,
        start,
        end: start,
        dot: 0,
        left_brother,
        children: SmallVec::new(),
    })
}

fn insert(
    grammar: &Grammar,
    chart: &mut Chart,
    agenda: &mut VecDeque<MatchId>,
    stats: &mut ParseStats,
    trace: Option<&dyn TraceSink>,
    m: Match,
) {
    match chart.insert(grammar, m) {
        Some(id) => {
            stats.inserted += 1;
            agenda.push_back(id);
            if let Some(t) = trace {
                t.entity(&chart.display(grammar, id));
            }
        }
        None => stats.duplicates += 1,
    }
}

/// The saturated chart of one parse, plus its statistics.
///
/// Owns every match produced; [`MatchRef`] handles borrow from it.
#[derive(Debug)]
pub struct Forest<'g> {
    grammar: &'g Grammar,
    chart: Chart,
    stats: ParseStats,
}

impl Forest<'_> {
    /// Every complete match spanning the whole input, in insertion order
    /// (unspecified, but stable for a run).
    #[must_use]
    pub fn spanning(&self) -> Vec<MatchRef<'_>> {
        self.chart
            .spanning()
            .map(|id| self.match_ref(id))
            .collect()
    }

    /// The spanning matches whose external name is `ext`.
    #[must_use]
    pub fn spanning_ext(&self, ext: &str) -> Vec<MatchRef<'_>> {
        let Some(ext) = self.grammar.ext_id(ext) else {
            return Vec::new();
        };
        self.chart
            .spanning()
            .filter(|&id| self.chart.complete(id).ext == ext)
            .map(|id| self.match_ref(id))
            .collect()
    }

    #[must_use]
    pub const fn stats(&self) -> &ParseStats {
        &self.stats
    }

    const fn match_ref(&self, id: MatchId) -> MatchRef<'_> {
        MatchRef {
            grammar: self.grammar,
            chart: &self.chart,
            id,
        }
    }
}

/// A complete match in a [`Forest`]: a borrowing handle over the match
/// graph.
#[derive(Clone, Copy)]
pub struct MatchRef<'a> {
    grammar: &'a Grammar,
    chart: &'a Chart,
    id: MatchId,
}

impl<'a> MatchRef<'a> {
    fn complete(&self) -> &'a CompleteMatch {
        self.chart.complete(self.id)
    }

    const fn wrap(&self, id: MatchId) -> Self {
        Self {
            grammar: self.grammar,
            chart: self.chart,
            id,
        }
    }

    /// The external name of the matched rule.
    #[must_use]
    pub fn ext(&self) -> &'a str {
        self.grammar.ext_name(self.complete().ext)
    }

    /// Byte offset where the span begins.
    #[must_use]
    pub fn start(&self) -> usize {
        self.complete().start
    }

    /// Byte offset one past the span's end.
    #[must_use]
    pub fn end(&self) -> usize {
        self.complete().end
    }

    /// Length of the unit-rename chain ending in this match.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.complete().depth
    }

    /// The opaque name of the rule this match applies.
    #[must_use]
    pub fn rule_id(&self) -> RuleId {
        self.complete().rule
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.grammar.rule(self.complete().rule), Rule::Terminal(_))
    }

    /// The terminal pattern as registered; `None` for substitution matches.
    #[must_use]
    pub fn pattern(&self) -> Option<&'a str> {
        match self.grammar.rule(self.complete().rule) {
            Rule::Terminal(t) => Some(&t.source),
            Rule::Substitution(_) => None,
        }
    }

    /// The action tuple of the matched rule; empty for terminals.
    #[must_use]
    pub fn action(&self) -> Vec<&'a str> {
        match self.grammar.rule(self.complete().rule) {
            Rule::Terminal(_) => Vec::new(),
            Rule::Substitution(s) => {
                s.act.iter().map(|&ext| self.grammar.ext_name(ext)).collect()
            }
        }
    }

    /// The completed children, left to right; empty for terminals.
    #[must_use]
    pub fn children(&self) -> Vec<MatchRef<'a>> {
        self.complete()
            .children
            .iter()
            .map(|&child| self.wrap(child))
            .collect()
    }

    /// The match that witnessed the rule's left expectation, if any.
    #[must_use]
    pub fn left_ctx(&self) -> Option<MatchRef<'a>> {
        self.complete().left_ctx.map(|id| self.wrap(id))
    }

    /// The match that witnessed the rule's right expectation, if any.
    #[must_use]
    pub fn right_ctx(&self) -> Option<MatchRef<'a>> {
        self.complete().right_ctx.map(|id| self.wrap(id))
    }

    /// The matched rule's left expectation; terminals have none.
    #[must_use]
    pub fn left_expect(&self) -> Option<Expect> {
        self.grammar
            .rule(self.complete().rule)
            .left_expect()
            .map(|ex| self.rebuild_expect(ex))
    }

    /// The matched rule's right expectation; terminals have none.
    #[must_use]
    pub fn right_expect(&self) -> Option<Expect> {
        self.grammar
            .rule(self.complete().rule)
            .right_expect()
            .map(|ex| self.rebuild_expect(ex))
    }

    fn rebuild_expect(&self, ex: Ex) -> Expect {
        let name = self.grammar.ext_name(ex.ext);
        match ex.polarity {
            Polarity::Is => Expect::is(name),
            Polarity::Not => Expect::not(name),
        }
    }
}

impl fmt::Display for MatchRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.chart.display(self.grammar, self.id).fmt(f)
    }
}

impl fmt::Debug for MatchRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MatchRef({self})")
    }
}
