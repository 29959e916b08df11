// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Grammar Model
//!
//! Rule definitions and the compiled grammar the engine consumes.
//!
//! ## Key Types
//!
//! - [`RuleDef`] - A rule as the caller registers it: a terminal (external
//!   name + regex pattern) or a substitution (external name + ordered action
//!   tuple + optional left/right context expectations)
//! - [`Expect`] - A polarity-tagged requirement on a neighbor's external name
//! - [`Grammar`] - The compiled, immutable rule set with the indexes the
//!   saturation loop needs
//!
//! ## External names and rule names
//!
//! An *external name* labels a rule's result (e.g. `"S"`, `"B"`); several
//! rules may share one. A *rule name* ([`RuleId`]) is assigned at
//! registration, is unique per rule, and is the rule's identity for
//! deduplication and display. Compilation interns every external name into a
//! dense id space so that rename chains can be tracked as bit sets.
//!
//! ## Example
//!
//! ```rust
//! use weft_chart_engine::{Expect, RuleDef};
//!
//! let rules = vec![
//!     RuleDef::terminal("a", "a"),
//!     RuleDef::terminal("b", "b"),
//!     RuleDef::substitution("B", ["b"]).with_left(Expect::is("a")),
//!     RuleDef::substitution("S", ["a", "B"]),
//! ];
//! let parser = weft_chart_engine::Parser::try_new(rules).unwrap();
//! assert!(parser.warnings().is_empty());
//! ```

use regex::Regex;
use smallvec::SmallVec;
use thiserror::Error;
use weft_utils::{RapidMap, RapidSet, get_map, get_set};

use std::fmt;

/// Interned id of an external name, an index into the grammar's name table.
pub(crate) type ExtId = usize;

/// Opaque rule name assigned at registration.
///
/// Unique per rule within one parser; the ordering is the registration order,
/// which is arbitrary but stable for a parser instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub(crate) u32);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Polarity of a context expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// `&A`: the neighbor's external name must equal `A`.
    Is,
    /// `!A`: the neighbor's external name must differ from `A`.
    Not,
}

impl Polarity {
    /// The sigil used in renderings: `&` for positive, `!` for negative.
    #[must_use]
    pub const fn sigil(self) -> char {
        match self {
            Self::Is => '&',
            Self::Not => '!',
        }
    }
}

/// A context expectation: a polarity plus the external name it constrains.
///
/// An absent expectation is trivially satisfied; that case is modeled as
/// `Option<Expect>` on [`RuleDef::substitution`] rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expect {
    polarity: Polarity,
    ext: String,
}

impl Expect {
    /// A positive expectation `&ext`: satisfied by a neighbor named `ext`.
    pub fn is(ext: impl Into<String>) -> Self {
        Self {
            polarity: Polarity::Is,
            ext: ext.into(),
        }
    }

    /// A negative expectation `!ext`: satisfied by any neighbor not named
    /// `ext`, or by the absence of a neighbor at an input boundary.
    pub fn not(ext: impl Into<String>) -> Self {
        Self {
            polarity: Polarity::Not,
            ext: ext.into(),
        }
    }

    #[must_use]
    pub const fn polarity(&self) -> Polarity {
        self.polarity
    }

    #[must_use]
    pub fn ext(&self) -> &str {
        &self.ext
    }
}

impl fmt::Display for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.polarity.sigil(), self.ext)
    }
}

/// A rule as registered by the caller, before compilation.
///
/// Terminal rules carry a regex pattern and no expectations. Substitution
/// rules carry an ordered action tuple of external names plus optional left
/// and right context expectations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleDef {
    /// External name + regular expression pattern.
    Terminal { ext: String, pattern: String },
    /// External name + expected child names + optional context expectations.
    Substitution {
        ext: String,
        action: Vec<String>,
        left: Option<Expect>,
        right: Option<Expect>,
    },
}

impl RuleDef {
    /// A terminal rule: `ext` matches `pattern` at a position.
    pub fn terminal(ext: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Terminal {
            ext: ext.into(),
            pattern: pattern.into(),
        }
    }

    /// A substitution rule with the given action tuple and no expectations.
    pub fn substitution<I, S>(ext: impl Into<String>, action: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Substitution {
            ext: ext.into(),
            action: action.into_iter().map(Into::into).collect(),
            left: None,
            right: None,
        }
    }

    /// Attach a left context expectation. No effect on terminal rules.
    #[must_use]
    pub fn with_left(self, expect: Expect) -> Self {
        match self {
            Self::Substitution {
                ext,
                action,
                right,
                ..
            } => Self::Substitution {
                ext,
                action,
                left: Some(expect),
                right,
            },
            terminal @ Self::Terminal { .. } => terminal,
        }
    }

    /// Attach a right context expectation. No effect on terminal rules.
    #[must_use]
    pub fn with_right(self, expect: Expect) -> Self {
        match self {
            Self::Substitution {
                ext, action, left, ..
            } => Self::Substitution {
                ext,
                action,
                left,
                right: Some(expect),
            },
            terminal @ Self::Terminal { .. } => terminal,
        }
    }

    fn ext(&self) -> &str {
        match self {
            Self::Terminal { ext, .. } | Self::Substitution { ext, .. } => ext,
        }
    }
}

/// Errors that can occur when compiling a rule set.
#[derive(Debug, Error)]
pub enum GrammarError {
    /// A substitution rule was registered with an empty action tuple.
    #[error("Substitution rule for `{0}` has an empty action.")]
    EmptyAction(String),

    /// The same rule definition was registered twice.
    #[error("Rule for `{0}` is registered twice with an identical definition.")]
    DuplicateRule(String),

    /// A terminal pattern failed to compile.
    ///
    /// Common causes include unbalanced parentheses, invalid escape
    /// sequences, or unsupported regex features.
    #[error("Parsing terminal pattern `/{pattern}/` fails.")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Non-fatal findings recorded while compiling a rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarWarning {
    /// `ext` is consumed by an action or expectation but produced by no
    /// rule; the rules that await it never fire.
    UnproducedExt { ext: String },
}

impl fmt::Display for GrammarWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnproducedExt { ext } => {
                write!(f, "external name `{ext}` is consumed but never produced")
            }
        }
    }
}

/// A compiled context expectation over interned names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ex {
    pub(crate) polarity: Polarity,
    pub(crate) ext: ExtId,
}

impl Ex {
    /// Whether a neighbor with the given external name satisfies this
    /// expectation.
    pub(crate) const fn admits(self, ext: ExtId) -> bool {
        match self.polarity {
            Polarity::Is => ext == self.ext,
            Polarity::Not => ext != self.ext,
        }
    }
}

/// A compiled terminal rule. The pattern is compiled once, anchored so it
/// can only match at the start of the slice it is applied to.
#[derive(Debug)]
pub(crate) struct TerminalRule {
    pub(crate) ext: ExtId,
    pub(crate) pattern: Regex,
    /// The pattern as registered, for display.
    pub(crate) source: String,
}

/// A compiled substitution rule.
#[derive(Debug)]
pub(crate) struct SubstRule {
    pub(crate) ext: ExtId,
    pub(crate) act: SmallVec<[ExtId; 4]>,
    pub(crate) left: Option<Ex>,
    pub(crate) right: Option<Ex>,
}

#[derive(Debug)]
pub(crate) enum Rule {
    Terminal(TerminalRule),
    Substitution(SubstRule),
}

impl Rule {
    pub(crate) fn ext(&self) -> ExtId {
        match self {
            Self::Terminal(t) => t.ext,
            Self::Substitution(s) => s.ext,
        }
    }

    /// The rule's left context expectation; terminals have none.
    pub(crate) fn left_expect(&self) -> Option<Ex> {
        match self {
            Self::Terminal(_) => None,
            Self::Substitution(s) => s.left,
        }
    }

    /// The rule's right context expectation; terminals have none.
    pub(crate) fn right_expect(&self) -> Option<Ex> {
        match self {
            Self::Terminal(_) => None,
            Self::Substitution(s) => s.right,
        }
    }
}

/// The compiled, immutable rule set.
///
/// Registration is closed before parsing: a `Grammar` is built once from a
/// list of [`RuleDef`]s and shared by every parse. It owns the external-name
/// table and the two indexes the engine drives on: `by_first_ext` (all
/// substitution rules whose first awaited name is a given `ext`, consulted
/// when a complete match with that name appears) and `terminals` (scanned at
/// every input position).
#[derive(Debug)]
pub struct Grammar {
    exts: Vec<String>,
    rules: Vec<Rule>,
    by_first_ext: Vec<Vec<RuleId>>,
    terminals: Vec<RuleId>,
    warnings: Vec<GrammarWarning>,
}

impl Grammar {
    /// Compile a rule set. Fails on empty actions, duplicate registrations,
    /// and invalid terminal patterns; records warnings for external names
    /// that are consumed but never produced.
    pub(crate) fn try_new(defs: Vec<RuleDef>) -> Result<Self, GrammarError> {
        let mut seen: RapidSet<&RuleDef> = get_set();
        for def in &defs {
            if !seen.insert(def) {
                return Err(GrammarError::DuplicateRule(def.ext().to_owned()));
            }
        }

        let mut exts: Vec<String> = Vec::new();
        let mut ids: RapidMap<String, ExtId> = get_map();
        let mut intern = |name: &str, exts: &mut Vec<String>| -> ExtId {
            if let Some(&id) = ids.get(name) {
                return id;
            }
            let id = exts.len();
            exts.push(name.to_owned());
            ids.insert(name.to_owned(), id);
            id
        };

        let mut rules = Vec::with_capacity(defs.len());
        let mut produced: RapidSet<ExtId> = get_set();
        let mut consumed: RapidSet<ExtId> = get_set();
        for def in &defs {
            let rule = match def {
                RuleDef::Terminal { ext, pattern } => {
                    let compiled = Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
                        GrammarError::Pattern {
                            pattern: pattern.clone(),
                            source,
                        }
                    })?;
                    Rule::Terminal(TerminalRule {
                        ext: intern(ext, &mut exts),
                        pattern: compiled,
                        source: pattern.clone(),
                    })
                }
                RuleDef::Substitution {
                    ext,
                    action,
                    left,
                    right,
                } => {
                    if action.is_empty() {
                        return Err(GrammarError::EmptyAction(ext.clone()));
                    }
                    let act: SmallVec<[ExtId; 4]> = action
                        .iter()
                        .map(|name| intern(name, &mut exts))
                        .collect();
                    consumed.extend(act.iter().copied());
                    let mut compile_ex = |expect: &Option<Expect>| {
                        expect.as_ref().map(|e| {
                            let id = intern(&e.ext, &mut exts);
                            consumed.insert(id);
                            Ex {
                                polarity: e.polarity,
                                ext: id,
                            }
                        })
                    };
                    let left = compile_ex(left);
                    let right = compile_ex(right);
                    Rule::Substitution(SubstRule {
                        ext: intern(ext, &mut exts),
                        act,
                        left,
                        right,
                    })
                }
            };
            produced.insert(rule.ext());
            rules.push(rule);
        }

        let mut by_first_ext = vec![Vec::new(); exts.len()];
        let mut terminals = Vec::new();
        for (index, rule) in rules.iter().enumerate() {
            let id = RuleId(index as u32);
            match rule {
                Rule::Terminal(_) => terminals.push(id),
                Rule::Substitution(s) => by_first_ext[s.act[0]].push(id),
            }
        }

        let mut warnings: Vec<GrammarWarning> = Vec::new();
        for id in 0..exts.len() {
            if consumed.contains(&id) && !produced.contains(&id) {
                warnings.push(GrammarWarning::UnproducedExt {
                    ext: exts[id].clone(),
                });
            }
        }

        Ok(Self {
            exts,
            rules,
            by_first_ext,
            terminals,
            warnings,
        })
    }

    pub(crate) fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0 as usize]
    }

    /// The substitution rule behind `id`. Only called on ids the engine
    /// created for substitution rules.
    pub(crate) fn subst(&self, id: RuleId) -> &SubstRule {
        match self.rule(id) {
            Rule::Substitution(s) => s,
            Rule::Terminal(_) => unreachable!("rule id for a substitution rule"),
        }
    }

    pub(crate) fn terminal_rules(&self) -> impl Iterator<Item = (RuleId, &TerminalRule)> {
        self.terminals.iter().map(|&id| match self.rule(id) {
            Rule::Terminal(t) => (id, t),
            Rule::Substitution(_) => unreachable!("terminals index holds terminal rules"),
        })
    }

    /// Substitution rules whose first awaited external name is `ext`.
    pub(crate) fn rules_by_first_ext(&self, ext: ExtId) -> &[RuleId] {
        &self.by_first_ext[ext]
    }

    pub(crate) fn ext_name(&self, id: ExtId) -> &str {
        &self.exts[id]
    }

    /// Resolve an external name; `None` for names no rule mentions.
    pub(crate) fn ext_id(&self, name: &str) -> Option<ExtId> {
        self.exts.iter().position(|e| e == name)
    }

    /// Number of distinct external names, the bound on rename-chain length.
    pub(crate) fn ext_count(&self) -> usize {
        self.exts.len()
    }

    pub(crate) fn warnings(&self) -> &[GrammarWarning] {
        &self.warnings
    }
}
