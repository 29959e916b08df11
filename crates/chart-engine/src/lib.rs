/*!
This module contains the core chart engine for Weft.

It provides APIs for registering context-conditioned grammars and parsing
inputs into match forests. A grammar is a list of rules: terminals match the
input through an opaque regex scanner, substitutions rewrite a tuple of
neighboring matches into a new one, optionally conditioned on the external
name of the match to their left or right. Parsing is Earley-style chart
saturation over complete and forward matches, with unit-rename cycles
bounded by per-match rename chains.
*/

pub mod grammar;
pub mod parser;
pub mod trace;

mod chart;
mod compat;
mod matches;
mod ops;
mod scan;

// Re-exports
pub use grammar::{Expect, GrammarError, GrammarWarning, Polarity, RuleDef, RuleId};
pub use parser::{Forest, MatchRef, ParseError, ParseStats, Parser};
pub use trace::{Granularity, ParseTrace};

#[cfg(test)]
mod test {
    use super::*;

    pub type Result = std::result::Result<(), GrammarError>;

    #[test]
    fn test_negative_context_blocks_neighbor() -> Result {
        // W admits a single `A` not followed by another `A`
        let parser = Parser::try_new(vec![
            RuleDef::terminal("A", "a"),
            RuleDef::substitution("W", ["A"]).with_right(Expect::not("A")),
        ])?;
        assert_eq!(parser.parse("a").spanning_ext("W").len(), 1);
        assert!(parser.parse("aa").spanning_ext("W").is_empty());
        Ok(())
    }

    #[test]
    fn test_forest_is_reusable_across_parses() -> Result {
        let parser = Parser::try_new(vec![
            RuleDef::terminal("a", "a"),
            RuleDef::substitution("S", ["a"]),
            RuleDef::substitution("S", ["a", "S"]),
        ])?;
        for input in ["a", "aa", "aaaa"] {
            assert_eq!(parser.parse(input).spanning_ext("S").len(), 1);
        }
        assert!(parser.parse("b").spanning().is_empty());
        Ok(())
    }
}
