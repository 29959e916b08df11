// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! End-to-end parses over small context-conditioned grammars, plus the
//! engine-wide properties every parse must uphold.

use weft_chart_engine::{Expect, Forest, MatchRef, Parser, Polarity, RuleDef};

/// The a^n b^n c^n grammar: `S → a S B C | a B C` with the reordering of
/// `B`s and `C`s done through context-conditioned unit renames.
fn anbncn() -> Parser {
    Parser::try_new(vec![
        RuleDef::terminal("a", "a"),
        RuleDef::terminal("b", "b"),
        RuleDef::terminal("c", "c"),
        RuleDef::substitution("C", ["c"]).with_left(Expect::is("b")),
        RuleDef::substitution("C", ["c"]).with_left(Expect::is("c")),
        RuleDef::substitution("B", ["b"]).with_left(Expect::is("a")),
        RuleDef::substitution("B", ["b"]).with_left(Expect::is("b")),
        RuleDef::substitution("W", ["B"]).with_right(Expect::is("C")),
        RuleDef::substitution("Z", ["C"]).with_left(Expect::is("W")),
        RuleDef::substitution("C", ["W"]).with_right(Expect::is("Z")),
        RuleDef::substitution("B", ["Z"]).with_left(Expect::is("C")),
        RuleDef::substitution("S", ["a", "S", "B", "C"]),
        RuleDef::substitution("S", ["a", "B", "C"]),
    ])
    .expect("grammar compiles")
}

fn walk(m: MatchRef<'_>, visit: &mut impl FnMut(MatchRef<'_>)) {
    visit(m);
    for child in m.children() {
        walk(child, visit);
    }
}

#[test]
fn test_anbncn_accepts_abc() {
    let parser = anbncn();
    let forest = parser.parse("abc");
    let spanning = forest.spanning();
    assert_eq!(spanning.len(), 1);
    let root = spanning[0];
    assert_eq!((root.start(), root.end()), (0, 3));
    assert_eq!(root.action(), vec!["a", "B", "C"]);
    assert_eq!(root.to_string(), "((S → a B C))<1> [0:3]");
}

#[test]
fn test_anbncn_accepts_aabbcc_through_rename_chain() {
    let parser = anbncn();
    let forest = parser.parse("aabbcc");
    let spanning = forest.spanning_ext("S");
    assert_eq!(spanning.len(), 1);

    let root = spanning[0];
    assert_eq!((root.start(), root.end()), (0, 6));
    assert_eq!(root.action(), vec!["a", "S", "B", "C"]);
    assert_eq!(root.depth(), 1);

    let children = root.children();
    assert_eq!(children.len(), 4);

    let inner = children[1];
    assert_eq!(inner.ext(), "S");
    assert_eq!((inner.start(), inner.end()), (1, 4));
    assert_eq!(inner.action(), vec!["a", "B", "C"]);

    // the third child covers a `c` renamed B → Z → C → c, with the `&C`
    // expectation witnessed inside the preceding sibling's span
    let third = children[2];
    assert_eq!(third.ext(), "B");
    assert_eq!((third.start(), third.end()), (4, 5));
    assert_eq!(third.action(), vec!["Z"]);
    assert_eq!(third.depth(), 4);
    let witness = third.left_ctx().expect("left context witnessed");
    assert_eq!(witness.ext(), "C");
    assert_eq!(witness.end(), third.start());

    let fourth = children[3];
    assert_eq!(fourth.ext(), "C");
    assert_eq!((fourth.start(), fourth.end()), (5, 6));
}

#[test]
fn test_anbncn_accepts_deeper_nesting() {
    let parser = anbncn();
    let forest = parser.parse("aaaabbbbcccc");
    let spanning = forest.spanning();
    assert_eq!(spanning.len(), 1);
    assert_eq!(spanning[0].action(), vec!["a", "S", "B", "C"]);
}

#[test]
fn test_anbncn_rejects_unbalanced_and_trailing_input() {
    let parser = anbncn();
    assert!(parser.parse("abcd").spanning().is_empty());
    assert!(parser.parse("aabbc").spanning().is_empty());
    assert!(parser.parse("abb").spanning().is_empty());
    assert!(parser.parse("").spanning().is_empty());
}

#[test]
fn test_negative_right_context_never_spans_aa() {
    let parser = Parser::try_new(vec![
        RuleDef::terminal("A", "a"),
        RuleDef::substitution("W", ["A"]).with_right(Expect::not("A")),
    ])
    .expect("grammar compiles");
    assert!(parser.parse("aa").spanning_ext("W").is_empty());
}

#[test]
fn test_unit_rename_cycle_terminates() {
    let parser = Parser::try_new(vec![
        RuleDef::terminal("A", "a"),
        RuleDef::substitution("B", ["A"]),
        RuleDef::substitution("A", ["B"]),
    ])
    .expect("grammar compiles");
    let forest = parser.parse("a");
    let spanning = forest.spanning();
    // the terminal A and its rename to B; renaming back to A is refused
    assert_eq!(spanning.len(), 2);
    for m in &spanning {
        assert!(m.depth() <= 2, "depth bounded by the external-name count");
    }
    // a budget far above the reachable chart is never hit
    assert!(parser.parse_bounded("a", 10_000).is_ok());
}

#[test]
fn test_parses_are_deterministic() {
    let parser = anbncn();
    let rendered = |forest: &Forest<'_>| {
        let mut lines: Vec<String> = forest.spanning().iter().map(ToString::to_string).collect();
        lines.sort_unstable();
        lines
    };
    let first = parser.parse("aabbcc");
    let second = parser.parse("aabbcc");
    assert_eq!(rendered(&first), rendered(&second));
    assert_eq!(first.stats(), second.stats());
}

#[test]
fn test_spanning_matches_cover_the_input() {
    let parser = anbncn();
    for input in ["abc", "aabbcc", "aaaabbbbcccc"] {
        for m in parser.parse(input).spanning() {
            assert_eq!(m.start(), 0);
            assert_eq!(m.end(), input.len());
        }
    }
}

#[test]
fn test_children_abut_and_witnesses_sit_on_the_frontier() {
    let parser = anbncn();
    let forest = parser.parse("aabbcc");
    for root in forest.spanning() {
        walk(root, &mut |m| {
            let children = m.children();
            for pair in children.windows(2) {
                assert_eq!(pair[0].end(), pair[1].start());
            }
            if !children.is_empty() {
                assert_eq!(children[0].start(), m.start());
                assert_eq!(children[children.len() - 1].end(), m.end());
            }
            if let Some(expect) = m.left_expect() {
                match (expect.polarity(), m.left_ctx()) {
                    (Polarity::Is, Some(witness)) => {
                        assert_eq!(witness.end(), m.start());
                        assert_eq!(witness.ext(), expect.ext());
                    }
                    (Polarity::Is, None) => panic!("positive left expectation witnessed"),
                    (Polarity::Not, Some(witness)) => {
                        assert_eq!(witness.end(), m.start());
                        assert_ne!(witness.ext(), expect.ext());
                    }
                    (Polarity::Not, None) => assert_eq!(m.start(), 0),
                }
            }
            if let Some(expect) = m.right_expect() {
                match (expect.polarity(), m.right_ctx()) {
                    (Polarity::Is, Some(witness)) => {
                        assert_eq!(witness.start(), m.end());
                        assert_eq!(witness.ext(), expect.ext());
                    }
                    (Polarity::Is, None) => panic!("positive right expectation witnessed"),
                    (Polarity::Not, Some(witness)) => {
                        assert_eq!(witness.start(), m.end());
                        assert_ne!(witness.ext(), expect.ext());
                    }
                    (Polarity::Not, None) => {}
                }
            }
        });
    }
}

#[test]
fn test_depth_bounded_by_external_name_count() {
    let parser = anbncn();
    // a, b, c, B, C, W, Z, S
    let ext_names = 8;
    for input in ["abc", "aabbcc", "aaaabbbbcccc"] {
        for root in parser.parse(input).spanning() {
            walk(root, &mut |m| {
                assert!(m.depth() as usize <= ext_names);
            });
        }
    }
}

#[test]
fn test_budget_cuts_saturation_short() {
    let parser = anbncn();
    let err = parser.parse_bounded("aabbcc", 3).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Parse exceeded its work budget of 3 agenda steps."
    );
}
