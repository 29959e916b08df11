// SPDX-FileCopyrightText: 2025 Knitli Inc. <knitli@knit.li>
// SPDX-FileContributor: Adam Poulemanos <adam@knit.li>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Parse Tracing
//!
//! Levelled tracing for the saturation loop. There is no global logger: the
//! caller picks a [`Granularity`] and owns the output sink, and the driver
//! writes into it as the parse runs.
//!
//! At [`Granularity::Summary`] the trace reports the parse statistics once,
//! after saturation. At [`Granularity::Entity`] it additionally renders
//! every inserted match, in insertion order, in the same notation the
//! display contract uses everywhere else.

use crate::parser::ParseStats;

use std::fmt;
use std::io::{Stderr, Write};
use std::sync::Mutex;

/// Granularity of tracing information.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Granularity {
    /// Do not show any tracing information
    #[default]
    Nothing = 0,
    /// Show a summary of the parse: positions scanned, matches, agenda work
    Summary = 1,
    /// Show every inserted match as it is created
    Entity = 2,
}

impl fmt::Debug for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nothing => write!(f, "nothing"),
            Self::Summary => write!(f, "summary"),
            Self::Entity => write!(f, "entity"),
        }
    }
}

impl Granularity {
    /// Create a parse trace writing to stderr.
    #[must_use]
    pub fn parse_trace(self) -> ParseTrace<Stderr> {
        self.trace_to(std::io::stderr())
    }

    /// Create a parse trace writing to the given sink.
    pub fn trace_to<W: Write>(self, output: W) -> ParseTrace<W> {
        ParseTrace {
            level: self,
            output: Mutex::new(output),
        }
    }
}

/// A trace sink for one or more parses.
pub struct ParseTrace<W: Write> {
    level: Granularity,
    output: Mutex<W>,
}

impl<W: Write> ParseTrace<W> {
    /// Recover the sink, e.g. to inspect a buffer in tests.
    pub fn into_inner(self) -> W {
        self.output.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn emit(&self, minimum: Granularity, line: &dyn fmt::Display) {
        if self.level >= minimum {
            let mut out = self
                .output
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            // a failing trace sink must not fail the parse
            let _ = writeln!(out, "{line}");
        }
    }
}

/// Driver-side hooks, object-safe so the saturation loop does not need the
/// sink's type parameter.
pub(crate) trait TraceSink {
    fn entity(&self, rendering: &dyn fmt::Display);
    fn summary(&self, stats: &ParseStats);
}

impl<W: Write> TraceSink for ParseTrace<W> {
    fn entity(&self, rendering: &dyn fmt::Display) {
        self.emit(Granularity::Entity, rendering);
    }

    fn summary(&self, stats: &ParseStats) {
        self.emit(
            Granularity::Summary,
            &format_args!(
                "scanned {} positions for {} seeds; {} matches inserted, {} duplicates dropped, {} agenda steps",
                stats.positions_scanned,
                stats.seeds,
                stats.inserted,
                stats.duplicates,
                stats.agenda_steps,
            ),
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn stats() -> ParseStats {
        ParseStats {
            positions_scanned: 4,
            seeds: 3,
            inserted: 10,
            duplicates: 2,
            agenda_steps: 10,
        }
    }

    #[test]
    fn test_nothing_stays_silent() {
        let trace = Granularity::Nothing.trace_to(Vec::new());
        trace.entity(&"((a → /a/))<1> [0:1]");
        trace.summary(&stats());
        assert!(trace.into_inner().is_empty());
    }

    #[test]
    fn test_summary_reports_stats_only() {
        let trace = Granularity::Summary.trace_to(Vec::new());
        trace.entity(&"((a → /a/))<1> [0:1]");
        trace.summary(&stats());
        let out = String::from_utf8(trace.into_inner()).unwrap();
        assert_eq!(
            out,
            "scanned 4 positions for 3 seeds; 10 matches inserted, 2 duplicates dropped, 10 agenda steps\n"
        );
    }

    #[test]
    fn test_entity_renders_matches() {
        let trace = Granularity::Entity.trace_to(Vec::new());
        trace.entity(&"((a → /a/))<1> [0:1]");
        let out = String::from_utf8(trace.into_inner()).unwrap();
        assert_eq!(out, "((a → /a/))<1> [0:1]\n");
    }
}
