//! Error kinds and the warning collector.
//!
//! Grounding distinguishes **fatal errors** ([`GroundError`]) from
//! **warnings** ([`Warning`]). Malformed schemas and inconsistent initial
//! states abort the run; conditions the engine can work around are recorded
//! in a [`Diagnostics`] collector and surfaced alongside the result, so no
//! anomaly is silently dropped.

use serde::{Deserialize, Serialize};
use std::io::Error;
use std::path::Path;
use std::{fmt, io};

/// A fatal grounding error.
#[derive(Debug, Clone, PartialEq)]
pub enum GroundError {
    /// Quantifier nesting deeper than the single supported layer.
    UnsupportedNesting {
        /// Name of the offending action schema.
        schema: String,
    },
    /// A fact references a predicate the symbol table does not know.
    UnknownPredicate {
        /// Where the fact was encountered.
        context: String,
        /// The out-of-range predicate id.
        id: usize,
    },
    /// A numeric term references a function the symbol table does not know.
    UnknownFunction {
        /// Where the term was encountered.
        context: String,
        /// The out-of-range function id.
        id: usize,
    },
    /// A fact or fluent carries the wrong number of arguments.
    ArityMismatch {
        /// Where the fact was encountered.
        context: String,
        /// Predicate or function name.
        name: String,
        expected: usize,
        found: usize,
    },
    /// A fact references a parameter index beyond the live parameter scope.
    ParameterOutOfRange {
        /// Name of the offending action schema.
        schema: String,
        /// The out-of-range parameter index.
        index: usize,
    },
    /// The initial state asserts and denies the same atom.
    InconsistentInitialState {
        /// Rendered ground atom.
        atom: String,
    },
    /// Cooperative cancellation was observed at a schema boundary.
    Cancelled,
}

impl fmt::Display for GroundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroundError::UnsupportedNesting { schema } => {
                write!(f, "schema '{schema}': quantifier nesting deeper than one level")
            }
            GroundError::UnknownPredicate { context, id } => {
                write!(f, "{context}: unknown predicate id {id}")
            }
            GroundError::UnknownFunction { context, id } => {
                write!(f, "{context}: unknown function id {id}")
            }
            GroundError::ArityMismatch {
                context,
                name,
                expected,
                found,
            } => {
                write!(
                    f,
                    "{context}: '{name}' expects {expected} argument(s), found {found}"
                )
            }
            GroundError::ParameterOutOfRange { schema, index } => {
                write!(f, "schema '{schema}': parameter index {index} is out of scope")
            }
            GroundError::InconsistentInitialState { atom } => {
                write!(f, "initial state both asserts and denies {atom}")
            }
            GroundError::Cancelled => write!(f, "grounding cancelled"),
        }
    }
}

impl std::error::Error for GroundError {}

/// A non-fatal condition recorded during grounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Warning {
    /// A fact-group code computation produced a negative exponent; the
    /// exponent was clamped to zero and the computation proceeded.
    NegativeExponent {
        /// Name of the predicate whose part ordering triggered the clamp.
        predicate: String,
    },
    /// A schema yielded zero surviving instantiations.
    EmptyGroundSet {
        /// Name of the schema.
        schema: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NegativeExponent { predicate } => {
                write!(f, "negative exponent while numbering '{predicate}'")
            }
            Warning::EmptyGroundSet { schema } => {
                write!(f, "schema '{schema}' grounded to an empty action set")
            }
        }
    }
}

/// Accumulates [`Warning`]s for batch reporting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning.
    pub fn warn(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// All recorded warnings, in recording order.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Number of recorded warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// True if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Print all warnings to stderr.
    pub fn print(&self) {
        for w in &self.warnings {
            eprintln!("warning: {w}");
        }
    }

    /// Export the warnings as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.warnings)
    }

    /// Write the warnings to a file in JSON format.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = self.to_json().map_err(Error::other)?;
        std::fs::write(path, json)
    }

    pub(crate) fn merge(&mut self, mut other: Diagnostics) {
        self.warnings.append(&mut other.warnings);
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Diagnostics({} warnings)", self.warning_count())
    }
}
