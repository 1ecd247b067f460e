//! # Groundwork
//!
//! A **grounding front-end for classical planners**: compiles lifted action
//! schemas with typed parameters, conjunctive preconditions, conditional
//! and universal effects, and numeric expressions into the explicit,
//! deduplicated set of propositional ground actions over a finite object
//! universe — the representation heuristic search engines consume.
//!
//! ## Key Features
//!
//! - **Stable ground numbering** - every predicate owns a contiguous
//!   atom-code range; encoding and decoding are exact inverses
//! - **Countdown validity** - an object becomes a candidate binding only
//!   once every unary precondition on that parameter is satisfied
//! - **Constant folding** - static predicates are folded into
//!   parameter-domain restrictions before enumeration, not filtered after
//! - **Dependency-ordered search** - non-unary preconditions are bucketed
//!   by their maximum parameter and checked the moment they become decidable
//! - **Conditional effects** - `when` and `forall` effect bodies become
//!   derived child schemas expanded under each surviving parent binding
//! - **Merged predicates** - invariant-analysis output materializes into
//!   fact groups, the search engine's compact state variables
//! - **Erase passes with receipts** - duplicates, noops, and constant-only
//!   instances are removed in a fixed order and every pass reports its count
//!
//! ## Quick Start
//!
//! ```
//! use groundwork::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! // Symbols: a blocksworld with three blocks.
//! let mut table = SymbolTable::new();
//! let block = table.add_type("block", &[table.top_type()]);
//! let a = table.add_object("a", block);
//! let b = table.add_object("b", block);
//! let c = table.add_object("c", block);
//! let clear = table.add_predicate("clear", &[block]);
//! let ontable = table.add_predicate("ontable", &[block]);
//! let holding = table.add_predicate("holding", &[block]);
//! let handempty = table.add_predicate("handempty", &[]);
//! table.freeze();
//!
//! // One lifted action: pickup(x).
//! let pickup = ActionDef::new(
//!     "pickup",
//!     vec![block],
//!     Condition::and(vec![
//!         Condition::atom(Atom::new(clear, vec![Term::Param(0)])),
//!         Condition::atom(Atom::new(ontable, vec![Term::Param(0)])),
//!         Condition::atom(Atom::new(handempty, vec![])),
//!     ]),
//!     Effect::and(vec![
//!         Effect::Add(Atom::new(holding, vec![Term::Param(0)])),
//!         Effect::Del(Atom::new(clear, vec![Term::Param(0)])),
//!         Effect::Del(Atom::new(ontable, vec![Term::Param(0)])),
//!         Effect::Del(Atom::new(handempty, vec![])),
//!     ]),
//! );
//! let domain = DomainDef { actions: vec![pickup] };
//!
//! let mut problem = ProblemDef::default();
//! for obj in [a, b, c] {
//!     problem.init.push(InitLiteral::holds(clear, vec![obj]));
//!     problem.init.push(InitLiteral::holds(ontable, vec![obj]));
//! }
//! problem.init.push(InitLiteral::holds(handempty, vec![]));
//!
//! let driver = ExploreStep::new(&table, GroundConfig::default());
//! let task = driver.ground(&domain, &problem, &[])?;
//! assert_eq!(task.actions.len(), 3);
//! assert!(task.action_named("pickup(a)").is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### `SymbolTable`
//!
//! The [`SymbolTable`] owns types, objects, predicates, and numeric
//! functions. Build it mutably, then [`freeze`](SymbolTable::freeze) it
//! once: freezing assigns the atom and fluent code ranges that every other
//! component treats as immutable.
//!
//! ### Lifted input
//!
//! The [`ast`] module is the contract with the (external) parser: action
//! definitions over [`Condition`] and [`Effect`] trees whose atoms carry
//! symbol-table handles, plus the problem's initial state, timed initial
//! literals, and fluent assignments.
//!
//! ### Grounding
//!
//! [`ExploreStep`] drives the run under an explicit [`GroundConfig`]:
//! sequential or rayon-parallel across schemas, with an explicit switch for
//! the constant-only erase pass and a cooperative cancellation flag. The
//! result is a [`GroundTask`]: ordered ground actions, the initial atom
//! set, fact groups, a diagnostic name map, statistics, and warnings.
//!
//! ### Fact groups
//!
//! [`MergedPredicate`] consumes invariant-analysis output: base predicates
//! projected and aligned onto a shared parameter list, with null-state
//! parts for "none of these atoms hold". Its
//! [`fact_groups`](MergedPredicate::fact_groups) are the mutex groups the
//! search engine uses as state-variable domains.
//!
//! ## Module Overview
//!
//! - [`symbols`] - symbol table and the ground atom/fluent numbering
//! - [`ast`] - the lifted symbolic tree consumed from the parser
//! - [`fact`] - symbolic facts bound to a schema's parameter space
//! - [`numeric`] - lifted and ground numeric conditions/effects
//! - [`merge`] - merged predicates and fact groups
//! - [`schema`] - action schemas, countdown state, erase passes
//! - [`scanner`] - static-predicate detection and constant folding
//! - [`instantiate`] - the combinatorial enumeration engine
//! - [`explore`] - the grounding driver and the ground task
//! - [`stats`] - per-schema grounding statistics
//! - [`error`] - error kinds and the warning collector

pub mod ast;
pub mod error;
pub mod explore;
pub mod fact;
pub mod instantiate;
pub mod merge;
pub mod numeric;
pub mod scanner;
pub mod schema;
pub mod stats;
pub mod symbols;

pub use ast::{
    ActionDef, Atom, Condition, DomainDef, Effect, FluentInit, InitLiteral, ProblemDef, Term,
    TimedLiteral,
};
pub use error::{Diagnostics, GroundError, Warning};
pub use explore::{
    AtomIndex, ExploreStep, GroundAction, GroundConfig, GroundMode, GroundTask, Prepared,
};
pub use fact::SymbolicFact;
pub use instantiate::Instantiation;
pub use merge::{MergedPredicate, PartPredicate};
pub use numeric::{
    AssignOp, Comparison, GroundNumericCondition, GroundNumericEffect, GroundNumericExpr,
    NumericCondition, NumericEffect, NumericExpr,
};
pub use schema::{ActionSchema, SchemaKind};
pub use stats::{GroundingStats, SchemaStats};
pub use symbols::{AtomCode, FluentCode, FunctionId, ObjectId, PredicateId, SymbolTable, TypeId};
