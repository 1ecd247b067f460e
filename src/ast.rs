//! The lifted symbolic tree consumed from the parser.
//!
//! The grounding engine does not read surface syntax; it consumes this
//! already-resolved representation in which every predicate, function,
//! object, and type is a symbol-table handle. Schema parameters are
//! positional: [`Term::Param`] carries the index of a parameter of the
//! enclosing action (a `forall` extends the index space by its bound
//! variables, which occupy the indices directly after the live scope).

use crate::numeric::{NumericCondition, NumericEffect};
use crate::symbols::{FunctionId, ObjectId, PredicateId, TypeId};

/// An argument of a lifted atom: a schema parameter or a constant object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Term {
    /// Index of a parameter of the enclosing action schema.
    Param(usize),
    /// A constant object.
    Object(ObjectId),
}

/// A lifted atom: a predicate applied to terms.
#[derive(Clone, Debug, PartialEq)]
pub struct Atom {
    pub predicate: PredicateId,
    pub args: Vec<Term>,
}

impl Atom {
    /// Build an atom from a predicate and its argument terms.
    pub fn new(predicate: PredicateId, args: Vec<Term>) -> Self {
        Self { predicate, args }
    }

    /// Replace every `Param(base + j)` with the corresponding object.
    ///
    /// An index beyond the substitution is left in place; the scope check
    /// during lowering reports it.
    pub(crate) fn substituted(&self, base: usize, objs: &[ObjectId]) -> Atom {
        let args = self
            .args
            .iter()
            .map(|t| match t {
                Term::Param(i) if *i >= base => match objs.get(*i - base) {
                    Some(o) => Term::Object(*o),
                    None => *t,
                },
                other => *other,
            })
            .collect();
        Atom {
            predicate: self.predicate,
            args,
        }
    }
}

/// A lifted condition tree.
#[derive(Clone, Debug)]
pub enum Condition {
    /// A possibly negated atom.
    Literal { atom: Atom, negated: bool },
    /// Conjunction.
    And(Vec<Condition>),
    /// Disjunction, carried through to the schema unevaluated.
    Or(Box<Condition>, Box<Condition>),
    /// Implication, carried through to the schema unevaluated.
    Implies(Box<Condition>, Box<Condition>),
    /// Universal quantification over objects of the given types; one layer
    /// is supported.
    Forall {
        types: Vec<TypeId>,
        body: Box<Condition>,
    },
    /// A named sub-formula.
    Preference { name: String, body: Box<Condition> },
    /// A numeric comparison.
    Numeric(NumericCondition),
}

impl Condition {
    /// A positive literal.
    pub fn atom(atom: Atom) -> Self {
        Condition::Literal {
            atom,
            negated: false,
        }
    }

    /// A negated literal.
    pub fn not_atom(atom: Atom) -> Self {
        Condition::Literal {
            atom,
            negated: true,
        }
    }

    /// Conjunction of the given conditions.
    pub fn and(conds: Vec<Condition>) -> Self {
        Condition::And(conds)
    }

    pub(crate) fn substituted(&self, base: usize, objs: &[ObjectId]) -> Condition {
        match self {
            Condition::Literal { atom, negated } => Condition::Literal {
                atom: atom.substituted(base, objs),
                negated: *negated,
            },
            Condition::And(cs) => {
                Condition::And(cs.iter().map(|c| c.substituted(base, objs)).collect())
            }
            Condition::Or(l, r) => Condition::Or(
                Box::new(l.substituted(base, objs)),
                Box::new(r.substituted(base, objs)),
            ),
            Condition::Implies(l, r) => Condition::Implies(
                Box::new(l.substituted(base, objs)),
                Box::new(r.substituted(base, objs)),
            ),
            Condition::Forall { types, body } => Condition::Forall {
                types: types.clone(),
                body: Box::new(body.substituted(base, objs)),
            },
            Condition::Preference { name, body } => Condition::Preference {
                name: name.clone(),
                body: Box::new(body.substituted(base, objs)),
            },
            Condition::Numeric(nc) => Condition::Numeric(nc.clone()),
        }
    }
}

/// A lifted effect tree.
#[derive(Clone, Debug)]
pub enum Effect {
    /// Assert an atom.
    Add(Atom),
    /// Retract an atom.
    Del(Atom),
    /// Effect conjunction.
    And(Vec<Effect>),
    /// Universal effect over objects of the given types.
    Forall { types: Vec<TypeId>, body: Box<Effect> },
    /// Conditional effect: `body` fires where `condition` holds.
    When {
        condition: Condition,
        body: Box<Effect>,
    },
    /// A numeric update.
    Numeric(NumericEffect),
}

impl Effect {
    /// Effect conjunction of the given effects.
    pub fn and(effects: Vec<Effect>) -> Self {
        Effect::And(effects)
    }
}

/// A lifted action definition.
#[derive(Clone, Debug)]
pub struct ActionDef {
    pub name: String,
    /// Per-parameter types; the parameter count is the vector length.
    pub params: Vec<TypeId>,
    pub precondition: Condition,
    pub effect: Effect,
    /// Fixed execution time for actions induced by timed initial literals.
    pub time: Option<f64>,
    /// Opaque tag carried through to the schema.
    pub label: i32,
}

impl ActionDef {
    /// Build a plain (untimed, unlabeled) action definition.
    pub fn new(name: &str, params: Vec<TypeId>, precondition: Condition, effect: Effect) -> Self {
        Self {
            name: name.to_string(),
            params,
            precondition,
            effect,
            time: None,
            label: 0,
        }
    }
}

/// A parsed planning domain: the action definitions.
#[derive(Clone, Debug, Default)]
pub struct DomainDef {
    pub actions: Vec<ActionDef>,
}

/// A ground literal of the initial state.
#[derive(Clone, Debug)]
pub struct InitLiteral {
    pub predicate: PredicateId,
    pub args: Vec<ObjectId>,
    pub negated: bool,
}

impl InitLiteral {
    /// A positive initial-state literal.
    pub fn holds(predicate: PredicateId, args: Vec<ObjectId>) -> Self {
        Self {
            predicate,
            args,
            negated: false,
        }
    }

    /// A negated initial-state literal.
    pub fn denied(predicate: PredicateId, args: Vec<ObjectId>) -> Self {
        Self {
            predicate,
            args,
            negated: true,
        }
    }
}

/// A timed initial literal: the atom becomes true at the given time.
#[derive(Clone, Debug)]
pub struct TimedLiteral {
    pub time: f64,
    pub predicate: PredicateId,
    pub args: Vec<ObjectId>,
}

/// An initial numeric fluent assignment.
#[derive(Clone, Debug)]
pub struct FluentInit {
    pub function: FunctionId,
    pub args: Vec<ObjectId>,
    pub value: f64,
}

/// A parsed planning problem: initial state, timed literals, fluents.
#[derive(Clone, Debug, Default)]
pub struct ProblemDef {
    pub init: Vec<InitLiteral>,
    pub timed: Vec<TimedLiteral>,
    pub fluents: Vec<FluentInit>,
}
