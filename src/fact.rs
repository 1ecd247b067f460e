//! Symbolic facts: lifted atoms bound to a schema's parameter space.
//!
//! A [`SymbolicFact`] is immutable once built; every argument is either a
//! schema-parameter index or a constant object. Construction validates the
//! predicate handle and arity so the engine can ground without re-checking.

use crate::ast::{Atom, Term};
use crate::error::GroundError;
use crate::symbols::{AtomCode, ObjectId, PredicateId, SymbolTable};

/// A predicate reference plus a parameter-binding vector.
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolicFact {
    predicate: PredicateId,
    args: Vec<Term>,
}

impl SymbolicFact {
    /// Validate and capture a lifted atom.
    pub fn new(atom: &Atom, symbols: &SymbolTable, context: &str) -> Result<Self, GroundError> {
        if !symbols.valid_predicate(atom.predicate.raw()) {
            return Err(GroundError::UnknownPredicate {
                context: context.to_string(),
                id: atom.predicate.raw(),
            });
        }
        let expected = symbols.predicate_arity(atom.predicate);
        if atom.args.len() != expected {
            return Err(GroundError::ArityMismatch {
                context: context.to_string(),
                name: symbols.predicate_name(atom.predicate).to_string(),
                expected,
                found: atom.args.len(),
            });
        }
        Ok(Self {
            predicate: atom.predicate,
            args: atom.args.clone(),
        })
    }

    /// The referenced predicate.
    pub fn predicate(&self) -> PredicateId {
        self.predicate
    }

    /// The argument terms.
    pub fn args(&self) -> &[Term] {
        &self.args
    }

    /// Largest referenced parameter index, if any parameter is referenced.
    pub fn max_param_index(&self) -> Option<usize> {
        self.args
            .iter()
            .filter_map(|t| match t {
                Term::Param(i) => Some(*i),
                Term::Object(_) => None,
            })
            .max()
    }

    /// Number of distinct parameters referenced.
    pub fn distinct_param_count(&self) -> usize {
        let mut params: Vec<usize> = self
            .args
            .iter()
            .filter_map(|t| match t {
                Term::Param(i) => Some(*i),
                Term::Object(_) => None,
            })
            .collect();
        params.sort_unstable();
        params.dedup();
        params.len()
    }

    /// The single referenced parameter, when exactly one is referenced.
    pub fn unary_param(&self) -> Option<usize> {
        let mut found: Option<usize> = None;
        for t in &self.args {
            if let Term::Param(i) = t {
                match found {
                    None => found = Some(*i),
                    Some(p) if p == *i => {}
                    Some(_) => return None,
                }
            }
        }
        found
    }

    /// Ground under a binding that covers every referenced parameter.
    pub fn ground(&self, binding: &[ObjectId], symbols: &SymbolTable) -> AtomCode {
        let objs: Vec<ObjectId> = self
            .args
            .iter()
            .map(|t| match t {
                Term::Param(i) => binding[*i],
                Term::Object(o) => *o,
            })
            .collect();
        symbols.encode_atom(self.predicate, &objs)
    }

    /// Ground a fact whose only parameter is `par`, bound to `obj`.
    pub(crate) fn ground_single(
        &self,
        par: usize,
        obj: ObjectId,
        symbols: &SymbolTable,
    ) -> AtomCode {
        let objs: Vec<ObjectId> = self
            .args
            .iter()
            .map(|t| match t {
                Term::Param(i) => {
                    debug_assert_eq!(*i, par);
                    obj
                }
                Term::Object(o) => *o,
            })
            .collect();
        symbols.encode_atom(self.predicate, &objs)
    }
}
