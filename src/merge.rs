//! Merged predicates and their fact groups.
//!
//! Invariant analysis can discover that several base predicates, suitably
//! projected and aligned, behave as one composite relation whose member
//! atoms are mutually exclusive. A [`MergedPredicate`] captures that
//! alignment as an ordered collection of [`PartPredicate`]s over a common
//! output parameter list, and [`fact_groups`](MergedPredicate::fact_groups)
//! materializes the composite into ground fact groups: compact state
//! variables for the search engine.
//!
//! Output slots come in two bands. The first `merged_par_count` slots are
//! the **merged** (free) slots, enumerated inside every group; the
//! remaining `par_count - merged_par_count` slots are the **raw** slots,
//! one group per assignment. A part whose predicate has a smaller arity
//! than `par_count` is a **null-state** part: its missing slots are the
//! `None` sentinel and it represents "none of the wider atoms hold".

use crate::error::{Diagnostics, Warning};
use crate::symbols::{AtomCode, PredicateId, SymbolTable};

/// One slot of a merged predicate: a base predicate plus the permutation
/// mapping output slots to the predicate's own parameters.
///
/// `par_order[i]` names the base-predicate parameter filling output slot
/// `i`; `None` marks a null slot of a null-state part.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PartPredicate {
    predicate: PredicateId,
    null_state: bool,
    par_order: Vec<Option<usize>>,
}

impl PartPredicate {
    /// Build a part from its predicate, null-state flag, and slot
    /// permutation.
    pub fn new(predicate: PredicateId, null_state: bool, par_order: Vec<Option<usize>>) -> Self {
        Self {
            predicate,
            null_state,
            par_order,
        }
    }

    /// The base predicate.
    pub fn predicate(&self) -> PredicateId {
        self.predicate
    }

    /// True for a null-state part.
    pub fn null_state(&self) -> bool {
        self.null_state
    }

    /// The output-slot permutation.
    pub fn par_order(&self) -> &[Option<usize>] {
        &self.par_order
    }

    fn multiplier(
        &self,
        slot: usize,
        max_power: isize,
        object_count: usize,
        symbols: &SymbolTable,
        diags: &mut Diagnostics,
    ) -> usize {
        let exponent = max_power - slot as isize;
        if exponent < 0 {
            diags.warn(Warning::NegativeExponent {
                predicate: symbols.predicate_name(self.predicate).to_string(),
            });
            return 1;
        }
        SymbolTable::power(object_count, exponent as usize)
    }

    /// Append this part's ground atom codes for one raw-argument tuple.
    ///
    /// The raw arguments fill the output slots from `merged_par_count`
    /// upward; the merged slots are enumerated over all objects. A
    /// null-state part whose null-variable count equals `merged_par_count`
    /// contributes exactly one code.
    pub(crate) fn append_instantiations(
        &self,
        raw_args: &[usize],
        group: &mut Vec<AtomCode>,
        merged_par_count: usize,
        symbols: &SymbolTable,
        diags: &mut Diagnostics,
    ) {
        let object_count = symbols.object_count();
        let arity = symbols.predicate_arity(self.predicate);
        let null_var_count = self.par_order.len().saturating_sub(arity);
        let max_power = arity as isize - 1;

        let raw_end = self
            .par_order
            .len()
            .min(merged_par_count + raw_args.len());
        let mut code = symbols.fact_lower_bound(self.predicate);
        for i in merged_par_count..raw_end {
            if let Some(slot) = self.par_order[i] {
                code += raw_args[i - merged_par_count]
                    * self.multiplier(slot, max_power, object_count, symbols, diags);
            }
        }

        if self.null_state && null_var_count == merged_par_count {
            group.push(code);
            return;
        }

        let mut mults = Vec::with_capacity(merged_par_count);
        for entry in self.par_order.iter().take(merged_par_count) {
            if let Some(slot) = entry {
                mults.push(self.multiplier(*slot, max_power, object_count, symbols, diags));
            }
        }

        let total = SymbolTable::power(object_count, mults.len());
        let mut digits = vec![0usize; mults.len()];
        for _ in 0..total {
            let final_code: AtomCode = code
                + mults
                    .iter()
                    .zip(&digits)
                    .map(|(m, d)| m * d)
                    .sum::<usize>();
            group.push(final_code);
            for d in digits.iter_mut() {
                if *d < object_count - 1 {
                    *d += 1;
                    break;
                }
                *d = 0;
            }
        }
    }
}

/// An ordered collection of [`PartPredicate`]s over a common output arity.
#[derive(Clone, Debug)]
pub struct MergedPredicate {
    par_count: usize,
    merged_par_count: usize,
    parts: Vec<PartPredicate>,
}

impl PartialEq for MergedPredicate {
    // The merged parameter count is not part of the identity.
    fn eq(&self, other: &Self) -> bool {
        self.par_count == other.par_count && self.parts == other.parts
    }
}

impl Eq for MergedPredicate {}

impl MergedPredicate {
    /// Start a merge from an initial predicate and the projection `pars`
    /// naming which of its parameters become the merged (output) slots.
    ///
    /// The remaining parameters follow in ascending order as raw slots.
    pub fn new(init: PredicateId, pars: &[usize], symbols: &SymbolTable) -> Self {
        let par_count = symbols.predicate_arity(init);
        let merged_par_count = pars.len();
        let mut order: Vec<Option<usize>> = pars.iter().map(|&p| Some(p)).collect();
        for i in 0..par_count {
            if !pars.contains(&i) {
                order.push(Some(i));
            }
        }
        Self {
            par_count,
            merged_par_count,
            parts: vec![PartPredicate::new(init, false, order)],
        }
    }

    /// Append a part. The null-state flag is set iff the predicate's arity
    /// differs from the merge's parameter count.
    pub fn push_predicate(
        &mut self,
        predicate: PredicateId,
        par_order: Vec<Option<usize>>,
        symbols: &SymbolTable,
    ) {
        let null_state = symbols.predicate_arity(predicate) != self.par_count;
        self.parts
            .push(PartPredicate::new(predicate, null_state, par_order));
    }

    /// Remove the most recently pushed part.
    pub fn pop_predicate(&mut self) {
        self.parts.pop();
    }

    /// Find the part for a predicate. The reference is valid only until
    /// the next `push`/`pop`.
    pub fn find_predicate(&self, predicate: PredicateId) -> Option<&PartPredicate> {
        self.parts.iter().find(|p| p.predicate == predicate)
    }

    /// Number of output parameters.
    pub fn par_count(&self) -> usize {
        self.par_count
    }

    /// Number of merged (free) output parameters.
    pub fn merged_par_count(&self) -> usize {
        self.merged_par_count
    }

    /// The parts, in their current order.
    pub fn parts(&self) -> &[PartPredicate] {
        &self.parts
    }

    /// Sort the parts into canonical order so equality is order-free.
    pub fn make_canonical(&mut self) {
        self.parts.sort();
    }

    /// Materialize the fact groups: one group per raw-argument tuple, each
    /// listing every part's atom codes under every merged-slot assignment.
    pub fn fact_groups(
        &self,
        symbols: &SymbolTable,
        diags: &mut Diagnostics,
    ) -> Vec<Vec<AtomCode>> {
        let object_count = symbols.object_count();
        let raw_len = self.par_count - self.merged_par_count;
        let tuples = SymbolTable::power(object_count, raw_len);
        let mut groups = Vec::with_capacity(tuples);
        let mut raw_args = vec![0usize; raw_len];
        for _ in 0..tuples {
            let mut group = Vec::with_capacity(object_count * self.parts.len());
            for part in &self.parts {
                part.append_instantiations(
                    &raw_args,
                    &mut group,
                    self.merged_par_count,
                    symbols,
                    diags,
                );
            }
            groups.push(group);
            for d in raw_args.iter_mut() {
                if *d < object_count - 1 {
                    *d += 1;
                    break;
                }
                *d = 0;
            }
        }
        groups
    }
}
