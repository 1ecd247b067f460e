//! The combinatorial instantiation engine.
//!
//! Parameters are bound in increasing index order. A candidate object must
//! already be admitted by the countdown ([`ActionSchema::valid_arguments`]),
//! and binding parameter `m` makes exactly the facts bucketed under
//! `pre_by_max_par[m]` decidable, so each bucket is checked at its binding
//! point and the search backtracks as early as possible.
//!
//! Emission grounds every referenced code once. A statically false
//! positive precondition (or statically true negative one) rejects the
//! binding outright; a record whose surviving references are all
//! statically determined is flagged constant-only for the erase pass.

use crate::explore::AtomIndex;
use crate::numeric::{self, GroundNumericCondition, GroundNumericEffect};
use crate::schema::ActionSchema;
use crate::symbols::{AtomCode, ObjectId, SymbolTable};
use std::cmp::Ordering;

/// A ground record of one action instance.
///
/// The atom-code lists are compacted: sorted and deduplicated. Identity
/// and ordering cover the parameter tuple and the four atom lists;
/// instantiations are totally ordered so duplicate elimination can sort.
#[derive(Clone, Debug)]
pub struct Instantiation {
    pub(crate) parameters: Vec<ObjectId>,
    pub(crate) pre_add: Vec<AtomCode>,
    pub(crate) pre_del: Vec<AtomCode>,
    pub(crate) eff_add: Vec<AtomCode>,
    pub(crate) eff_del: Vec<AtomCode>,
    pub(crate) num_pre: Vec<GroundNumericCondition>,
    pub(crate) num_eff: Vec<GroundNumericEffect>,
    noop: bool,
    constant_only: bool,
}

impl Instantiation {
    /// Build a record from a parameter tuple and raw atom-code lists.
    ///
    /// The lists are compacted here. The noop flag is derived from the
    /// compacted effects; the constant-only flag defaults to "references
    /// nothing at all" until the engine overrides it with the verdict of
    /// the atom index.
    pub fn new(
        parameters: Vec<ObjectId>,
        mut pre_add: Vec<AtomCode>,
        mut pre_del: Vec<AtomCode>,
        mut eff_add: Vec<AtomCode>,
        mut eff_del: Vec<AtomCode>,
    ) -> Self {
        for list in [&mut pre_add, &mut pre_del, &mut eff_add, &mut eff_del] {
            list.sort_unstable();
            list.dedup();
        }
        let noop = eff_add == eff_del;
        let constant_only =
            pre_add.is_empty() && pre_del.is_empty() && eff_add.is_empty() && eff_del.is_empty();
        Self {
            parameters,
            pre_add,
            pre_del,
            eff_add,
            eff_del,
            num_pre: Vec::new(),
            num_eff: Vec::new(),
            noop,
            constant_only,
        }
    }

    /// Override the constant-only verdict with one computed against the
    /// true/fluent atom index.
    pub fn with_constant_only(mut self, constant_only: bool) -> Self {
        self.constant_only = constant_only;
        self
    }

    /// Attach ground numeric terms.
    pub fn with_numeric(
        mut self,
        num_pre: Vec<GroundNumericCondition>,
        num_eff: Vec<GroundNumericEffect>,
    ) -> Self {
        if !num_pre.is_empty() || !num_eff.is_empty() {
            self.constant_only = false;
        }
        if !num_eff.is_empty() {
            self.noop = false;
        }
        self.num_pre = num_pre;
        self.num_eff = num_eff;
        self
    }

    /// The bound parameter tuple.
    pub fn parameters(&self) -> &[ObjectId] {
        &self.parameters
    }

    /// Ground positive precondition codes.
    pub fn pre_add(&self) -> &[AtomCode] {
        &self.pre_add
    }

    /// Ground negative precondition codes.
    pub fn pre_del(&self) -> &[AtomCode] {
        &self.pre_del
    }

    /// Ground add-effect codes.
    pub fn eff_add(&self) -> &[AtomCode] {
        &self.eff_add
    }

    /// Ground del-effect codes.
    pub fn eff_del(&self) -> &[AtomCode] {
        &self.eff_del
    }

    /// Ground numeric preconditions.
    pub fn num_pre(&self) -> &[GroundNumericCondition] {
        &self.num_pre
    }

    /// Ground numeric effects.
    pub fn num_eff(&self) -> &[GroundNumericEffect] {
        &self.num_eff
    }

    /// True when the add effects equal the del effects.
    pub fn is_noop(&self) -> bool {
        self.noop
    }

    /// True when no fluent atom or numeric term is referenced.
    pub fn is_constant_only(&self) -> bool {
        self.constant_only
    }

    fn key(&self) -> (&[ObjectId], &[AtomCode], &[AtomCode], &[AtomCode], &[AtomCode]) {
        (
            &self.parameters,
            &self.pre_add,
            &self.pre_del,
            &self.eff_add,
            &self.eff_del,
        )
    }
}

impl PartialEq for Instantiation {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Instantiation {}

impl PartialOrd for Instantiation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Instantiation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Read-only matching context shared by every schema.
pub(crate) struct MatchContext<'a> {
    pub(crate) symbols: &'a SymbolTable,
    pub(crate) index: &'a AtomIndex,
}

/// Enumerate and record the instantiations of `schema` under each prefix.
///
/// A prefix binds the schema's leading parameters (empty for a top-level
/// schema; a parent's parameter tuple for a conditional child). Returns
/// the number of records emitted.
pub(crate) fn instantiate_schema(
    schema: &mut ActionSchema,
    ctx: &MatchContext<'_>,
    prefixes: &[Vec<ObjectId>],
) -> usize {
    if schema.unsatisfiable {
        return 0;
    }
    let mut out = Vec::new();
    for prefix in prefixes {
        if !prefix_admissible(schema, ctx, prefix) {
            continue;
        }
        let mut binding = prefix.clone();
        extend(schema, ctx, &mut binding, &mut out);
    }
    let emitted = out.len();
    for inst in out {
        schema.log_instantiation(inst);
    }
    emitted
}

/// Check everything that is already decidable under the prefix: the
/// countdown verdict for each bound parameter, the zero-parameter facts,
/// and every bucket whose maximum parameter is bound.
fn prefix_admissible(
    schema: &ActionSchema,
    ctx: &MatchContext<'_>,
    prefix: &[ObjectId],
) -> bool {
    for (par, &obj) in prefix.iter().enumerate() {
        if !schema.is_valid_argument(par, obj) {
            return false;
        }
    }
    for (_, fact) in &schema.pre_add {
        if fact.max_param_index().is_none()
            && !ctx.index.possibly_true(fact.ground(&[], ctx.symbols))
        {
            return false;
        }
    }
    for (_, fact) in &schema.pre_del {
        if fact.max_param_index().is_none()
            && !ctx.index.possibly_false(fact.ground(&[], ctx.symbols))
        {
            return false;
        }
    }
    for m in 0..prefix.len() {
        for (fact, negated) in schema.preconditions_by_max_par(m) {
            let code = fact.ground(prefix, ctx.symbols);
            let ok = if negated {
                ctx.index.possibly_false(code)
            } else {
                ctx.index.possibly_true(code)
            };
            if !ok {
                return false;
            }
        }
    }
    true
}

fn extend(
    schema: &ActionSchema,
    ctx: &MatchContext<'_>,
    binding: &mut Vec<ObjectId>,
    out: &mut Vec<Instantiation>,
) {
    let m = binding.len();
    if m == schema.parameter_count() {
        if let Some(inst) = emit(schema, ctx, binding) {
            out.push(inst);
        }
        return;
    }
    'candidates: for i in 0..schema.valid_arguments(m).len() {
        let obj = schema.valid_arguments(m)[i];
        binding.push(obj);
        for (fact, negated) in schema.preconditions_by_max_par(m) {
            let code = fact.ground(binding, ctx.symbols);
            let ok = if negated {
                ctx.index.possibly_false(code)
            } else {
                ctx.index.possibly_true(code)
            };
            if !ok {
                binding.pop();
                continue 'candidates;
            }
        }
        extend(schema, ctx, binding, out);
        binding.pop();
    }
}

fn emit(
    schema: &ActionSchema,
    ctx: &MatchContext<'_>,
    binding: &[ObjectId],
) -> Option<Instantiation> {
    let mut any_nonstatic = false;
    let mut pre_add = Vec::with_capacity(schema.pre_add.len());
    for (_, fact) in &schema.pre_add {
        let code = fact.ground(binding, ctx.symbols);
        if ctx.index.statically_false(code) {
            return None;
        }
        any_nonstatic |= !ctx.index.statically_true(code);
        pre_add.push(code);
    }
    let mut pre_del = Vec::with_capacity(schema.pre_del.len());
    for (_, fact) in &schema.pre_del {
        let code = fact.ground(binding, ctx.symbols);
        if ctx.index.statically_true(code) {
            return None;
        }
        any_nonstatic |= !ctx.index.statically_false(code);
        pre_del.push(code);
    }
    let eff_add: Vec<AtomCode> = schema
        .eff_add
        .iter()
        .map(|(_, fact)| fact.ground(binding, ctx.symbols))
        .collect();
    let eff_del: Vec<AtomCode> = schema
        .eff_del
        .iter()
        .map(|(_, fact)| fact.ground(binding, ctx.symbols))
        .collect();
    // Effect predicates are never static.
    if !eff_add.is_empty() || !eff_del.is_empty() {
        any_nonstatic = true;
    }

    let num_pre: Vec<GroundNumericCondition> = schema
        .num_pre
        .iter()
        .map(|(_, nc)| numeric::ground_condition(nc, binding, ctx.symbols))
        .collect();
    let num_eff: Vec<GroundNumericEffect> = schema
        .num_eff
        .iter()
        .map(|(_, ne)| numeric::ground_effect(ne, binding, ctx.symbols))
        .collect();

    Some(
        Instantiation::new(binding.to_vec(), pre_add, pre_del, eff_add, eff_del)
            .with_constant_only(!any_nonstatic)
            .with_numeric(num_pre, num_eff),
    )
}
