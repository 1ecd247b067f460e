//! Lifted action schemas.
//!
//! An [`ActionSchema`] is the engine-facing form of a parsed action: typed
//! parameters, the four scope-tagged fact lists (positive/negative
//! preconditions, add/del effects), numeric lists, carried-through
//! preferences, disjunctions and implications, and the owned `whens`
//! children produced by conditional and universal effects.
//!
//! A schema is mutable during construction and scanning. Once
//! instantiation begins, only the `instantiations` vector and the countdown
//! matrices change: the countdown admits an object for a parameter exactly
//! when its per-object precondition count reaches zero, and the erase
//! passes monotonically shrink the instantiation list, reporting how many
//! records each removed.

use crate::ast::{ActionDef, Condition, Effect};
use crate::error::GroundError;
use crate::explore::AtomIndex;
use crate::fact::SymbolicFact;
use crate::instantiate::Instantiation;
use crate::numeric::{self, NumericCondition, NumericEffect};
use crate::symbols::{ObjectId, SymbolTable, TypeId};
use std::collections::HashSet;

/// Classification of a schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaKind {
    /// A top-level action.
    Normal,
    /// A conditional-effect body owned by a parent schema.
    When,
    /// A universal-effect body owned by a parent schema.
    Forall,
}

/// Reference from a max-parameter bucket into one of the precondition
/// lists.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PreFact {
    pub(crate) negated: bool,
    pub(crate) index: usize,
}

const INCOMPATIBLE: u32 = u32::MAX;

/// A lifted action schema.
///
/// Schemas own their `whens` children exclusively and are deliberately not
/// `Clone`: sibling and domain relationships live in the symbol table, not
/// in the schema graph.
#[derive(Debug)]
pub struct ActionSchema {
    name: String,
    kind: SchemaKind,
    label: i32,
    time: Option<f64>,
    param_types: Vec<TypeId>,
    pub(crate) pre_add: Vec<(usize, SymbolicFact)>,
    pub(crate) pre_del: Vec<(usize, SymbolicFact)>,
    pub(crate) eff_add: Vec<(usize, SymbolicFact)>,
    pub(crate) eff_del: Vec<(usize, SymbolicFact)>,
    pub(crate) num_pre: Vec<(usize, NumericCondition)>,
    pub(crate) num_eff: Vec<(usize, NumericEffect)>,
    prefs: Vec<(String, (usize, Condition))>,
    ors: Vec<(usize, (Condition, Condition))>,
    implications: Vec<(usize, (Condition, Condition))>,
    pub(crate) whens: Vec<ActionSchema>,
    pub(crate) instantiations: Vec<Instantiation>,
    /// Per-parameter object domains narrowed by constant folding.
    pub(crate) restricted_domains: Vec<Option<HashSet<ObjectId>>>,
    /// True when a fully ground static precondition is initially false.
    pub(crate) unsatisfiable: bool,
    // Matching state, sized by the driver before instantiation.
    pub(crate) pre_by_max_par: Vec<Vec<PreFact>>,
    pub(crate) unary_pre: Vec<(usize, usize)>,
    pub(crate) precondition_count: Vec<Vec<u32>>,
    pub(crate) valid_arguments: Vec<Vec<ObjectId>>,
}

impl ActionSchema {
    fn empty(name: String, kind: SchemaKind, param_types: Vec<TypeId>, label: i32) -> Self {
        let n = param_types.len();
        Self {
            name,
            kind,
            label,
            time: None,
            param_types,
            pre_add: Vec::new(),
            pre_del: Vec::new(),
            eff_add: Vec::new(),
            eff_del: Vec::new(),
            num_pre: Vec::new(),
            num_eff: Vec::new(),
            prefs: Vec::new(),
            ors: Vec::new(),
            implications: Vec::new(),
            whens: Vec::new(),
            instantiations: Vec::new(),
            restricted_domains: vec![None; n],
            unsatisfiable: false,
            pre_by_max_par: Vec::new(),
            unary_pre: Vec::new(),
            precondition_count: Vec::new(),
            valid_arguments: Vec::new(),
        }
    }

    /// Lower a parsed action definition into a schema.
    ///
    /// Conjunctions are flattened, one layer of `forall` in conditions is
    /// unfolded over the quantified objects, conditional and universal
    /// effects become owned child schemas sharing this schema's parameter
    /// prefix, and disjunctions, implications, and preferences are recorded
    /// with the live parameter scope at their position.
    pub fn from_def(def: &ActionDef, symbols: &SymbolTable) -> Result<Self, GroundError> {
        let mut schema = Self::empty(
            def.name.clone(),
            SchemaKind::Normal,
            def.params.clone(),
            def.label,
        );
        schema.time = def.time;
        let scope = schema.parameter_count();
        schema.lower_condition(&def.precondition, scope, 0, symbols)?;
        schema.lower_effect(&def.effect, scope, symbols)?;
        Ok(schema)
    }

    fn check_fact(&self, fact: &SymbolicFact, scope: usize) -> Result<(), GroundError> {
        if let Some(max) = fact.max_param_index() {
            if max >= scope {
                return Err(GroundError::ParameterOutOfRange {
                    schema: self.name.clone(),
                    index: max,
                });
            }
        }
        Ok(())
    }

    fn lower_condition(
        &mut self,
        cond: &Condition,
        scope: usize,
        forall_depth: usize,
        symbols: &SymbolTable,
    ) -> Result<(), GroundError> {
        match cond {
            Condition::Literal { atom, negated } => {
                let fact = SymbolicFact::new(atom, symbols, &self.name)?;
                self.check_fact(&fact, scope)?;
                if *negated {
                    self.pre_del.push((scope, fact));
                } else {
                    self.pre_add.push((scope, fact));
                }
                Ok(())
            }
            Condition::And(cs) => {
                for c in cs {
                    self.lower_condition(c, scope, forall_depth, symbols)?;
                }
                Ok(())
            }
            Condition::Or(l, r) => {
                self.ors.push((scope, ((**l).clone(), (**r).clone())));
                Ok(())
            }
            Condition::Implies(l, r) => {
                self.implications
                    .push((scope, ((**l).clone(), (**r).clone())));
                Ok(())
            }
            Condition::Preference { name, body } => {
                self.prefs
                    .push((name.clone(), (scope, (**body).clone())));
                Ok(())
            }
            Condition::Numeric(nc) => {
                numeric::validate_condition(nc, scope, symbols, &self.name)?;
                self.num_pre.push((scope, nc.clone()));
                Ok(())
            }
            Condition::Forall { types, body } => {
                if forall_depth >= 1 {
                    return Err(GroundError::UnsupportedNesting {
                        schema: self.name.clone(),
                    });
                }
                let domains: Vec<Vec<ObjectId>> =
                    types.iter().map(|&t| symbols.objects_of_type(t)).collect();
                let mut assignment = vec![ObjectId(0); types.len()];
                self.unfold_forall(body, scope, symbols, &domains, &mut assignment, 0)
            }
        }
    }

    fn unfold_forall(
        &mut self,
        body: &Condition,
        scope: usize,
        symbols: &SymbolTable,
        domains: &[Vec<ObjectId>],
        assignment: &mut Vec<ObjectId>,
        depth: usize,
    ) -> Result<(), GroundError> {
        if depth == domains.len() {
            let expanded = body.substituted(scope, assignment);
            return self.lower_condition(&expanded, scope, 1, symbols);
        }
        for i in 0..domains[depth].len() {
            assignment[depth] = domains[depth][i];
            self.unfold_forall(body, scope, symbols, domains, assignment, depth + 1)?;
        }
        Ok(())
    }

    fn lower_effect(
        &mut self,
        eff: &Effect,
        scope: usize,
        symbols: &SymbolTable,
    ) -> Result<(), GroundError> {
        match eff {
            Effect::Add(atom) => {
                let fact = SymbolicFact::new(atom, symbols, &self.name)?;
                self.check_fact(&fact, scope)?;
                self.eff_add.push((scope, fact));
                Ok(())
            }
            Effect::Del(atom) => {
                let fact = SymbolicFact::new(atom, symbols, &self.name)?;
                self.check_fact(&fact, scope)?;
                self.eff_del.push((scope, fact));
                Ok(())
            }
            Effect::And(es) => {
                for e in es {
                    self.lower_effect(e, scope, symbols)?;
                }
                Ok(())
            }
            Effect::Numeric(ne) => {
                numeric::validate_effect(ne, scope, symbols, &self.name)?;
                self.num_eff.push((scope, ne.clone()));
                Ok(())
            }
            Effect::When { condition, body } => {
                let name = format!("{}-when-{}", self.name, self.whens.len() + 1);
                let mut child =
                    Self::empty(name, SchemaKind::When, self.param_types.clone(), self.label);
                let child_scope = child.parameter_count();
                child.lower_condition(condition, child_scope, 0, symbols)?;
                child.lower_effect(body, child_scope, symbols)?;
                self.whens.push(child);
                Ok(())
            }
            Effect::Forall { types, body } => {
                let name = format!("{}-forall-{}", self.name, self.whens.len() + 1);
                let mut params = self.param_types.clone();
                params.extend_from_slice(types);
                let mut child = Self::empty(name, SchemaKind::Forall, params, self.label);
                let child_scope = child.parameter_count();
                child.lower_effect(body, child_scope, symbols)?;
                self.whens.push(child);
                Ok(())
            }
        }
    }

    /// The schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The classification tag.
    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    /// The opaque label carried from the definition.
    pub fn label(&self) -> i32 {
        self.label
    }

    /// The fixed execution time, for timed schemas.
    pub fn time(&self) -> Option<f64> {
        self.time
    }

    /// Number of parameters.
    pub fn parameter_count(&self) -> usize {
        self.param_types.len()
    }

    /// Per-parameter types.
    pub fn param_types(&self) -> &[TypeId] {
        &self.param_types
    }

    /// The owned conditional/universal children.
    pub fn whens(&self) -> &[ActionSchema] {
        &self.whens
    }

    /// Positive precondition facts with their live-parameter scope.
    pub fn add_preconditions(&self) -> &[(usize, SymbolicFact)] {
        &self.pre_add
    }

    /// Negative precondition facts with their live-parameter scope.
    pub fn del_preconditions(&self) -> &[(usize, SymbolicFact)] {
        &self.pre_del
    }

    /// Add-effect facts with their live-parameter scope.
    pub fn add_effects(&self) -> &[(usize, SymbolicFact)] {
        &self.eff_add
    }

    /// Del-effect facts with their live-parameter scope.
    pub fn del_effects(&self) -> &[(usize, SymbolicFact)] {
        &self.eff_del
    }

    /// Numeric preconditions with their live-parameter scope.
    pub fn num_preconditions(&self) -> &[(usize, NumericCondition)] {
        &self.num_pre
    }

    /// Numeric effects with their live-parameter scope.
    pub fn num_effects(&self) -> &[(usize, NumericEffect)] {
        &self.num_eff
    }

    /// Carried-through preferences: `(name, (scope, condition))`.
    pub fn prefs(&self) -> &[(String, (usize, Condition))] {
        &self.prefs
    }

    /// Carried-through disjunctions: `(scope, (left, right))`.
    pub fn ors(&self) -> &[(usize, (Condition, Condition))] {
        &self.ors
    }

    /// Carried-through implications: `(scope, (left, right))`.
    pub fn implications(&self) -> &[(usize, (Condition, Condition))] {
        &self.implications
    }

    /// Non-unary precondition facts whose maximum referenced parameter is
    /// `max_par`, with their negation flag.
    pub fn preconditions_by_max_par(
        &self,
        max_par: usize,
    ) -> impl Iterator<Item = (&SymbolicFact, bool)> {
        self.pre_by_max_par
            .get(max_par)
            .into_iter()
            .flatten()
            .map(move |pf| {
                let fact = if pf.negated {
                    &self.pre_del[pf.index].1
                } else {
                    &self.pre_add[pf.index].1
                };
                (fact, pf.negated)
            })
    }

    /// Decrement the precondition countdown for `(par, obj)`.
    ///
    /// Returns true exactly when the count reaches zero, which admits the
    /// object into [`valid_arguments`](ActionSchema::valid_arguments).
    pub fn decrease_precondition_countdown(&mut self, par: usize, obj: ObjectId) -> bool {
        let slot = &mut self.precondition_count[par][obj.raw()];
        debug_assert!(*slot > 0, "countdown already exhausted");
        *slot -= 1;
        if *slot == 0 {
            self.valid_arguments[par].push(obj);
            return true;
        }
        false
    }

    /// The objects admitted so far for a parameter.
    pub fn valid_arguments(&self, par: usize) -> &[ObjectId] {
        &self.valid_arguments[par]
    }

    /// True iff every unary precondition on `par` is satisfied at `obj`.
    pub fn is_valid_argument(&self, par: usize, obj: ObjectId) -> bool {
        self.precondition_count[par][obj.raw()] == 0
    }

    /// Record a ground instantiation.
    pub fn log_instantiation(&mut self, inst: Instantiation) {
        self.instantiations.push(inst);
    }

    /// The recorded instantiations.
    pub fn instantiations(&self) -> &[Instantiation] {
        &self.instantiations
    }

    /// Sort the instantiations into canonical order and drop duplicates.
    ///
    /// Returns the number of records removed.
    pub fn erase_duplicates(&mut self) -> usize {
        let before = self.instantiations.len();
        self.instantiations.sort();
        self.instantiations.dedup();
        before - self.instantiations.len()
    }

    /// Drop instantiations whose add effects equal their del effects.
    ///
    /// The pass never runs on a schema with conditional children: their
    /// effective effects depend on condition evaluation. Returns the
    /// number of records removed.
    pub fn erase_noops(&mut self) -> usize {
        if !self.whens.is_empty() {
            return 0;
        }
        let before = self.instantiations.len();
        self.instantiations.retain(|i| !i.is_noop());
        before - self.instantiations.len()
    }

    /// Drop instantiations that reference no fluent atom at all.
    ///
    /// Returns the number of records removed.
    pub fn erase_constants(&mut self) -> usize {
        let before = self.instantiations.len();
        self.instantiations.retain(|i| !i.is_constant_only());
        before - self.instantiations.len()
    }

    pub(crate) fn init_matching_state(&mut self, symbols: &SymbolTable) {
        let n = self.parameter_count();
        let object_count = symbols.object_count();

        self.pre_by_max_par = vec![Vec::new(); n];
        self.unary_pre = Vec::new();
        for (index, (_, fact)) in self.pre_add.iter().enumerate() {
            match fact.distinct_param_count() {
                0 => {}
                1 => {
                    let par = fact.unary_param().unwrap();
                    self.unary_pre.push((par, index));
                }
                _ => {
                    let max = fact.max_param_index().unwrap();
                    self.pre_by_max_par[max].push(PreFact {
                        negated: false,
                        index,
                    });
                }
            }
        }
        for (index, (_, fact)) in self.pre_del.iter().enumerate() {
            if let Some(max) = fact.max_param_index() {
                self.pre_by_max_par[max].push(PreFact {
                    negated: true,
                    index,
                });
            }
        }

        // One extra countdown unit per object covers the type/domain
        // compatibility check, so reaching zero stays the only admission
        // trigger.
        self.precondition_count = Vec::with_capacity(n);
        for par in 0..n {
            let unary = self.unary_pre.iter().filter(|(p, _)| *p == par).count() as u32;
            let mut row = vec![INCOMPATIBLE; object_count];
            for (slot, entry) in row.iter_mut().enumerate() {
                let obj = ObjectId(slot);
                if self.object_compatible(par, obj, symbols) {
                    *entry = unary + 1;
                }
            }
            self.precondition_count.push(row);
        }
        self.valid_arguments = vec![Vec::new(); n];

        for child in &mut self.whens {
            child.init_matching_state(symbols);
        }
    }

    /// Burn down the countdown against the true/fluent heads: first the
    /// compatibility unit for every type- and domain-admissible object,
    /// then one unit per satisfied unary precondition.
    pub(crate) fn seed_countdown(&mut self, symbols: &SymbolTable, index: &AtomIndex) {
        let n = self.parameter_count();
        let object_count = symbols.object_count();
        for par in 0..n {
            for raw in 0..object_count {
                if self.precondition_count[par][raw] != INCOMPATIBLE {
                    self.decrease_precondition_countdown(par, ObjectId(raw));
                }
            }
        }
        let unary = self.unary_pre.clone();
        for (par, idx) in unary {
            let fact = self.pre_add[idx].1.clone();
            for raw in 0..object_count {
                if self.precondition_count[par][raw] == INCOMPATIBLE {
                    continue;
                }
                let obj = ObjectId(raw);
                if index.possibly_true(fact.ground_single(par, obj, symbols)) {
                    self.decrease_precondition_countdown(par, obj);
                }
            }
        }
        for child in &mut self.whens {
            child.seed_countdown(symbols, index);
        }
    }

    fn object_compatible(&self, par: usize, obj: ObjectId, symbols: &SymbolTable) -> bool {
        if !symbols.is_subtype(symbols.object_type(obj), self.param_types[par]) {
            return false;
        }
        match &self.restricted_domains[par] {
            Some(domain) => domain.contains(&obj),
            None => true,
        }
    }

    pub(crate) fn collect_effect_atoms(
        &self,
        symbols: &SymbolTable,
        out: &mut HashSet<crate::symbols::AtomCode>,
    ) {
        for (_, fact) in self.eff_add.iter().chain(self.eff_del.iter()) {
            self.collect_fact_atoms(fact, symbols, out);
        }
        for child in &self.whens {
            child.collect_effect_atoms(symbols, out);
        }
    }

    fn collect_fact_atoms(
        &self,
        fact: &SymbolicFact,
        symbols: &SymbolTable,
        out: &mut HashSet<crate::symbols::AtomCode>,
    ) {
        let mut params: Vec<usize> = fact
            .args()
            .iter()
            .filter_map(|t| match t {
                crate::ast::Term::Param(i) => Some(*i),
                crate::ast::Term::Object(_) => None,
            })
            .collect();
        params.sort_unstable();
        params.dedup();

        let domains: Vec<Vec<ObjectId>> = params
            .iter()
            .map(|&p| symbols.objects_of_type(self.param_types[p]))
            .collect();
        if domains.iter().any(|d| d.is_empty()) && !params.is_empty() {
            return;
        }

        let max_par = params.iter().copied().max().map_or(0, |m| m + 1);
        let mut binding = vec![ObjectId(0); max_par];
        let mut digits = vec![0usize; params.len()];
        loop {
            for (j, &p) in params.iter().enumerate() {
                binding[p] = domains[j][digits[j]];
            }
            out.insert(fact.ground(&binding, symbols));
            let mut advanced = false;
            for j in 0..digits.len() {
                if digits[j] + 1 < domains[j].len() {
                    digits[j] += 1;
                    advanced = true;
                    break;
                }
                digits[j] = 0;
            }
            if !advanced {
                break;
            }
        }
    }
}
