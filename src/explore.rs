//! The grounding driver.
//!
//! [`ExploreStep`] owns the run: it lowers the parsed definitions into
//! schemas, checks the initial state, folds constant predicates, builds the
//! true/fluent atom heads, sizes and seeds every schema's matching state,
//! runs the engine per schema (sequentially or rayon-parallel across
//! schemas), expands conditional and universal children under each
//! surviving parent binding, converts timed initial literals into
//! fixed-time actions, and assembles the final [`GroundTask`].
//!
//! The driver is the designated mutator of the schemas' matching-state
//! shape; everything it shares with the engine afterwards is read-only.

use crate::ast::{DomainDef, ProblemDef};
use crate::error::{Diagnostics, GroundError, Warning};
use crate::instantiate::{self, MatchContext};
use crate::merge::MergedPredicate;
use crate::numeric::{GroundNumericCondition, GroundNumericEffect};
use crate::scanner;
use crate::schema::ActionSchema;
use crate::stats::{GroundingStats, SchemaStats};
use crate::symbols::{AtomCode, FluentCode, ObjectId, SymbolTable};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// How to execute the per-schema grounding loop.
#[derive(Clone, Copy, Debug, Default)]
pub enum GroundMode {
    /// Single-threaded, schema order.
    #[default]
    Sequential,
    /// Rayon-parallel across schemas; results are identical to sequential
    /// mode because each schema's matching state is private.
    Parallel {
        /// Worker threads; defaults from the machine's CPU count.
        threads: Option<usize>,
    },
}

/// Driver configuration. Passed explicitly; the crate keeps no globals.
#[derive(Clone, Debug)]
pub struct GroundConfig {
    pub mode: GroundMode,
    /// Whether to run the constant-only erase pass.
    pub prune_constants: bool,
    /// Cooperative cancellation flag, checked at schema boundaries.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            mode: GroundMode::Sequential,
            prune_constants: true,
            cancel: None,
        }
    }
}

const DENSE_LIMIT: usize = 1 << 22;

enum CodeSet {
    Dense(Vec<bool>),
    Sparse(Vec<AtomCode>),
}

impl CodeSet {
    fn build(set: &HashSet<AtomCode>, universe: usize) -> Self {
        if universe <= DENSE_LIMIT {
            let mut dense = vec![false; universe];
            for &c in set {
                dense[c] = true;
            }
            CodeSet::Dense(dense)
        } else {
            let mut sparse: Vec<AtomCode> = set.iter().copied().collect();
            sparse.sort_unstable();
            CodeSet::Sparse(sparse)
        }
    }

    fn contains(&self, code: AtomCode) -> bool {
        match self {
            CodeSet::Dense(v) => v.get(code).copied().unwrap_or(false),
            CodeSet::Sparse(v) => v.binary_search(&code).is_ok(),
        }
    }
}

/// Membership index over the true and fluent atom heads.
///
/// `true` atoms hold initially (or at their fixed time); `fluent` atoms can
/// be toggled by some schema. The four derived queries drive every
/// engine-side satisfiability check.
pub struct AtomIndex {
    true_atoms: CodeSet,
    fluent_atoms: CodeSet,
}

impl AtomIndex {
    pub(crate) fn new(
        true_set: &HashSet<AtomCode>,
        fluent_set: &HashSet<AtomCode>,
        atom_count: usize,
    ) -> Self {
        Self {
            true_atoms: CodeSet::build(true_set, atom_count),
            fluent_atoms: CodeSet::build(fluent_set, atom_count),
        }
    }

    /// The atom holds initially.
    pub fn is_true(&self, code: AtomCode) -> bool {
        self.true_atoms.contains(code)
    }

    /// Some schema can toggle the atom.
    pub fn is_fluent(&self, code: AtomCode) -> bool {
        self.fluent_atoms.contains(code)
    }

    /// The atom can hold at some point.
    pub fn possibly_true(&self, code: AtomCode) -> bool {
        self.is_true(code) || self.is_fluent(code)
    }

    /// The atom holds initially and nothing can retract it.
    pub fn statically_true(&self, code: AtomCode) -> bool {
        self.is_true(code) && !self.is_fluent(code)
    }

    /// The atom never holds.
    pub fn statically_false(&self, code: AtomCode) -> bool {
        !self.is_true(code) && !self.is_fluent(code)
    }

    /// The atom can be absent at some point.
    pub fn possibly_false(&self, code: AtomCode) -> bool {
        !self.statically_true(code)
    }
}

/// A schema set with sized matching state, ready to instantiate.
pub struct Prepared {
    /// The lowered, folded, countdown-seeded schemas.
    pub schemas: Vec<ActionSchema>,
    index: AtomIndex,
    initial_atoms: Vec<AtomCode>,
    initial_fluents: Vec<(FluentCode, f64)>,
    timed: Vec<(f64, AtomCode)>,
}

impl Prepared {
    /// The true/fluent membership index.
    pub fn atom_index(&self) -> &AtomIndex {
        &self.index
    }

    /// The initial-state atom codes, sorted.
    pub fn initial_atoms(&self) -> &[AtomCode] {
        &self.initial_atoms
    }
}

/// One fully ground action instance.
#[derive(Clone, Debug, Serialize)]
pub struct GroundAction {
    /// Rendered name, e.g. `pickup(a)`.
    pub name: String,
    /// Name of the originating schema.
    pub schema: String,
    /// The bound parameter tuple.
    pub parameters: Vec<ObjectId>,
    /// Compacted positive precondition codes.
    pub preconditions: Vec<AtomCode>,
    /// Compacted negative precondition codes.
    pub negative_preconditions: Vec<AtomCode>,
    /// Compacted add-effect codes.
    pub add: Vec<AtomCode>,
    /// Compacted del-effect codes.
    pub del: Vec<AtomCode>,
    /// Ground numeric preconditions.
    pub num_pre: Vec<GroundNumericCondition>,
    /// Ground numeric effects.
    pub num_eff: Vec<GroundNumericEffect>,
    /// True for conditional/universal children.
    pub derived: bool,
    /// Fixed execution time, if any.
    pub time: Option<f64>,
}

/// The propositional output handed to the search engine.
#[derive(Debug, Default, Serialize)]
pub struct GroundTask {
    /// Ground actions: schemas in definition order, canonical order within
    /// a schema, each parent's derived children after the parent's block.
    pub actions: Vec<GroundAction>,
    /// Initial-state atom codes, sorted.
    pub initial_atoms: Vec<AtomCode>,
    /// Initial numeric fluent assignments.
    pub initial_fluents: Vec<(FluentCode, f64)>,
    /// Fact groups contributed by the merged-predicate directory.
    pub fact_groups: Vec<Vec<AtomCode>>,
    /// Ground-name to action-index map for diagnostics.
    pub name_index: HashMap<String, usize>,
    /// Per-schema grounding statistics.
    pub stats: GroundingStats,
    /// Warnings collected during the run.
    pub diagnostics: Diagnostics,
}

impl GroundTask {
    /// Look up a ground action by its rendered name.
    pub fn action_named(&self, name: &str) -> Option<&GroundAction> {
        self.name_index.get(name).map(|&i| &self.actions[i])
    }
}

/// The grounding driver.
pub struct ExploreStep<'a> {
    symbols: &'a SymbolTable,
    config: GroundConfig,
}

impl<'a> ExploreStep<'a> {
    /// Create a driver over a frozen symbol table.
    pub fn new(symbols: &'a SymbolTable, config: GroundConfig) -> Self {
        assert!(symbols.is_frozen(), "symbol table must be frozen");
        Self { symbols, config }
    }

    /// The symbol table the driver grounds against.
    pub fn symbols(&self) -> &SymbolTable {
        self.symbols
    }

    /// Ground a domain against a problem and a merged-predicate directory.
    pub fn ground(
        &self,
        domain: &DomainDef,
        problem: &ProblemDef,
        merges: &[MergedPredicate],
    ) -> Result<GroundTask> {
        let prepared = self.prepare(domain, problem)?;
        self.run(prepared, merges)
    }

    /// Lower, validate, fold, and seed: everything up to enumeration.
    pub fn prepare(&self, domain: &DomainDef, problem: &ProblemDef) -> Result<Prepared> {
        let mut schemas = Vec::with_capacity(domain.actions.len());
        for def in &domain.actions {
            let schema = ActionSchema::from_def(def, self.symbols)
                .with_context(|| format!("lowering action '{}'", def.name))?;
            schemas.push(schema);
        }

        let init_true = self.checked_initial_state(problem)?;
        let initial_fluents = self.checked_initial_fluents(problem)?;
        let timed = self.checked_timed_literals(problem)?;

        let mut statics = scanner::find_static_predicates(&schemas, self.symbols);
        // A timed literal changes its predicate's truth over time.
        for tl in &problem.timed {
            statics[tl.predicate.raw()] = false;
        }
        for schema in &mut schemas {
            scanner::fold_constant_preconditions(schema, &statics, &init_true, self.symbols);
        }

        let mut fluent_set = HashSet::new();
        for schema in &schemas {
            schema.collect_effect_atoms(self.symbols, &mut fluent_set);
        }
        for &(_, code) in &timed {
            fluent_set.insert(code);
        }

        let index = AtomIndex::new(&init_true, &fluent_set, self.symbols.atom_count());
        for schema in &mut schemas {
            schema.init_matching_state(self.symbols);
            schema.seed_countdown(self.symbols, &index);
        }

        let mut initial_atoms: Vec<AtomCode> = init_true.into_iter().collect();
        initial_atoms.sort_unstable();

        Ok(Prepared {
            schemas,
            index,
            initial_atoms,
            initial_fluents,
            timed,
        })
    }

    /// Instantiate every prepared schema and assemble the ground task.
    pub fn run(&self, prepared: Prepared, merges: &[MergedPredicate]) -> Result<GroundTask> {
        let Prepared {
            mut schemas,
            index,
            initial_atoms,
            initial_fluents,
            timed,
        } = prepared;
        let ctx = MatchContext {
            symbols: self.symbols,
            index: &index,
        };

        let outcomes: Vec<(Vec<SchemaStats>, Diagnostics)> = match self.config.mode {
            GroundMode::Sequential => {
                let mut out = Vec::with_capacity(schemas.len());
                for schema in &mut schemas {
                    if self.cancelled() {
                        return Err(GroundError::Cancelled.into());
                    }
                    out.push(process_schema(schema, &ctx, &self.config));
                }
                out
            }
            GroundMode::Parallel { threads } => {
                let threads = threads.unwrap_or_else(|| num_cpus::get().max(2));
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .context("building grounding thread pool")?;
                let cancel = self.config.cancel.clone();
                pool.install(|| {
                    schemas
                        .par_iter_mut()
                        .map(|schema| {
                            if let Some(flag) = &cancel {
                                if flag.load(Ordering::Relaxed) {
                                    return Err(GroundError::Cancelled);
                                }
                            }
                            Ok(process_schema(schema, &ctx, &self.config))
                        })
                        .collect::<Result<Vec<_>, GroundError>>()
                })?
            }
        };

        let mut stats = GroundingStats::new();
        let mut diagnostics = Diagnostics::new();
        for (schema_stats, diag) in outcomes {
            for s in schema_stats {
                stats.record(s);
            }
            diagnostics.merge(diag);
        }

        let mut fact_groups = Vec::new();
        for merge in merges {
            fact_groups.extend(merge.fact_groups(self.symbols, &mut diagnostics));
        }

        let mut actions = Vec::new();
        let mut name_index = HashMap::new();
        for schema in &schemas {
            collect_actions(schema, false, self.symbols, &mut actions, &mut name_index);
        }
        for &(time, code) in &timed {
            let name = format!("{}@{}", self.symbols.display_atom(code), time);
            name_index.insert(name.clone(), actions.len());
            actions.push(GroundAction {
                name,
                schema: "timed-initial-literal".to_string(),
                parameters: Vec::new(),
                preconditions: Vec::new(),
                negative_preconditions: Vec::new(),
                add: vec![code],
                del: Vec::new(),
                num_pre: Vec::new(),
                num_eff: Vec::new(),
                derived: false,
                time: Some(time),
            });
        }

        Ok(GroundTask {
            actions,
            initial_atoms,
            initial_fluents,
            fact_groups,
            name_index,
            stats,
            diagnostics,
        })
    }

    fn cancelled(&self) -> bool {
        self.config
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn checked_initial_state(&self, problem: &ProblemDef) -> Result<HashSet<AtomCode>> {
        let mut pos = HashSet::new();
        let mut neg = HashSet::new();
        for lit in &problem.init {
            let code = self.checked_atom(lit.predicate, &lit.args, "initial state")?;
            if lit.negated {
                neg.insert(code);
            } else {
                pos.insert(code);
            }
        }
        if let Some(&code) = pos.intersection(&neg).next() {
            return Err(GroundError::InconsistentInitialState {
                atom: self.symbols.display_atom(code),
            }
            .into());
        }
        Ok(pos)
    }

    fn checked_initial_fluents(&self, problem: &ProblemDef) -> Result<Vec<(FluentCode, f64)>> {
        let mut out = Vec::with_capacity(problem.fluents.len());
        for init in &problem.fluents {
            if !self.symbols.valid_function(init.function.raw()) {
                return Err(GroundError::UnknownFunction {
                    context: "initial fluents".to_string(),
                    id: init.function.raw(),
                }
                .into());
            }
            let expected = self.symbols.function_arity(init.function);
            if init.args.len() != expected {
                return Err(GroundError::ArityMismatch {
                    context: "initial fluents".to_string(),
                    name: self.symbols.function_name(init.function).to_string(),
                    expected,
                    found: init.args.len(),
                }
                .into());
            }
            out.push((
                self.symbols.encode_fluent(init.function, &init.args),
                init.value,
            ));
        }
        Ok(out)
    }

    fn checked_timed_literals(&self, problem: &ProblemDef) -> Result<Vec<(f64, AtomCode)>> {
        let mut out = Vec::with_capacity(problem.timed.len());
        for tl in &problem.timed {
            let code = self.checked_atom(tl.predicate, &tl.args, "timed initial literal")?;
            out.push((tl.time, code));
        }
        Ok(out)
    }

    fn checked_atom(
        &self,
        predicate: crate::symbols::PredicateId,
        args: &[ObjectId],
        context: &str,
    ) -> Result<AtomCode, GroundError> {
        if !self.symbols.valid_predicate(predicate.raw()) {
            return Err(GroundError::UnknownPredicate {
                context: context.to_string(),
                id: predicate.raw(),
            });
        }
        let expected = self.symbols.predicate_arity(predicate);
        if args.len() != expected {
            return Err(GroundError::ArityMismatch {
                context: context.to_string(),
                name: self.symbols.predicate_name(predicate).to_string(),
                expected,
                found: args.len(),
            });
        }
        Ok(self.symbols.encode_atom(predicate, args))
    }
}

/// Run the full per-schema pipeline: enumerate, erase, expand children.
fn process_schema(
    schema: &mut ActionSchema,
    ctx: &MatchContext<'_>,
    config: &GroundConfig,
) -> (Vec<SchemaStats>, Diagnostics) {
    let mut stats = Vec::new();
    let mut diags = Diagnostics::new();
    process_with_prefixes(schema, ctx, config, &[Vec::new()], false, &mut stats, &mut diags);
    (stats, diags)
}

/// Returns the number of records this schema's enumeration emitted, so a
/// parent can record the sum over its direct children.
fn process_with_prefixes(
    schema: &mut ActionSchema,
    ctx: &MatchContext<'_>,
    config: &GroundConfig,
    prefixes: &[Vec<ObjectId>],
    derived: bool,
    stats: &mut Vec<SchemaStats>,
    diags: &mut Diagnostics,
) -> usize {
    let enumerated = instantiate::instantiate_schema(schema, ctx, prefixes);
    let duplicates_removed = schema.erase_duplicates();
    let noops_removed = schema.erase_noops();
    // Constant pruning runs on leaf schemas only; a parent record anchors
    // its children.
    let constants_removed = if config.prune_constants && schema.whens.is_empty() {
        schema.erase_constants()
    } else {
        0
    };
    let surviving = schema.instantiations().len();
    if surviving == 0 {
        diags.warn(Warning::EmptyGroundSet {
            schema: schema.name().to_string(),
        });
    }
    let row = stats.len();
    stats.push(SchemaStats {
        schema: schema.name().to_string(),
        derived,
        enumerated,
        duplicates_removed,
        noops_removed,
        constants_removed,
        children_emitted: 0,
        surviving,
    });

    if schema.whens.is_empty() {
        return enumerated;
    }
    let child_prefixes: Vec<Vec<ObjectId>> = schema
        .instantiations
        .iter()
        .map(|i| i.parameters().to_vec())
        .collect();
    if child_prefixes.is_empty() {
        return enumerated;
    }
    let mut children_emitted = 0;
    for child in &mut schema.whens {
        children_emitted +=
            process_with_prefixes(child, ctx, config, &child_prefixes, true, stats, diags);
    }
    stats[row].children_emitted = children_emitted;
    enumerated
}

fn collect_actions(
    schema: &ActionSchema,
    derived: bool,
    symbols: &SymbolTable,
    actions: &mut Vec<GroundAction>,
    name_index: &mut HashMap<String, usize>,
) {
    for inst in schema.instantiations() {
        let name = render_name(schema.name(), inst.parameters(), symbols);
        name_index.insert(name.clone(), actions.len());
        actions.push(GroundAction {
            name,
            schema: schema.name().to_string(),
            parameters: inst.parameters().to_vec(),
            preconditions: inst.pre_add().to_vec(),
            negative_preconditions: inst.pre_del().to_vec(),
            add: inst.eff_add().to_vec(),
            del: inst.eff_del().to_vec(),
            num_pre: inst.num_pre().to_vec(),
            num_eff: inst.num_eff().to_vec(),
            derived,
            time: schema.time(),
        });
    }
    for child in schema.whens() {
        collect_actions(child, true, symbols, actions, name_index);
    }
}

fn render_name(schema: &str, parameters: &[ObjectId], symbols: &SymbolTable) -> String {
    if parameters.is_empty() {
        return schema.to_string();
    }
    let names: Vec<&str> = parameters.iter().map(|&o| symbols.object_name(o)).collect();
    format!("{}({})", schema, names.join(", "))
}
