//! Static-predicate analysis and constant folding.
//!
//! A predicate is **static** when no schema in the domain (children
//! included) ever adds or deletes it: its ground atoms keep their
//! initial-state truth value forever. Static preconditions therefore
//! partition the object space into finite domains, and folding them into
//! per-parameter restrictions before enumeration shrinks the Cartesian
//! product instead of filtering it.

use crate::fact::SymbolicFact;
use crate::schema::ActionSchema;
use crate::symbols::{AtomCode, ObjectId, SymbolTable};
use std::collections::HashSet;

/// Mark every predicate that appears in no effect of any schema.
///
/// Indexed by predicate id; `true` means static.
pub fn find_static_predicates(schemas: &[ActionSchema], symbols: &SymbolTable) -> Vec<bool> {
    let mut statics = vec![true; symbols.predicate_count()];
    for schema in schemas {
        mark_effects(schema, &mut statics);
    }
    statics
}

fn mark_effects(schema: &ActionSchema, statics: &mut [bool]) {
    for (_, fact) in schema.eff_add.iter().chain(schema.eff_del.iter()) {
        statics[fact.predicate().raw()] = false;
    }
    for child in schema.whens() {
        mark_effects(child, statics);
    }
}

/// Fold static positive preconditions into parameter-domain restrictions
/// and drop them from the schema body.
///
/// A fully ground static fact that is initially false marks the schema
/// unsatisfiable. A fact over a single parameter narrows that parameter's
/// domain to the objects making the fact initially true. Facts over two or
/// more parameters stay in the body and are pruned by the bucketed engine
/// checks. Children are folded recursively.
pub fn fold_constant_preconditions(
    schema: &mut ActionSchema,
    statics: &[bool],
    init_true: &HashSet<AtomCode>,
    symbols: &SymbolTable,
) {
    let mut kept = Vec::with_capacity(schema.pre_add.len());
    let facts = std::mem::take(&mut schema.pre_add);
    for (scope, fact) in facts {
        if !statics[fact.predicate().raw()] {
            kept.push((scope, fact));
            continue;
        }
        match fact.distinct_param_count() {
            0 => {
                let code = fact.ground(&[], symbols);
                if !init_true.contains(&code) {
                    schema.unsatisfiable = true;
                }
            }
            1 => {
                let par = fact.unary_param().unwrap();
                let allowed = satisfying_objects(&fact, par, init_true, symbols);
                restrict_domain(schema, par, allowed);
            }
            _ => kept.push((scope, fact)),
        }
    }
    schema.pre_add = kept;

    for child in &mut schema.whens {
        fold_constant_preconditions(child, statics, init_true, symbols);
    }
}

fn satisfying_objects(
    fact: &SymbolicFact,
    par: usize,
    init_true: &HashSet<AtomCode>,
    symbols: &SymbolTable,
) -> HashSet<ObjectId> {
    let mut allowed = HashSet::new();
    for raw in 0..symbols.object_count() {
        let obj = ObjectId(raw);
        if init_true.contains(&fact.ground_single(par, obj, symbols)) {
            allowed.insert(obj);
        }
    }
    allowed
}

fn restrict_domain(schema: &mut ActionSchema, par: usize, allowed: HashSet<ObjectId>) {
    let slot = &mut schema.restricted_domains[par];
    match slot {
        Some(existing) => {
            existing.retain(|o| allowed.contains(o));
        }
        None => *slot = Some(allowed),
    }
}
