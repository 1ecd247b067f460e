//! Symbol table: types, objects, predicates, numeric functions, and the
//! ground atom/fluent numbering.
//!
//! The table is built mutably (`add_*`), then **frozen** once. Freezing
//! assigns every predicate a contiguous atom-code range and every numeric
//! function a contiguous fluent-code range; afterwards the numbering is
//! immutable and shared read-only by the whole engine.
//!
//! The numbering is the invariant everything else honors: with `O` objects,
//! the ground atom of predicate `p` (arity `k`, range base `L(p)`) applied
//! to objects `(o₀, …, o_{k-1})` has code
//!
//! ```text
//! L(p) + Σ oᵢ · O^(k-1-i)
//! ```
//!
//! and decoding is the exact inverse. Fluent codes follow the same scheme
//! over the numeric functions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Code of a ground (propositional) atom.
pub type AtomCode = usize;

/// Code of a ground numeric fluent.
pub type FluentCode = usize;

/// Handle to a type in the symbol table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct TypeId(pub(crate) usize);

/// Handle to an object in the symbol table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct ObjectId(pub(crate) usize);

/// Handle to a predicate in the symbol table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct PredicateId(pub(crate) usize);

/// Handle to a numeric function in the symbol table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct FunctionId(pub(crate) usize);

impl TypeId {
    /// The underlying numeric value.
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl ObjectId {
    /// The underlying object code in `[0..O)`.
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl PredicateId {
    /// The underlying numeric value.
    pub fn raw(&self) -> usize {
        self.0
    }
}

impl FunctionId {
    /// The underlying numeric value.
    pub fn raw(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct TypeEntry {
    name: String,
    parents: Vec<TypeId>,
}

#[derive(Debug, Clone)]
struct ObjectEntry {
    name: String,
    ty: TypeId,
}

#[derive(Debug, Clone)]
struct PredicateEntry {
    name: String,
    param_types: Vec<TypeId>,
    fact_base: usize,
}

#[derive(Debug, Clone)]
struct FunctionEntry {
    name: String,
    param_types: Vec<TypeId>,
    fluent_base: usize,
}

/// Owns the planning symbols and the ground numbering.
///
/// A fresh table carries the root type `object`. All `add_*` calls must
/// happen before [`freeze`](SymbolTable::freeze); all encoding/decoding
/// after it.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    types: Vec<TypeEntry>,
    objects: Vec<ObjectEntry>,
    predicates: Vec<PredicateEntry>,
    functions: Vec<FunctionEntry>,
    type_names: HashMap<String, usize>,
    object_names: HashMap<String, usize>,
    predicate_names: HashMap<String, usize>,
    function_names: HashMap<String, usize>,
    atom_count: usize,
    fluent_count: usize,
    frozen: bool,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Create a table holding only the root type `object`.
    pub fn new() -> Self {
        let mut table = Self {
            types: Vec::new(),
            objects: Vec::new(),
            predicates: Vec::new(),
            functions: Vec::new(),
            type_names: HashMap::new(),
            object_names: HashMap::new(),
            predicate_names: HashMap::new(),
            function_names: HashMap::new(),
            atom_count: 0,
            fluent_count: 0,
            frozen: false,
        };
        table.type_names.insert("object".to_string(), 0);
        table.types.push(TypeEntry {
            name: "object".to_string(),
            parents: Vec::new(),
        });
        table
    }

    /// The root type every other type descends from.
    pub fn top_type(&self) -> TypeId {
        TypeId(0)
    }

    /// Register a type with the given parents (the type DAG).
    pub fn add_type(&mut self, name: &str, parents: &[TypeId]) -> TypeId {
        assert!(!self.frozen, "symbol table is frozen");
        let id = self.types.len();
        self.type_names.insert(name.to_string(), id);
        self.types.push(TypeEntry {
            name: name.to_string(),
            parents: parents.to_vec(),
        });
        TypeId(id)
    }

    /// Register an object of the given type. Objects are numbered `[0..O)`
    /// in registration order.
    pub fn add_object(&mut self, name: &str, ty: TypeId) -> ObjectId {
        assert!(!self.frozen, "symbol table is frozen");
        let id = self.objects.len();
        self.object_names.insert(name.to_string(), id);
        self.objects.push(ObjectEntry {
            name: name.to_string(),
            ty,
        });
        ObjectId(id)
    }

    /// Register a predicate with typed parameter slots.
    pub fn add_predicate(&mut self, name: &str, param_types: &[TypeId]) -> PredicateId {
        assert!(!self.frozen, "symbol table is frozen");
        let id = self.predicates.len();
        self.predicate_names.insert(name.to_string(), id);
        self.predicates.push(PredicateEntry {
            name: name.to_string(),
            param_types: param_types.to_vec(),
            fact_base: 0,
        });
        PredicateId(id)
    }

    /// Register a numeric function with typed parameter slots.
    pub fn add_function(&mut self, name: &str, param_types: &[TypeId]) -> FunctionId {
        assert!(!self.frozen, "symbol table is frozen");
        let id = self.functions.len();
        self.function_names.insert(name.to_string(), id);
        self.functions.push(FunctionEntry {
            name: name.to_string(),
            param_types: param_types.to_vec(),
            fluent_base: 0,
        });
        FunctionId(id)
    }

    /// Assign the atom and fluent code ranges and lock the table.
    ///
    /// Freezing twice is a no-op.
    pub fn freeze(&mut self) {
        if self.frozen {
            return;
        }
        let o = self.objects.len();
        let mut base = 0usize;
        for p in &mut self.predicates {
            p.fact_base = base;
            base += Self::power(o, p.param_types.len());
        }
        self.atom_count = base;
        let mut base = 0usize;
        for f in &mut self.functions {
            f.fluent_base = base;
            base += Self::power(o, f.param_types.len());
        }
        self.fluent_count = base;
        self.frozen = true;
    }

    /// True once [`freeze`](SymbolTable::freeze) has run.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Number of registered objects, `O`.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Total number of ground atom codes.
    pub fn atom_count(&self) -> usize {
        assert!(self.frozen, "symbol table must be frozen");
        self.atom_count
    }

    /// Total number of ground fluent codes.
    pub fn fluent_count(&self) -> usize {
        assert!(self.frozen, "symbol table must be frozen");
        self.fluent_count
    }

    /// Number of registered predicates.
    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    /// Look up a type by name.
    pub fn type_named(&self, name: &str) -> Option<TypeId> {
        self.type_names.get(name).copied().map(TypeId)
    }

    /// Look up an object by name.
    pub fn object_named(&self, name: &str) -> Option<ObjectId> {
        self.object_names.get(name).copied().map(ObjectId)
    }

    /// Look up a predicate by name.
    pub fn predicate_named(&self, name: &str) -> Option<PredicateId> {
        self.predicate_names.get(name).copied().map(PredicateId)
    }

    /// Look up a numeric function by name.
    pub fn function_named(&self, name: &str) -> Option<FunctionId> {
        self.function_names.get(name).copied().map(FunctionId)
    }

    /// Name of a type.
    pub fn type_name(&self, t: TypeId) -> &str {
        &self.types[t.0].name
    }

    /// Name of an object.
    pub fn object_name(&self, o: ObjectId) -> &str {
        &self.objects[o.0].name
    }

    /// Name of a predicate.
    pub fn predicate_name(&self, p: PredicateId) -> &str {
        &self.predicates[p.0].name
    }

    /// Name of a numeric function.
    pub fn function_name(&self, f: FunctionId) -> &str {
        &self.functions[f.0].name
    }

    /// The type tag of an object.
    pub fn object_type(&self, o: ObjectId) -> TypeId {
        self.objects[o.0].ty
    }

    /// Arity of a predicate.
    pub fn predicate_arity(&self, p: PredicateId) -> usize {
        self.predicates[p.0].param_types.len()
    }

    /// Typed parameter slots of a predicate.
    pub fn predicate_param_types(&self, p: PredicateId) -> &[TypeId] {
        &self.predicates[p.0].param_types
    }

    /// Arity of a numeric function.
    pub fn function_arity(&self, f: FunctionId) -> usize {
        self.functions[f.0].param_types.len()
    }

    pub(crate) fn valid_predicate(&self, id: usize) -> bool {
        id < self.predicates.len()
    }

    pub(crate) fn valid_function(&self, id: usize) -> bool {
        id < self.functions.len()
    }

    /// True if `t` equals `ancestor` or descends from it in the type DAG.
    pub fn is_subtype(&self, t: TypeId, ancestor: TypeId) -> bool {
        if t == ancestor {
            return true;
        }
        let mut stack = vec![t];
        let mut seen = vec![false; self.types.len()];
        while let Some(cur) = stack.pop() {
            if seen[cur.0] {
                continue;
            }
            seen[cur.0] = true;
            for &parent in &self.types[cur.0].parents {
                if parent == ancestor {
                    return true;
                }
                stack.push(parent);
            }
        }
        false
    }

    /// All objects whose type descends from `t`, in object-code order.
    pub fn objects_of_type(&self, t: TypeId) -> Vec<ObjectId> {
        (0..self.objects.len())
            .map(ObjectId)
            .filter(|&o| self.is_subtype(self.objects[o.0].ty, t))
            .collect()
    }

    /// Lower bound of the atom-code range of a predicate.
    pub fn fact_lower_bound(&self, p: PredicateId) -> AtomCode {
        assert!(self.frozen, "symbol table must be frozen");
        self.predicates[p.0].fact_base
    }

    /// Exclusive upper bound of the atom-code range of a predicate,
    /// `L(p) + O^arity(p)`.
    pub fn fact_upper_bound(&self, p: PredicateId) -> AtomCode {
        let entry = &self.predicates[p.0];
        self.fact_lower_bound(p) + Self::power(self.objects.len(), entry.param_types.len())
    }

    /// Lower bound of the fluent-code range of a numeric function.
    pub fn fluent_lower_bound(&self, f: FunctionId) -> FluentCode {
        assert!(self.frozen, "symbol table must be frozen");
        self.functions[f.0].fluent_base
    }

    /// Encode a ground atom into its code.
    pub fn encode_atom(&self, p: PredicateId, args: &[ObjectId]) -> AtomCode {
        debug_assert_eq!(args.len(), self.predicate_arity(p));
        let o = self.objects.len();
        let k = args.len();
        let mut code = self.fact_lower_bound(p);
        for (i, arg) in args.iter().enumerate() {
            code += arg.0 * Self::power(o, k - 1 - i);
        }
        code
    }

    /// Decode an atom code back into its predicate and object tuple.
    ///
    /// Exact inverse of [`encode_atom`](SymbolTable::encode_atom).
    pub fn decode_atom(&self, code: AtomCode) -> (PredicateId, Vec<ObjectId>) {
        assert!(self.frozen, "symbol table must be frozen");
        let idx = self
            .predicates
            .partition_point(|p| p.fact_base <= code)
            .saturating_sub(1);
        let entry = &self.predicates[idx];
        let o = self.objects.len();
        let k = entry.param_types.len();
        let mut offset = code - entry.fact_base;
        let mut args = vec![ObjectId(0); k];
        for i in (0..k).rev() {
            args[i] = ObjectId(offset % o);
            offset /= o;
        }
        (PredicateId(idx), args)
    }

    /// Encode a ground numeric fluent into its code.
    pub fn encode_fluent(&self, f: FunctionId, args: &[ObjectId]) -> FluentCode {
        debug_assert_eq!(args.len(), self.function_arity(f));
        let o = self.objects.len();
        let k = args.len();
        let mut code = self.fluent_lower_bound(f);
        for (i, arg) in args.iter().enumerate() {
            code += arg.0 * Self::power(o, k - 1 - i);
        }
        code
    }

    /// Decode a fluent code back into its function and object tuple.
    pub fn decode_fluent(&self, code: FluentCode) -> (FunctionId, Vec<ObjectId>) {
        assert!(self.frozen, "symbol table must be frozen");
        let idx = self
            .functions
            .partition_point(|f| f.fluent_base <= code)
            .saturating_sub(1);
        let entry = &self.functions[idx];
        let o = self.objects.len();
        let k = entry.param_types.len();
        let mut offset = code - entry.fluent_base;
        let mut args = vec![ObjectId(0); k];
        for i in (0..k).rev() {
            args[i] = ObjectId(offset % o);
            offset /= o;
        }
        (FunctionId(idx), args)
    }

    /// Render an atom code as `predicate(obj, …)` for diagnostics.
    pub fn display_atom(&self, code: AtomCode) -> String {
        let (p, args) = self.decode_atom(code);
        let names: Vec<&str> = args.iter().map(|&o| self.object_name(o)).collect();
        format!("{}({})", self.predicate_name(p), names.join(", "))
    }

    pub(crate) fn power(base: usize, exp: usize) -> usize {
        base.pow(exp as u32)
    }
}
