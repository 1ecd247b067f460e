use groundwork::*;

fn table() -> SymbolTable {
    let mut t = SymbolTable::new();
    let obj = t.top_type();
    for name in ["a", "b", "c"] {
        t.add_object(name, obj);
    }
    t.add_predicate("p", &[obj]);
    t.add_predicate("q", &[obj]);
    t.add_predicate("r", &[obj, obj]);
    t.freeze();
    t
}

fn p(t: &SymbolTable) -> PredicateId {
    t.predicate_named("p").unwrap()
}

fn q(t: &SymbolTable) -> PredicateId {
    t.predicate_named("q").unwrap()
}

#[test]
fn lowering_splits_literals_and_collects_children() {
    let t = table();
    let obj = t.top_type();
    let def = ActionDef::new(
        "act",
        vec![obj, obj],
        Condition::and(vec![
            Condition::atom(Atom::new(p(&t), vec![Term::Param(0)])),
            Condition::not_atom(Atom::new(q(&t), vec![Term::Param(1)])),
        ]),
        Effect::and(vec![
            Effect::Add(Atom::new(q(&t), vec![Term::Param(0)])),
            Effect::When {
                condition: Condition::atom(Atom::new(p(&t), vec![Term::Param(1)])),
                body: Box::new(Effect::Del(Atom::new(q(&t), vec![Term::Param(1)]))),
            },
            Effect::Forall {
                types: vec![obj],
                body: Box::new(Effect::Del(Atom::new(p(&t), vec![Term::Param(2)]))),
            },
        ]),
    );

    let schema = ActionSchema::from_def(&def, &t).unwrap();
    assert_eq!(schema.kind(), SchemaKind::Normal);
    assert_eq!(schema.parameter_count(), 2);
    assert_eq!(schema.add_preconditions().len(), 1);
    assert_eq!(schema.del_preconditions().len(), 1);
    assert_eq!(schema.add_effects().len(), 1);
    assert_eq!(schema.add_preconditions()[0].0, 2);

    assert_eq!(schema.whens().len(), 2);
    let when = &schema.whens()[0];
    assert_eq!(when.kind(), SchemaKind::When);
    assert_eq!(when.parameter_count(), 2);
    assert_eq!(when.add_preconditions().len(), 1);
    assert_eq!(when.del_effects().len(), 1);

    let forall = &schema.whens()[1];
    assert_eq!(forall.kind(), SchemaKind::Forall);
    assert_eq!(forall.parameter_count(), 3);
    assert_eq!(forall.del_effects().len(), 1);
}

#[test]
fn one_forall_layer_unfolds_in_conditions() {
    let t = table();
    let obj = t.top_type();
    let def = ActionDef::new(
        "sweep",
        vec![obj],
        Condition::Forall {
            types: vec![obj],
            body: Box::new(Condition::atom(Atom::new(
                t.predicate_named("r").unwrap(),
                vec![Term::Param(0), Term::Param(1)],
            ))),
        },
        Effect::Add(Atom::new(p(&t), vec![Term::Param(0)])),
    );

    let schema = ActionSchema::from_def(&def, &t).unwrap();
    // One conjunct per object, with the bound variable substituted.
    assert_eq!(schema.add_preconditions().len(), 3);
    for (scope, fact) in schema.add_preconditions() {
        assert_eq!(*scope, 1);
        assert_eq!(fact.max_param_index(), Some(0));
    }
}

#[test]
fn nested_quantifiers_are_rejected() {
    let t = table();
    let obj = t.top_type();
    let def = ActionDef::new(
        "deep",
        vec![],
        Condition::Forall {
            types: vec![obj],
            body: Box::new(Condition::Forall {
                types: vec![obj],
                body: Box::new(Condition::atom(Atom::new(
                    t.predicate_named("r").unwrap(),
                    vec![Term::Param(0), Term::Param(1)],
                ))),
            }),
        },
        Effect::Add(Atom::new(p(&t), vec![Term::Object(t.object_named("a").unwrap())])),
    );

    let err = ActionSchema::from_def(&def, &t).unwrap_err();
    assert!(matches!(err, GroundError::UnsupportedNesting { .. }));
}

#[test]
fn malformed_facts_are_rejected_at_lowering() {
    let t = table();
    let obj = t.top_type();

    let wrong_arity = ActionDef::new(
        "bad-arity",
        vec![obj],
        Condition::atom(Atom::new(p(&t), vec![Term::Param(0), Term::Param(0)])),
        Effect::And(vec![]),
    );
    assert!(matches!(
        ActionSchema::from_def(&wrong_arity, &t).unwrap_err(),
        GroundError::ArityMismatch { .. }
    ));

    let out_of_scope = ActionDef::new(
        "bad-param",
        vec![obj],
        Condition::atom(Atom::new(p(&t), vec![Term::Param(5)])),
        Effect::And(vec![]),
    );
    assert!(matches!(
        ActionSchema::from_def(&out_of_scope, &t).unwrap_err(),
        GroundError::ParameterOutOfRange { index: 5, .. }
    ));

    // A handle minted by a larger table is unknown to this one.
    let mut big = SymbolTable::new();
    let big_obj = big.top_type();
    for name in ["p", "q", "r", "extra"] {
        big.add_predicate(name, &[big_obj]);
    }
    big.freeze();
    let foreign = big.predicate_named("extra").unwrap();
    let unknown = ActionDef::new(
        "bad-pred",
        vec![obj],
        Condition::atom(Atom::new(foreign, vec![Term::Param(0)])),
        Effect::And(vec![]),
    );
    assert!(matches!(
        ActionSchema::from_def(&unknown, &t).unwrap_err(),
        GroundError::UnknownPredicate { .. }
    ));
}

#[test]
fn carried_formulas_keep_their_scope() {
    let t = table();
    let obj = t.top_type();
    let lit = |pred: PredicateId| Condition::atom(Atom::new(pred, vec![Term::Param(0)]));
    let def = ActionDef::new(
        "carrier",
        vec![obj],
        Condition::and(vec![
            Condition::Or(Box::new(lit(p(&t))), Box::new(lit(q(&t)))),
            Condition::Implies(Box::new(lit(p(&t))), Box::new(lit(q(&t)))),
            Condition::Preference {
                name: "tidy".to_string(),
                body: Box::new(lit(q(&t))),
            },
        ]),
        Effect::Add(Atom::new(q(&t), vec![Term::Param(0)])),
    );

    let schema = ActionSchema::from_def(&def, &t).unwrap();
    assert_eq!(schema.ors().len(), 1);
    assert_eq!(schema.ors()[0].0, 1);
    assert_eq!(schema.implications().len(), 1);
    assert_eq!(schema.prefs().len(), 1);
    let (name, (scope, _)) = &schema.prefs()[0];
    assert_eq!(name, "tidy");
    assert_eq!(*scope, 1);
}

#[test]
fn duplicate_instantiations_collapse_once() {
    let t = table();
    let obj = t.top_type();
    let def = ActionDef::new(
        "dup",
        vec![obj],
        Condition::And(vec![]),
        Effect::Add(Atom::new(q(&t), vec![Term::Param(0)])),
    );
    let mut schema = ActionSchema::from_def(&def, &t).unwrap();

    let a = t.object_named("a").unwrap();
    let code = t.encode_atom(q(&t), &[a]);
    // Same grounding reached twice through different list orderings.
    schema.log_instantiation(Instantiation::new(
        vec![a],
        vec![3, 1],
        vec![],
        vec![code],
        vec![],
    ));
    schema.log_instantiation(Instantiation::new(
        vec![a],
        vec![1, 3],
        vec![],
        vec![code],
        vec![],
    ));
    assert_eq!(schema.instantiations().len(), 2);

    assert_eq!(schema.erase_duplicates(), 1);
    assert_eq!(schema.instantiations().len(), 1);
    // Idempotent: a second run removes nothing.
    assert_eq!(schema.erase_duplicates(), 0);
}

#[test]
fn noop_removal_respects_conditional_children() {
    let t = table();
    let obj = t.top_type();
    let a = t.object_named("a").unwrap();
    let code = t.encode_atom(q(&t), &[a]);
    let noop = Instantiation::new(vec![a], vec![], vec![], vec![code], vec![code]);
    assert!(noop.is_noop());

    let plain = ActionDef::new(
        "plain",
        vec![obj],
        Condition::And(vec![]),
        Effect::And(vec![
            Effect::Add(Atom::new(q(&t), vec![Term::Param(0)])),
            Effect::Del(Atom::new(q(&t), vec![Term::Param(0)])),
        ]),
    );
    let mut schema = ActionSchema::from_def(&plain, &t).unwrap();
    schema.log_instantiation(noop.clone());
    assert_eq!(schema.erase_noops(), 1);
    assert!(schema.instantiations().is_empty());

    let guarded = ActionDef::new(
        "guarded",
        vec![obj],
        Condition::And(vec![]),
        Effect::And(vec![
            Effect::Add(Atom::new(q(&t), vec![Term::Param(0)])),
            Effect::Del(Atom::new(q(&t), vec![Term::Param(0)])),
            Effect::When {
                condition: Condition::atom(Atom::new(p(&t), vec![Term::Param(0)])),
                body: Box::new(Effect::Add(Atom::new(p(&t), vec![Term::Param(0)]))),
            },
        ]),
    );
    let mut schema = ActionSchema::from_def(&guarded, &t).unwrap();
    schema.log_instantiation(noop);
    assert_eq!(schema.erase_noops(), 0);
    assert_eq!(schema.instantiations().len(), 1);
}

#[test]
fn constant_only_records_are_erasable() {
    let t = table();
    let obj = t.top_type();
    let def = ActionDef::new(
        "idle",
        vec![obj],
        Condition::And(vec![]),
        Effect::And(vec![]),
    );
    let mut schema = ActionSchema::from_def(&def, &t).unwrap();

    let a = t.object_named("a").unwrap();
    let empty = Instantiation::new(vec![a], vec![], vec![], vec![], vec![]);
    assert!(empty.is_constant_only());
    schema.log_instantiation(empty);
    assert_eq!(schema.erase_constants(), 1);
    assert!(schema.instantiations().is_empty());
}

#[test]
fn instantiation_order_is_total_and_sortable() {
    let t = table();
    let a = t.object_named("a").unwrap();
    let b = t.object_named("b").unwrap();

    let i1 = Instantiation::new(vec![a], vec![1], vec![], vec![2], vec![]);
    let i2 = Instantiation::new(vec![a], vec![1], vec![], vec![3], vec![]);
    let i3 = Instantiation::new(vec![b], vec![0], vec![], vec![2], vec![]);

    // The parameter tuple dominates, then the atom lists.
    assert!(i1 < i2);
    assert!(i2 < i3);
    assert!(i1 < i3);
    assert!(!(i2 < i1));
    assert_ne!(i1, i2);

    let mut v = vec![i3.clone(), i1.clone(), i2.clone()];
    v.sort();
    assert_eq!(v, vec![i1, i2, i3]);
}
