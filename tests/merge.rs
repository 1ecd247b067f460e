use groundwork::*;

fn logistics_table() -> (SymbolTable, PredicateId, PredicateId) {
    let mut t = SymbolTable::new();
    let obj = t.top_type();
    for name in ["t0", "t1", "t2", "t3"] {
        t.add_object(name, obj);
    }
    let at = t.add_predicate("at", &[obj, obj]);
    let in_airplane = t.add_predicate("in-airplane", &[obj]);
    t.freeze();
    (t, at, in_airplane)
}

#[test]
fn fact_groups_list_every_member_per_raw_tuple() {
    let (t, at, in_airplane) = logistics_table();

    // Output slots: merged slot 0 = at's second parameter, raw slot 1 =
    // at's first parameter; the narrower predicate rides along as a null
    // state keyed by the raw slot.
    let mut merged = MergedPredicate::new(at, &[1], &t);
    merged.push_predicate(in_airplane, vec![None, Some(0)], &t);
    assert_eq!(merged.par_count(), 2);
    assert_eq!(merged.merged_par_count(), 1);
    assert!(merged.parts()[1].null_state());

    let mut diags = Diagnostics::new();
    let groups = merged.fact_groups(&t, &mut diags);
    assert!(diags.is_empty());

    assert_eq!(groups.len(), 4);
    for (r, group) in groups.iter().enumerate() {
        let mut expected: Vec<AtomCode> = (0..4).map(|c| 4 * r + c).collect();
        expected.push(16 + r);
        assert_eq!(group, &expected);
    }
}

#[test]
fn fact_group_codes_stay_inside_member_ranges() {
    let (t, at, in_airplane) = logistics_table();
    let mut merged = MergedPredicate::new(at, &[1], &t);
    merged.push_predicate(in_airplane, vec![None, Some(0)], &t);

    let mut diags = Diagnostics::new();
    for group in merged.fact_groups(&t, &mut diags) {
        for code in group {
            let in_at = code >= t.fact_lower_bound(at) && code < t.fact_upper_bound(at);
            let in_plane = code >= t.fact_lower_bound(in_airplane)
                && code < t.fact_upper_bound(in_airplane);
            assert!(in_at || in_plane, "code {code} outside every member range");
        }
    }
}

#[test]
fn fully_merged_predicate_yields_one_group_with_every_atom() {
    let (t, at, _) = logistics_table();
    let merged = MergedPredicate::new(at, &[0, 1], &t);

    let mut diags = Diagnostics::new();
    let groups = merged.fact_groups(&t, &mut diags);
    assert_eq!(groups.len(), 1);

    let mut codes = groups.into_iter().next().unwrap();
    codes.sort_unstable();
    let expected: Vec<AtomCode> = (t.fact_lower_bound(at)..t.fact_upper_bound(at)).collect();
    assert_eq!(codes, expected);
}

#[test]
fn unmerged_projection_yields_singleton_groups() {
    let (t, at, _) = logistics_table();
    let merged = MergedPredicate::new(at, &[], &t);

    let mut diags = Diagnostics::new();
    let groups = merged.fact_groups(&t, &mut diags);
    assert_eq!(groups.len(), 16);
    for group in &groups {
        assert_eq!(group.len(), 1);
    }
    let mut all: Vec<AtomCode> = groups.iter().flatten().copied().collect();
    all.sort_unstable();
    assert_eq!(all, (0..16).collect::<Vec<_>>());
}

#[test]
fn canonical_form_makes_equality_order_free() {
    let (t, at, in_airplane) = logistics_table();

    let mut left = MergedPredicate::new(at, &[1], &t);
    left.push_predicate(in_airplane, vec![None, Some(0)], &t);
    left.push_predicate(at, vec![Some(0), Some(1)], &t);

    let mut right = MergedPredicate::new(at, &[1], &t);
    right.push_predicate(at, vec![Some(0), Some(1)], &t);
    right.push_predicate(in_airplane, vec![None, Some(0)], &t);

    assert_ne!(left, right);
    left.make_canonical();
    right.make_canonical();
    assert_eq!(left, right);
}

#[test]
fn push_and_pop_are_inverse_before_canonicalization() {
    let (t, at, in_airplane) = logistics_table();
    let mut merged = MergedPredicate::new(at, &[1], &t);
    let snapshot = merged.clone();

    merged.push_predicate(in_airplane, vec![None, Some(0)], &t);
    assert_ne!(merged, snapshot);
    assert!(merged.find_predicate(in_airplane).is_some());

    merged.pop_predicate();
    assert_eq!(merged, snapshot);
    assert!(merged.find_predicate(in_airplane).is_none());
}

#[test]
fn part_ordering_puts_plain_parts_before_null_states() {
    let (t, at, in_airplane) = logistics_table();
    let mut merged = MergedPredicate::new(at, &[1], &t);
    merged.push_predicate(in_airplane, vec![None, Some(0)], &t);
    merged.push_predicate(at, vec![Some(0), Some(1)], &t);
    merged.make_canonical();

    let parts = merged.parts();
    assert_eq!(parts[0].predicate(), at);
    assert_eq!(parts[1].predicate(), at);
    assert_eq!(parts[2].predicate(), in_airplane);
    assert!(parts[2].null_state());
}

#[test]
fn out_of_range_slot_warns_and_clamps() {
    let mut t = SymbolTable::new();
    let obj = t.top_type();
    t.add_object("a", obj);
    t.add_object("b", obj);
    let p = t.add_predicate("p", &[obj]);
    let q = t.add_predicate("q", &[obj]);
    t.freeze();

    let mut merged = MergedPredicate::new(p, &[0], &t);
    merged.push_predicate(q, vec![Some(3)], &t);

    let mut diags = Diagnostics::new();
    let groups = merged.fact_groups(&t, &mut diags);
    assert!(!diags.is_empty());
    assert!(
        diags
            .warnings()
            .iter()
            .any(|w| matches!(w, Warning::NegativeExponent { predicate } if predicate == "q"))
    );
    // One group (no raw slots), still listing both members' codes.
    assert_eq!(groups.len(), 1);
    assert!(!groups[0].is_empty());
}
