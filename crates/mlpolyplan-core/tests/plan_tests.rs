use mlpolyplan_core::{
    leaf_ranges, segment_targets, BuildPlan, MakefileDocument, PlanError, Recipe, RecipeStyle,
    SplitParams, SplitPolicy,
};

fn plan(order: u32, segments_order: Option<u32>) -> BuildPlan {
    let params = SplitPolicy::default()
        .resolve(order, segments_order, None)
        .unwrap();
    BuildPlan::new(params).unwrap()
}

fn ranges_of(plan: &BuildPlan) -> Vec<(u128, u128)> {
    plan.leaves
        .iter()
        .map(|&id| match &plan.graph.get(id).unwrap().recipe {
            Recipe::Generate {
                range: Some(r), ..
            } => (r.start, r.end),
            other => panic!("leaf without range: {:?}", other),
        })
        .collect()
}

#[test]
fn leaf_count_matches_split_depth() {
    for order in 1..=40 {
        let p = plan(order, None);
        assert_eq!(p.leaves.len(), 1 << p.params.segments_order, "order {}", order);
    }
    for segments_order in 0..=12 {
        // One merge level straight from the root to the leaves.
        let params = SplitPolicy::default()
            .explicit(13, segments_order, Some(segments_order.max(1)))
            .unwrap();
        let p = BuildPlan::new(params).unwrap();
        assert_eq!(p.leaves.len(), 1 << segments_order);
    }
}

#[test]
fn leaf_ranges_partition_upper_half() {
    for (order, segments_order) in [(21, 4), (24, 4), (28, 8), (30, 10), (35, 15), (64, 16)] {
        let ranges = leaf_ranges(order, 1 << segments_order).unwrap();
        assert_eq!(ranges.first().unwrap().start, 1u128 << (order - 1));
        assert_eq!(ranges.last().unwrap().end, (1u128 << order) - 1);
        for pair in ranges.windows(2) {
            assert!(pair[0].start <= pair[0].end);
            assert_eq!(pair[0].end + 1, pair[1].start);
            assert_eq!(pair[0].key_count(), pair[1].key_count());
        }
    }
}

#[test]
fn fan_in_times_rules_equals_finer_level() {
    for order in [21, 25, 29, 30, 31, 33, 36] {
        let p = plan(order, None);
        for level in &p.levels {
            let finer = segment_targets(order, p.params.segments_order, level.next_depth).unwrap();
            assert_eq!(level.fan_in * level.rules.len(), finer.len());
        }
    }
}

#[test]
fn identifiers_unique_and_prefix_grouped() {
    for order in [24, 29, 30, 34] {
        let p = plan(order, None);
        let mut seen = std::collections::HashSet::new();
        for rule in p.graph.rules() {
            assert!(seen.insert(rule.target.path.clone()));
            for input in &rule.inputs {
                assert!(rule.target.covers(input));
                // Digit-aligned levels: the wildcard form is a literal prefix pattern.
                if (input.depth - rule.target.depth) % 4 == 0 && !rule.target.is_root() {
                    let stem = rule.target.path.trim_end_matches(".txt.gz");
                    let prefix = stem.trim_end_matches('x');
                    assert!(input.path.starts_with(prefix), "{} !< {}", input, rule.target);
                }
            }
        }
    }
}

#[test]
fn heuristic_reference_points() {
    let policy = SplitPolicy::default();
    let pair = |p: SplitParams| (p.segments_order, p.incr_per_level);
    assert_eq!(pair(policy.choose_split(20).unwrap()), (0, 8));
    assert_eq!(pair(policy.choose_split(24).unwrap()), (4, 8));
    // 10 bits, 10/9 + 1 = 2 levels, 10/2 + 1 = 6 bits per level.
    assert_eq!(pair(policy.choose_split(30).unwrap()), (10, 6));
}

#[test]
fn order_16_single_leaf() {
    let p = plan(16, None);
    assert!(p.levels.is_empty());
    assert_eq!(p.leaves.len(), 1);
    let leaf = p.graph.get(p.leaves[0]).unwrap();
    assert_eq!(leaf.target.path, "mlpoly16.txt.gz");
    assert_eq!(
        leaf.recipe,
        Recipe::Generate {
            order: 16,
            range: None
        }
    );

    let style = RecipeStyle::default();
    let text = MakefileDocument::new(&p, &style, "mlpolyplan 16").to_string();
    assert!(text.contains("mlpoly16.txt.gz:\n\t$(MLPOLYGEN) 16 | gzip -c > $@\n"));
    assert!(!text.contains("-p"));
    assert!(!text.contains("sort rule"));
}

#[test]
fn order_24_sixteen_leaves_one_merge() {
    let p = plan(24, Some(4));
    assert_eq!(p.levels.len(), 1);
    let merge = p.graph.get(p.levels[0].rules[0]).unwrap();
    assert_eq!(merge.target.path, "mlpoly24.txt.gz");
    assert_eq!(merge.inputs.len(), 16);

    let ranges = ranges_of(&p);
    assert_eq!(ranges.len(), 16);
    for (i, (start, end)) in ranges.iter().enumerate() {
        assert_eq!(*start, 0x80_0000 + i as u128 * 0x8_0000);
        assert_eq!(*end, start + 0x7_ffff);
    }
}

#[test]
fn rendering_is_deterministic() {
    let style = RecipeStyle::default();
    let a = MakefileDocument::new(&plan(29, None), &style, "mlpolyplan 29").to_string();
    let b = MakefileDocument::new(&plan(29, None), &style, "mlpolyplan 29").to_string();
    assert_eq!(a, b);

    let mut bytes = Vec::new();
    MakefileDocument::new(&plan(29, None), &style, "mlpolyplan 29")
        .write_to(&mut bytes)
        .unwrap();
    assert_eq!(bytes, a.into_bytes());
}

#[test]
fn misaligned_explicit_split_fails_before_output() {
    // Default branching 8 leaves a 2-bit gap between depth 8 and 10.
    let params = SplitPolicy::default().explicit(30, 10, None).unwrap();
    assert!(matches!(
        BuildPlan::new(params),
        Err(PlanError::AddressPrecondition {
            total_depth: 10,
            level_depth: 8
        })
    ));

    let params = SplitPolicy::default().explicit(30, 10, Some(6)).unwrap();
    assert!(BuildPlan::new(params).is_ok());
}

#[test]
fn explicit_split_with_narrow_branching() {
    let params = SplitPolicy::default().explicit(30, 12, Some(4)).unwrap();
    let p = BuildPlan::new(params).unwrap();
    let depths: Vec<(u32, u32)> = p
        .levels
        .iter()
        .map(|l| (l.curr_depth, l.next_depth))
        .collect();
    assert_eq!(depths, vec![(0, 4), (4, 8), (8, 12)]);
    assert!(p.levels.iter().all(|l| l.fan_in == 16));
    assert_eq!(p.leaves.len(), 1 << 12);
}

#[test]
fn plan_serializes_to_json() {
    let p = plan(22, None);
    let json = serde_json::to_value(&p).unwrap();
    assert_eq!(json["params"]["segments_order"], 4);
    assert_eq!(json["root"], "mlpoly22.txt.gz");
    let rules = json["graph"]["rules"].as_array().unwrap();
    assert_eq!(rules.len(), 17);
    assert_eq!(rules[0]["recipe"]["kind"], "merge");
    assert_eq!(rules[1]["recipe"]["kind"], "generate");
}
