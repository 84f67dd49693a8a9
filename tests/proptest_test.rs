//! Property-based tests for costaudit using proptest

mod common;

use common::RecordBuilder;
use costaudit::{
    Category, FilterConstraints, History, KeyPath, NodeShape, Record, TotalsNode,
    grouping::{group, group_where},
    history::merge,
    snapshot::PeriodSnapshot,
    totals::compute_totals,
};
use proptest::prelude::*;

// Strategies for generating test data

prop_compose! {
    fn arb_record()(
        owner in prop::sample::select(vec!["alice", "bob", "carol", "", "i-0123abcd"]),
        service in prop::sample::select(vec!["AmazonEC2", "AmazonS3", "AWSLambda"]),
        account in prop::sample::select(vec!["platform-dev", "research"]),
        region in prop::sample::select(vec!["us-west-2a", "us-east-1b", ""]),
        cost in 0.0f64..500.0,
    ) -> Record {
        RecordBuilder::new()
            .with_owner(owner)
            .with_service(service)
            .with_account(account)
            .with_region(region)
            .with_cost(cost)
            .build()
    }
}

prop_compose! {
    fn arb_categories()(
        order in Just(vec!["owner", "service", "account", "region"]).prop_shuffle(),
        depth in 0usize..=4,
    ) -> Vec<Category> {
        Category::parse_list(&order[..depth]).unwrap()
    }
}

prop_compose! {
    fn arb_snapshot(period: u32)(
        entries in prop::collection::btree_map(
            prop::sample::select(vec!["alice", "bob", "carol", "dave"]),
            0.0f64..100.0,
            0..4,
        )
    ) -> PeriodSnapshot {
        let mut snapshot = PeriodSnapshot::new(common::day(period));
        for (owner, total) in entries {
            snapshot.insert(KeyPath::from_segments(["By Person", owner]), NodeShape::Internal, total).unwrap();
        }
        snapshot
    }
}

fn assert_reconciled(node: &TotalsNode) {
    if let Some(children) = node.children() {
        let sum = children.values().fold(0.0, |acc, child| acc + child.total());
        assert_eq!(node.total(), sum);
        for child in children.values() {
            assert_reconciled(child);
        }
    } else {
        let sum = node.records().iter().fold(0.0, |acc, record| acc + record.cost);
        assert_eq!(node.total(), sum);
    }
}

proptest! {
    #[test]
    fn prop_totals_reconcile(
        records in prop::collection::vec(arb_record(), 0..60),
        categories in arb_categories(),
    ) {
        let tree = compute_totals(&group(&records, &categories).unwrap());
        assert_reconciled(&tree);
        prop_assert!(tree.is_reconciled());
        prop_assert_eq!(tree.record_count(), records.len());
    }

    #[test]
    fn prop_totals_are_idempotent(
        records in prop::collection::vec(arb_record(), 0..60),
        categories in arb_categories(),
    ) {
        let first = compute_totals(&group(&records, &categories).unwrap());
        let second = compute_totals(&group(&records, &categories).unwrap());
        prop_assert_eq!(&first, &second);

        let mut recomputed = first.clone();
        recomputed.recompute();
        prop_assert_eq!(recomputed, first);
    }

    #[test]
    fn prop_pruning_keeps_totals(
        records in prop::collection::vec(arb_record(), 1..60),
        categories in arb_categories(),
    ) {
        let mut tree = compute_totals(&group(&records, &categories).unwrap());
        let total = tree.total();
        tree.prune_empty();
        prop_assert_eq!(tree.total(), total);
        prop_assert!(tree.is_reconciled());
    }

    #[test]
    fn prop_filter_matches_inline_predicate(
        records in prop::collection::vec(arb_record(), 0..60),
        categories in arb_categories(),
        min_cost in prop::option::of(0.0f64..250.0),
        services in prop::option::of(prop::collection::btree_set(
            prop::sample::select(vec!["AmazonEC2", "AmazonS3", "AWSLambda"]),
            0..3,
        )),
    ) {
        let mut filter = FilterConstraints::new();
        filter.min_cost = min_cost;
        filter.services = services.map(|set| set.into_iter().map(String::from).collect());

        let filtered = filter.apply(&records);
        prop_assert!(filtered.iter().all(|record| filter.matches(record)));

        let first = compute_totals(&group(&filtered, &categories).unwrap());
        let second = compute_totals(&group_where(&records, &categories, |r| filter.matches(r)).unwrap());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_merge_is_append_only(
        first in arb_snapshot(1),
        second in arb_snapshot(2),
        third in arb_snapshot(3),
    ) {
        let h1 = merge(&History::new(), &first).unwrap();
        let h2 = merge(&h1, &second).unwrap();
        let h3 = merge(&h2, &third).unwrap();

        for (earlier, later) in [(&h1, &h2), (&h2, &h3), (&h1, &h3)] {
            for (path, series) in earlier.iter() {
                let grown = later.series(path).unwrap();
                prop_assert!(series.is_prefix_of(grown));
            }
        }
        prop_assert_eq!(h3.periods().len(), 3);
    }
}
