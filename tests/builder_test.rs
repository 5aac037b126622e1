//! Integration tests for HierarchyBuilder on complete forests

use rstest::{fixture, rstest};

use netforest::domain::{
    invariants, AddressFamily, DomainError, Forest, HierarchyBuilder, OverlapPolicy, Range,
};
use netforest::util::testing;

fn r(identity: &str, start: u128, end: u128) -> Range {
    Range::new(identity, AddressFamily::Ipv4, start, end, end - start + 1).expect("valid range")
}

fn built(ranges: Vec<Range>) -> Forest {
    let mut forest = Forest::from_ranges(ranges).expect("unique identities");
    HierarchyBuilder::new().build(&mut forest).expect("laminar input");
    forest
}

/// (identity, parent, children) for every node, sorted by identity.
fn shape(forest: &Forest) -> Vec<(String, Option<String>, Vec<String>)> {
    let mut shape: Vec<_> = forest
        .nodes()
        .map(|node| {
            (
                node.identity().to_string(),
                forest.parent_of(node.identity()).map(str::to_string),
                forest
                    .children_of(node.identity())
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            )
        })
        .collect();
    shape.sort();
    shape
}

#[fixture]
fn allocations() -> Vec<Range> {
    testing::init_test_setup();
    vec![
        r("0-5", 0, 5),
        r("0-100", 0, 100),
        r("50-55", 50, 55),
        r("10-28", 10, 28),
        r("64-67", 64, 67),
        r("70-94", 70, 94),
        r("45-62", 45, 62),
        r("42-67", 42, 67),
    ]
}

#[rstest]
fn given_nested_and_disjoint_ranges_when_building_then_links_tightest_parents() {
    // Arrange
    let ranges = vec![r("A", 0, 100), r("B", 10, 20), r("C", 30, 40), r("D", 15, 18)];

    // Act
    let forest = built(ranges);

    // Assert
    assert_eq!(forest.root_identities(), vec!["A"]);
    assert_eq!(forest.children_of("A"), vec!["B", "C"]);
    assert_eq!(forest.children_of("B"), vec!["D"]);
    assert!(forest.children_of("C").is_empty());
    assert!(forest.children_of("D").is_empty());
}

#[rstest]
fn given_adjacent_ranges_when_building_then_both_are_roots() {
    let forest = built(vec![r("E", 0, 10), r("F", 11, 20)]);

    assert_eq!(forest.root_identities(), vec!["E", "F"]);
    assert_eq!(forest.parent_of("F"), None);
    assert!(forest.children_of("E").is_empty());
}

#[rstest]
fn given_identical_single_addresses_when_building_then_siblings_by_identity() {
    let forest = built(vec![r("H", 15, 15), r("B", 10, 20), r("G", 15, 15)]);

    assert_eq!(forest.children_of("B"), vec!["G", "H"]);
    assert!(forest.children_of("G").is_empty());
    assert!(forest.children_of("H").is_empty());
}

#[rstest]
fn given_identical_ranges_when_building_then_lower_identity_encloses() {
    let forest = built(vec![r("Y", 0, 100), r("X", 0, 100)]);

    assert_eq!(forest.root_identities(), vec!["X"]);
    assert_eq!(forest.parent_of("Y"), Some("X"));
}

#[rstest]
fn given_allocation_snapshot_when_building_then_matches_expected_forest(allocations: Vec<Range>) {
    // Act
    let forest = built(allocations);

    // Assert
    assert_eq!(forest.root_identities(), vec!["0-100"]);
    assert_eq!(forest.children_of("0-100"), vec!["0-5", "10-28", "42-67", "70-94"]);
    assert_eq!(forest.children_of("42-67"), vec!["45-62", "64-67"]);
    assert_eq!(forest.children_of("45-62"), vec!["50-55"]);
    assert_eq!(forest.depth(), 4);
    assert!(invariants::check(&forest).is_empty());
}

#[rstest]
fn given_built_forest_when_building_again_then_identical(allocations: Vec<Range>) {
    let mut forest = built(allocations);
    let first = shape(&forest);

    let stats = HierarchyBuilder::new().build(&mut forest).unwrap();

    assert_eq!(shape(&forest), first);
    assert_eq!(stats.roots, 1);
    assert_eq!(stats.ranges, 8);
}

#[rstest]
#[case::reversed(|v: &mut Vec<Range>| v.reverse())]
#[case::rotated(|v: &mut Vec<Range>| v.rotate_left(3))]
#[case::sorted_by_identity(|v: &mut Vec<Range>| v.sort_by(|a, b| a.identity().cmp(b.identity())))]
fn given_shuffled_input_when_building_then_same_forest(
    allocations: Vec<Range>,
    #[case] shuffle: fn(&mut Vec<Range>),
) {
    let expected = shape(&built(allocations.clone()));

    let mut shuffled = allocations;
    shuffle(&mut shuffled);

    assert_eq!(shape(&built(shuffled)), expected);
}

#[rstest]
fn given_range_added_after_build_when_rebuilding_then_reflects_new_range(allocations: Vec<Range>) {
    let mut forest = built(allocations);

    forest.insert(r("43-44", 43, 44)).unwrap();
    assert!(!forest.is_built());
    HierarchyBuilder::new().build(&mut forest).unwrap();

    assert_eq!(forest.parent_of("43-44"), Some("42-67"));
    assert_eq!(forest.children_of("42-67"), vec!["43-44", "45-62", "64-67"]);
}

#[rstest]
fn given_partial_overlap_when_rejecting_then_errors_and_forest_unlinked() {
    let mut forest = Forest::from_ranges(vec![r("A", 0, 10), r("B", 5, 15)]).unwrap();

    let err = HierarchyBuilder::new().build(&mut forest).unwrap_err();

    assert_eq!(
        err,
        DomainError::PartialOverlap {
            outer: "A".into(),
            inner: "B".into()
        }
    );
    assert!(!forest.is_built());
    assert!(forest.root_identities().is_empty());
}

#[rstest]
fn given_partial_overlap_when_tolerating_then_counts_and_completes() {
    let mut forest =
        Forest::from_ranges(vec![r("A", 0, 10), r("B", 5, 15), r("C", 12, 13)]).unwrap();

    let stats = HierarchyBuilder::new()
        .with_overlap_policy(OverlapPolicy::Tolerate)
        .build(&mut forest)
        .unwrap();

    assert_eq!(stats.overlaps, 1);
    assert!(forest.is_built());
    assert_eq!(forest.root_identities(), vec!["A"]);
    assert_eq!(forest.parent_of("C"), Some("B"));
}

#[rstest]
fn given_single_addresses_when_building_then_never_parents(allocations: Vec<Range>) {
    let mut ranges = allocations;
    ranges.extend([r("h0", 0, 0), r("h100", 100, 100), r("h50", 50, 50), r("h51", 51, 51)]);

    let forest = built(ranges);

    for node in forest.nodes().filter(|n| n.range().is_degenerate()) {
        assert_eq!(node.child_count(), 0, "{} has children", node.identity());
    }
    assert_eq!(forest.parent_of("h0"), Some("0-5"));
    assert_eq!(forest.parent_of("h100"), Some("0-100"));
    assert_eq!(forest.children_of("50-55"), vec!["h50", "h51"]);
}
