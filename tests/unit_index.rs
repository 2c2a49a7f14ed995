// tests/unit_index.rs
//! Tests for the duplicate index: bucketing, lookup, ordering, persistence.

use dupgraph_core::config::Config;
use dupgraph_core::index::{CodeIndex, SuppressionSet};
use dupgraph_core::parse::{BlockType, CodeUnit, UnitType};

fn unit(name: &str, code: &str, file: &str) -> CodeUnit {
    let lines = code.lines().count().max(1);
    CodeUnit::function(name, code, file, 1, lines)
}

#[test]
fn identical_structures_group_together() {
    let mut index = CodeIndex::new();
    index.add_code_unit(unit(
        "calculate",
        "def calculate(a, b):\n    return a * b + 1",
        "file1.py",
    ));
    index.add_code_unit(unit(
        "compute",
        "def compute(x, y):\n    return x * y + 1",
        "file2.py",
    ));
    index.add_code_unit(unit(
        "different",
        "def different(a, b):\n    result = a * b\n    return result + 1",
        "file3.py",
    ));

    let duplicates = index.find_all_duplicates(3);
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].entries.len(), 2);
    assert!(!duplicates[0].is_verified);
}

#[test]
fn every_entry_lands_in_exactly_one_bucket() {
    let mut index = CodeIndex::new();
    let e1 = index.add_code_unit(unit("a", "def a(x):\n    return x + 1", "a.py"));
    let e2 = index.add_code_unit(unit("b", "def b(x):\n    return x - 1", "b.py"));

    assert_eq!(index.entry_count(), 2);
    assert_eq!(index.bucket(&e1.wl_hash).len(), 1);
    assert_eq!(index.bucket(&e2.wl_hash).len(), 1);
    assert_ne!(e1.wl_hash, e2.wl_hash);
}

#[test]
fn entry_invariants_hold() {
    let mut index = CodeIndex::new();
    let entry = index.add_code_unit(unit("f", "def f(x):\n    return x + 1", "f.py"));

    assert_eq!(entry.node_count, entry.graph.node_count());
    assert_eq!(
        entry.wl_hash,
        dupgraph_core::hash::weisfeiler_leman_hash(&entry.graph, index.wl_iterations())
    );
}

#[test]
fn min_node_count_filters_on_group_average() {
    let mut index = CodeIndex::new();
    // Tiny units: module + two-ish nodes each.
    index.add_code_unit(unit("a", "pass", "a.py"));
    index.add_code_unit(unit("b", "pass", "b.py"));

    let small = index.find_all_duplicates(3);
    assert!(
        small.is_empty(),
        "bucket with average below the threshold must be omitted"
    );

    let all = index.find_all_duplicates(1);
    assert_eq!(all.len(), 1, "lower threshold admits the same bucket");
}

#[test]
fn groups_sorted_by_descending_average_node_count() {
    let mut index = CodeIndex::new();
    let small = "def s():\n    return 1";
    let large = "
def l(items):
    out = []
    for item in items:
        if item > 0:
            out.append(item * 2)
    return out
";
    for i in 0..2 {
        index.add_code_unit(unit(&format!("s{i}"), small, &format!("s{i}.py")));
        index.add_code_unit(unit(&format!("l{i}"), large, &format!("l{i}.py")));
    }

    let groups = index.find_all_duplicates(1);
    assert_eq!(groups.len(), 2);
    for pair in groups.windows(2) {
        assert!(
            pair[0].avg_node_count() >= pair[1].avg_node_count(),
            "groups must be ordered by descending average node count"
        );
    }
}

#[test]
fn entries_within_group_sorted_by_path_then_line() {
    let mut index = CodeIndex::new();
    let code = "def f(x):\n    return x + 1";
    index.add_code_unit(CodeUnit::function("z", code, "z.py", 5, 6));
    index.add_code_unit(CodeUnit::function("a2", code, "a.py", 9, 10));
    index.add_code_unit(CodeUnit::function("a1", code, "a.py", 1, 2));

    let groups = index.find_all_duplicates(1);
    assert_eq!(groups.len(), 1);
    let order: Vec<(&str, usize)> = groups[0]
        .entries
        .iter()
        .map(|e| (e.code_unit.file_path.as_str(), e.code_unit.line_start))
        .collect();
    assert_eq!(order, vec![("a.py", 1), ("a.py", 9), ("z.py", 5)]);
}

#[test]
fn find_similar_returns_exact_hits() {
    let mut index = CodeIndex::new();
    index.add_code_unit(unit(
        "process",
        "def process(items):\n    for item in items:\n        print(item)",
        "existing.py",
    ));

    let results = index.find_similar(
        "def handle(elements):\n    for element in elements:\n        print(element)",
        3,
    );
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].similarity.label(), "exact");
    assert_eq!(results[0].entry.code_unit.name, "process");
}

#[test]
fn find_similar_misses_on_different_structure() {
    let mut index = CodeIndex::new();
    index.add_code_unit(unit(
        "process",
        "def process(items):\n    for item in items:\n        print(item)",
        "existing.py",
    ));

    let results = index.find_similar(
        "def handle(elements):\n    for element in elements:\n        if element:\n            print(element)",
        3,
    );
    assert!(results.is_empty());
}

#[test]
fn find_similar_on_unparseable_input_is_empty() {
    let mut index = CodeIndex::new();
    index.add_code_unit(unit("f", "def f(x):\n    return x", "f.py"));
    assert!(index.find_similar("def broken(", 1).is_empty());
}

#[test]
fn find_similar_respects_min_node_count() {
    let mut index = CodeIndex::new();
    index.add_code_unit(unit("f", "def f(x):\n    return x + 1", "f.py"));

    assert_eq!(index.find_similar("def g(y):\n    return y + 1", 3).len(), 1);
    assert!(
        index
            .find_similar("def g(y):\n    return y + 1", 1000)
            .is_empty(),
        "entries below min_node_count produce no hit"
    );
}

#[test]
fn add_file_extracts_and_counts_units() {
    let mut index = CodeIndex::new();
    let source = "
def a():
    return 1

def b():
    for i in range(3):
        pass
";
    let count = index.add_file("mod.py", source);
    assert!(count >= 3, "two functions and a block expected, got {count}");
    assert_eq!(index.entry_count(), count);
}

#[test]
fn add_file_with_broken_source_adds_nothing() {
    let mut index = CodeIndex::new();
    assert_eq!(index.add_file("bad.py", "def broken("), 0);
    assert!(index.is_empty());
}

#[test]
fn remove_file_drops_its_entries() {
    let mut index = CodeIndex::new();
    index.add_file("keep.py", "def k():\n    return 1");
    index.add_file("drop.py", "def d():\n    return 2");
    assert_eq!(index.entry_count(), 2);

    index.remove_file("drop.py");
    assert_eq!(index.entry_count(), 1);
    let remaining = index.find_similar("def k():\n    return 1", 1);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].entry.code_unit.file_path, "keep.py");
}

#[test]
fn suppression_is_idempotent() {
    let mut set = SuppressionSet::new();
    assert!(set.add("abc123"));
    assert!(!set.add("abc123"));
    assert_eq!(set.list(), vec!["abc123".to_string()]);

    assert!(set.remove("abc123"));
    assert!(!set.remove("abc123"));
    assert!(set.list().is_empty());
}

#[test]
fn suppressions_round_trip_through_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("suppressions.txt");

    let mut set = SuppressionSet::new();
    set.add("hash_a");
    set.add("hash_b");
    set.save(&path).expect("save");

    let loaded = SuppressionSet::load(&path).expect("load");
    assert_eq!(loaded.list(), set.list());

    let missing = SuppressionSet::load(&dir.path().join("absent.txt")).expect("missing ok");
    assert!(missing.is_empty());
}

#[test]
fn index_round_trips_every_code_unit_field() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("index.json");

    let mut index = CodeIndex::new();
    let block = CodeUnit {
        name: "func.for_1".to_string(),
        code: "for i in range(10):\n    pass".to_string(),
        file_path: "src/mod.py".to_string(),
        line_start: 5,
        line_end: 6,
        unit_type: UnitType::Block,
        parent_name: Some("func".to_string()),
        block_type: Some(BlockType::For),
        nesting_depth: Some(1),
        parent_block_name: None,
    };
    index.add_code_unit(block.clone());
    index.add_code_unit(CodeUnit::method(
        "save",
        "def save(self):\n    return True",
        "src/models.py",
        10,
        11,
        "Model",
    ));
    index.save(&path).expect("save");

    let (loaded, saved_k) = CodeIndex::load(&path, &Config::new()).expect("load");
    assert_eq!(saved_k, index.wl_iterations());
    assert_eq!(loaded.entry_count(), 2);

    let hits = loaded.find_similar("for i in range(10):\n    pass", 1);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entry.code_unit, block);
}
