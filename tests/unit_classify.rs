// tests/unit_classify.rs
//! Tests for the pattern classifier.

use dupgraph_core::classify::{is_test_file, DuplicateCategory, PatternClassifier};
use dupgraph_core::index::{CodeIndex, DuplicateGroup};
use dupgraph_core::parse::{BlockType, CodeUnit, UnitType};

fn pair_group(code: &str, file1: &str, file2: &str, unit_type: UnitType) -> DuplicateGroup {
    let mut index = CodeIndex::new();
    let lines = code.lines().count().max(1);
    for (name, file) in [("unit_1", file1), ("unit_2", file2)] {
        let unit = CodeUnit {
            name: name.to_string(),
            code: code.to_string(),
            file_path: file.to_string(),
            line_start: 1,
            line_end: lines,
            unit_type,
            parent_name: None,
            block_type: if unit_type == UnitType::Block {
                Some(BlockType::If)
            } else {
                None
            },
            nesting_depth: if unit_type == UnitType::Block {
                Some(1)
            } else {
                None
            },
            parent_block_name: None,
        };
        index.add_code_unit(unit);
    }
    let mut groups = index.find_all_duplicates(1);
    assert_eq!(groups.len(), 1, "fixture code must form exactly one group");
    groups.remove(0)
}

#[test]
fn empty_group_is_refactorable_at_half_confidence() {
    let classifier = PatternClassifier::new();
    let classification = classifier.classify_group(&DuplicateGroup::new("none", Vec::new()));

    assert_eq!(classification.category, DuplicateCategory::Refactorable);
    assert!((classification.confidence - 0.5).abs() < f64::EPSILON);
    assert!(!classification.suppress_suggestion);
}

#[test]
fn walrus_guard_is_idiomatic() {
    let code = "if error := self._require_index():\n    return error";
    let group = pair_group(code, "src/tools.py", "src/tools2.py", UnitType::Function);

    let classification = PatternClassifier::new().classify_group(&group);
    assert_eq!(classification.category, DuplicateCategory::IdiomaticGuard);
    assert!(classification.suppress_suggestion);
    assert!(
        classification.reason.to_lowercase().contains("walrus")
            || classification.reason.to_lowercase().contains("guard")
    );
}

#[test]
fn early_return_guard_is_idiomatic() {
    let code = "if not items:\n    return";
    let group = pair_group(code, "src/utils.py", "src/utils2.py", UnitType::Block);

    let classification = PatternClassifier::new().classify_group(&group);
    assert_eq!(classification.category, DuplicateCategory::IdiomaticGuard);
    assert!(classification.suppress_suggestion);
}

#[test]
fn single_line_guard_is_idiomatic() {
    let code = "if x is None: return 0";
    let group = pair_group(code, "src/a.py", "src/b.py", UnitType::Block);

    let classification = PatternClassifier::new().classify_group(&group);
    assert_eq!(classification.category, DuplicateCategory::IdiomaticGuard);
}

#[test]
fn continue_guard_mentions_loop_skip() {
    let code = "if _should_skip_path(py_file.parts):\n    continue";
    let group = pair_group(code, "src/index.py", "src/index2.py", UnitType::Block);

    let classification = PatternClassifier::new().classify_group(&group);
    assert_eq!(classification.category, DuplicateCategory::IdiomaticGuard);
    assert!(classification.suppress_suggestion);
    let reason = classification.reason.to_lowercase();
    assert!(reason.contains("skip") || reason.contains("loop"));
}

#[test]
fn conditional_dict_build_is_idiomatic() {
    let code =
        "if self.code_unit.block_type:\n    code_unit_dict[\"block_type\"] = self.code_unit.block_type";
    let group = pair_group(code, "src/index.py", "src/index2.py", UnitType::Block);

    let classification = PatternClassifier::new().classify_group(&group);
    assert_eq!(
        classification.category,
        DuplicateCategory::IdiomaticDictBuild
    );
    assert!(classification.suppress_suggestion);
}

#[test]
fn setattr_build_is_idiomatic() {
    let code = "if value:\n    setattr(obj, key, value)";
    let group = pair_group(code, "src/a.py", "src/b.py", UnitType::Block);

    let classification = PatternClassifier::new().classify_group(&group);
    assert_eq!(
        classification.category,
        DuplicateCategory::IdiomaticDictBuild
    );
}

#[test]
fn test_files_classify_as_test_setup() {
    let code = "with tempfile.TemporaryDirectory() as tmpdir:\n    file_path = os.path.join(tmpdir, \"test.py\")\n    with open(file_path, \"w\") as f:\n        f.write(\"print('hello')\")";
    let group = pair_group(
        code,
        "tests/test_server.py",
        "tests/test_cli.py",
        UnitType::Function,
    );

    let classification = PatternClassifier::new().classify_group(&group);
    assert_eq!(classification.category, DuplicateCategory::TestSetup);
    assert!(classification.suppress_suggestion);
    assert!(classification.reason.to_lowercase().contains("test"));
}

#[test]
fn test_setup_wins_over_guard_shape() {
    // Even guard-shaped code in test files is test setup first.
    let code = "x = 1\ny = 2";
    let group = pair_group(code, "tests/test_a.py", "tests/test_b.py", UnitType::Block);

    let classification = PatternClassifier::new().classify_group(&group);
    assert_eq!(classification.category, DuplicateCategory::TestSetup);
    assert!(classification.suppress_suggestion);
}

#[test]
fn larger_test_duplicates_stay_test_setup() {
    let code = "def setup_test_data():\n    data = {}\n    data[\"key1\"] = \"value1\"\n    data[\"key2\"] = \"value2\"\n    data[\"key3\"] = \"value3\"\n    return data";
    let group = pair_group(code, "tests/test_a.py", "tests/test_b.py", UnitType::Function);

    let classification = PatternClassifier::new().classify_group(&group);
    assert_eq!(classification.category, DuplicateCategory::TestSetup);
    assert!(classification.reason.to_lowercase().contains("test"));
}

#[test]
fn delegate_methods_suggest_suppression() {
    let code1 = "def suppress(self, wl_hash):\n    \"\"\"Suppress a hash.\"\"\"\n    return self._toggle_suppression(wl_hash, suppress=True)";
    let code2 = "def unsuppress(self, wl_hash):\n    \"\"\"Unsuppress a hash.\"\"\"\n    return self._toggle_suppression(wl_hash, suppress=False)";

    let mut index = CodeIndex::new();
    index.add_code_unit(CodeUnit::method(
        "suppress",
        code1,
        "src/tools.py",
        1,
        3,
        "Tools",
    ));
    index.add_code_unit(CodeUnit::method(
        "unsuppress",
        code2,
        "src/tools.py",
        4,
        6,
        "Tools",
    ));

    let groups = index.find_all_duplicates(1);
    assert_eq!(groups.len(), 1, "delegates must share a hash");

    let classification = PatternClassifier::new().classify_group(&groups[0]);
    assert_eq!(classification.category, DuplicateCategory::DelegateMethod);
    assert!(classification.suppress_suggestion);
}

#[test]
fn identical_argument_delegates_are_refactorable() {
    // Delegating to the same call with the same arguments everywhere is
    // ordinary duplication; only differing arguments make it a delegate
    // idiom.
    let code1 = "def alias_a(self, key):\n    return self._lookup(key, strict=True)";
    let code2 = "def alias_b(self, key):\n    return self._lookup(key, strict=True)";

    let mut index = CodeIndex::new();
    index.add_code_unit(CodeUnit::method(
        "alias_a",
        code1,
        "src/tools.py",
        1,
        2,
        "Tools",
    ));
    index.add_code_unit(CodeUnit::method(
        "alias_b",
        code2,
        "src/registry.py",
        1,
        2,
        "Registry",
    ));

    let groups = index.find_all_duplicates(1);
    assert_eq!(groups.len(), 1, "identical bodies must share a hash");

    let classifier = PatternClassifier::new();
    assert!(!classifier.is_delegate_method(code1, &groups[0].entries));

    let classification = classifier.classify_group(&groups[0]);
    assert_eq!(classification.category, DuplicateCategory::Refactorable);
    assert!(!classification.suppress_suggestion);
}

#[test]
fn non_delegate_bodies_are_rejected() {
    let classifier = PatternClassifier::new();
    let code = "def process(self, data):\n    result = []\n    for item in data:\n        result.append(item * 2)\n    return result";
    assert!(!classifier.is_delegate_method(code, &[]));
}

#[test]
fn single_entry_is_never_a_delegate() {
    let classifier = PatternClassifier::new();
    let mut index = CodeIndex::new();
    let entry = index.add_code_unit(CodeUnit::method(
        "suppress",
        "def suppress(self):\n    return self._impl()",
        "src/tools.py",
        1,
        2,
        "Tools",
    ));
    let code = entry.code_unit.code.clone();
    assert!(!classifier.is_delegate_method(&code, &[entry]));
}

#[test]
fn plain_duplicates_are_refactorable() {
    let code = "def process_items(items):\n    results = []\n    for item in items:\n        if item > 0:\n            processed = item * 2\n            results.append(processed)\n    return sorted(results)";
    let group = pair_group(code, "src/module_a.py", "src/module_b.py", UnitType::Function);

    let classification = PatternClassifier::new().classify_group(&group);
    assert_eq!(classification.category, DuplicateCategory::Refactorable);
    assert!(!classification.suppress_suggestion);
    assert!(classification.recommendation.to_lowercase().contains("extract"));
}

#[test]
fn test_file_path_detection() {
    assert!(is_test_file("tests/test_server.py"));
    assert!(is_test_file("test_utils.py"));
    assert!(is_test_file("src/tests/integration.py"));
    assert!(is_test_file("conftest.py"));
    assert!(is_test_file("specs/spec_parser.py"));
    assert!(!is_test_file("src/utils.py"));
    assert!(!is_test_file("src/testing_utils.py"));
}
