//! Integration test: rule records and catalog end-to-end via Converter.
//!
//! Uses fixture files under `tests/fixtures/convert/` to verify that the
//! full records → rules → catalog → view model → constraints pipeline
//! emits the expected CML per product cluster.

use rulecml_core::cml::parse_associations_csv;
use rulecml_core::{load_records, ConversionResult, Converter, LoadedRules, StaticCatalog};
use std::path::PathBuf;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/convert")
        .join(name);
    std::fs::read_to_string(path).expect("fixture should exist")
}

/// Wraps each rule definition in a record the way exports store them: the
/// definition as an embedded JSON string.
fn records(extra: &[serde_json::Value]) -> String {
    let definitions: Vec<serde_json::Value> =
        serde_json::from_str(&fixture("rules.json")).expect("rules fixture should parse");
    let records: Vec<serde_json::Value> = definitions
        .iter()
        .map(|d| {
            serde_json::json!({
                "ApiName": d["apiName"],
                "Name": d["name"],
                "Sequence": d["sequence"].to_string(),
                "ConfigurationRuleDefinition": d.to_string(),
            })
        })
        .chain(extra.iter().cloned())
        .collect();
    serde_json::Value::Array(records).to_string()
}

fn load() -> LoadedRules {
    load_records(&records(&[])).expect("records should load")
}

fn convert_with(ledger: Vec<rulecml_core::cml::Association>) -> ConversionResult {
    let catalog =
        StaticCatalog::from_json(&fixture("products.json")).expect("catalog should parse");
    let converter = Converter::builder()
        .provider(catalog)
        .api_name("TestApi")
        .ledger(ledger)
        .build()
        .expect("converter should build");
    converter.convert(load().rules).expect("conversion should succeed")
}

fn convert() -> ConversionResult {
    convert_with(Vec::new())
}

/// Trimmed, non-empty lines of a type's body.
fn type_lines(cml: &str, type_name: &str) -> Vec<String> {
    let exact = format!("type {type_name};");
    let open = format!("type {type_name} ");
    let mut lines = cml.lines();
    let found = lines.by_ref().any(|l| l == exact || l.starts_with(&open));
    assert!(found, "type {type_name} missing from:\n{cml}");
    lines
        .take_while(|l| *l != "}")
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn contains(lines: &[String], expected: &str) -> bool {
    lines.iter().any(|l| l == expected)
}

// ── Happy-path: clustering and artifacts ──

#[test]
fn produces_one_artifact_per_root_product() {
    let result = convert();

    assert_eq!(result.clusters.len(), 2);
    assert_eq!(
        result.clusters[0].rules,
        vec!["lpb_gk", "lpb_vr", "lpb_smt", "ghost_target"]
    );
    assert_eq!(result.clusters[1].rules, vec!["desktopp"]);
    assert_eq!(result.clusters[0].artifact.cml_file_name(), "TestApi_0.cml");
    assert_eq!(
        result.clusters[1].artifact.associations_file_name(),
        "TestApi_1_Associations.csv"
    );
    assert_eq!(result.products_fetched, 3);
}

#[test]
fn orphan_rules_are_reported_unmatched() {
    let result = convert();
    assert_eq!(result.unmatched.len(), 1);
    assert_eq!(result.unmatched[0].rules, vec!["orphan"]);
}

#[test]
fn nested_catalog_entries_do_not_form_their_own_cluster() {
    let result = convert();
    let laptop_headers = result
        .clusters
        .iter()
        .map(|c| c.artifact.cml.matches("type Laptop : LineItem").count())
        .collect::<Vec<_>>();
    assert_eq!(laptop_headers, vec![1, 0]);
}

// ── Happy-path: emitted constraints ──

#[test]
fn bundle_criterion_navigates_to_component_attribute() {
    let result = convert();
    let lines = type_lines(&result.clusters[0].artifact.cml, "LaptopProBundle");

    assert!(contains(
        &lines,
        r#"constraint lpb_gk_criteria_1 = ((laptop[Laptop] > 0) && laptop[Laptop].Memory == "RAM 64GB");"#
    ));
    assert!(contains(&lines, "require(lpb_gk_criteria_1, printer[Printer]);"));
    assert!(contains(
        &lines,
        r#"message(lpb_gk_criteria_1, "AutoAdd: Printer added", "Info");"#
    ));
}

#[test]
fn attribute_behaviors_propagate_guard_into_components() {
    let result = convert();
    let cml = &result.clusters[0].artifact.cml;

    let bundle = type_lines(cml, "LaptopProBundle");
    assert!(contains(&bundle, "boolean lpb_vr_criteria_1_value;"));
    assert!(contains(
        &bundle,
        "constraint((lpb_vr_criteria_1) == lpb_vr_criteria_1_value);"
    ));
    let joined = bundle.join(" ");
    assert!(!joined.contains(r#""Hide", "attribute", "Graphics");"#));
    assert!(!joined.contains(r#""Hide", "attribute", "Printer", "value", "Laser");"#));

    let laptop = type_lines(cml, "Laptop");
    assert!(contains(
        &laptop,
        "boolean parent_lpb_vr_criteria_1_value = parent(lpb_vr_criteria_1_value);"
    ));
    assert!(contains(
        &laptop,
        r#"rule(parent_lpb_vr_criteria_1_value == true, "Hide", "attribute", "Graphics");"#
    ));
    assert!(contains(
        &laptop,
        r#"rule(parent_lpb_vr_criteria_1_value == true, "Disable", "attribute", "Windows_Processor", "value", ["i7-CPU 4.7GHz", "Intel Core i9 5.2 GHz"]);"#
    ));

    let printer = type_lines(cml, "Printer");
    assert!(contains(
        &printer,
        "boolean parent_lpb_vr_criteria_1_value = parent(lpb_vr_criteria_1_value);"
    ));
    assert!(contains(
        &printer,
        r#"rule(parent_lpb_vr_criteria_1_value == true, "Hide", "attribute", "Printer", "value", "Laser");"#
    ));
}

#[test]
fn product_message_escapes_quotes() {
    let result = convert();
    let lines = type_lines(&result.clusters[1].artifact.cml, "Desktop");

    assert!(contains(&lines, "constraint desktopp_criteria_1 = (true);"));
    assert!(contains(
        &lines,
        r#"constraint(desktopp_criteria_1 && (Screen == "2k"));"#
    ));
    assert!(contains(
        &lines,
        r#"message(desktopp_criteria_1, "SetAttribute: 2k screen selected. and 27\"", "Info");"#
    ));
}

#[test]
fn tag_condition_declares_annotated_attribute() {
    let result = convert();
    let lines = type_lines(&result.clusters[0].artifact.cml, "LaptopProBundle");

    let attribute = lines
        .iter()
        .position(|l| l == "string SellingModelType;")
        .expect("tag attribute should be declared");
    assert_eq!(lines[attribute - 1], r#"@(tagName = "SellingModelType")"#);
    assert!(contains(
        &lines,
        r#"constraint lpb_smt_criteria_1 = (SellingModelType == "OneTime");"#
    ));
    assert!(contains(
        &lines,
        r#"rule(lpb_smt_criteria_1, "Hide", "relation", "printer", "type", "Printer");"#
    ));
}

#[test]
fn transaction_root_is_dropped_when_unused() {
    let result = convert();
    assert!(result
        .clusters
        .iter()
        .all(|c| !c.artifact.cml.contains("VirtualQuote")));
}

// ── Rule failures ──

#[test]
fn action_with_unknown_target_is_skipped_alone() {
    let result = convert();
    let report = &result.clusters[0].report;

    assert_eq!(report.rules_compiled, 4);
    assert!(report.rules_skipped.is_empty());
    assert_eq!(report.actions_skipped.len(), 1);
    assert_eq!(report.actions_skipped[0].api_name, "ghost_target");

    let lines = type_lines(&result.clusters[0].artifact.cml, "LaptopProBundle");
    assert!(contains(
        &lines,
        "constraint ghost_target_criteria_1 = ((laptop[Laptop] > 0));"
    ));
    assert!(!lines.iter().any(|l| l.starts_with("require(ghost_target_criteria_1")));
}

#[test]
fn malformed_record_is_skipped_at_load() {
    let broken = serde_json::json!({
        "ApiName": "broken",
        "Name": "Broken",
        "Sequence": "70",
        "ConfigurationRuleDefinition": "{not json",
    });
    let loaded = load_records(&records(&[broken])).expect("outer array should load");

    assert_eq!(loaded.rules.len(), 6);
    assert_eq!(loaded.failures.len(), 1);
    assert_eq!(loaded.failures[0].api_name, "broken");
}

// ── Ledger ──

/// `type` and `relation` lines, which carry the generated names.
fn declared_names(cml: &str) -> Vec<&str> {
    cml.lines()
        .map(str::trim)
        .filter(|l| l.starts_with("type ") || l.starts_with("relation "))
        .collect()
}

#[test]
fn regeneration_with_ledger_keeps_names_and_table() {
    let first = convert();
    let ledger = first
        .clusters
        .iter()
        .flat_map(|c| {
            parse_associations_csv(&c.artifact.associations_csv).expect("table should parse")
        })
        .collect();

    let second = convert_with(ledger);

    assert_eq!(first.clusters.len(), second.clusters.len());
    for (a, b) in first.clusters.iter().zip(&second.clusters) {
        assert_eq!(declared_names(&a.artifact.cml), declared_names(&b.artifact.cml));
        assert_eq!(a.artifact.associations_csv, b.artifact.associations_csv);
        assert_eq!(a.report.rules_compiled, b.report.rules_compiled);
    }
}

#[test]
fn ledger_known_products_do_not_redeclare_catalog_attributes() {
    let first = convert();
    let domain = r#"string Memory = ["RAM 32GB", "RAM 64GB"];"#;
    assert!(first.clusters[0].artifact.cml.contains(domain));

    let ledger = first
        .clusters
        .iter()
        .flat_map(|c| {
            parse_associations_csv(&c.artifact.associations_csv).expect("table should parse")
        })
        .collect();
    let second = convert_with(ledger);

    let cml = &second.clusters[0].artifact.cml;
    assert!(!cml.contains(domain));
    assert!(!type_lines(cml, "Laptop").iter().any(|l| l == "string Graphics;"));
}

#[test]
fn associations_table_lists_types_and_ports() {
    let result = convert();
    let csv = &result.clusters[0].artifact.associations_csv;

    assert!(csv.contains("TestApi,LaptopProBundle,Type,01tLPB,Laptop Pro Bundle,,"));
    assert!(csv.contains("TestApi,laptop,Port,0dSLPBLAP,,,Laptop Pro Bundle||Laptop||"));
    assert!(!csv.contains("Desktop"));
}
