//! Session integration tests: schema documents on disk through check/commit

use formula_bridge::engine::EngineValue;
use formula_bridge::error::BridgeError;
use formula_bridge::{FormulaErrorKind, FormulaSession, Options};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ORDERS: &str = r#"
tables:
  - name: 订单
    code: orders
    fields:
      - { name: 数量, code: qty, sample: [1, 2, 3] }
      - { name: 单价, code: price, sample: [10, 20] }
      - { name: 备注, code: note }
  - name: 客户
    code: customers
    fields:
      - { name: 编号, code: id }
      - { name: 名称, code: name }
functions:
  - { name: DISCOUNT, params: "amount, rate?", category: custom }
options:
  default_table: 订单
"#;

fn write_schema(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("schema.yaml");
    fs::write(&path, content).unwrap();
    path
}

fn orders_session() -> (TempDir, FormulaSession) {
    let dir = TempDir::new().unwrap();
    let path = write_schema(&dir, ORDERS);
    let session = FormulaSession::from_path(&path).unwrap();
    (dir, session)
}

#[test]
fn test_check_previews_sample_data() {
    let (_dir, session) = orders_session();
    let report = session.check("@数量.SUM()", None);
    assert_eq!(report.canonical, "=SUM('订单'!A:A)");
    assert!(report.validation.is_empty());
    assert!(report.parse_errors.is_empty());
    assert_eq!(report.preview, Some(EngineValue::Number(6.0)));
    assert!(report.is_ok());
}

#[test]
fn test_check_reports_missing_samples() {
    let (_dir, session) = orders_session();
    let report = session.check("@备注.SUM()", None);
    assert!(report.preview.is_none());
    let error = report.compute_error.unwrap();
    assert_eq!(error.kind, FormulaErrorKind::EngineCompute);
    assert!(error.message.contains("'订单'!C:C"), "{}", error.message);
}

#[test]
fn test_check_parse_error_has_markers() {
    let (_dir, session) = orders_session();
    let report = session.check("=SUM(1,", None);
    assert!(!report.parse_errors.is_empty());
    assert_eq!(report.markers.len(), report.parse_errors.len());
    assert!(report.preview.is_none());
    assert!(report.compute_error.is_none());
}

#[test]
fn test_check_reports_signature_and_engine_independently() {
    let (_dir, session) = orders_session();
    let report = session.check("=IF(1, 2)", None);
    assert_eq!(report.validation_message(), "function IF requires at least 3 arguments, got 2");
}

#[test]
fn test_custom_function_from_document() {
    let (_dir, session) = orders_session();
    assert_eq!(session.validate("DISCOUNT(@单价)", None), None);
    assert_eq!(session.validate("DISCOUNT(@单价, 0.1)", None), None);
    let err = session.validate("DISCOUNT(@单价, 0.1, 2)", None).unwrap();
    assert_eq!(err.kind, FormulaErrorKind::Arity);
}

#[test]
fn test_validate_all_keeps_fail_fast_first() {
    let (_dir, session) = orders_session();
    let formula = "=IF(1) + NOPE() + NOT()";
    let all = session.validate_all(formula, None);
    assert_eq!(all.len(), 3);
    assert_eq!(Some(all[0].clone()), session.validate(formula, None));
}

#[test]
fn test_nested_validation_option() {
    let (_dir, session) = orders_session();
    assert_eq!(session.validate("SUM(NOT())", None), None);

    let options = Options {
        validate_nested: true,
        ..session.options().clone()
    };
    let session = session.with_options(options);
    assert!(session.validate("SUM(NOT())", None).is_some());
}

#[test]
fn test_commit_uses_default_table() {
    let (_dir, session) = orders_session();
    assert_eq!(
        session.commit("@数量 * @单价", None),
        "[orders.qty]*[orders.price]"
    );
    assert_eq!(
        session.commit("[客户].@名称 & \" - \" & @编号", None),
        "[customers.name]&\" - \"&[customers.id]"
    );
}

#[test]
fn test_explicit_table_overrides_default() {
    let (_dir, session) = orders_session();
    assert_eq!(session.normalize("@名称", Some("客户")), "'客户'!B:B");
    assert_eq!(session.normalize("@名称", None), "'订单'!A:Z");
}

#[test]
fn test_lookup_across_tables() {
    let (_dir, session) = orders_session();
    assert_eq!(
        session.lookup("customers", "id", "A2", "name").as_deref(),
        Some("=INDEX('客户'!B:B, MATCH(A2, '客户'!A:A, 0))")
    );
}

#[test]
fn test_from_path_missing_file() {
    let result = FormulaSession::from_path(Path::new("/nonexistent/schema.yaml"));
    assert!(matches!(result, Err(BridgeError::Io(_))));
}

#[test]
fn test_from_path_invalid_document() {
    let dir = TempDir::new().unwrap();
    let path = write_schema(&dir, "tables:\n  - name: T\n");
    let err = FormulaSession::from_path(&path).err().unwrap();
    assert!(matches!(err, BridgeError::Schema(_)), "{err}");
}

#[test]
fn test_json_document_in_host_shape() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("schema.json");
    fs::write(
        &path,
        r#"{"tables": [{"name": "出库通知单", "fieldName": "outStock",
            "fields": [{"name": "编号", "field": "id"}, {"name": "等级", "field": "level"}]}]}"#,
    )
    .unwrap();
    let session = FormulaSession::from_path(&path).unwrap();
    assert_eq!(session.commit("[出库通知单].@等级", None), "[outStock.level]");
}
