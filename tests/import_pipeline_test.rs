// ==========================================
// 导入流水线集成测试
// ==========================================
// 测试目标: 源读取 → 映射/转换 → 自动填充 → copy 解析 的完整组合
// ==========================================


use cusmon_import::domain::{AutoFillMethod, Item};
use cusmon_import::importer::{
    find_anchor, row_hash, Anchor, AutoFillConfig, ColumnMapping, ImportPipeline, ImportSession,
    SessionConfig, Sheet, TabularSource, Workbook, INVALID_DATE,
};
use cusmon_import::logging;
use serde_json::json;
use std::collections::HashMap;
use test_helpers::{grid, name_code_schema, orders_schema};
use uuid::Uuid;

fn customers() -> HashMap<String, Vec<Item>> {
    let rows = vec![
        Item::from_value(json!({"_id": "c-1", "code": "ACME", "name": "Acme Ltd"})).unwrap(),
        Item::from_value(json!({"_id": "c-2", "code": "^GLOBEX", "name": "Globex"})).unwrap(),
    ];
    HashMap::from([("customers".to_string(), rows)])
}

#[test]
fn test_title_row_sheet_produces_two_items_with_fresh_ids() {
    logging::init_test();

    let sheet = grid(&[&["Title"], &["Name", "Code"], &["Alice", "X1"], &["Bob", "X2"]]);
    let schema = name_code_schema();
    let source = TabularSource::detect(&sheet);
    assert_eq!(source.anchor(), Anchor::new(1, 0));

    let mapping = ColumnMapping::auto(source.columns(), &schema);
    let autofill = AutoFillConfig::new();
    let references = HashMap::new();
    let pipeline = ImportPipeline::new(&schema, &mapping, &autofill, &references);

    let items: Vec<Item> = pipeline.run(&source, Some(5)).collect();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].get("name"), Some(&json!("Alice")));
    assert_eq!(items[0].get("code"), Some(&json!("X1")));
    assert_eq!(items[1].get("name"), Some(&json!("Bob")));
    assert_eq!(items[1].get("code"), Some(&json!("X2")));

    let first = items[0].id().unwrap();
    let second = items[1].id().unwrap();
    assert!(Uuid::parse_str(first).is_ok());
    assert!(Uuid::parse_str(second).is_ok());
    assert_ne!(first, second);
}

#[test]
fn test_row_hash_ids_are_identical_across_runs() {
    let sheet = grid(&[&["Title"], &["Name", "Code"], &["Alice", "X1"], &["Bob", "X2"]]);
    let schema = name_code_schema();
    let source = TabularSource::detect(&sheet);
    let mapping = ColumnMapping::auto(source.columns(), &schema);
    let autofill = AutoFillConfig::new().with_advanced("_id", Some(AutoFillMethod::InputRowHash));
    let references = HashMap::new();

    let ids = || -> Vec<String> {
        ImportPipeline::new(&schema, &mapping, &autofill, &references)
            .run(&source, None)
            .map(|item| item.id().unwrap().to_string())
            .collect()
    };
    let first_run = ids();
    let second_run = ids();

    // 相同源数据两次运行的 _id 必须一致；写库是否覆盖仍由批量插入决定
    assert_eq!(first_run, second_run);
    assert_eq!(first_run[0], row_hash(&sheet[2]));
    assert_ne!(first_run[0], first_run[1]);
}

#[test]
fn test_reference_and_copy_fields_resolve_from_fetched_rows() {
    let sheet = grid(&[
        &["", "", "", ""],
        &["Order No", "Date", "Customer", ""],
        &["O-1", "15-03-2024", "ACME", ""],
        &["O-2", "not a date", "GLOBEX", ""],
        &["O-3", "", "Initech", ""],
    ]);
    let schema = orders_schema();
    let source = TabularSource::detect(&sheet);
    let mapping = ColumnMapping::auto(source.columns(), &schema);
    let autofill = AutoFillConfig::new();
    let references = customers();
    let items: Vec<Item> = ImportPipeline::new(&schema, &mapping, &autofill, &references)
        .run(&source, None)
        .collect();

    assert_eq!(items.len(), 3);

    assert_eq!(items[0].get("ordered_at"), Some(&json!("2024-03-15")));
    assert_eq!(items[0].get("customer"), Some(&json!("c-1")));
    assert_eq!(items[0].get("customer_name"), Some(&json!("Acme Ltd")));

    // 单元格值按正则匹配被引用行的搜索列
    assert_eq!(items[1].get("ordered_at"), Some(&json!(INVALID_DATE)));
    assert_eq!(items[1].get("customer"), Some(&json!("c-2")));
    assert_eq!(items[1].get("customer_name"), Some(&json!("Globex")));

    // 无匹配: 引用与复制字段均缺失
    assert!(items[2].get("ordered_at").is_none());
    assert!(items[2].get("customer").is_none());
    assert!(items[2].get("customer_name").is_none());
}

#[test]
fn test_empty_sheet_anchor_and_sequences() {
    let sheet = grid(&[&["", ""], &["", ""]]);
    assert_eq!(find_anchor(&sheet), Anchor::new(0, 0));
    let source = TabularSource::detect(&sheet);
    assert!(source.columns().is_empty());
    assert_eq!(source.rows().count(), 0);
}

#[test]
fn test_session_preview_then_finish() {
    let mut rows: Vec<Vec<&str>> = vec![vec!["Export"], vec!["Name", "Code"]];
    let names: Vec<String> = (0..8).map(|i| format!("row-{}", i)).collect();
    for name in &names {
        rows.push(vec![name.as_str(), "X"]);
    }
    let row_refs: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
    let workbook = Workbook {
        sheets: vec![Sheet {
            name: "Sheet1".to_string(),
            grid: grid(&row_refs),
        }],
    };

    let session = ImportSession::open(workbook, name_code_schema(), SessionConfig::default()).unwrap();
    assert!(session.unmapped_fields().is_empty());

    let references = HashMap::new();
    let session = session.preview(&references).unwrap();
    assert_eq!(session.items().len(), 5);
    let preview_ids: Vec<String> = session.items().iter().map(|i| i.id().unwrap().to_string()).collect();

    let session = session.finish(&references).unwrap();
    assert_eq!(session.items().len(), 8);
    let finished_ids: Vec<String> = session.items()[..5].iter().map(|i| i.id().unwrap().to_string()).collect();
    // 会话默认以行哈希作为 _id
    assert_eq!(preview_ids, finished_ids);
}
