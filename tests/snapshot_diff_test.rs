// ==========================================
// 快照对比集成测试
// ==========================================
// 测试目标: 两批导出 → 快照 → VIN 差异 → 差异报告
// ==========================================


use lyriq_price::domain::{DuplicateVinPolicy, ListingRecord, SnapshotRelation};
use lyriq_price::engine::{DiffReport, EngineError, Snapshot, SnapshotDiffer};
use lyriq_price::importer::{json_store, ListingImporter};
use std::collections::BTreeSet;
use test_helpers::{current_export, default_importer, previous_export, write_temp_csv};

fn import(content: &str) -> Vec<ListingRecord> {
    let file = write_temp_csv(content).expect("Failed to write fixture");
    default_importer()
        .import_csv(file.path())
        .expect("Import should succeed")
        .records
}

fn build_report() -> DiffReport {
    let previous = Snapshot::build(import(&previous_export()), DuplicateVinPolicy::Reject).unwrap();
    let current = Snapshot::build(import(&current_export()), DuplicateVinPolicy::Reject).unwrap();
    let diff = SnapshotDiffer::new().diff(&previous, &current);
    DiffReport::build(&previous, &current, &diff)
}

#[test]
fn test_diff_between_exports() {
    let previous = Snapshot::build(import(&previous_export()), DuplicateVinPolicy::Reject).unwrap();
    let current = Snapshot::build(import(&current_export()), DuplicateVinPolicy::Reject).unwrap();
    let diff = SnapshotDiffer::new().diff(&previous, &current);

    let set = |vins: &[&str]| -> BTreeSet<String> { vins.iter().map(|v| v.to_string()).collect() };
    assert_eq!(diff.added, set(&["1GYKPRRL1RZ100004", "1GYKPRRL1RZ100005"]));
    assert_eq!(diff.removed, set(&["1GYKPRRL1RZ100001"]));
    assert_eq!(diff.common, set(&["1GYKPRRL1RZ100002", "1GYKPRRL1RZ100003"]));
    assert_eq!(diff.relation(), SnapshotRelation::Mixed);
    assert_eq!(diff.net_change(), 1);

    // 三个集合互不相交，且覆盖两个快照的全部 VIN
    assert!(diff.added.is_disjoint(&diff.common));
    assert!(diff.removed.is_disjoint(&diff.common));
    let all: BTreeSet<String> = previous.vins().union(&current.vins()).cloned().collect();
    let covered: BTreeSet<String> = diff
        .added
        .iter()
        .chain(&diff.removed)
        .chain(&diff.common)
        .cloned()
        .collect();
    assert_eq!(all, covered);
}

#[test]
fn test_report_between_exports() {
    let report = build_report();

    assert_eq!(report.previous_count, 3);
    assert_eq!(report.current_count, 4);
    assert_eq!(report.added_count, 2);
    assert_eq!(report.removed_count, 1);
    assert_eq!(report.common_count, 2);

    // 新增记录保持当前快照顺序
    let added: Vec<&str> = report.added.iter().map(|r| r.vin.as_str()).collect();
    assert_eq!(added, vec!["1GYKPRRL1RZ100004", "1GYKPRRL1RZ100005"]);
    assert_eq!(report.removed[0].trim, "Tech");
    assert_eq!(report.removed_by_trim[0].key, "Tech");
    assert_eq!(report.removed_by_year[0].key, "2024");
    assert_eq!(report.removed_top_locations[0].key, "Austin, TX");

    let text = report.render_text();
    assert!(text.contains("Unique VINs in previous snapshot: 3"));
    assert!(text.contains("New VINs in current snapshot: 2"));
    assert!(text.contains("Net change: 1"));
    assert!(text.contains("Relationship: mixed"));
    assert!(text.contains("Removed entries by location (top 10):\n  Austin, TX: 1"));
}

#[test]
fn test_json_snapshots_compare_trimmed_vins() {
    let previous = json_store::parse_records(r#"[{"vin": "A"}]"#).unwrap();
    let current = json_store::parse_records(r#"[{"vin": "A "}]"#).unwrap();

    let previous = Snapshot::build(previous, DuplicateVinPolicy::Reject).unwrap();
    let current = Snapshot::build(current, DuplicateVinPolicy::Reject).unwrap();
    let diff = SnapshotDiffer::new().diff(&previous, &current);

    assert_eq!(diff.relation(), SnapshotRelation::Identical);
    assert_eq!(diff.common, BTreeSet::from(["A".to_string()]));
}

#[test]
fn test_added_records_extract_round_trip() {
    let report = build_report();
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("new_entries.json");

    json_store::write_records(&path, &report.added).unwrap();
    let loaded = json_store::read_records(&path).unwrap();
    assert_eq!(loaded, report.added);
}

#[test]
fn test_identical_exports() {
    let previous = Snapshot::build(import(&previous_export()), DuplicateVinPolicy::Reject).unwrap();
    let again = Snapshot::build(import(&previous_export()), DuplicateVinPolicy::Reject).unwrap();
    let diff = SnapshotDiffer::new().diff(&previous, &again);

    assert_eq!(diff.relation(), SnapshotRelation::Identical);
    assert_eq!(diff.common.len(), 3);
}

#[test]
fn test_duplicate_vin_policies() {
    // 按全字段去重后，同 VIN 不同价格的两条记录都会保留
    let content = format!(
        "{}\n{}\n{}",
        test_helpers::EXPORT_HEADER,
        r#"VIN-A,S1,2024,Tech AWD,"$45,900.00",100,,"Austin, TX",AWD,Black,White,"#,
        r#"VIN-A,S1,2024,Tech AWD,"$44,900.00",100,,"Austin, TX",AWD,Black,White,"#,
    );
    let records = import(&content);
    assert_eq!(records.len(), 2);

    let err = Snapshot::build(records.clone(), DuplicateVinPolicy::Reject).unwrap_err();
    assert_eq!(
        err,
        EngineError::DuplicateVin {
            vin: "VIN-A".to_string(),
            first_position: 1,
            second_position: 2,
        }
    );

    let snapshot = Snapshot::build(records, DuplicateVinPolicy::LastWins).unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.get("VIN-A").map(|r| r.price), Some(44900));
}
