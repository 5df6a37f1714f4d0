// ==========================================
// ListingImporter 集成测试
// ==========================================
// 测试目标: 验证 CSV 文件 → 规范记录 → JSON 的完整导入流程
// ==========================================


use lyriq_price::domain::{OutputFormat, PHONE_PLACEHOLDER};
use lyriq_price::importer::{json_store, ImportError, ListingImporter};
use lyriq_price::logging;
use test_helpers::{
    current_export, default_importer, importer_with_dedup_keys, importer_with_encoding,
    previous_export, write_temp_csv, write_temp_csv_bytes, write_temp_file,
};

#[test]
fn test_import_csv_basic() {
    logging::init_test();

    let file = write_temp_csv(&previous_export()).expect("Failed to write fixture");
    let outcome = default_importer()
        .import_csv(file.path())
        .expect("Import should succeed");

    // 5 行数据: 1 空行 + 1 完全重复
    let summary = &outcome.summary;
    assert_eq!(summary.total_rows, 5);
    assert_eq!(summary.empty_rows, 1);
    assert_eq!(summary.duplicate_rows, 1);
    assert_eq!(summary.retained_rows, 3);
    assert_eq!(summary.delimiter, ",");
    assert!(!summary.run_id.is_empty());

    // 重复记录指向首次出现的行
    assert_eq!(outcome.duplicates.len(), 1);
    assert_eq!(outcome.duplicates[0].row_number, 5);
    assert_eq!(outcome.duplicates[0].first_row_number, 2);

    let vins: Vec<&str> = outcome.records.iter().map(|r| r.vin.as_str()).collect();
    assert_eq!(
        vins,
        vec!["1GYKPRRL1RZ100001", "1GYKPRRL1RZ100002", "1GYKPRRL1RZ100003"]
    );
}

#[test]
fn test_import_csv_normalizes_fields() {
    let file = write_temp_csv(&previous_export()).unwrap();
    let outcome = default_importer().import_csv(file.path()).unwrap();

    let first = &outcome.records[0];
    assert_eq!(first.stock, "S1");
    assert_eq!(first.year, 2024);
    assert_eq!(first.trim, "Tech");
    assert_eq!(first.price, 45900);
    assert_eq!(first.mileage, 10203);
    assert_eq!(first.payment, 670);
    assert_eq!(first.location, "Austin, TX");
    assert_eq!(first.drive_type, "AWD");
    assert_eq!(first.interior_color, "Black");
    assert_eq!(first.exterior_color, "White");
    assert_eq!(first.request_info, PHONE_PLACEHOLDER);

    let third = &outcome.records[2];
    assert_eq!(third.trim, "Sport 2");
    assert_eq!(third.drive_type, "RWD");
    assert_eq!(third.request_info, "(555) 555-0100");

    // 同一次导入共享时间戳
    assert!(outcome.records.iter().all(|r| r.time == outcome.summary.parsed_at));
}

#[test]
fn test_import_csv_sniffs_semicolon() {
    let file = write_temp_csv(&current_export()).unwrap();
    let outcome = default_importer().import_csv(file.path()).unwrap();

    assert_eq!(outcome.summary.delimiter, ";");
    assert_eq!(outcome.summary.retained_rows, 4);
    assert_eq!(outcome.records[0].price, 51900);
    assert_eq!(outcome.records[0].mileage, 3400);
    assert_eq!(outcome.records[0].location, "Dallas, TX");
}

#[test]
fn test_import_csv_dedup_by_vin() {
    // 同一 VIN 的两条记录仅字段不同，按 VIN 去重时后者被丢弃
    let content = format!(
        "{}\n{}",
        test_helpers::EXPORT_HEADER,
        [
            r#"VIN-A,S1,2024,Tech AWD,"$45,900.00",100,,"Austin, TX",AWD,Black,White,"#,
            r#"VIN-A,S1,2024,Tech AWD,"$44,900.00",100,,"Austin, TX",AWD,Black,White,"#,
            r#"VIN-B,S2,2024,Tech AWD,"$46,900.00",100,,"Austin, TX",AWD,Black,White,"#,
        ]
        .join("\n")
    );
    let file = write_temp_csv(&content).unwrap();

    let all_fields = default_importer().import_csv(file.path()).unwrap();
    assert_eq!(all_fields.summary.retained_rows, 3);

    let by_vin = importer_with_dedup_keys(&["vin"])
        .import_csv(file.path())
        .unwrap();
    assert_eq!(by_vin.summary.retained_rows, 2);
    assert_eq!(by_vin.records[0].price, 45900);
    assert_eq!(by_vin.duplicates[0].vin, "VIN-A");
}

#[test]
fn test_import_csv_dedup_keys_use_header_spelling() {
    // 去重键按表头规则规范化: "VIN" 即 vin，"milege" 即 mileage
    let content = format!(
        "{}\n{}",
        test_helpers::EXPORT_HEADER,
        [
            r#"VIN-A,S1,2024,Tech AWD,"$45,900.00",100,,"Austin, TX",AWD,Black,White,"#,
            r#"VIN-B,S2,2024,Tech AWD,"$46,900.00",200,,"Austin, TX",AWD,Black,White,"#,
            r#"VIN-C,S3,2024,Tech AWD,"$47,900.00",300,,"Austin, TX",AWD,Black,White,"#,
        ]
        .join("\n")
    );
    let file = write_temp_csv(&content).unwrap();

    for keys in [["VIN"], ["milege"]] {
        let outcome = importer_with_dedup_keys(&keys)
            .import_csv(file.path())
            .unwrap();
        assert_eq!(outcome.summary.retained_rows, 3, "dedup keys {:?}", keys);
        assert!(outcome.duplicates.is_empty());
    }
}

#[test]
fn test_import_csv_latin1_encoding() {
    let content: &[u8] =
        b"VIN,Trim,Location,Interior Color\nVIN-A,Tech AWD,\"Montr\xe9al, QC\",Cr\xe8me\n";
    let file = write_temp_csv_bytes(content).unwrap();

    let outcome = importer_with_encoding("latin1")
        .import_csv(file.path())
        .unwrap();
    assert_eq!(outcome.records[0].location, "Montréal, QC");
    assert_eq!(outcome.records[0].interior_color, "Crème");

    // 默认 UTF-8 读取同一文件失败
    let result = default_importer().import_csv(file.path());
    assert!(matches!(result, Err(ImportError::FileReadError(_))));
}

#[test]
fn test_import_csv_missing_required_column() {
    let file = write_temp_csv("Stock,Price\nS1,$1\n").unwrap();
    let result = default_importer().import_csv(file.path());

    match result {
        Err(ImportError::MissingColumn { column, available }) => {
            assert_eq!(column, "vin");
            assert!(available.contains("stock"));
        }
        other => panic!("Expected MissingColumn, got {:?}", other.map(|o| o.summary)),
    }
}

#[test]
fn test_import_csv_file_not_found() {
    let result = default_importer().import_csv(std::path::Path::new("/nonexistent/listings.csv"));
    assert!(matches!(result, Err(ImportError::FileNotFound(_))));
}

#[test]
fn test_convert_to_json_and_back() {
    let file = write_temp_csv(&previous_export()).unwrap();
    let outcome = default_importer().import_csv(file.path()).unwrap();

    let array = json_store::to_json_string(&outcome.records, &outcome.summary, OutputFormat::Array)
        .unwrap();
    let (_dir, path) = write_temp_file("listings.json", &array).unwrap();
    let loaded = json_store::read_records(&path).unwrap();
    assert_eq!(loaded, outcome.records);

    // 包装形态同样可读回
    let wrapped =
        json_store::to_json_string(&outcome.records, &outcome.summary, OutputFormat::Wrapped)
            .unwrap();
    let value: serde_json::Value = serde_json::from_str(&wrapped).unwrap();
    assert_eq!(value["metadata"]["retained_rows"], 3);
    assert_eq!(json_store::parse_records(&wrapped).unwrap(), outcome.records);
}
