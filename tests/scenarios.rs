//! End-to-end scenarios through the public API: load, query, select, bulk act.

use std::io::Cursor;
use tablectl::model::{BulkError, DynRecord, FetchError, RecordKey, ValidationError};
use tablectl::source::{parse_records, JsonLinesExporter, MemorySource, RecordExporter};
use tablectl::state::{
    Capabilities, DeleteOutcome, ExportJustification, FilterValue, SortDirection, TableController,
    TableOptions,
};

fn ids(ns: &[i64]) -> Vec<RecordKey> {
    ns.iter().map(|&n| RecordKey::Int(n)).collect()
}

fn twenty_five() -> Vec<DynRecord> {
    (1..=25)
        .map(|i| {
            DynRecord::new(i)
                .with("name", format!("Company {i}"))
                .with("tier", if i % 5 == 0 { "gold" } else { "basic" })
        })
        .collect()
}

// ===== Scenario: filter while on page 3 =====

#[test]
fn filter_to_five_records_from_page_three_lands_on_page_one() {
    let mut table = TableController::local(twenty_five(), TableOptions::default());
    table.set_page(3).unwrap();
    assert_eq!(table.page_info().first_row, 21);

    table.set_filter("tier", FilterValue::Equals("gold".into()));

    assert_eq!(table.query().page_index(), 1);
    assert_eq!(table.total(), 5);
    assert_eq!(table.visible_ids(), ids(&[5, 10, 15, 20, 25]));
}

// ===== Scenario: delete selected ids, one filtered out =====

#[test]
fn delete_three_and_seven_with_seven_filtered_out() {
    let mut table = TableController::local(twenty_five(), TableOptions::default());
    table.toggle(RecordKey::Int(3));
    table.toggle(RecordKey::Int(7));
    table.set_search("Company 3");
    assert_eq!(table.visible_ids(), ids(&[3]));
    let mut backend = MemorySource::new(twenty_five(), vec!["name".to_string()]);

    let (report, _) = table
        .delete_selected(&mut backend, &Capabilities::all())
        .expect("delete succeeds");

    assert_eq!(report.removed, ids(&[3, 7]));
    assert!(report.failed.is_empty());
    assert!(!table.is_selected(&RecordKey::Int(3)));
    assert!(!table.is_selected(&RecordKey::Int(7)));
    assert!(!backend.contains(&RecordKey::Int(3)));
    assert!(!backend.contains(&RecordKey::Int(7)));

    table.clear_filters();
    assert_eq!(table.total(), 23);
    assert!(!table.visible_ids().contains(&RecordKey::Int(3)));
}

// ===== Export justification threshold =====

struct CountingExporter(usize);

impl RecordExporter<DynRecord> for CountingExporter {
    fn export(
        &mut self,
        _records: &[&DynRecord],
        _justification: &ExportJustification,
    ) -> Result<(), tablectl::model::ExportFailure> {
        self.0 += 1;
        Ok(())
    }
}

#[test]
fn export_needs_ten_characters_of_justification() {
    let mut table = TableController::local(twenty_five(), TableOptions::default());
    table.toggle_page();
    let mut exporter = CountingExporter(0);

    let rejected = table.export_selected(&mut exporter, "too short", &Capabilities::all());
    assert_eq!(
        rejected.unwrap_err(),
        BulkError::Validation(ValidationError::JustificationTooShort { min: 10, actual: 9 })
    );
    assert_eq!(exporter.0, 0);

    let receipt = table
        .export_selected(&mut exporter, "ten chars!", &Capabilities::all())
        .expect("accepted at ten characters");
    assert_eq!(receipt.exported, 10);
    assert_eq!(exporter.0, 1);
}

#[test]
fn configured_minimum_justification_is_honoured() {
    let options = TableOptions {
        min_justification_len: 20,
        ..TableOptions::default()
    };
    let mut table = TableController::local(twenty_five(), options);
    table.toggle(RecordKey::Int(1));
    let mut exporter = CountingExporter(0);

    let err = table
        .export_selected(&mut exporter, "monthly report", &Capabilities::all())
        .unwrap_err();

    assert!(matches!(
        err,
        BulkError::Validation(ValidationError::JustificationTooShort { min: 20, .. })
    ));
}

// ===== File to export =====

#[test]
fn loaded_file_sorted_and_exported_as_json_lines() {
    let input = r#"{"id":1,"name":"Globex","price":12.5}
{"id":2,"name":"acme","price":3}
{"id":3,"name":"Initech"}
"#;
    let records = parse_records(Cursor::new(input)).expect("valid input");
    let mut table = TableController::local(records, TableOptions::default());
    table.set_sort("price", SortDirection::Descending);
    assert_eq!(table.visible_ids(), ids(&[1, 2, 3]), "missing price sorts last");

    table.set_sort("name", SortDirection::Ascending);
    assert_eq!(table.visible_ids(), ids(&[2, 1, 3]), "case-insensitive order");

    table.toggle(RecordKey::Int(2));
    table.toggle(RecordKey::Int(1));
    let mut exporter = JsonLinesExporter::new(Vec::new());
    table
        .export_selected(&mut exporter, "supplier audit 2024", &Capabilities::all())
        .expect("export succeeds");

    let output = String::from_utf8(exporter.into_inner()).expect("utf-8");
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], r#"{"id":1,"name":"Globex","price":12.5}"#);
    assert_eq!(lines[1], r#"{"id":2,"name":"acme","price":3}"#);
    assert!(lines[2].contains("supplier audit 2024"));
}

// ===== Remote mode =====

#[test]
fn remote_table_recovers_from_fetch_error_and_pages() {
    let mut backend = MemorySource::new(twenty_five(), vec!["name".to_string()]);
    let mut table: TableController<DynRecord> = TableController::remote(TableOptions::default());
    backend.fail_next_fetch(FetchError::Unavailable("connection reset".into()));

    assert!(table.refresh_with(&mut backend).is_err());
    assert!(table.rows().is_empty());

    let effect = table.retry();
    table.run_effect(effect, &mut backend).expect("retry succeeds");
    assert_eq!(table.total(), 25);

    let effect = table.next_page();
    table.run_effect(effect, &mut backend).expect("page 2");
    assert_eq!(table.page_info().first_row, 11);
    assert_eq!(table.visible_ids().first(), Some(&RecordKey::Int(11)));
}

#[test]
fn remote_export_includes_rows_selected_on_earlier_pages() {
    let mut backend = MemorySource::new(twenty_five(), vec!["name".to_string()]);
    let mut table: TableController<DynRecord> = TableController::remote(TableOptions::default());
    table.refresh_with(&mut backend).expect("first page");
    table.toggle(RecordKey::Int(4));
    let effect = table.next_page();
    table.run_effect(effect, &mut backend).expect("page 2");
    table.toggle(RecordKey::Int(15));
    let mut exporter = JsonLinesExporter::new(Vec::new());

    let receipt = table
        .export_selected(&mut exporter, "customer data request", &Capabilities::all())
        .expect("export succeeds");

    assert_eq!(receipt.exported, 2);
    let output = String::from_utf8(exporter.into_inner()).expect("utf-8");
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains(r#""id":4"#));
    assert!(lines[1].contains(r#""id":15"#));
}

#[test]
fn partial_remote_delete_reports_failures_and_keeps_them_selected() {
    let mut backend =
        MemorySource::new(twenty_five(), vec!["name".to_string()]).protect([RecordKey::Int(4)]);
    let mut table: TableController<DynRecord> = TableController::remote(TableOptions::default());
    table.refresh_with(&mut backend).expect("first page");
    table.toggle(RecordKey::Int(2));
    table.toggle(RecordKey::Int(4));

    let (report, effect) = table
        .delete_selected(&mut backend, &Capabilities::all())
        .expect("delete call succeeds");
    table.run_effect(effect, &mut backend).expect("refill");

    assert!(report.is_partial());
    assert_eq!(report.removed, ids(&[2]));
    assert_eq!(report.failed, ids(&[4]));
    assert_eq!(table.selected_ids(), ids(&[4]));
    assert_eq!(table.total(), 24);
    assert_eq!(table.rows().len(), 10);
}

#[test]
fn deleter_reporting_unrequested_ids_only_removes_requested_ones() {
    let mut table = TableController::local(twenty_five(), TableOptions::default());
    table.toggle(RecordKey::Int(1));
    let mut deleter = |_: &[RecordKey]| -> Result<DeleteOutcome<RecordKey>, FetchError> {
        Ok(DeleteOutcome {
            succeeded: ids(&[1, 2]),
            failed: Vec::new(),
        })
    };

    let (report, _) = table
        .delete_selected(&mut deleter, &Capabilities::all())
        .expect("delete succeeds");

    assert_eq!(report.removed, ids(&[1]));
    assert_eq!(table.total(), 24);
}

#[test]
fn read_only_caller_cannot_bulk_act() {
    let mut table = TableController::local(twenty_five(), TableOptions::default());
    table.toggle(RecordKey::Int(1));

    assert!(matches!(
        table.begin_delete(&Capabilities::read_only()),
        Err(BulkError::NotPermitted(_))
    ));
    assert!(matches!(
        table.begin_export("quarterly audit", &Capabilities::read_only()),
        Err(BulkError::NotPermitted(_))
    ));
    assert!(!table.is_busy());
}
