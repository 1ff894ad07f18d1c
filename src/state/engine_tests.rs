//! Tests for the filter/sort/paginate engine.

use super::*;
use crate::model::{DynRecord, RecordKey};
use chrono::NaiveDate;

fn searchable() -> Vec<String> {
    vec!["name".to_string(), "company".to_string()]
}

fn product(id: i64, name: &str, price: f64) -> DynRecord {
    DynRecord::new(id).with("name", name).with("price", price)
}

fn ids<R: Record>(rows: &[&R]) -> Vec<R::Id> {
    rows.iter().map(|r| r.id()).collect()
}

fn numbered(n: i64) -> Vec<DynRecord> {
    (1..=n)
        .map(|i| {
            DynRecord::new(i)
                .with("name", format!("item {i}"))
                .with("even", i % 2 == 0)
        })
        .collect()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ===== Search =====

#[test]
fn search_is_case_insensitive_substring() {
    let records = vec![
        product(1, "Red Widget", 5.0),
        product(2, "Blue gadget", 7.0),
        product(3, "WIDGETRON", 9.0),
    ];
    let mut q = QueryState::new(10);
    q.set_search("widget");

    let view = apply(&records, &q, &searchable());

    assert_eq!(ids(&view.rows), vec![RecordKey::Int(1), RecordKey::Int(3)]);
    assert_eq!(view.total, 2);
}

#[test]
fn search_only_looks_at_searchable_fields() {
    let records = vec![DynRecord::new(1).with("name", "Plain").with("notes", "secret widget")];
    let mut q = QueryState::new(10);
    q.set_search("widget");

    assert_eq!(apply(&records, &q, &searchable()).total, 0);
}

#[test]
fn whitespace_search_term_matches_everything() {
    let records = numbered(4);
    let mut q = QueryState::new(10);
    q.set_search("   ");

    assert_eq!(apply(&records, &q, &searchable()).total, 4);
}

#[test]
fn search_matches_numeric_field_text() {
    let records = vec![DynRecord::new(1).with("name", 1234_i64)];
    let mut q = QueryState::new(10);
    q.set_search("23");

    assert_eq!(apply(&records, &q, &searchable()).total, 1);
}

// ===== Filters =====

#[test]
fn filters_combine_with_and() {
    let records = vec![
        DynRecord::new(1).with("status", "open").with("active", true),
        DynRecord::new(2).with("status", "open").with("active", false),
        DynRecord::new(3).with("status", "closed").with("active", true),
    ];
    let mut q = QueryState::new(10);
    q.set_filter("status", FilterValue::Equals(FieldValue::text("OPEN")));
    q.set_filter("active", FilterValue::Flag(true));

    let view = apply(&records, &q, &searchable());

    assert_eq!(ids(&view.rows), vec![RecordKey::Int(1)]);
}

#[test]
fn one_of_filter_is_set_membership() {
    let records = vec![
        DynRecord::new(1).with("category", "food"),
        DynRecord::new(2).with("category", "tools"),
        DynRecord::new(3).with("category", "toys"),
    ];
    let mut q = QueryState::new(10);
    q.set_filter(
        "category",
        FilterValue::OneOf(vec![FieldValue::text("food"), FieldValue::text("toys")]),
    );

    let view = apply(&records, &q, &searchable());

    assert_eq!(ids(&view.rows), vec![RecordKey::Int(1), RecordKey::Int(3)]);
}

#[test]
fn date_range_is_inclusive_on_both_ends() {
    let records = vec![
        DynRecord::new(1).with("created", date(2024, 1, 1)),
        DynRecord::new(2).with("created", date(2024, 1, 15)),
        DynRecord::new(3).with("created", date(2024, 1, 31)),
        DynRecord::new(4).with("created", date(2024, 2, 1)),
    ];
    let mut q = QueryState::new(10);
    q.set_filter(
        "created",
        FilterValue::Range {
            from: Some(FieldValue::Date(date(2024, 1, 1))),
            to: Some(FieldValue::Date(date(2024, 1, 31))),
        },
    );

    let view = apply(&records, &q, &searchable());

    assert_eq!(
        ids(&view.rows),
        vec![RecordKey::Int(1), RecordKey::Int(2), RecordKey::Int(3)]
    );
}

#[test]
fn date_range_includes_timestamps_on_the_end_day() {
    let late = chrono::DateTime::parse_from_rfc3339("2024-01-31T23:30:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let records = vec![DynRecord::new(1).with("created", late)];
    let mut q = QueryState::new(10);
    q.set_filter(
        "created",
        FilterValue::Range {
            from: None,
            to: Some(FieldValue::Date(date(2024, 1, 31))),
        },
    );

    assert_eq!(apply(&records, &q, &searchable()).total, 1);
}

#[test]
fn open_ended_numeric_range() {
    let records = vec![product(1, "a", 5.0), product(2, "b", 10.0), product(3, "c", 15.0)];
    let mut q = QueryState::new(10);
    q.set_filter(
        "price",
        FilterValue::Range {
            from: Some(FieldValue::Number(10.0)),
            to: None,
        },
    );

    let view = apply(&records, &q, &searchable());

    assert_eq!(ids(&view.rows), vec![RecordKey::Int(2), RecordKey::Int(3)]);
}

#[test]
fn missing_field_fails_equality_but_reads_false_for_flag() {
    assert!(!matches_filter(None, &FilterValue::Equals(FieldValue::text("x"))));
    assert!(matches_filter(None, &FilterValue::Flag(false)));
    assert!(!matches_filter(None, &FilterValue::Flag(true)));
}

#[test]
fn mismatched_kinds_never_satisfy_a_range() {
    let value = FieldValue::text("zebra");
    let range = FilterValue::Range {
        from: Some(FieldValue::Number(1.0)),
        to: None,
    };
    assert!(!matches_filter(Some(&value), &range));
}

// ===== Sort =====

#[test]
fn sort_ascending_by_text_ignores_case() {
    let records = vec![product(1, "banana", 1.0), product(2, "Apple", 1.0), product(3, "cherry", 1.0)];
    let mut q = QueryState::new(10);
    q.set_sort("name", SortDirection::Ascending);

    let view = apply(&records, &q, &searchable());

    assert_eq!(
        ids(&view.rows),
        vec![RecordKey::Int(2), RecordKey::Int(1), RecordKey::Int(3)]
    );
}

#[test]
fn sort_descending_by_number() {
    let records = vec![product(1, "a", 9.0), product(2, "b", 10.0), product(3, "c", 1.5)];
    let mut q = QueryState::new(10);
    q.set_sort("price", SortDirection::Descending);

    let view = apply(&records, &q, &searchable());

    assert_eq!(
        ids(&view.rows),
        vec![RecordKey::Int(2), RecordKey::Int(1), RecordKey::Int(3)]
    );
}

#[test]
fn sort_is_stable_for_ties_in_both_directions() {
    let records = vec![
        product(1, "same", 1.0),
        product(2, "same", 1.0),
        product(3, "other", 0.0),
        product(4, "SAME", 1.0),
    ];
    let mut q = QueryState::new(10);

    q.set_sort("name", SortDirection::Ascending);
    let asc = apply(&records, &q, &searchable());
    assert_eq!(
        ids(&asc.rows),
        vec![RecordKey::Int(3), RecordKey::Int(1), RecordKey::Int(2), RecordKey::Int(4)]
    );

    q.set_sort("name", SortDirection::Descending);
    let desc = apply(&records, &q, &searchable());
    assert_eq!(
        ids(&desc.rows),
        vec![RecordKey::Int(1), RecordKey::Int(2), RecordKey::Int(4), RecordKey::Int(3)]
    );
}

#[test]
fn missing_sort_values_go_last_in_both_directions() {
    let records = vec![
        DynRecord::new(1),
        product(2, "a", 2.0),
        product(3, "b", 1.0),
    ];
    let mut q = QueryState::new(10);

    q.set_sort("price", SortDirection::Ascending);
    assert_eq!(
        ids(&apply(&records, &q, &searchable()).rows),
        vec![RecordKey::Int(3), RecordKey::Int(2), RecordKey::Int(1)]
    );

    q.set_sort("price", SortDirection::Descending);
    assert_eq!(
        ids(&apply(&records, &q, &searchable()).rows),
        vec![RecordKey::Int(2), RecordKey::Int(3), RecordKey::Int(1)]
    );
}

// ===== Pagination =====

#[test]
fn paginates_by_page_index_and_size() {
    let records = numbered(25);
    let mut q = QueryState::new(10);
    q.set_page(3).unwrap();

    let view = apply(&records, &q, &searchable());

    assert_eq!(view.total, 25);
    assert_eq!(view.page_index, 3);
    assert_eq!(
        ids(&view.rows),
        (21..=25).map(RecordKey::Int).collect::<Vec<_>>()
    );
}

#[test]
fn page_past_the_end_clamps_to_last_page() {
    let records = numbered(25);
    let mut q = QueryState::new(10);
    q.set_page(3).unwrap();
    // Leaves 12 even-numbered rows: two pages.
    q.set_filter("even", FilterValue::Flag(true));
    q.set_page(3).unwrap();

    let view = apply(&records, &q, &searchable());

    assert_eq!(view.total, 12);
    assert_eq!(view.page_index, 2);
    assert_eq!(view.rows.len(), 2);
}

#[test]
fn empty_result_is_page_one_with_no_rows() {
    let records = numbered(5);
    let mut q = QueryState::new(10);
    q.set_search("nothing matches this");

    let view = apply(&records, &q, &searchable());

    assert_eq!(view.total, 0);
    assert_eq!(view.page_index, 1);
    assert!(view.rows.is_empty());
}

#[test]
fn indices_point_into_input_slice() {
    let records = vec![product(10, "b", 1.0), product(20, "a", 1.0)];
    let mut q = QueryState::new(10);
    q.set_sort("name", SortDirection::Ascending);

    let page = apply_indices(&records, &q, &searchable());

    assert_eq!(page.indices, vec![1, 0]);
}

// ===== PageInfo =====

#[test]
fn page_info_reports_row_range() {
    let info = PageInfo::new(2, 10, 25);

    assert_eq!(info.page_count, 3);
    assert_eq!(info.first_row, 11);
    assert_eq!(info.last_row, 20);
    assert!(info.has_previous());
    assert!(info.has_next());
}

#[test]
fn page_info_with_huge_page_size_does_not_overflow() {
    let info = PageInfo::new(1, usize::MAX, 5);

    assert_eq!(info.page_count, 1);
    assert_eq!((info.first_row, info.last_row), (1, 5));
    assert!(!info.has_next());
}

#[test]
fn page_info_last_page_is_partial() {
    let info = PageInfo::new(3, 10, 25);

    assert_eq!((info.first_row, info.last_row), (21, 25));
    assert!(!info.has_next());
}

#[test]
fn page_info_for_empty_set() {
    let info = PageInfo::new(1, 10, 0);

    assert_eq!(info.page_count, 1);
    assert_eq!((info.first_row, info.last_row), (0, 0));
}
