//! Aligned text table.
//!
//! Column widths are measured in terminal cells with `unicode-width`, so
//! wide characters (CJK, emoji) line up with ASCII rows.

use crate::model::{DynRecord, FieldValue, Record};
use crate::state::engine::PageInfo;
use std::collections::BTreeSet;
use unicode_width::UnicodeWidthStr;

/// Gap between columns.
const COLUMN_GAP: &str = "  ";

/// Marker column for selected rows.
const SELECTED_MARK: &str = "*";

/// Columns for schemaless records: `id` first, then every field name seen
/// in `records`, alphabetically.
pub fn dyn_columns<'a>(records: impl IntoIterator<Item = &'a DynRecord>) -> Vec<String> {
    let names: BTreeSet<&str> = records
        .into_iter()
        .flat_map(|r| r.fields.keys().map(String::as_str))
        .filter(|name| *name != "id")
        .collect();
    std::iter::once("id".to_string())
        .chain(names.into_iter().map(str::to_string))
        .collect()
}

/// "page 2/3, rows 11-20 of 25"
pub fn footer(info: &PageInfo) -> String {
    format!(
        "page {}/{}, rows {}-{} of {}",
        info.page_index, info.page_count, info.first_row, info.last_row, info.total
    )
}

fn cell_text(value: Option<FieldValue>) -> String {
    match value {
        None | Some(FieldValue::Null) => String::new(),
        Some(value) => value.to_string(),
    }
}

fn push_padded(line: &mut String, text: &str, width: usize) {
    line.push_str(text);
    let pad = width.saturating_sub(text.width());
    line.extend(std::iter::repeat_n(' ', pad));
}

/// Render `rows` under a header of `columns`, followed by the footer.
///
/// The first column marks selected rows with `*`. Trailing spaces are
/// trimmed from every line.
pub fn render_table<R, F>(rows: &[&R], columns: &[String], info: &PageInfo, is_selected: F) -> String
where
    R: Record,
    F: Fn(&R::Id) -> bool,
{
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|column| cell_text(row.field(column)))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| {
            cells
                .iter()
                .map(|row| row[i].width())
                .chain(std::iter::once(column.width()))
                .max()
                .unwrap_or(0)
        })
        .collect();
    let mark_width = SELECTED_MARK.width();

    let mut lines = Vec::with_capacity(rows.len() + 2);

    let mut header = String::new();
    push_padded(&mut header, "", mark_width);
    for (column, width) in columns.iter().zip(&widths) {
        header.push_str(COLUMN_GAP);
        push_padded(&mut header, column, *width);
    }
    lines.push(header.trim_end().to_string());

    if rows.is_empty() {
        lines.push("(no rows)".to_string());
    }

    for (row, row_cells) in rows.iter().zip(&cells) {
        let mut line = String::new();
        let mark = if is_selected(&row.id()) { SELECTED_MARK } else { "" };
        push_padded(&mut line, mark, mark_width);
        for (cell, width) in row_cells.iter().zip(&widths) {
            line.push_str(COLUMN_GAP);
            push_padded(&mut line, cell, *width);
        }
        lines.push(line.trim_end().to_string());
    }

    lines.push(footer(info));
    lines.join("\n")
}
