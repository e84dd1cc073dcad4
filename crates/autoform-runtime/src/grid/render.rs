//! Plain-text grid rendering.

use autoform_schema::{IndexKey, IndexLevels};
use serde_json::{Number, Value};

use crate::grid::GridView;

/// Render `view` as an aligned text table.
///
/// Untransposed, each record is a line led by its row id. Transposed, each
/// column is a line and records run across. A two-level index adds a section
/// line (or column) that names each section once, at its first column.
#[must_use]
pub fn render_text(view: &GridView) -> String {
    let labels: Vec<String> = (0..view.columns.len())
        .map(|column| view.label(column).unwrap_or_default().to_string())
        .collect();
    let sections = section_labels(&view.columns);
    let multi = view.levels == IndexLevels::SectionTitle;
    let precision = |column: usize| view.precision.get(column).copied().flatten();

    let mut header: Vec<Vec<String>> = Vec::new();
    let mut body: Vec<Vec<String>> = Vec::new();
    if view.transposed {
        let mut head = vec![String::new(); if multi { 2 } else { 1 }];
        head.extend(view.rows.iter().map(|row| row.id.to_string()));
        header.push(head);
        for (column, label) in labels.iter().enumerate() {
            let mut line = Vec::with_capacity(view.rows.len() + 2);
            if multi {
                line.push(sections[column].clone());
            }
            line.push(label.clone());
            line.extend(
                view.rows
                    .iter()
                    .map(|row| format_cell(row.cells.get(column), precision(column))),
            );
            body.push(line);
        }
    } else {
        if multi {
            let mut head = vec![String::new()];
            head.extend(sections.iter().cloned());
            header.push(head);
        }
        let mut head = vec!["id".to_string()];
        head.extend(labels.iter().cloned());
        header.push(head);
        for row in &view.rows {
            let mut line = vec![row.id.to_string()];
            line.extend(
                row.cells
                    .iter()
                    .enumerate()
                    .map(|(column, cell)| format_cell(Some(cell), precision(column))),
            );
            body.push(line);
        }
    }
    layout(&header, &body)
}

fn section_labels(columns: &[IndexKey]) -> Vec<String> {
    let mut previous: Option<&str> = None;
    columns
        .iter()
        .map(|key| {
            let section = key.section.as_deref().unwrap_or_default();
            if previous == Some(section) {
                String::new()
            } else {
                previous = Some(section);
                section.to_string()
            }
        })
        .collect()
}

fn layout(header: &[Vec<String>], body: &[Vec<String>]) -> String {
    let count = header.iter().chain(body).map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0; count];
    for line in header.iter().chain(body) {
        for (column, cell) in line.iter().enumerate() {
            widths[column] = widths[column].max(cell.chars().count());
        }
    }
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    let mut out = String::new();
    for line in header.iter().chain(std::iter::once(&rule)).chain(body) {
        push_line(&mut out, line, &widths);
    }
    out
}

fn push_line(out: &mut String, line: &[String], widths: &[usize]) {
    let cells: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(column, width)| {
            let cell = line.get(column).map_or("", String::as_str);
            format!("{cell:<width$}")
        })
        .collect();
    out.push_str(cells.join("  ").trim_end());
    out.push('\n');
}

fn format_cell(cell: Option<&Value>, precision: Option<u8>) -> String {
    match cell {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => format_number(number, precision),
        Some(other) => other.to_string(),
    }
}

fn format_number(number: &Number, precision: Option<u8>) -> String {
    match (precision, number.as_f64()) {
        (Some(digits), Some(value)) if number.is_f64() && digits > 0 => {
            significant(value, digits)
        }
        _ => number.to_string(),
    }
}

/// `value` rounded to `digits` significant figures, without trailing zeros.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn significant(value: f64, digits: u8) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = i32::from(digits) - 1 - magnitude;
    if decimals <= 0 {
        let scale = 10f64.powi(-decimals);
        return format!("{}", (value / scale).round() * scale);
    }
    let text = format!("{value:.prec$}", prec = decimals as usize);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn significant_figures_trim_trailing_zeros() {
        assert_eq!(significant(1.5, 3), "1.5");
        assert_eq!(significant(4.56789, 3), "4.57");
        assert_eq!(significant(0.012345, 2), "0.012");
        assert_eq!(significant(1234.5, 2), "1200");
        assert_eq!(significant(0.0, 3), "0");
    }

    #[test]
    fn integers_ignore_precision() {
        assert_eq!(format_number(&Number::from(12345), Some(2)), "12345");
    }
}
