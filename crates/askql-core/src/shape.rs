use crate::types::ResultRow;
use serde_json::Value;

/// Display shaping applied to rows before they are returned.
///
/// Shaping only rewrites cells and headers; it never removes a row, so the
/// number of rows in a response always matches what the database returned.
#[derive(Debug, Clone, Default)]
pub struct ResultShaper {
    hidden_columns: Vec<String>,
    humanize_columns: bool,
    drop_empty_values: bool,
}

impl ResultShaper {
    pub fn new(hidden_columns: &[String], humanize_columns: bool, drop_empty_values: bool) -> Self {
        Self {
            hidden_columns: hidden_columns.iter().map(|c| c.to_lowercase()).collect(),
            humanize_columns,
            drop_empty_values,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.hidden_columns.is_empty() && !self.humanize_columns && !self.drop_empty_values
    }

    pub fn shape(&self, rows: Vec<ResultRow>) -> Vec<ResultRow> {
        if self.is_passthrough() {
            return rows;
        }
        rows.into_iter().map(|row| self.shape_row(row)).collect()
    }

    fn shape_row(&self, row: ResultRow) -> ResultRow {
        let mut out = ResultRow::new();
        for (column, value) in row {
            if self.hidden_columns.contains(&column.to_lowercase()) {
                continue;
            }
            if self.drop_empty_values && is_empty_value(&value) {
                continue;
            }
            let column = if self.humanize_columns {
                humanize(&column)
            } else {
                column
            };
            out.insert(column, value);
        }
        out
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => {
            let s = s.trim();
            s.is_empty()
                || s.eq_ignore_ascii_case("null")
                || s.eq_ignore_ascii_case("none")
                || s.eq_ignore_ascii_case("nan")
        }
        _ => false,
    }
}

/// `billing_city` -> `Billing City`
pub fn humanize(column: &str) -> String {
    column
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Plain-text table of the first `max_rows` rows.
pub fn render_text_table(rows: &[ResultRow], max_rows: usize) -> String {
    let rows = &rows[..rows.len().min(max_rows)];
    let mut headers: Vec<&str> = Vec::new();
    for row in rows {
        for column in row.keys() {
            if !headers.contains(&column.as_str()) {
                headers.push(column);
            }
        }
    }
    if headers.is_empty() {
        return String::new();
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .map(|h| row.get(*h).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, h)| {
            cells
                .iter()
                .map(|r| r[idx].chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(cells.len() + 1);
    lines.push(pad_line(headers.iter().map(|h| h.to_string()), &widths));
    for row in cells {
        lines.push(pad_line(row.into_iter(), &widths));
    }
    lines.join("\n")
}

fn pad_line(values: impl Iterator<Item = String>, widths: &[usize]) -> String {
    values
        .zip(widths)
        .map(|(v, w)| format!("{v:<w$}", w = *w))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
