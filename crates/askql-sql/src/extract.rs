//! Pulls a candidate SQL statement out of free-form model output.

use askql_core::AskqlError;

/// Returns the SQL text found in `raw`.
///
/// Code fences and commentary lines are removed and leading prose is
/// skipped up to the first line that opens a read query. When no such line
/// exists the remaining text is returned as-is so the validator can report
/// exactly what the model produced.
pub fn extract_sql(raw: &str) -> Result<String, AskqlError> {
    let body = strip_code_fence(raw);
    let lines: Vec<&str> = body.lines().filter(|line| !is_commentary(line)).collect();
    let start = lines
        .iter()
        .position(|line| opens_read_query(line))
        .unwrap_or(0);
    let sql = lines[start..].join("\n").trim().to_string();
    if sql.is_empty() {
        return Err(AskqlError::unsafe_sql(raw.trim(), "no SQL statement found"));
    }
    Ok(sql)
}

fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let Some(open) = text.find("```") else {
        return text;
    };
    let after_open = &text[open + 3..];
    // skip the language tag, e.g. ```sql
    let body = match after_open.find('\n') {
        Some(newline) => &after_open[newline + 1..],
        None => after_open,
    };
    match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    }
}

fn is_commentary(line: &str) -> bool {
    let line = line.trim();
    line.starts_with("--")
        || line.starts_with('#')
        || line.starts_with("//")
        || (line.len() > 4 && line.starts_with("**") && line.ends_with("**"))
}

fn opens_read_query(line: &str) -> bool {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return false;
    };
    if first.eq_ignore_ascii_case("SELECT") {
        return true;
    }
    if !first.eq_ignore_ascii_case("WITH") {
        return false;
    }
    // tell a CTE header apart from prose such as "With this schema, ..."
    match (words.next(), words.next()) {
        (None, _) => true,
        (Some(second), _) if second.eq_ignore_ascii_case("RECURSIVE") || second.contains('(') => true,
        (Some(_), Some(third)) => {
            third.eq_ignore_ascii_case("AS")
                || third.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("AS("))
        }
        (Some(_), None) => false,
    }
}
