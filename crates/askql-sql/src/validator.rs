//! Read-only gate for model-authored SQL.
//!
//! Nothing reaches the database without passing [`validate_read_only`]. The
//! check runs in two layers: a keyword floor over the token stream, then a
//! walk of the parsed statement that only accepts queries all the way down.

use crate::parser::{parse_sql, tokenize_sql};
use askql_core::AskqlError;
use sqlparser::ast::{Expr, ObjectName, Query, Statement, TableFactor, Visit, Visitor};
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;
use std::ops::ControlFlow;
use tracing::debug;

/// Unquoted keywords that never appear in a plain read query.
const DENIED_KEYWORDS: &[Keyword] = &[
    Keyword::INSERT,
    Keyword::UPDATE,
    Keyword::DELETE,
    Keyword::DROP,
    Keyword::ALTER,
    Keyword::TRUNCATE,
    Keyword::CREATE,
    Keyword::MERGE,
    Keyword::GRANT,
    Keyword::REVOKE,
    Keyword::INTO,
    Keyword::COPY,
    Keyword::CALL,
    Keyword::DO,
    Keyword::EXECUTE,
    Keyword::VACUUM,
    Keyword::LOCK,
    Keyword::SET,
];

/// PostgreSQL functions with side effects or that run SQL given as text.
const DENIED_FUNCTIONS: &[&str] = &[
    "pg_sleep",
    "pg_sleep_for",
    "pg_sleep_until",
    "set_config",
    "pg_terminate_backend",
    "pg_cancel_backend",
    "pg_reload_conf",
    "pg_rotate_logfile",
    "pg_switch_wal",
    "pg_create_restore_point",
    "pg_logical_emit_message",
    "pg_notify",
    "pg_advisory_lock",
    "pg_advisory_xact_lock",
    "pg_try_advisory_lock",
    "pg_read_file",
    "pg_read_binary_file",
    "pg_ls_dir",
    "pg_stat_file",
    "pg_file_write",
    "lo_import",
    "lo_export",
    "lo_create",
    "lo_unlink",
    "lo_from_bytea",
    "dblink",
    "dblink_exec",
    "nextval",
    "setval",
    "txid_current",
    "query_to_xml",
    "query_to_xml_and_xmlschema",
    "cursor_to_xml",
    "table_to_xml",
];

/// A statement that passed the read-only check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSql {
    sql: String,
    tables_used: Vec<String>,
}

impl ValidatedSql {
    /// Canonical rendering of the checked statement; this is the text that runs.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn tables_used(&self) -> &[String] {
        &self.tables_used
    }
}

pub fn validate_read_only(sql: &str) -> Result<ValidatedSql, AskqlError> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(AskqlError::unsafe_sql(sql, "empty statement"));
    }
    check_keywords(sql)?;

    let mut statements = parse_sql(sql)
        .map_err(|e| AskqlError::unsafe_sql(sql, format!("could not parse: {e}")))?;
    if statements.len() != 1 {
        return Err(AskqlError::unsafe_sql(
            sql,
            format!("expected exactly one statement, found {}", statements.len()),
        ));
    }
    let statement = statements.remove(0);
    if !matches!(statement, Statement::Query(_)) {
        return Err(AskqlError::unsafe_sql(sql, "root statement is not a read query"));
    }

    let mut guard = ReadOnlyGuard::default();
    if let ControlFlow::Break(reason) = statement.visit(&mut guard) {
        return Err(AskqlError::unsafe_sql(sql, reason));
    }

    let tables_used = guard
        .relations
        .into_iter()
        .filter(|name| !guard.cte_names.contains(name))
        .collect();
    let validated = ValidatedSql {
        sql: statement.to_string(),
        tables_used,
    };
    debug!(sql = validated.sql(), "validated read-only statement");
    Ok(validated)
}

fn check_keywords(sql: &str) -> Result<(), AskqlError> {
    let tokens = tokenize_sql(sql)
        .map_err(|e| AskqlError::unsafe_sql(sql, format!("could not tokenize: {e}")))?;
    for token in tokens {
        if let Token::Word(word) = token {
            if word.quote_style.is_none() && DENIED_KEYWORDS.contains(&word.keyword) {
                return Err(AskqlError::unsafe_sql(
                    sql,
                    format!("{} is not permitted", word.value.to_uppercase()),
                ));
            }
        }
    }
    Ok(())
}

fn denied_function(name: &ObjectName) -> Option<String> {
    let name = name
        .0
        .last()
        .map(|ident| ident.value.to_lowercase())
        .unwrap_or_default();
    DENIED_FUNCTIONS
        .contains(&name.as_str())
        .then(|| format!("function {name} is not permitted"))
}

#[derive(Default)]
struct ReadOnlyGuard {
    relations: Vec<String>,
    cte_names: Vec<String>,
    /// Set when the next visited relation is a table function, not a table.
    table_function: bool,
}

impl Visitor for ReadOnlyGuard {
    type Break = String;

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<Self::Break> {
        if matches!(statement, Statement::Query(_)) {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break("nested statement is not a read query".into())
        }
    }

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if !query.locks.is_empty() {
            return ControlFlow::Break("row locking clauses are not permitted".into());
        }
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.cte_names.push(cte.alias.name.value.clone());
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<Self::Break> {
        let name = match factor {
            TableFactor::Table {
                name,
                args: Some(_),
                ..
            } => {
                self.table_function = true;
                name
            }
            TableFactor::Function { name, .. } => name,
            _ => return ControlFlow::Continue(()),
        };
        match denied_function(name) {
            Some(reason) => ControlFlow::Break(reason),
            None => ControlFlow::Continue(()),
        }
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        if std::mem::take(&mut self.table_function) {
            return ControlFlow::Continue(());
        }
        let name = relation.to_string();
        if !self.relations.contains(&name) {
            self.relations.push(name);
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if let Expr::Function(func) = expr {
            if let Some(reason) = denied_function(&func.name) {
                return ControlFlow::Break(reason);
            }
        }
        ControlFlow::Continue(())
    }
}
