#[cfg(test)]
mod tests {
    use crate::error::{AskqlError, ErrorKind};
    use crate::schema::{Column, SchemaContext, TableSchema};
    use crate::shape::{humanize, render_text_table, ResultShaper};
    use crate::types::{QueryOutcome, QueryRequest, QueryResponse, ResultRow};
    use serde_json::json;
    use std::time::Duration;

    fn row(value: serde_json::Value) -> ResultRow {
        value.as_object().cloned().expect("object")
    }

    fn companies() -> SchemaContext {
        let mut table = TableSchema::new(
            "companies",
            vec![
                Column::new("uid", "text").with_description("Unique company identifier"),
                Column::new("company_name", "text"),
                Column::new("city", "text"),
            ],
        );
        table.description = Some("Company/business data".into());
        table.record_count = Some(42);
        table.columns[2].samples = vec!["Mumbai".into(), "Pune".into()];
        SchemaContext::new(vec![table])
    }

    #[test]
    fn failure_response_has_no_rows_and_an_error() {
        let err = AskqlError::unsafe_sql("DROP TABLE companies", "root statement is not a query");
        let response = QueryResponse::failure("drop it", &err);
        assert!(!response.success);
        assert!(response.results.is_empty());
        assert!(response.error.as_deref().unwrap().contains("not permitted"));
        assert!(response.is_kind(ErrorKind::UnsafeOrUnparseableSql));
    }

    #[test]
    fn success_response_serializes_without_error_fields() {
        let outcome = QueryOutcome {
            sql: "SELECT 1".into(),
            tables_used: vec![],
            rows: vec![row(json!({"x": 1}))],
            raw_data: None,
        };
        let response = QueryResponse::success("one", outcome);
        let value = serde_json::to_value(&response).expect("serialize");
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["results"], json!([{"x": 1}]));
        assert!(value.get("error").is_none());
        assert!(value.get("raw_data").is_none());
    }

    #[test]
    fn result_rows_keep_column_order() {
        let r = row(json!({"zeta": 1, "alpha": 2, "mid": 3}));
        let text = serde_json::to_string(&r).expect("serialize");
        assert_eq!(text, r#"{"zeta":1,"alpha":2,"mid":3}"#);
    }

    #[test]
    fn request_defaults_optional_fields() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"question": "List all companies in Mumbai"}"#).expect("parse");
        assert_eq!(request.question, "List all companies in Mumbai");
        assert!(!request.include_raw_data);
        assert!(request.limit.is_none());
    }

    #[test]
    fn error_kinds_map_to_stable_names() {
        assert_eq!(
            AskqlError::QueryExecution("syntax error".into()).kind().as_str(),
            "query_execution_error"
        );
        assert_eq!(
            AskqlError::QueryTimeout(Duration::from_secs(2)).kind(),
            ErrorKind::QueryTimeout
        );
        assert!(AskqlError::EmptyQuestion.kind().is_client_error());
        assert!(!AskqlError::ProviderUnavailable("timeout".into()).kind().is_client_error());
        let kind = serde_json::to_value(ErrorKind::ProviderQuotaExceeded).expect("serialize");
        assert_eq!(kind, json!("provider_quota_exceeded"));
    }

    #[test]
    fn schema_render_is_stable() {
        let schema = companies();
        let rendered = schema.render();
        assert_eq!(rendered, schema.render());
        assert_eq!(
            rendered,
            "Table 'companies': Company/business data (42 records)\n  \
             - uid (text): Unique company identifier\n  \
             - company_name (text)\n  \
             - city (text) | Examples: Mumbai, Pune"
        );
        assert_eq!(schema.total_records(), 42);
        assert_eq!(schema.table_names(), vec!["companies".to_string()]);
    }

    #[test]
    fn shaper_hides_and_humanizes_without_dropping_rows() {
        let shaper = ResultShaper::new(&["UID".to_string()], true, true);
        let rows = vec![
            row(json!({"uid": "c1", "company_name": "Acme", "billing_city": null})),
            row(json!({"uid": "c2", "company_name": "", "billing_city": "nan"})),
        ];
        let shaped = shaper.shape(rows);
        assert_eq!(shaped.len(), 2);
        assert_eq!(shaped[0], row(json!({"Company Name": "Acme"})));
        assert!(shaped[1].is_empty());
    }

    #[test]
    fn passthrough_shaper_returns_rows_untouched() {
        let shaper = ResultShaper::default();
        let rows = vec![row(json!({"first_name": null}))];
        assert_eq!(shaper.shape(rows.clone()), rows);
    }

    #[test]
    fn humanize_title_cases_snake_case() {
        assert_eq!(humanize("billing_city"), "Billing City");
        assert_eq!(humanize("ARR_estimate"), "Arr Estimate");
        assert_eq!(humanize("id"), "Id");
    }

    #[test]
    fn text_table_pads_columns() {
        let rows = vec![
            row(json!({"id": 1, "name": "alice"})),
            row(json!({"id": 22, "name": null})),
        ];
        assert_eq!(render_text_table(&rows, 10), "id  name\n1   alice\n22");
        assert_eq!(render_text_table(&rows, 1), "id  name\n1   alice");
        assert_eq!(render_text_table(&[], 10), "");
    }
}
