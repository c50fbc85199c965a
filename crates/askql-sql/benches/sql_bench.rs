use askql_sql::{extract_sql, parse_sql, prepare_sql, validate_read_only};
use criterion::{criterion_group, criterion_main, Criterion};

const MODEL_OUTPUT: &str = "Here is the query:\n```sql\n\
    SELECT full_name, title, company_name, city, email, mobile\n\
    FROM unified_personnel\n\
    WHERE title ILIKE '%architect%' AND city ILIKE '%mumbai%'\n\
    LIMIT 50;\n```";

fn sql_parse_bench(c: &mut Criterion) {
    c.bench_function("sql_parse", |b| {
        b.iter(|| {
            let _ = parse_sql("SELECT * FROM companies WHERE city = 'Mumbai';");
        })
    });
}

fn sql_extract_bench(c: &mut Criterion) {
    c.bench_function("sql_extract", |b| {
        b.iter(|| {
            let _ = extract_sql(MODEL_OUTPUT);
        })
    });
}

fn sql_validate_bench(c: &mut Criterion) {
    let candidate = extract_sql(MODEL_OUTPUT).expect("extract");
    c.bench_function("sql_validate", |b| {
        b.iter(|| {
            let _ = validate_read_only(&candidate);
        })
    });
    c.bench_function("sql_prepare_end_to_end", |b| {
        b.iter(|| {
            let _ = prepare_sql(MODEL_OUTPUT);
        })
    });
}

criterion_group!(sql_benches, sql_parse_bench, sql_extract_bench, sql_validate_bench);
criterion_main!(sql_benches);
