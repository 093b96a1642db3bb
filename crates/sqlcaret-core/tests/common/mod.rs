#![allow(dead_code)]

use sqlcaret_core::{
    ColumnMetadata, CompletionRequest, DatabaseMetadata, SchemaMetadata, StaticMetadata,
    TableMetadata,
};

/// Builds a request whose caret sits at the `|` marker.
pub fn request_at_caret(sql: &str) -> CompletionRequest {
    let marker = sql.find('|').expect("sql must contain caret marker '|'");
    let before = &sql[..marker];
    let line = before.matches('\n').count() + 1;
    let offset = before.rsplit('\n').next().unwrap_or_default().chars().count();
    CompletionRequest::new(sql.replacen('|', "", 1), line, offset).with_database("shop")
}

pub fn column(name: &str, data_type: &str) -> ColumnMetadata {
    ColumnMetadata {
        name: name.to_string(),
        data_type: data_type.to_string(),
        nullable: true,
        comment: String::new(),
    }
}

pub fn table(name: &str, columns: Vec<ColumnMetadata>) -> TableMetadata {
    TableMetadata {
        name: name.to_string(),
        columns,
    }
}

/// `shop` with `public.users`, `public.orders`, `public.active_users` (view)
/// and `sales.invoices`, `sales.monthly_totals` (materialized view).
pub fn sample_catalog() -> StaticMetadata {
    let mut id = column("id", "int4");
    id.nullable = false;
    id.comment = "primary key".to_string();

    let public = SchemaMetadata {
        name: "public".to_string(),
        tables: vec![
            table("users", vec![id.clone(), column("email", "varchar")]),
            table(
                "orders",
                vec![column("id", "int4"), column("user_id", "int4"), column("total", "numeric")],
            ),
            table("Audit Log", vec![column("entry", "text")]),
        ],
        views: vec!["active_users".to_string()],
        ..Default::default()
    };
    let sales = SchemaMetadata {
        name: "sales".to_string(),
        tables: vec![table("invoices", vec![column("amount", "numeric")])],
        materialized_views: vec!["monthly_totals".to_string()],
        ..Default::default()
    };

    StaticMetadata::new().with_database(DatabaseMetadata {
        name: "shop".to_string(),
        schemas: vec![public, sales],
    })
}
