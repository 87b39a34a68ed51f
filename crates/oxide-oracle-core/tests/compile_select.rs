//! Compiles JSON query documents into Oracle SELECT statements.

mod common;
use common::*;

use oxide_oracle_core::query::json::query_from_json;
use oxide_oracle_core::CompileError;
use serde_json::json;

// ===================================================================
// Projection and filters
// ===================================================================

#[test]
fn select_qualified_fields_are_aliased() {
    let sql = compile(&json!({
        "$select": { "Products": ["Products.id", "Products.name"] }
    }));
    assert_eq!(
        sql,
        r#"SELECT "Products"."id" "id", "Products"."name" "name" FROM "Products""#
    );
}

#[test]
fn select_with_where_and_order() {
    let sql = compile(&json!({
        "$select": { "Products": ["id", "name"] },
        "$where": { "$and": [
            { "$gt": ["$price", 500] },
            { "$eq": ["$category", "Laptops"] }
        ] },
        "$order": [{ "$desc": "$price" }]
    }));
    assert_eq!(
        sql,
        concat!(
            r#"SELECT "id", "name" FROM "Products" "#,
            r#"WHERE (("price">500) AND ("category"='Laptops')) "#,
            r#"ORDER BY "price" DESC"#
        )
    );
}

#[test]
fn select_distinct() {
    let sql = compile(&json!({
        "$select": { "Products": ["category"] },
        "$distinct": true
    }));
    assert_eq!(sql, r#"SELECT DISTINCT "category" FROM "Products""#);
}

#[test]
fn literal_text_is_escaped() {
    let sql = compile(&json!({
        "$select": { "Users": ["id"] },
        "$where": { "name": "'; DROP TABLE users; --" }
    }));
    assert_eq!(
        sql,
        r#"SELECT "id" FROM "Users" WHERE ("name"='''; DROP TABLE users; --')"#
    );
}

#[test]
fn boolean_literals_render_as_numbers() {
    let sql = compile(&json!({
        "$select": { "Users": ["id"] },
        "$where": { "active": true }
    }));
    assert!(sql.ends_with(r#"WHERE ("active"=1)"#));
}

#[test]
fn null_comparison_uses_is_null() {
    let sql = compile(&json!({
        "$select": { "Users": ["id"] },
        "$where": { "$ne": ["$deletedAt", null] }
    }));
    assert!(sql.ends_with(r#"WHERE ("deletedAt" IS NOT NULL)"#));
}

#[test]
fn group_by_with_aggregate() {
    let sql = compile(&json!({
        "$select": { "Orders": ["customer", { "total": { "$sum": "$amount" } }] },
        "$group": ["$customer"]
    }));
    assert_eq!(
        sql,
        r#"SELECT "customer", SUM("amount") "total" FROM "Orders" GROUP BY "customer""#
    );
}

#[test]
fn expand_renders_join() {
    let sql = compile(&json!({
        "$select": { "Orders": ["Orders.id", { "customerName": { "$name": "c.name" } }] },
        "$expand": [{
            "$entity": { "name": "Customers", "$as": "c", "$join": "left" },
            "$with": { "$eq": ["$Orders.customer", "$c.id"] }
        }]
    }));
    assert_eq!(
        sql,
        concat!(
            r#"SELECT "Orders"."id" "id", "c"."name" "customerName" FROM "Orders" "#,
            r#"LEFT JOIN "Customers" "c" ON ("Orders"."customer"="c"."id")"#
        )
    );
}

#[test]
fn fixed_select_reads_from_dual() {
    let sql = compile(&json!({
        "$fixed": true,
        "$select": { "Fixed": [{ "now": { "$getDate": "datetime" } }] }
    }));
    assert_eq!(sql, r#"SELECT SYSDATE "now" FROM DUAL"#);
}

// ===================================================================
// Paging
// ===================================================================

#[test]
fn paging_wraps_in_row_number_window() {
    let doc = json!({
        "$select": { "Products": ["id", "name"] },
        "$order": [{ "$asc": "$name" }],
        "$skip": 10,
        "$take": 5
    });
    let query = query_from_json(&doc).unwrap();
    let before = query.clone();
    let sql = formatter().format_select(&query).unwrap();

    assert!(sql.starts_with(r#"SELECT "id", "name" FROM (SELECT "id", "name", ROW_NUMBER() OVER(ORDER BY "name" ASC) "__RowIndex" FROM "Products") t0"#));
    assert!(sql.contains(r#"WHERE "__RowIndex" BETWEEN 11 AND 15"#));
    assert_eq!(query, before);
    assert_eq!(query.order.len(), 1);
}

#[test]
fn paging_without_order_numbers_by_null() {
    let sql = compile(&json!({
        "$select": { "Products": ["id"] },
        "$take": 25
    }));
    assert!(sql.contains("ROW_NUMBER() OVER(ORDER BY NULL)"));
    assert!(sql.contains("BETWEEN 1 AND 25"));
}

#[test]
fn paging_keeps_filter_in_inner_query() {
    let sql = compile(&json!({
        "$select": { "Products": ["id"] },
        "$where": { "category": "Laptops" },
        "$skip": 20,
        "$take": 10
    }));
    assert!(sql.contains(r#"FROM "Products" WHERE ("category"='Laptops')) t0"#));
    assert!(sql.contains("BETWEEN 21 AND 30"));
}

#[test]
fn paging_past_the_last_row_number_is_rejected() {
    let err = compile_err(&json!({
        "$select": { "Products": ["id"] },
        "$skip": u64::MAX,
        "$take": 5
    }));
    assert!(matches!(err, CompileError::InvalidArgument(_)));

    let sql = compile(&json!({
        "$select": { "Products": ["id"] },
        "$skip": u64::MAX - 5,
        "$take": 5
    }));
    assert!(sql.contains(&format!("BETWEEN {} AND {}", u64::MAX - 4, u64::MAX)));
}

#[test]
fn paging_without_projection_keeps_row_index() {
    let sql = compile(&json!({
        "$select": { "Products": [] },
        "$take": 5
    }));
    assert!(sql.starts_with("SELECT * FROM (SELECT "));
    assert!(sql.contains(r#"ROW_NUMBER() OVER(ORDER BY NULL) "__RowIndex" FROM "Products") t0"#));
}

// ===================================================================
// Mutations
// ===================================================================

#[test]
fn insert_update_delete() {
    assert_eq!(
        compile(&json!({ "$insert": { "Products": { "name": "Laptop", "price": 999.5 } } })),
        r#"INSERT INTO "Products"("name", "price") VALUES ('Laptop', 999.5)"#
    );
    assert_eq!(
        compile(&json!({
            "$update": { "Products": { "price": 10 } },
            "$where": { "id": 7 }
        })),
        r#"UPDATE "Products" SET "price"=10 WHERE ("id"=7)"#
    );
    assert_eq!(
        compile(&json!({ "$delete": "Products", "$where": { "id": 7 } })),
        r#"DELETE FROM "Products" WHERE ("id"=7)"#
    );
}

// ===================================================================
// Errors
// ===================================================================

#[test]
fn missing_entity_is_reported() {
    assert_eq!(
        compile_err(&json!({ "$where": { "id": 1 } })),
        CompileError::MissingEntity
    );
}

#[test]
fn unknown_function_is_reported() {
    assert!(matches!(
        compile_err(&json!({
            "$select": { "Products": [{ "x": { "$soundex": "$name" } }] }
        })),
        CompileError::UnknownFunction(name) if name == "soundex"
    ));
}
