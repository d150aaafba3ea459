//! Introspection round trip: a schema whose columns were produced by the
//! DDL compiler must come back out of the catalog as the same DSL calls.

mod common;

use common::test_context;
use sluice_migrate::prelude::*;

fn catalog_row(table: &str, column: &str, data_type: &str, column_type: &str) -> Row {
    Row::new()
        .with("TABLE_NAME", table)
        .with("COLUMN_NAME", column)
        .with("COLUMN_KEY", "")
        .with("DATA_TYPE", data_type)
        .with("COLUMN_TYPE", column_type)
}

// The catalog rows MySQL would report for:
//   create_table("tblUsers", |t| { t.primary_key("id"); t.string("name");
//                                  t.boolean("active"); t.timestamps(); })
//   create_table("tblPosts", |t| { t.primary_key("id"); t.text("body");
//                                  t.integer("views"); })
fn seed_catalog(state: &mut common::FakeState) {
    state.catalog = vec![
        catalog_row("tblUsers", "id", "int", "int(11)").with("COLUMN_KEY", "PRI"),
        catalog_row("tblUsers", "name", "varchar", "varchar(255)"),
        catalog_row("tblUsers", "active", "tinyint", "tinyint(1)"),
        catalog_row("tblUsers", "createdAt", "datetime", "datetime"),
        catalog_row("tblUsers", "updatedAt", "datetime", "datetime"),
        catalog_row("tblPosts", "id", "int", "int(11)").with("COLUMN_KEY", "PRI"),
        catalog_row("tblPosts", "body", "mediumtext", "mediumtext"),
        catalog_row("tblPosts", "views", "int", "int(11)"),
        catalog_row(LOG_TABLE, "filename", "varchar", "varchar(255)"),
    ];
}

#[tokio::test]
async fn recreate_emits_the_declaring_dsl() {
    let (ctx, state) = test_context();
    seed_catalog(&mut state.lock());

    let code = Introspector::new(&ctx).recreate().await.unwrap();

    let users_block = [
        "    m.create_table(\"tblUsers\", |t| {",
        "        t.primary_key(\"id\");",
        "        t.string(\"name\");",
        "        t.boolean(\"active\");",
        "        t.timestamps();",
        "    });",
    ]
    .join("\n");
    assert!(code.contains(&users_block), "missing users block in:\n{code}");

    let posts_block = [
        "    m.create_table(\"tblPosts\", |t| {",
        "        t.primary_key(\"id\");",
        "        t.text(\"body\");",
        "        t.integer(\"views\");",
        "    });",
    ]
    .join("\n");
    assert!(code.contains(&posts_block), "missing posts block in:\n{code}");

    // The log table never appears in the dump.
    assert!(!code.contains(LOG_TABLE));

    // The users block precedes the posts block, as the catalog reported.
    let users_at = code.find("tblUsers").unwrap();
    let posts_at = code.find("tblPosts").unwrap();
    assert!(users_at < posts_at);
}

#[tokio::test]
async fn recreate_queries_the_configured_schema() {
    let (ctx, state) = test_context();
    seed_catalog(&mut state.lock());

    Introspector::new(&ctx).recreate().await.unwrap();

    let executed = state.lock().executed.clone();
    assert!(executed.iter().any(|sql| {
        sql.contains("INFORMATION_SCHEMA.COLUMNS") && sql.contains("TABLE_SCHEMA = 'test'")
    }));
}

#[tokio::test]
async fn recreate_of_an_empty_schema_emits_an_empty_migration() {
    let (ctx, _state) = test_context();

    let code = Introspector::new(&ctx).recreate().await.unwrap();
    assert!(code.starts_with("ctx.declare(\""));
    assert!(!code.contains("create_table"));
}

#[tokio::test]
async fn unsupported_native_type_fails_the_dump() {
    let (ctx, state) = test_context();
    state.lock().catalog = vec![catalog_row("tblShapes", "outline", "geometry", "geometry")];

    let err = Introspector::new(&ctx).recreate().await.unwrap_err();
    assert!(matches!(err, MigrateError::UnsupportedType(ty) if ty == "geometry"));
}
