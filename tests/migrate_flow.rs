//! End-to-end migration flows against the fake driver: declaration,
//! compilation, log reconciliation, batch ordering and failure behavior.

mod common;

use common::test_context;
use sluice_migrate::prelude::*;

const M1: &str = "20100801000000_create_users";
const M2: &str = "20100802000000_create_posts";
const M3: &str = "20100803000000_add_flags";

fn declare_three(ctx: &MigrationContext) {
    ctx.declare(
        M1,
        |m| {
            m.create_table("tblUsers", |t| {
                t.primary_key("id");
                t.string("name");
                t.timestamps();
            });
        },
        |m| m.drop_table("tblUsers"),
    )
    .unwrap();

    ctx.declare(
        M2,
        |m| {
            m.create_table("tblPosts", |t| {
                t.primary_key("id");
                t.integer("authorId");
                t.text("body");
            });
        },
        |m| m.drop_table("tblPosts"),
    )
    .unwrap();

    ctx.declare(
        M3,
        |m| {
            m.alter_table("tblUsers", |t| {
                t.boolean("active");
            });
        },
        |m| {
            m.alter_table("tblUsers", |t| {
                t.remove_column("active");
            });
        },
    )
    .unwrap();
}

#[tokio::test]
async fn declared_migration_compiles_to_the_expected_statements() {
    let (ctx, _state) = test_context();

    let migration = ctx
        .declare(
            M1,
            |m| {
                m.create_table("tblUsers", |t| {
                    t.primary_key("id");
                    t.string("name");
                    t.timestamps();
                });
            },
            |m| m.drop_table("tblUsers"),
        )
        .unwrap();

    let up: Vec<_> = migration
        .up_steps()
        .iter()
        .map(|step| match step {
            DdlStep::Statement(sql) => sql.as_str(),
            other => panic!("unexpected step {other:?}"),
        })
        .collect();

    assert_eq!(
        up,
        vec![
            "CREATE TABLE `tblUsers` ( `id` INTEGER AUTO_INCREMENT NOT NULL, PRIMARY KEY (`id`) ) ENGINE=INNODB;",
            "ALTER TABLE `tblUsers` ADD `name` VARCHAR(255) NOT NULL;",
            "ALTER TABLE `tblUsers` ADD `createdAt` DATETIME NOT NULL;",
            "ALTER TABLE `tblUsers` ADD `updatedAt` DATETIME NOT NULL;",
            "INSERT INTO `tblSchemaMigrations` SET `filename` = '20100801000000_create_users';",
        ]
    );

    let down: Vec<_> = migration
        .down_steps()
        .iter()
        .map(|step| match step {
            DdlStep::Statement(sql) => sql.as_str(),
            other => panic!("unexpected step {other:?}"),
        })
        .collect();

    assert_eq!(
        down,
        vec![
            "DROP TABLE `tblUsers`;",
            "DELETE FROM `tblSchemaMigrations` WHERE `filename` = '20100801000000_create_users';",
        ]
    );
}

#[tokio::test]
async fn raise_all_applies_only_pending_migrations_in_order() {
    let (ctx, state) = test_context();
    declare_three(&ctx);
    state.lock().log.push(M1.to_string());

    let raised = ctx.raise_all().await.unwrap();
    let raised: Vec<_> = raised.iter().map(MigrationId::as_str).collect();
    assert_eq!(raised, vec![M2, M3]);

    let state = state.lock();
    assert_eq!(state.log, vec![M1, M2, M3]);

    // M1 was already logged, so none of its DDL ran.
    assert!(!state.executed.iter().any(|sql| sql.contains("tblUsers` ( `id`")));

    // M2's create ran before M3's alter.
    let create_posts = state
        .executed
        .iter()
        .position(|sql| sql.contains("CREATE TABLE `tblPosts`"))
        .unwrap();
    let add_active = state
        .executed
        .iter()
        .position(|sql| sql.contains("ADD `active` BOOLEAN"))
        .unwrap();
    assert!(create_posts < add_active);
}

#[tokio::test]
async fn each_raise_runs_inside_its_own_transaction() {
    let (ctx, state) = test_context();
    declare_three(&ctx);
    state.lock().log.extend([M1.to_string(), M3.to_string()]);

    ctx.raise_all().await.unwrap();

    let executed = state.lock().executed.clone();
    let begin = executed
        .iter()
        .position(|sql| sql == "START TRANSACTION;")
        .unwrap();
    let insert = executed
        .iter()
        .position(|sql| sql.contains(M2) && sql.starts_with("INSERT"))
        .unwrap();
    let commit = executed.iter().position(|sql| sql == "COMMIT;").unwrap();
    assert!(begin < insert && insert < commit);
}

#[tokio::test]
async fn raise_all_twice_is_a_no_op() {
    let (ctx, state) = test_context();
    declare_three(&ctx);

    assert_eq!(ctx.raise_all().await.unwrap().len(), 3);
    assert_eq!(ctx.raise_all().await.unwrap().len(), 0);
    assert_eq!(state.lock().log.len(), 3);
}

#[tokio::test]
async fn lower_all_reverts_in_reverse_order_and_clears_the_log() {
    let (ctx, state) = test_context();
    declare_three(&ctx);
    state.lock().log.extend([M1.to_string(), M2.to_string()]);

    let lowered = ctx.lower_all().await.unwrap();
    let lowered: Vec<_> = lowered.iter().map(MigrationId::as_str).collect();
    assert_eq!(lowered, vec![M2, M1]);

    let state = state.lock();
    assert!(state.log.is_empty());

    let drop_posts = state
        .executed
        .iter()
        .position(|sql| sql.contains("DROP TABLE `tblPosts`"))
        .unwrap();
    let drop_users = state
        .executed
        .iter()
        .position(|sql| sql.contains("DROP TABLE `tblUsers`"))
        .unwrap();
    assert!(drop_posts < drop_users);
}

#[tokio::test]
async fn raise_next_and_lower_next_step_one_at_a_time() {
    let (ctx, state) = test_context();
    declare_three(&ctx);

    assert_eq!(ctx.raise_next().await.unwrap().unwrap().as_str(), M1);
    assert_eq!(ctx.raise_next().await.unwrap().unwrap().as_str(), M2);
    assert_eq!(state.lock().log, vec![M1, M2]);

    assert_eq!(ctx.lower_next().await.unwrap().unwrap().as_str(), M2);
    assert_eq!(state.lock().log, vec![M1]);

    assert_eq!(ctx.lower_next().await.unwrap().unwrap().as_str(), M1);
    assert!(ctx.lower_next().await.unwrap().is_none());
}

#[tokio::test]
async fn raised_preserves_registry_order() {
    let (ctx, state) = test_context();
    declare_three(&ctx);
    // Log rows in scrambled order; registry order must win.
    state.lock().log.extend([M3.to_string(), M1.to_string()]);

    let raised = ctx.raised().await.unwrap();
    let ids: Vec<_> = raised.iter().map(|m| m.id().as_str()).collect();
    assert_eq!(ids, vec![M1, M3]);
}

#[tokio::test]
async fn batch_stops_at_the_first_failing_migration() {
    let (ctx, state) = test_context();
    declare_three(&ctx);
    state.lock().fail_on = Some("CREATE TABLE `tblPosts`".to_string());

    let err = ctx.raise_all().await.unwrap_err();
    assert!(matches!(err, MigrateError::Driver { errno: 1064, .. }));

    let state = state.lock();
    // M1 committed, M2 failed before its log insert, M3 never started.
    assert_eq!(state.log, vec![M1]);
    assert!(!state.executed.iter().any(|sql| sql.contains("ADD `active`")));

    // The failing migration's transaction was rolled back.
    assert_eq!(state.executed.last().map(String::as_str), Some("ROLLBACK;"));
}

#[tokio::test]
async fn rename_column_looks_up_the_live_definition() {
    let (ctx, state) = test_context();

    ctx.declare(
        M1,
        |m| {
            m.alter_table("tblUsers", |t| {
                t.rename_column("name", "fullName");
            });
        },
        |m| {
            m.alter_table("tblUsers", |t| {
                t.rename_column("fullName", "name");
            });
        },
    )
    .unwrap();

    state.lock().live_columns.insert(
        "tblUsers".to_string(),
        vec![
            Row::new()
                .with("Field", "id")
                .with("Type", "int(11)")
                .with("Null", "NO")
                .with("Key", "PRI")
                .with_null("Default")
                .with("Extra", "auto_increment"),
            Row::new()
                .with("Field", "name")
                .with("Type", "varchar(255)")
                .with("Null", "NO")
                .with("Key", "")
                .with_null("Default")
                .with("Extra", ""),
        ],
    );

    ctx.raise_next().await.unwrap();

    let state = state.lock();
    assert!(state
        .executed
        .iter()
        .any(|sql| sql == "SHOW COLUMNS FROM `tblUsers`;"));
    assert!(state
        .executed
        .iter()
        .any(|sql| sql == "ALTER TABLE `tblUsers` CHANGE `name` `fullName` varchar(255) NOT NULL;"));
    assert_eq!(state.log, vec![M1]);
}

#[tokio::test]
async fn renaming_a_missing_column_fails_the_migration() {
    let (ctx, state) = test_context();

    ctx.declare(
        M1,
        |m| {
            m.alter_table("tblUsers", |t| {
                t.rename_column("ghost", "spirit");
            });
        },
        |_m| {},
    )
    .unwrap();

    state
        .lock()
        .live_columns
        .insert("tblUsers".to_string(), Vec::new());

    let err = ctx.raise_next().await.unwrap_err();
    assert!(matches!(
        err,
        MigrateError::UnknownColumn { table, column } if table == "tblUsers" && column == "ghost"
    ));
    assert!(state.lock().log.is_empty());
}

#[tokio::test]
async fn out_of_order_declaration_is_rejected() {
    let (ctx, _state) = test_context();

    ctx.declare(M2, |_m| {}, |_m| {}).unwrap();
    let err = ctx.declare(M1, |_m| {}, |_m| {}).unwrap_err();
    assert!(matches!(err, MigrateError::OutOfOrder { .. }));

    // Duplicate identifiers are out-of-order too.
    let err = ctx.declare(M2, |_m| {}, |_m| {}).unwrap_err();
    assert!(matches!(err, MigrateError::OutOfOrder { .. }));
}

#[tokio::test]
async fn ensure_log_table_is_idempotent() {
    let (ctx, state) = test_context();
    declare_three(&ctx);
    assert_eq!(ctx.registry().len(), 3);

    ctx.log().ensure_table().await.unwrap();
    ctx.log().ensure_table().await.unwrap();

    let creates = state
        .lock()
        .executed
        .iter()
        .filter(|sql| sql.starts_with("CREATE TABLE IF NOT EXISTS `tblSchemaMigrations`"))
        .count();
    assert_eq!(creates, 2);
}

#[tokio::test]
async fn malformed_identifier_is_rejected_at_declaration() {
    let (ctx, _state) = test_context();
    let err = ctx.declare("not_a_timestamp", |_m| {}, |_m| {}).unwrap_err();
    assert!(matches!(err, MigrateError::InvalidIdentifier(_)));
}
