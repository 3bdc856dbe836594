//! ensure_table / ensure_constraints against an in-memory SQLite database.

mod common;

use common::{exec, posts, sync, users};
use loom_migrate::{Drift, Driver, MigrateError, SchemaSync, SqliteDriver, ViolationKind};
use loom_sql_core::{Dialect, Template};

// =============================================================================
// Creation and idempotence
// =============================================================================

#[tokio::test]
async fn creates_absent_table_then_converges() {
    let sync = sync().await;
    let (users, posts) = (users(), posts());

    let first = sync.ensure_table(&users).await.unwrap();
    assert!(first.created);
    let created = sync.ensure_table(&posts).await.unwrap();
    assert!(created.created);

    let columns = sync.driver().list_columns("posts").await.unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "title", "authorId", "published"]);

    let second = sync.ensure_table(&users).await.unwrap();
    assert!(second.is_unchanged(), "{second:?}");
    let second = sync.ensure_table(&posts).await.unwrap();
    assert!(second.is_unchanged(), "{second:?}");
    let constraints = sync.ensure_constraints(&posts).await.unwrap();
    assert!(constraints.is_unchanged(), "{constraints:?}");

    let report = sync.inspect(&posts).await.unwrap().unwrap();
    assert!(report.is_clean(), "{report}");
}

#[tokio::test]
async fn inspect_reports_absent_table() {
    let sync = sync().await;
    assert!(sync.inspect(&users()).await.unwrap().is_none());
}

// =============================================================================
// Additive changes
// =============================================================================

#[tokio::test]
async fn adds_missing_column_and_index() {
    let sync = sync().await;
    sync.ensure_table(&users()).await.unwrap();
    exec(
        sync.driver(),
        r#"CREATE TABLE "posts" ("id" TEXT PRIMARY KEY NOT NULL, "title" TEXT NOT NULL, "authorId" INTEGER NOT NULL, CONSTRAINT "fk_posts_authorId" FOREIGN KEY ("authorId") REFERENCES "users" ("id"))"#,
    )
    .await;

    let report = sync.ensure_table(&posts()).await.unwrap();
    assert!(!report.created);
    assert_eq!(report.added_columns, ["published"]);
    assert_eq!(report.created_indexes, ["idx_posts_authorId"]);

    let again = sync.ensure_table(&posts()).await.unwrap();
    assert!(again.is_unchanged(), "{again:?}");
}

// =============================================================================
// Drift and preflight
// =============================================================================

async fn users_without_unique() -> SchemaSync<SqliteDriver> {
    let sync = sync().await;
    exec(
        sync.driver(),
        r#"CREATE TABLE "users" ("id" INTEGER PRIMARY KEY AUTOINCREMENT, "email" TEXT NOT NULL, "name" TEXT)"#,
    )
    .await;
    sync
}

async fn insert_user(sync: &SchemaSync<SqliteDriver>, email: &str) {
    let insert = Template::raw(r#"INSERT INTO "users" ("email") VALUES ("#)
        .param(email)
        .sql(")");
    sync.driver().execute(&insert).await.unwrap();
}

#[tokio::test]
async fn missing_unique_is_drift() {
    let sync = users_without_unique().await;

    let err = sync.ensure_table(&users()).await.unwrap_err();
    match err {
        MigrateError::SchemaDrift {
            table,
            drift,
            remediation,
            applied,
        } => {
            assert!(applied.is_unchanged());
            assert_eq!(table, "users");
            assert_eq!(
                drift,
                Drift::MissingUnique {
                    columns: vec![String::from("email")]
                }
            );
            assert!(remediation.contains("ensure_constraints"));
        }
        other => panic!("expected drift, got {other:?}"),
    }
}

#[tokio::test]
async fn duplicates_block_unique_constraint() {
    let sync = users_without_unique().await;
    insert_user(&sync, "a@example.com").await;
    insert_user(&sync, "a@example.com").await;
    insert_user(&sync, "b@example.com").await;
    let before = sync.driver().list_indexes("users").await.unwrap();

    let err = sync.ensure_constraints(&users()).await.unwrap_err();
    match err {
        MigrateError::ConstraintPreflight {
            table,
            violations,
            query,
            ..
        } => {
            assert_eq!(table, "users");
            assert_eq!(violations, 1);
            assert!(query.contains(r#"GROUP BY "email" HAVING COUNT(*) > 1"#));

            // the diagnostic query runs as-is
            let count: i64 = sqlx::query_scalar(&query)
                .fetch_one(sync.driver().pool())
                .await
                .unwrap();
            assert_eq!(count, 1);
        }
        other => panic!("expected preflight failure, got {other:?}"),
    }
    assert_eq!(sync.driver().list_indexes("users").await.unwrap(), before);
}

#[tokio::test]
async fn clean_data_gets_unique_index() {
    let sync = users_without_unique().await;
    insert_user(&sync, "a@example.com").await;
    insert_user(&sync, "b@example.com").await;

    let report = sync.ensure_constraints(&users()).await.unwrap();
    assert_eq!(report.added_constraints, ["uq_users_email"]);
    assert!(sync.ensure_table(&users()).await.unwrap().is_unchanged());

    // the index is enforced from now on
    let insert = Template::raw(r#"INSERT INTO "users" ("email") VALUES ("#)
        .param("a@example.com")
        .sql(")");
    match sync.driver().execute(&insert).await.unwrap_err() {
        MigrateError::ConstraintViolation { kind, column, .. } => {
            assert_eq!(kind, ViolationKind::Unique);
            assert_eq!(column.as_deref(), Some("email"));
        }
        other => panic!("expected a unique violation, got {other:?}"),
    }
}

#[tokio::test]
async fn sqlite_cannot_add_foreign_key() {
    let sync = sync().await;
    sync.ensure_table(&users()).await.unwrap();
    exec(
        sync.driver(),
        r#"CREATE TABLE "posts" ("id" TEXT PRIMARY KEY NOT NULL, "title" TEXT NOT NULL, "authorId" INTEGER NOT NULL, "published" INTEGER)"#,
    )
    .await;

    match sync.ensure_table(&posts()).await.unwrap_err() {
        MigrateError::SchemaDrift {
            remediation,
            applied,
            ..
        } => {
            assert!(remediation.contains("rebuild 'posts'"));
            assert_eq!(applied.created_indexes, ["idx_posts_authorId"]);
        }
        other => panic!("expected drift, got {other:?}"),
    }
    let indexes = sync.driver().list_indexes("posts").await.unwrap();
    assert!(indexes.iter().any(|i| i.name == "idx_posts_authorId"));

    match sync.ensure_constraints(&posts()).await.unwrap_err() {
        MigrateError::Unsupported { dialect, hint, .. } => {
            assert_eq!(dialect, Dialect::Sqlite);
            assert!(hint.contains("authorId"));
        }
        other => panic!("expected unsupported, got {other:?}"),
    }
}

#[tokio::test]
async fn orphans_block_foreign_key() {
    let sync = sync().await;
    sync.ensure_table(&users()).await.unwrap();
    exec(
        sync.driver(),
        r#"CREATE TABLE "posts" ("id" TEXT PRIMARY KEY NOT NULL, "title" TEXT NOT NULL, "authorId" INTEGER NOT NULL, "published" INTEGER)"#,
    )
    .await;
    exec(
        sync.driver(),
        r#"INSERT INTO "posts" ("id", "title", "authorId") VALUES ('p1', 'Orphan', 99)"#,
    )
    .await;

    match sync.ensure_constraints(&posts()).await.unwrap_err() {
        MigrateError::ConstraintPreflight {
            violations, query, ..
        } => {
            assert_eq!(violations, 1);
            assert!(query.contains("NOT EXISTS"));
        }
        other => panic!("expected preflight failure, got {other:?}"),
    }
}

// =============================================================================
// Error pass-through
// =============================================================================

#[tokio::test]
async fn unclassified_database_errors_pass_through() {
    let sync = sync().await;
    // SQLite refuses to add a NOT NULL column without a default.
    exec(
        sync.driver(),
        r#"CREATE TABLE "users" ("id" INTEGER PRIMARY KEY AUTOINCREMENT, "name" TEXT)"#,
    )
    .await;

    let err = sync.ensure_table(&users()).await.unwrap_err();
    assert!(matches!(err, MigrateError::Database(_)), "{err:?}");
}
