//! Database schema and migrations for filedepot.
//!
//! Migrations are applied sequentially when the database is first opened
//! or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: files table
    r#"
-- One row per stored file; name is the external identity
CREATE TABLE files (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL UNIQUE,
    path        TEXT NOT NULL,           -- location assigned by the blob store
    size        INTEGER NOT NULL,        -- bytes
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
"#,
];
