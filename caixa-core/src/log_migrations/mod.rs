//! Event log migrations - embedded SQL files, kept apart from the ledger
//! so that logs.duckdb can be exported or deleted on its own.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
