//! Store migrations, embedded at compile time
//!
//! Applied in order by `MigrationService` and tracked in `sys_migrations`.
//! New files are named `NNN_description.sql` and appended here.

pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_initial_schema.sql",
        include_str!("001_initial_schema.sql"),
    ),
];
