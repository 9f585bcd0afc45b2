//! Log database migrations, embedded at compile time
//!
//! Applied in order by `LoggingService` through `MigrationService`.
//! New files are named `NNN_description.sql` and appended here.

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_event_log.sql", include_str!("001_event_log.sql")),
];
