//! # Tenant Database Modules
//!
//! A module is a self-contained slice of tenant schema (Core, Blog, Event)
//! with its own migration history. Every module keeps its applied-migration
//! bookkeeping in a distinct table inside the tenant database, so running a
//! module that is already present is a no-op and later plan upgrades can lay
//! new modules alongside existing ones without touching their data.

use sea_orm::{DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

pub mod blog;
pub mod core;
pub mod event;

/// Module identifiers this binary can provision.
pub fn known_module_ids() -> &'static [&'static str] {
    &["Blog", "Core", "Event"]
}

/// Outcome of a module provisioning run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleRunReport {
    /// Modules whose migrations were run (idempotently).
    pub applied: Vec<String>,
    /// Module ids that were not recognized and therefore skipped.
    pub skipped: Vec<String>,
}

/// Run one module's migrations against a tenant database.
///
/// Returns `Ok(true)` when the module was recognized and its migrations ran,
/// `Ok(false)` for an unknown module id. Unknown modules are skipped with a
/// warning rather than failing the run: a plan may name modules this binary
/// does not ship yet.
pub async fn migrate_module(db: &DatabaseConnection, module_id: &str) -> Result<bool, DbErr> {
    // MigratorTrait is not object-safe, so dispatch is a match.
    match module_id {
        "Core" => core::Migrator::up(db, None).await?,
        "Blog" => blog::Migrator::up(db, None).await?,
        "Event" => event::Migrator::up(db, None).await?,
        unknown => {
            tracing::warn!(module = %unknown, "Unknown tenant module, skipping");
            return Ok(false);
        }
    }
    Ok(true)
}

/// Run a set of modules against a tenant database.
pub async fn run_modules<I, S>(
    db: &DatabaseConnection,
    modules: I,
) -> Result<ModuleRunReport, DbErr>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = ModuleRunReport::default();

    for module in modules {
        let module = module.as_ref();
        if migrate_module(db, module).await? {
            report.applied.push(module.to_string());
        } else {
            report.skipped.push(module.to_string());
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Database;

    #[test]
    fn test_known_module_ids_are_sorted_and_unique() {
        let ids = known_module_ids();
        let mut sorted = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids, sorted.as_slice());
    }

    #[tokio::test]
    async fn test_unknown_module_is_skipped() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        assert!(!migrate_module(&db, "Crm").await.unwrap());
    }

    #[tokio::test]
    async fn test_run_modules_reports_applied_and_skipped() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let report = run_modules(&db, ["Core", "Crm", "Blog"]).await.unwrap();
        assert_eq!(report.applied, vec!["Core", "Blog"]);
        assert_eq!(report.skipped, vec!["Crm"]);
    }

    #[tokio::test]
    async fn test_modules_keep_separate_migration_tables() {
        use sea_orm::ConnectionTrait;

        let db = Database::connect("sqlite::memory:").await.unwrap();
        run_modules(&db, ["Core", "Blog"]).await.unwrap();

        for table in ["seaql_migrations_core", "seaql_migrations_blog"] {
            let stmt = sea_orm::Statement::from_string(
                db.get_database_backend(),
                format!("SELECT COUNT(*) AS n FROM {}", table),
            );
            assert!(db.query_one(stmt).await.is_ok(), "missing {}", table);
        }
    }

    #[tokio::test]
    async fn test_module_runs_are_idempotent() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        run_modules(&db, ["Core"]).await.unwrap();
        // Second run finds the migration already recorded and does nothing.
        let report = run_modules(&db, ["Core"]).await.unwrap();
        assert_eq!(report.applied, vec!["Core"]);
    }
}
