//! Per-tenant database management.
//!
//! Each tenant owns a physical database separate from the central (landlord)
//! database. This module resolves tenant database URLs from the configured
//! template and provides explicit create/probe/connect/drop operations; the
//! handle is injected into callers rather than held in ambient state, so a
//! failed operation can never leak a tenancy context across requests.

use std::path::{Path, PathBuf};

use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use thiserror::Error;
use url::Url;

use crate::config::AppConfig;

/// Errors that can occur while managing tenant databases.
#[derive(Debug, Error)]
pub enum TenantDbError {
    #[error("invalid tenant database URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
    #[error("unsupported tenant database scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },
    #[error("tenant identifier '{0}' is not a valid database name component")]
    InvalidTenantId(String),
    #[error("filesystem error for tenant database: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Db(#[from] sea_orm::DbErr),
}

/// Backend family of the tenant database template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TenantBackend {
    Postgres,
    Sqlite,
}

/// Resolves and manages the physical databases owned by tenants.
#[derive(Debug, Clone)]
pub struct TenantDatabases {
    url_template: String,
}

impl TenantDatabases {
    /// Create a manager from the configured URL template.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            url_template: config.tenant_database_url_template.clone(),
        }
    }

    /// Create a manager from an explicit template (useful for tests).
    pub fn with_template<S: Into<String>>(url_template: S) -> Self {
        Self {
            url_template: url_template.into(),
        }
    }

    /// Resolve the database URL for a tenant.
    ///
    /// Hyphens in the tenant id are folded to underscores so subdomain-derived
    /// identifiers stay valid database name components.
    pub fn url_for(&self, tenant_id: &str) -> Result<String, TenantDbError> {
        let db_component = sanitize_tenant_component(tenant_id)?;
        Ok(self.url_template.replace("{tenant}", &db_component))
    }

    /// Probe whether the tenant's physical database exists.
    ///
    /// Never errors: any probe failure is reported as "does not exist".
    pub async fn exists(&self, tenant_id: &str) -> bool {
        let Ok(url) = self.url_for(tenant_id) else {
            return false;
        };

        match backend_of(&url) {
            Ok(TenantBackend::Sqlite) => sqlite_file_path(&url)
                .map(|path| path.exists())
                .unwrap_or(false),
            Ok(TenantBackend::Postgres) => match Database::connect(&url).await {
                Ok(conn) => {
                    let stmt = Statement::from_string(
                        conn.get_database_backend(),
                        "SELECT 1".to_string(),
                    );
                    let healthy = conn.query_one(stmt).await.is_ok();
                    let _ = conn.close().await;
                    healthy
                }
                Err(_) => false,
            },
            Err(_) => false,
        }
    }

    /// Idempotently create the tenant's physical database if it is absent.
    ///
    /// Postgres databases are created through the central connection; sqlite
    /// files are created by opening them in read-write-create mode.
    pub async fn create_if_absent(
        &self,
        central: &DatabaseConnection,
        tenant_id: &str,
    ) -> Result<(), TenantDbError> {
        let url = self.url_for(tenant_id)?;

        match backend_of(&url)? {
            TenantBackend::Sqlite => {
                if let Some(path) = sqlite_file_path(&url) {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                // Opening with mode=rwc creates the file when missing.
                let conn = Database::connect(&url).await?;
                conn.close().await?;
                Ok(())
            }
            TenantBackend::Postgres => {
                let db_name = postgres_database_name(&url)?;
                let existing = central
                    .query_one(Statement::from_sql_and_values(
                        central.get_database_backend(),
                        "SELECT 1 AS present FROM pg_database WHERE datname = $1",
                        [db_name.clone().into()],
                    ))
                    .await?;

                if existing.is_none() {
                    central
                        .execute(Statement::from_string(
                            central.get_database_backend(),
                            format!("CREATE DATABASE \"{}\"", db_name),
                        ))
                        .await?;
                }
                Ok(())
            }
        }
    }

    /// Open a connection to the tenant's database.
    pub async fn connect(&self, tenant_id: &str) -> Result<DatabaseConnection, TenantDbError> {
        let url = self.url_for(tenant_id)?;
        Ok(Database::connect(&url).await?)
    }

    /// Drop the tenant's physical database. Missing databases are a no-op.
    pub async fn drop_database(
        &self,
        central: &DatabaseConnection,
        tenant_id: &str,
    ) -> Result<(), TenantDbError> {
        let url = self.url_for(tenant_id)?;

        match backend_of(&url)? {
            TenantBackend::Sqlite => {
                if let Some(path) = sqlite_file_path(&url)
                    && path.exists()
                {
                    std::fs::remove_file(path)?;
                }
                Ok(())
            }
            TenantBackend::Postgres => {
                let db_name = postgres_database_name(&url)?;
                central
                    .execute(Statement::from_string(
                        central.get_database_backend(),
                        format!("DROP DATABASE IF EXISTS \"{}\"", db_name),
                    ))
                    .await?;
                Ok(())
            }
        }
    }
}

/// Fold a tenant id into a safe database-name component.
fn sanitize_tenant_component(tenant_id: &str) -> Result<String, TenantDbError> {
    if tenant_id.is_empty() {
        return Err(TenantDbError::InvalidTenantId(tenant_id.to_string()));
    }

    let component: String = tenant_id
        .chars()
        .map(|c| if c == '-' { '_' } else { c })
        .collect();

    if !component
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(TenantDbError::InvalidTenantId(tenant_id.to_string()));
    }

    Ok(component)
}

fn backend_of(url: &str) -> Result<TenantBackend, TenantDbError> {
    let parsed = Url::parse(url).map_err(|e| TenantDbError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    match parsed.scheme() {
        "sqlite" => Ok(TenantBackend::Sqlite),
        "postgres" | "postgresql" => Ok(TenantBackend::Postgres),
        other => Err(TenantDbError::UnsupportedScheme {
            scheme: other.to_string(),
        }),
    }
}

/// Extract the filesystem path from a sqlite URL, ignoring query parameters.
fn sqlite_file_path(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("sqlite://")?;
    if rest.starts_with(":memory:") {
        return None;
    }
    let path = rest.split('?').next()?;
    Some(Path::new(path).to_path_buf())
}

fn postgres_database_name(url: &str) -> Result<String, TenantDbError> {
    let parsed = Url::parse(url).map_err(|e| TenantDbError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let name = parsed.path().trim_start_matches('/');
    if name.is_empty() {
        return Err(TenantDbError::InvalidUrl {
            url: url.to_string(),
            message: "missing database name".to_string(),
        });
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_replaces_placeholder() {
        let manager = TenantDatabases::with_template("sqlite://data/{tenant}.sqlite?mode=rwc");
        let url = manager.url_for("acme").unwrap();
        assert_eq!(url, "sqlite://data/acme.sqlite?mode=rwc");
    }

    #[test]
    fn test_url_for_folds_hyphens() {
        let manager =
            TenantDatabases::with_template("postgres://landlord@localhost/tenant_{tenant}");
        let url = manager.url_for("acme-east").unwrap();
        assert_eq!(url, "postgres://landlord@localhost/tenant_acme_east");
    }

    #[test]
    fn test_url_for_rejects_hostile_ids() {
        let manager =
            TenantDatabases::with_template("postgres://landlord@localhost/tenant_{tenant}");
        assert!(manager.url_for("acme\"; DROP TABLE tenants;--").is_err());
        assert!(manager.url_for("").is_err());
        assert!(manager.url_for("Acme").is_err());
    }

    #[test]
    fn test_sqlite_file_path_ignores_query() {
        let path = sqlite_file_path("sqlite://data/tenants/acme.sqlite?mode=rwc").unwrap();
        assert_eq!(path, Path::new("data/tenants/acme.sqlite"));

        assert!(sqlite_file_path("sqlite::memory:").is_none());
    }

    #[test]
    fn test_postgres_database_name() {
        let name =
            postgres_database_name("postgres://landlord@localhost:5432/tenant_acme").unwrap();
        assert_eq!(name, "tenant_acme");

        assert!(postgres_database_name("postgres://landlord@localhost:5432/").is_err());
    }

    #[tokio::test]
    async fn test_sqlite_create_and_probe() {
        let dir = tempfile::tempdir().unwrap();
        let template = format!(
            "sqlite://{}/{{tenant}}.sqlite?mode=rwc",
            dir.path().display()
        );
        let manager = TenantDatabases::with_template(template);

        assert!(!manager.exists("acme").await);

        // The central handle is unused for sqlite but part of the contract.
        let central = Database::connect("sqlite::memory:").await.unwrap();
        manager.create_if_absent(&central, "acme").await.unwrap();

        assert!(manager.exists("acme").await);

        // Second call is a no-op.
        manager.create_if_absent(&central, "acme").await.unwrap();
        assert!(manager.exists("acme").await);

        manager.drop_database(&central, "acme").await.unwrap();
        assert!(!manager.exists("acme").await);
    }
}
