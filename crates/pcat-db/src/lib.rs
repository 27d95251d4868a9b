//! pcat-db
//!
//! Postgres persistence for the preservation catalog: pool setup, embedded
//! migrations, and the [`CatalogStore`] seam the reconciliation engine
//! commits through.

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
pub use sqlx::PgPool;

mod pg;
mod store;

pub use pg::PgCatalogStore;
pub use store::{
    CatalogSnapshot, CatalogStore, CatalogWrite, NewMoabRecord, PersistenceError, RecordChanges,
    WriteBatch,
};

pub const ENV_DB_URL: &str = "PCAT_DATABASE_URL";

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Connect to Postgres using PCAT_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    connect_from_env_with(DEFAULT_MAX_CONNECTIONS).await
}

/// Same as [`connect_from_env`] with an explicit pool size (from config).
pub async fn connect_from_env_with(max_connections: u32) -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Connectivity plus presence of the catalog tables.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (tables,): (i64,) = sqlx::query_as::<_, (i64,)>(
        r#"
        select count(*)::bigint
        from information_schema.tables
        where table_schema = 'public'
          and table_name in ('storage_roots', 'preserved_objects', 'moab_records')
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_catalog_tables: tables == 3,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_catalog_tables: bool,
}

/// Row counts for `pcat db status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogCounts {
    pub storage_roots: i64,
    pub preserved_objects: i64,
    pub moab_records: i64,
}

pub async fn catalog_counts(pool: &PgPool) -> Result<CatalogCounts> {
    let (storage_roots, preserved_objects, moab_records): (i64, i64, i64) = sqlx::query_as(
        r#"
        select
          (select count(*) from storage_roots)::bigint,
          (select count(*) from preserved_objects)::bigint,
          (select count(*) from moab_records)::bigint
        "#,
    )
    .fetch_one(pool)
    .await
    .context("catalog_counts failed")?;

    Ok(CatalogCounts {
        storage_roots,
        preserved_objects,
        moab_records,
    })
}

/// Postgres unique_violation.
const SQLSTATE_UNIQUE_VIOLATION: &str = "23505";

/// Detect a Postgres unique constraint violation, optionally by name.
pub fn is_unique_constraint_violation(err: &sqlx::Error, constraint: Option<&str>) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some(SQLSTATE_UNIQUE_VIOLATION)
                && constraint.map_or(true, |c| db_err.constraint() == Some(c))
        }
        _ => false,
    }
}
