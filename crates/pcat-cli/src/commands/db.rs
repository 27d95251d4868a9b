use anyhow::Result;
use pcat_config::CatalogConfig;
use pcat_db::{CatalogStore, PgCatalogStore, PgPool};

pub async fn status(pool: &PgPool) -> Result<()> {
    let s = pcat_db::status(pool).await?;
    println!("db_ok={} has_catalog_tables={}", s.ok, s.has_catalog_tables);
    if s.has_catalog_tables {
        let c = pcat_db::catalog_counts(pool).await?;
        println!("storage_roots={}", c.storage_roots);
        println!("preserved_objects={}", c.preserved_objects);
        println!("moab_records={}", c.moab_records);
    }
    Ok(())
}

pub async fn migrate(pool: &PgPool) -> Result<()> {
    pcat_db::migrate(pool).await?;
    println!("migrations_applied=true");
    Ok(())
}

/// Upsert every configured storage root; the catalog keeps roots the config
/// no longer lists, since records may still point at them.
pub async fn sync_roots(pool: &PgPool, cfg: &CatalogConfig) -> Result<()> {
    if cfg.storage_roots.is_empty() {
        anyhow::bail!("no storage_roots in config; pass --config <path>");
    }
    let store = PgCatalogStore::new(pool.clone());
    for root in &cfg.storage_roots {
        let r = store
            .ensure_storage_root(&root.name, &root.storage_location)
            .await?;
        println!(
            "storage_root id={} name={} storage_location={}",
            r.id, r.name, r.storage_location
        );
    }
    Ok(())
}
