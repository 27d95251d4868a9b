use crate::store::{
    CatalogSnapshot, CatalogStore, CatalogWrite, NewMoabRecord, PersistenceError, RecordChanges,
    WriteBatch,
};
use async_trait::async_trait;
use pcat_schemas::{Druid, MoabRecord, MoabStatus, PreservedObject, StorageRoot};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

/// [`CatalogStore`] over a Postgres pool.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn storage_root_from_row(row: &PgRow) -> Result<StorageRoot, PersistenceError> {
    Ok(StorageRoot {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        storage_location: row.try_get("storage_location")?,
    })
}

fn object_from_row(row: &PgRow) -> Result<PreservedObject, PersistenceError> {
    let druid: String = row.try_get("druid")?;
    Ok(PreservedObject {
        id: row.try_get("id")?,
        druid: Druid::parse(&druid).map_err(|e| PersistenceError::Database(e.to_string()))?,
        current_version: row.try_get("current_version")?,
    })
}

fn record_from_row(row: &PgRow) -> Result<MoabRecord, PersistenceError> {
    let status: String = row.try_get("status")?;
    Ok(MoabRecord {
        id: row.try_get("id")?,
        preserved_object_id: row.try_get("preserved_object_id")?,
        storage_root_id: row.try_get("storage_root_id")?,
        previous_storage_root_id: row.try_get("previous_storage_root_id")?,
        version: row.try_get("version")?,
        size: row.try_get("size")?,
        status: MoabStatus::parse(&status).map_err(|e| PersistenceError::Database(e.to_string()))?,
        status_details: row.try_get("status_details")?,
        is_primary: row.try_get("is_primary")?,
        last_version_audit: row.try_get("last_version_audit")?,
        last_moab_validation: row.try_get("last_moab_validation")?,
        last_checksum_validation: row.try_get("last_checksum_validation")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn create_object(
    tx: &mut Transaction<'_, Postgres>,
    druid: &Druid,
    current_version: i32,
) -> Result<(), PersistenceError> {
    sqlx::query(
        r#"
        insert into preserved_objects (druid, current_version)
        values ($1, $2)
        "#,
    )
    .bind(druid.as_str())
    .bind(current_version)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn create_record(
    tx: &mut Transaction<'_, Postgres>,
    druid: &Druid,
    rec: &NewMoabRecord,
) -> Result<(), PersistenceError> {
    // The first copy of an object becomes primary. Two concurrent first
    // inserts collide on uq_moab_records_primary and one of them fails.
    let res = sqlx::query(
        r#"
        insert into moab_records (
          preserved_object_id, storage_root_id, version, size, status, status_details,
          is_primary, last_version_audit, last_moab_validation, last_checksum_validation
        )
        select
          po.id, $2, $3, $4, $5, $6,
          not exists (select 1 from moab_records mr where mr.preserved_object_id = po.id),
          $7, $8, $9
        from preserved_objects po
        where po.druid = $1
        "#,
    )
    .bind(druid.as_str())
    .bind(rec.storage_root_id)
    .bind(rec.version)
    .bind(rec.size)
    .bind(rec.status.as_str())
    .bind(&rec.status_details)
    .bind(rec.last_version_audit)
    .bind(rec.last_moab_validation)
    .bind(rec.last_checksum_validation)
    .execute(&mut **tx)
    .await?;

    if res.rows_affected() == 0 {
        return Err(PersistenceError::NotFound(format!(
            "PreservedObject {druid} not found"
        )));
    }
    Ok(())
}

async fn update_record(
    tx: &mut Transaction<'_, Postgres>,
    record_id: i64,
    expected_version: i32,
    changes: &RecordChanges,
) -> Result<(), PersistenceError> {
    let res = sqlx::query(
        r#"
        update moab_records
        set version                  = coalesce($3, version),
            size                     = coalesce($4, size),
            status                   = coalesce($5, status),
            status_details           = coalesce($6, status_details),
            last_version_audit       = coalesce($7, last_version_audit),
            last_moab_validation     = coalesce($8, last_moab_validation),
            last_checksum_validation = coalesce($9, last_checksum_validation),
            updated_at               = now()
        where id = $1
          and version = $2
        "#,
    )
    .bind(record_id)
    .bind(expected_version)
    .bind(changes.version)
    .bind(changes.size)
    .bind(changes.status.map(|s| s.as_str()))
    .bind(&changes.status_details)
    .bind(changes.last_version_audit)
    .bind(changes.last_moab_validation)
    .bind(changes.last_checksum_validation)
    .execute(&mut **tx)
    .await?;

    if res.rows_affected() == 0 {
        return Err(PersistenceError::VersionConflict(format!(
            "MoabRecord {record_id} no longer at version {expected_version}"
        )));
    }
    Ok(())
}

async fn advance_object_version(
    tx: &mut Transaction<'_, Postgres>,
    druid: &Druid,
    expected_current_version: i32,
    new_version: i32,
) -> Result<(), PersistenceError> {
    let res = sqlx::query(
        r#"
        update preserved_objects
        set current_version = $3,
            updated_at = now()
        where druid = $1
          and current_version = $2
          and current_version < $3
        "#,
    )
    .bind(druid.as_str())
    .bind(expected_current_version)
    .bind(new_version)
    .execute(&mut **tx)
    .await?;

    if res.rows_affected() == 0 {
        return Err(PersistenceError::VersionConflict(format!(
            "PreservedObject {druid} no longer at version {expected_current_version}"
        )));
    }
    Ok(())
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn storage_root(&self, name: &str) -> Result<Option<StorageRoot>, PersistenceError> {
        let row = sqlx::query(
            r#"
            select id, name, storage_location
            from storage_roots
            where name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(storage_root_from_row).transpose()
    }

    async fn storage_roots(&self) -> Result<Vec<StorageRoot>, PersistenceError> {
        let rows = sqlx::query(
            r#"
            select id, name, storage_location
            from storage_roots
            order by name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(storage_root_from_row).collect()
    }

    async fn ensure_storage_root(
        &self,
        name: &str,
        storage_location: &str,
    ) -> Result<StorageRoot, PersistenceError> {
        let row = sqlx::query(
            r#"
            insert into storage_roots (name, storage_location)
            values ($1, $2)
            on conflict (name) do update
              set storage_location = excluded.storage_location,
                  updated_at = now()
            returning id, name, storage_location
            "#,
        )
        .bind(name)
        .bind(storage_location)
        .fetch_one(&self.pool)
        .await?;

        storage_root_from_row(&row)
    }

    async fn load(
        &self,
        druid: &Druid,
        storage_root_id: i64,
    ) -> Result<CatalogSnapshot, PersistenceError> {
        let obj_row = sqlx::query(
            r#"
            select id, druid, current_version
            from preserved_objects
            where druid = $1
            "#,
        )
        .bind(druid.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let object = match obj_row.as_ref().map(object_from_row).transpose()? {
            Some(o) => o,
            None => return Ok(CatalogSnapshot::default()),
        };

        let rec_row = sqlx::query(
            r#"
            select
              id, preserved_object_id, storage_root_id, previous_storage_root_id,
              version, size, status, status_details, is_primary,
              last_version_audit, last_moab_validation, last_checksum_validation,
              created_at, updated_at
            from moab_records
            where preserved_object_id = $1
              and storage_root_id = $2
            "#,
        )
        .bind(object.id)
        .bind(storage_root_id)
        .fetch_optional(&self.pool)
        .await?;
        let record = rec_row.as_ref().map(record_from_row).transpose()?;

        let primary_version: Option<i32> = sqlx::query_scalar(
            r#"
            select version
            from moab_records
            where preserved_object_id = $1
              and is_primary
            "#,
        )
        .bind(object.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(CatalogSnapshot {
            object: Some(object),
            record,
            primary_version,
        })
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), PersistenceError> {
        if batch.is_empty() {
            return Ok(());
        }

        let n = batch.len();
        let mut tx = self.pool.begin().await?;

        // Returning early drops `tx`, which rolls back.
        for op in batch.ops() {
            match op {
                CatalogWrite::CreateObject {
                    druid,
                    current_version,
                } => create_object(&mut tx, druid, *current_version).await?,
                CatalogWrite::CreateRecord { druid, record } => {
                    create_record(&mut tx, druid, record).await?
                }
                CatalogWrite::UpdateRecord {
                    record_id,
                    expected_version,
                    changes,
                } => update_record(&mut tx, *record_id, *expected_version, changes).await?,
                CatalogWrite::AdvanceObjectVersion {
                    druid,
                    expected_current_version,
                    new_version,
                } => {
                    advance_object_version(&mut tx, druid, *expected_current_version, *new_version)
                        .await?
                }
            }
        }

        tx.commit().await?;
        debug!(ops = n, "catalog batch committed");
        Ok(())
    }
}
