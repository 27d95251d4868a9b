use async_trait::async_trait;
use chrono::Utc;
use pcat_db::{
    CatalogSnapshot, CatalogStore, CatalogWrite, NewMoabRecord, PersistenceError, RecordChanges,
    WriteBatch,
};
use pcat_schemas::{Druid, MoabRecord, MoabStatus, PreservedObject, StorageRoot};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
struct Tables {
    roots: Vec<StorageRoot>,
    objects: Vec<PreservedObject>,
    records: Vec<MoabRecord>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn object_by_druid(&self, druid: &Druid) -> Option<&PreservedObject> {
        self.objects.iter().find(|o| &o.druid == druid)
    }

    fn apply(&mut self, op: &CatalogWrite) -> Result<(), PersistenceError> {
        match op {
            CatalogWrite::CreateObject {
                druid,
                current_version,
            } => {
                if self.object_by_druid(druid).is_some() {
                    return Err(unique("uq_preserved_objects_druid"));
                }
                let id = self.next_id();
                self.objects.push(PreservedObject {
                    id,
                    druid: druid.clone(),
                    current_version: *current_version,
                });
                Ok(())
            }
            CatalogWrite::CreateRecord { druid, record } => self.create_record(druid, record),
            CatalogWrite::UpdateRecord {
                record_id,
                expected_version,
                changes,
            } => {
                let rec = self
                    .records
                    .iter_mut()
                    .find(|r| r.id == *record_id && r.version == *expected_version)
                    .ok_or_else(|| {
                        PersistenceError::VersionConflict(format!(
                            "MoabRecord {record_id} no longer at version {expected_version}"
                        ))
                    })?;
                apply_changes(rec, changes);
                Ok(())
            }
            CatalogWrite::AdvanceObjectVersion {
                druid,
                expected_current_version,
                new_version,
            } => {
                let obj = self
                    .objects
                    .iter_mut()
                    .find(|o| {
                        &o.druid == druid
                            && o.current_version == *expected_current_version
                            && o.current_version < *new_version
                    })
                    .ok_or_else(|| {
                        PersistenceError::VersionConflict(format!(
                            "PreservedObject {druid} no longer at version {expected_current_version}"
                        ))
                    })?;
                obj.current_version = *new_version;
                Ok(())
            }
        }
    }

    fn create_record(
        &mut self,
        druid: &Druid,
        rec: &NewMoabRecord,
    ) -> Result<(), PersistenceError> {
        let object_id = self
            .object_by_druid(druid)
            .map(|o| o.id)
            .ok_or_else(|| {
                PersistenceError::NotFound(format!("PreservedObject {druid} not found"))
            })?;
        if self
            .records
            .iter()
            .any(|r| r.preserved_object_id == object_id && r.storage_root_id == rec.storage_root_id)
        {
            return Err(unique("uq_moab_records_object_root"));
        }
        let is_primary = !self.records.iter().any(|r| r.preserved_object_id == object_id);
        let id = self.next_id();
        let now = Utc::now();
        self.records.push(MoabRecord {
            id,
            preserved_object_id: object_id,
            storage_root_id: rec.storage_root_id,
            previous_storage_root_id: None,
            version: rec.version,
            size: rec.size,
            status: rec.status,
            status_details: rec.status_details.clone(),
            is_primary,
            last_version_audit: rec.last_version_audit,
            last_moab_validation: rec.last_moab_validation,
            last_checksum_validation: rec.last_checksum_validation,
            created_at: now,
            updated_at: now,
        });
        Ok(())
    }
}

fn unique(constraint: &str) -> PersistenceError {
    PersistenceError::UniqueViolation {
        constraint: Some(constraint.to_string()),
        message: format!("duplicate key value violates unique constraint \"{constraint}\""),
    }
}

fn apply_changes(rec: &mut MoabRecord, c: &RecordChanges) {
    if let Some(v) = c.version {
        rec.version = v;
    }
    if let Some(s) = c.size {
        rec.size = Some(s);
    }
    if let Some(st) = c.status {
        rec.status = st;
    }
    if let Some(d) = &c.status_details {
        rec.status_details = Some(d.clone());
    }
    if c.last_version_audit.is_some() {
        rec.last_version_audit = c.last_version_audit;
    }
    if c.last_moab_validation.is_some() {
        rec.last_moab_validation = c.last_moab_validation;
    }
    if c.last_checksum_validation.is_some() {
        rec.last_checksum_validation = c.last_checksum_validation;
    }
    rec.updated_at = Utc::now();
}

#[derive(Default)]
struct State {
    tables: Tables,
    fail_next_commit: Option<PersistenceError>,
    fail_next_lookup: Option<PersistenceError>,
    race_next_commit: Option<WriteBatch>,
    commits: usize,
}

/// In-memory [`CatalogStore`] with the same uniqueness, primary and guarded
/// update rules as the Postgres schema. Batches apply to a copy that only
/// replaces the live tables if every write succeeds.
#[derive(Default)]
pub struct MemoryCatalogStore {
    state: Mutex<State>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn add_storage_root(&self, name: &str, storage_location: &str) -> StorageRoot {
        let mut st = self.lock();
        let id = st.tables.next_id();
        let root = StorageRoot {
            id,
            name: name.to_string(),
            storage_location: storage_location.to_string(),
        };
        st.tables.roots.push(root.clone());
        root
    }

    /// Insert an object directly, bypassing the engine.
    pub fn seed_object(&self, druid: &Druid, current_version: i32) -> PreservedObject {
        let mut st = self.lock();
        let id = st.tables.next_id();
        let obj = PreservedObject {
            id,
            druid: druid.clone(),
            current_version,
        };
        st.tables.objects.push(obj.clone());
        obj
    }

    /// Insert a record directly. The object must already be seeded.
    pub fn seed_record(
        &self,
        druid: &Druid,
        storage_root_id: i64,
        version: i32,
        status: MoabStatus,
    ) -> Option<MoabRecord> {
        let mut st = self.lock();
        let new = NewMoabRecord {
            storage_root_id,
            version,
            size: Some(1),
            status,
            status_details: None,
            last_version_audit: None,
            last_moab_validation: None,
            last_checksum_validation: None,
        };
        st.tables.create_record(druid, &new).ok()?;
        st.tables.records.last().cloned()
    }

    /// Overwrite a record's version without any guard, to stage corruption.
    pub fn force_record_version(&self, record_id: i64, version: i32) {
        let mut st = self.lock();
        if let Some(r) = st.tables.records.iter_mut().find(|r| r.id == record_id) {
            r.version = version;
        }
    }

    pub fn object(&self, druid: &Druid) -> Option<PreservedObject> {
        self.lock().tables.object_by_druid(druid).cloned()
    }

    pub fn record(&self, druid: &Druid, storage_root_id: i64) -> Option<MoabRecord> {
        let st = self.lock();
        let object_id = st.tables.object_by_druid(druid)?.id;
        st.tables
            .records
            .iter()
            .find(|r| r.preserved_object_id == object_id && r.storage_root_id == storage_root_id)
            .cloned()
    }

    pub fn records(&self, druid: &Druid) -> Vec<MoabRecord> {
        let st = self.lock();
        let Some(object_id) = st.tables.object_by_druid(druid).map(|o| o.id) else {
            return Vec::new();
        };
        st.tables
            .records
            .iter()
            .filter(|r| r.preserved_object_id == object_id)
            .cloned()
            .collect()
    }

    /// The next `commit` fails with `err` and applies nothing.
    pub fn fail_next_commit(&self, err: PersistenceError) {
        self.lock().fail_next_commit = Some(err);
    }

    /// The next `storage_root` lookup fails with `err`.
    pub fn fail_next_lookup(&self, err: PersistenceError) {
        self.lock().fail_next_lookup = Some(err);
    }

    /// Commit `batch` on behalf of a competing writer just before the next
    /// `commit` call is applied.
    pub fn race_next_commit(&self, batch: WriteBatch) {
        self.lock().race_next_commit = Some(batch);
    }

    /// Successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.lock().commits
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn storage_root(&self, name: &str) -> Result<Option<StorageRoot>, PersistenceError> {
        let mut st = self.lock();
        if let Some(err) = st.fail_next_lookup.take() {
            return Err(err);
        }
        Ok(st.tables.roots.iter().find(|r| r.name == name).cloned())
    }

    async fn storage_roots(&self) -> Result<Vec<StorageRoot>, PersistenceError> {
        let mut roots = self.lock().tables.roots.clone();
        roots.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roots)
    }

    async fn ensure_storage_root(
        &self,
        name: &str,
        storage_location: &str,
    ) -> Result<StorageRoot, PersistenceError> {
        {
            let mut st = self.lock();
            if let Some(r) = st.tables.roots.iter_mut().find(|r| r.name == name) {
                r.storage_location = storage_location.to_string();
                return Ok(r.clone());
            }
        }
        Ok(self.add_storage_root(name, storage_location))
    }

    async fn load(
        &self,
        druid: &Druid,
        storage_root_id: i64,
    ) -> Result<CatalogSnapshot, PersistenceError> {
        let st = self.lock();
        let Some(object) = st.tables.object_by_druid(druid).cloned() else {
            return Ok(CatalogSnapshot::default());
        };
        let record = st
            .tables
            .records
            .iter()
            .find(|r| r.preserved_object_id == object.id && r.storage_root_id == storage_root_id)
            .cloned();
        let primary_version = st
            .tables
            .records
            .iter()
            .find(|r| r.preserved_object_id == object.id && r.is_primary)
            .map(|r| r.version);
        Ok(CatalogSnapshot {
            object: Some(object),
            record,
            primary_version,
        })
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), PersistenceError> {
        let mut st = self.lock();

        if let Some(race) = st.race_next_commit.take() {
            let mut tables = st.tables.clone();
            for op in race.ops() {
                tables.apply(op)?;
            }
            st.tables = tables;
        }

        if let Some(err) = st.fail_next_commit.take() {
            return Err(err);
        }

        let mut tables = st.tables.clone();
        for op in batch.ops() {
            tables.apply(op)?;
        }
        st.tables = tables;
        st.commits += 1;
        Ok(())
    }
}
