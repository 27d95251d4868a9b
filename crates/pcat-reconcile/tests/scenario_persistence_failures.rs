use pcat_db::{CatalogWrite, NewMoabRecord, PersistenceError, WriteBatch};
use pcat_reconcile::{AuditRequest, ReconcileConfig, Reconciler};
use pcat_results::{Detail, ResultCode};
use pcat_schemas::MoabStatus;
use pcat_testkit::{World, FIXTURE_ROOT};

const DRUID: &str = "bj102hs9687";

fn engine(world: &World) -> Reconciler {
    Reconciler::new(world.store.clone(), ReconcileConfig::default())
}

fn persistence_category(detail: &Detail) -> &str {
    match detail {
        Detail::PersistenceFailed { category, .. } => category,
        other => panic!("expected persistence_failed, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_create_leaves_no_trace_and_no_created_result() {
    let world = World::new(DRUID).with_versions(1);
    world
        .store
        .fail_next_commit(PersistenceError::Database("connection reset".into()));

    let res = engine(&world)
        .check_existence(&AuditRequest::new(DRUID, 1, Some(1), FIXTURE_ROOT))
        .await;

    assert_eq!(
        res.codes(),
        vec![ResultCode::DoesNotExist, ResultCode::PersistenceFailed]
    );
    assert!(!res.contains(ResultCode::Created));
    assert_eq!(persistence_category(&res.results()[1].detail), "database");
    assert!(world.store.object(world.moab.druid()).is_none());
    assert_eq!(world.store.commit_count(), 0);
}

#[tokio::test]
async fn failed_update_drops_status_change_and_keeps_prior_state() {
    let world = World::new(DRUID).with_versions(3);
    let druid = world.moab.druid().clone();
    world.store.seed_object(&druid, 2);
    world
        .store
        .seed_record(&druid, world.root.id, 2, MoabStatus::InvalidMoab)
        .unwrap();
    world
        .store
        .fail_next_commit(PersistenceError::Database("deadlock detected".into()));

    let res = engine(&world)
        .update_version(&AuditRequest::new(DRUID, 3, Some(1), FIXTURE_ROOT), false)
        .await;

    assert_eq!(
        res.codes(),
        vec![
            ResultCode::ActualGreaterThanCatalog,
            ResultCode::PersistenceFailed,
        ]
    );
    let record = world.store.record(&druid, world.root.id).unwrap();
    assert_eq!(record.version, 2);
    assert_eq!(record.status, MoabStatus::InvalidMoab);
    assert_eq!(world.store.object(&druid).unwrap().current_version, 2);
}

#[tokio::test]
async fn concurrent_create_surfaces_as_unique_violation() {
    let world = World::new(DRUID).with_versions(1);
    let druid = world.moab.druid().clone();

    let mut competitor = WriteBatch::new();
    competitor.push(CatalogWrite::CreateObject {
        druid: druid.clone(),
        current_version: 1,
    });
    competitor.push(CatalogWrite::CreateRecord {
        druid: druid.clone(),
        record: NewMoabRecord {
            storage_root_id: world.root.id,
            version: 1,
            size: Some(1),
            status: MoabStatus::ValidityUnknown,
            status_details: None,
            last_version_audit: None,
            last_moab_validation: None,
            last_checksum_validation: None,
        },
    });
    world.store.race_next_commit(competitor);

    let res = engine(&world)
        .create(&AuditRequest::new(DRUID, 1, Some(1), FIXTURE_ROOT), false)
        .await;

    assert_eq!(res.codes(), vec![ResultCode::PersistenceFailed]);
    assert_eq!(persistence_category(&res.results()[0].detail), "unique_violation");
    assert_eq!(world.store.records(&druid).len(), 1);
}

#[tokio::test]
async fn concurrent_version_bump_surfaces_as_version_conflict() {
    let world = World::new(DRUID).with_versions(3);
    let druid = world.moab.druid().clone();
    world.store.seed_object(&druid, 2);
    let record = world
        .store
        .seed_record(&druid, world.root.id, 2, MoabStatus::Ok)
        .unwrap();

    let mut competitor = WriteBatch::new();
    competitor.push(CatalogWrite::UpdateRecord {
        record_id: record.id,
        expected_version: 2,
        changes: pcat_db::RecordChanges {
            version: Some(3),
            ..Default::default()
        },
    });
    world.store.race_next_commit(competitor);

    let res = engine(&world)
        .update_version(&AuditRequest::new(DRUID, 3, Some(1), FIXTURE_ROOT), false)
        .await;

    assert!(res.contains(ResultCode::PersistenceFailed));
    assert!(!res.contains(ResultCode::StatusChanged));
    let failed = res
        .results()
        .iter()
        .find(|r| r.code() == ResultCode::PersistenceFailed)
        .unwrap();
    assert_eq!(persistence_category(&failed.detail), "version_conflict");
    assert_eq!(world.store.object(&druid).unwrap().current_version, 2);
}

#[tokio::test]
async fn bad_arguments_win_over_a_failed_root_lookup() {
    let world = World::new(DRUID).with_versions(1);
    world
        .store
        .fail_next_lookup(PersistenceError::Database("connection reset".into()));
    let res = engine(&world)
        .check_existence(&AuditRequest::new("not-a-druid", 0, Some(10), FIXTURE_ROOT))
        .await;

    assert_eq!(res.codes(), vec![ResultCode::InvalidArguments]);
    match &res.results()[0].detail {
        Detail::InvalidArguments { errors } => assert_eq!(
            errors,
            &vec![
                "Druid is invalid".to_string(),
                "Incoming version must be an integer greater than 0".to_string(),
            ]
        ),
        other => panic!("unexpected detail {other:?}"),
    }
}

#[tokio::test]
async fn failed_root_lookup_with_good_arguments_is_a_persistence_failure() {
    let world = World::new(DRUID).with_versions(1);
    world
        .store
        .fail_next_lookup(PersistenceError::Database("connection reset".into()));
    let res = engine(&world)
        .check_existence(&AuditRequest::new(DRUID, 1, Some(10), FIXTURE_ROOT))
        .await;

    assert_eq!(res.codes(), vec![ResultCode::PersistenceFailed]);
    assert_eq!(persistence_category(&res.results()[0].detail), "database");
    assert!(world.store.object(world.moab.druid()).is_none());
}
