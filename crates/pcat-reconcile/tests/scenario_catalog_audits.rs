use pcat_reconcile::{AuditRequest, ReconcileConfig, Reconciler};
use pcat_results::ResultCode;
use pcat_schemas::MoabStatus;
use pcat_testkit::{World, FIXTURE_ROOT};

const DRUID: &str = "bj102hs9687";

fn engine(world: &World) -> Reconciler {
    Reconciler::new(world.store.clone(), ReconcileConfig::default())
}

async fn catalogued(world: &World, engine: &Reconciler, version: i32) {
    let res = engine
        .check_existence(&AuditRequest::new(DRUID, version, Some(1), FIXTURE_ROOT))
        .await;
    assert!(res.contains(ResultCode::Created), "{:?}", res.codes());
    assert!(world.store.record(world.moab.druid(), world.root.id).is_some());
}

#[tokio::test]
async fn catalog_to_moab_missing_moab_is_not_found_on_storage() {
    let world = World::new(DRUID).with_versions(2);
    let engine = engine(&world);
    catalogued(&world, &engine, 2).await;
    world.moab.remove_object();

    let res = engine.check_catalog_version(DRUID, FIXTURE_ROOT).await;

    assert_eq!(
        res.codes(),
        vec![ResultCode::MoabNotFound, ResultCode::StatusChanged]
    );
    let record = world.store.record(world.moab.druid(), world.root.id).unwrap();
    assert_eq!(record.status, MoabStatus::NotFoundOnStorage);
    assert_eq!(record.version, 2);
}

#[tokio::test]
async fn catalog_to_moab_picks_up_newer_version_on_disk() {
    let mut world = World::new(DRUID).with_versions(2);
    let engine = engine(&world);
    catalogued(&world, &engine, 2).await;
    world.add_version();

    let res = engine.check_catalog_version(DRUID, FIXTURE_ROOT).await;

    assert_eq!(res.actual_version, Some(3));
    assert_eq!(res.codes(), vec![ResultCode::ActualGreaterThanCatalog]);
    let druid = world.moab.druid();
    let record = world.store.record(druid, world.root.id).unwrap();
    assert_eq!(record.version, 3);
    assert!(record.size.is_some_and(|s| s > 0));
    assert_eq!(world.store.object(druid).unwrap().current_version, 3);
}

#[tokio::test]
async fn catalog_to_moab_matching_ok_record_only_reports_match() {
    let world = World::new(DRUID).with_versions(2);
    let engine = engine(&world);
    engine
        .create(&AuditRequest::new(DRUID, 2, Some(1), FIXTURE_ROOT), true)
        .await;

    let res = engine.check_catalog_version(DRUID, FIXTURE_ROOT).await;

    assert_eq!(res.codes(), vec![ResultCode::VersionMatches]);
    let record = world.store.record(world.moab.druid(), world.root.id).unwrap();
    assert_eq!(record.status, MoabStatus::Ok);
}

#[tokio::test]
async fn catalog_to_moab_older_disk_is_less_than_catalog() {
    let world = World::new(DRUID).with_versions(2);
    let druid = world.moab.druid().clone();
    world.store.seed_object(&druid, 3);
    world
        .store
        .seed_record(&druid, world.root.id, 3, MoabStatus::Ok)
        .unwrap();

    let res = engine(&world).check_catalog_version(DRUID, FIXTURE_ROOT).await;

    assert_eq!(
        res.codes(),
        vec![ResultCode::ActualLessThanCatalog, ResultCode::StatusChanged]
    );
    let record = world.store.record(&druid, world.root.id).unwrap();
    assert_eq!(record.version, 3);
    assert_eq!(record.status, MoabStatus::UnexpectedVersionOnStorage);
}

#[tokio::test]
async fn catalog_to_moab_older_disk_overrides_invalid_checksum() {
    let world = World::new(DRUID).with_versions(2);
    let druid = world.moab.druid().clone();
    world.store.seed_object(&druid, 3);
    world
        .store
        .seed_record(&druid, world.root.id, 3, MoabStatus::InvalidChecksum)
        .unwrap();

    let res = engine(&world).check_catalog_version(DRUID, FIXTURE_ROOT).await;

    assert_eq!(
        res.codes(),
        vec![ResultCode::ActualLessThanCatalog, ResultCode::StatusChanged]
    );
    let record = world.store.record(&druid, world.root.id).unwrap();
    assert_eq!(record.status, MoabStatus::UnexpectedVersionOnStorage);
}

#[tokio::test]
async fn catalog_to_moab_unknown_druid_is_does_not_exist() {
    let world = World::new(DRUID).with_versions(1);
    let res = engine(&world).check_catalog_version(DRUID, FIXTURE_ROOT).await;

    assert_eq!(res.codes(), vec![ResultCode::DoesNotExist]);
    assert_eq!(res.results()[0].message, "PreservedObject db object does not exist");
}

#[tokio::test]
async fn catalog_to_moab_unknown_root_is_an_argument_error() {
    let world = World::new(DRUID).with_versions(1);
    let res = engine(&world).check_catalog_version(DRUID, "fixture_sr9").await;
    assert_eq!(res.codes(), vec![ResultCode::InvalidArguments]);
}

#[tokio::test]
async fn checksum_pass_moves_record_to_ok() {
    let world = World::new(DRUID).with_versions(2);
    let engine = engine(&world);
    catalogued(&world, &engine, 2).await;

    let res = engine.validate_checksums(DRUID, FIXTURE_ROOT).await;

    assert!(res.contains(ResultCode::ChecksumValid));
    assert!(res.contains(ResultCode::StatusChanged));
    assert_eq!(res.completed().len(), 1);
    assert!(res.completed()[0].is_status_changed_to_ok());
    let record = world.store.record(world.moab.druid(), world.root.id).unwrap();
    assert_eq!(record.status, MoabStatus::Ok);
    assert!(record.last_checksum_validation.is_some());
}

#[tokio::test]
async fn one_tampered_file_is_one_mismatch() {
    let world = World::new(DRUID).with_versions(2);
    let engine = engine(&world);
    catalogued(&world, &engine, 2).await;
    world
        .moab
        .write_file("v0002/data/content/page2.txt", b"tampered bytes");

    let res = engine.validate_checksums(DRUID, FIXTURE_ROOT).await;

    assert_eq!(res.count(ResultCode::ChecksumMismatch), 1);
    assert!(!res.contains(ResultCode::ChecksumValid));
    let record = world.store.record(world.moab.druid(), world.root.id).unwrap();
    assert_eq!(record.status, MoabStatus::InvalidChecksum);
    assert!(record.last_checksum_validation.is_some());
}

#[tokio::test]
async fn checksum_failure_blocks_later_blind_recovery() {
    let world = World::new(DRUID).with_versions(2);
    let engine = engine(&world);
    catalogued(&world, &engine, 2).await;
    world
        .moab
        .write_file("v0001/data/content/page1.txt", b"tampered bytes");
    engine.validate_checksums(DRUID, FIXTURE_ROOT).await;

    let res = engine
        .check_existence(&AuditRequest::new(DRUID, 2, Some(1), FIXTURE_ROOT))
        .await;

    assert_eq!(
        res.codes(),
        vec![ResultCode::VersionMatches, ResultCode::UnableToCheckStatus]
    );
    let record = world.store.record(world.moab.druid(), world.root.id).unwrap();
    assert_eq!(record.status, MoabStatus::InvalidChecksum);
}

#[tokio::test]
async fn checksum_audit_of_missing_moab_is_not_found_on_storage() {
    let world = World::new(DRUID).with_versions(1);
    let engine = engine(&world);
    catalogued(&world, &engine, 1).await;
    world.moab.remove_object();

    let res = engine.validate_checksums(DRUID, FIXTURE_ROOT).await;

    assert_eq!(
        res.codes(),
        vec![ResultCode::MoabNotFound, ResultCode::StatusChanged]
    );
    let record = world.store.record(world.moab.druid(), world.root.id).unwrap();
    assert_eq!(record.status, MoabStatus::NotFoundOnStorage);
}
