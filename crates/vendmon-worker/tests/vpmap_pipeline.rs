mod support;

use std::sync::Arc;
use support::{
    consume_until_drained, count_rows, test_database, LogCapture, MemoryBroker, StubVendor, VPMAP,
};
use vendmon_core::Strategy;
use vendmon_db::{vendor_maps, vendors, Database, VendorMapping};
use vendmon_vendor::{PartSearch, VendorError, VendorHandle, VendorRegistry};
use vendmon_worker::{LoopError, MappingPipeline, PipelineError};

fn v1() -> StubVendor {
    StubVendor::new("V1")
        .with_search(
            "IDEN001",
            PartSearch::found(vec!["V1-PN-01".to_string(), "V1-PN-02".to_string()]),
        )
        .with_search("IDEN002", PartSearch::absent(Strategy::NoDevice))
        .with_search(
            "IDEN004",
            PartSearch::absent(Strategy::Other("PARSE_FAIL".to_string())),
        )
}

fn pipeline_for(vendor: &Arc<StubVendor>, db: &Database) -> MappingPipeline {
    let handle: VendorHandle = vendor.clone();
    let registry = VendorRegistry::new();
    registry.register(handle);
    MappingPipeline::new(registry, db.clone())
}

async fn stored(db: &Database, vendor: &str, ident: &str) -> VendorMapping {
    let record = vendors::find_vendor(db.pool(), vendor)
        .await
        .expect("find vendor")
        .expect("vendor record exists");
    vendor_maps::get_mapping(db.pool(), record.id, ident)
        .await
        .expect("read mapping")
        .expect("mapping exists")
}

#[tokio::test]
async fn test_found_part_numbers_are_persisted_in_order() {
    let db = test_database().await;
    let vendor = Arc::new(v1());
    let pipeline = pipeline_for(&vendor, &db);
    let broker = MemoryBroker::new();
    let tag = broker.publish(VPMAP, r#"{"ident":"IDEN001","vendor":"V1"}"#);

    let (result, stats) = consume_until_drained(&broker, VPMAP, &pipeline).await;

    result.expect("consume vpmap");
    assert_eq!(broker.acked(VPMAP), vec![tag]);
    assert_eq!(stats.processed, 1);

    let mapping = stored(&db, "V1", "IDEN001").await;
    assert_eq!(mapping.strategy, None);
    assert_eq!(mapping.vpnos, vec!["V1-PN-01", "V1-PN-02"]);
}

#[tokio::test]
async fn test_expected_absence_is_persisted_without_diagnostic() {
    let logs = LogCapture::default();
    let _guard = logs.install();

    let db = test_database().await;
    let vendor = Arc::new(v1());
    let pipeline = pipeline_for(&vendor, &db);
    let broker = MemoryBroker::new();
    let tag = broker.publish(VPMAP, r#"{"ident":"IDEN002","vendor":"V1"}"#);

    let (result, _) = consume_until_drained(&broker, VPMAP, &pipeline).await;

    result.expect("consume vpmap");
    assert_eq!(broker.acked(VPMAP), vec![tag]);

    let mapping = stored(&db, "V1", "IDEN002").await;
    assert_eq!(mapping.strategy, Some(Strategy::NoDevice));
    assert!(mapping.vpnos.is_empty());

    assert!(
        !logs.contents().contains("Not Found"),
        "NODEVICE is not a lookup failure"
    );
    assert!(logs.contents().contains("VMAP"));
}

#[tokio::test]
async fn test_opaque_strategy_logs_not_found() {
    let logs = LogCapture::default();
    let _guard = logs.install();

    let db = test_database().await;
    let vendor = Arc::new(v1());
    let pipeline = pipeline_for(&vendor, &db);
    let broker = MemoryBroker::new();
    broker.publish(VPMAP, r#"{"ident":"IDEN004","vendor":"V1"}"#);

    let (result, _) = consume_until_drained(&broker, VPMAP, &pipeline).await;

    result.expect("consume vpmap");
    let diagnostics: Vec<String> = logs
        .contents()
        .lines()
        .filter(|line| line.contains("Not Found"))
        .map(ToString::to_string)
        .collect();
    assert_eq!(diagnostics.len(), 1, "one diagnostic: {diagnostics:?}");
    assert!(diagnostics[0].contains("IDEN004"));
    assert!(diagnostics[0].contains("PARSE_FAIL"));

    let mapping = stored(&db, "V1", "IDEN004").await;
    assert_eq!(mapping.strategy, Some(Strategy::Other("PARSE_FAIL".to_string())));
    assert!(mapping.vpnos.is_empty());
}

#[tokio::test]
async fn test_unknown_vendor_is_not_acknowledged_and_writes_nothing() {
    let db = test_database().await;
    let vendor = Arc::new(v1());
    let pipeline = pipeline_for(&vendor, &db);
    let broker = MemoryBroker::new();
    broker.publish(VPMAP, r#"{"ident":"IDEN003","vendor":"UNKNOWN_VENDOR"}"#);

    let (result, _) = consume_until_drained(&broker, VPMAP, &pipeline).await;

    assert!(matches!(
        result,
        Err(LoopError::Pipeline {
            source: PipelineError::Vendor(VendorError::UnknownVendor { .. }),
            ..
        })
    ));
    assert!(broker.acked(VPMAP).is_empty());
    assert_eq!(broker.ready(VPMAP), 1);
    assert!(vendor.search_calls().is_empty());

    for table in [
        "vendors",
        "vendor_strategies",
        "vendor_part_maps",
        "vendor_part_numbers",
    ] {
        assert_eq!(count_rows(&db, table).await, 0, "{table} untouched");
    }
}

#[tokio::test]
async fn test_redelivery_converges_on_same_state() {
    let db = test_database().await;
    let vendor = Arc::new(v1());
    let pipeline = pipeline_for(&vendor, &db);
    let broker = MemoryBroker::new();

    broker.publish(VPMAP, r#"{"ident":"IDEN001","vendor":"V1"}"#);
    let (first, _) = consume_until_drained(&broker, VPMAP, &pipeline).await;
    first.expect("first run");
    let once = stored(&db, "V1", "IDEN001").await;
    let rows_once = count_rows(&db, "vendor_part_numbers").await;

    broker.publish(VPMAP, r#"{"ident":"IDEN001","vendor":"V1"}"#);
    let (second, _) = consume_until_drained(&broker, VPMAP, &pipeline).await;
    second.expect("second run");

    assert_eq!(stored(&db, "V1", "IDEN001").await, once);
    assert_eq!(count_rows(&db, "vendor_part_numbers").await, rows_once);
    assert_eq!(count_rows(&db, "vendors").await, 1);
    assert_eq!(broker.acked(VPMAP).len(), 2);
}

#[tokio::test]
async fn test_new_run_replaces_previous_mapping() {
    let db = test_database().await;
    let broker = MemoryBroker::new();

    let before = Arc::new(v1());
    broker.publish(VPMAP, r#"{"ident":"IDEN001","vendor":"V1"}"#);
    let (result, _) = consume_until_drained(&broker, VPMAP, &pipeline_for(&before, &db)).await;
    result.expect("first run");

    let after = Arc::new(StubVendor::new("V1").with_search("IDEN001", PartSearch::absent(Strategy::NoValue)));
    broker.publish(VPMAP, r#"{"ident":"IDEN001","vendor":"V1"}"#);
    let (result, _) = consume_until_drained(&broker, VPMAP, &pipeline_for(&after, &db)).await;
    result.expect("second run");

    let mapping = stored(&db, "V1", "IDEN001").await;
    assert_eq!(mapping.strategy, Some(Strategy::NoValue));
    assert!(mapping.vpnos.is_empty());
}

#[tokio::test]
async fn test_canonical_name_keys_the_vendor_record() {
    let db = test_database().await;
    let vendor = Arc::new(v1().with_canonical_name("Vendor One Ltd"));
    let pipeline = pipeline_for(&vendor, &db);
    let broker = MemoryBroker::new();
    broker.publish(VPMAP, r#"{"ident":"IDEN001","vendor":"V1"}"#);

    let (result, _) = consume_until_drained(&broker, VPMAP, &pipeline).await;

    result.expect("consume vpmap");
    let mapping = stored(&db, "Vendor One Ltd", "IDEN001").await;
    assert_eq!(mapping.vpnos, vec!["V1-PN-01", "V1-PN-02"]);
    assert_eq!(
        vendors::find_vendor(db.pool(), "V1").await.expect("find vendor"),
        None
    );
}

#[tokio::test]
async fn test_persistence_failure_is_not_acknowledged() {
    let db = test_database().await;
    let vendor = Arc::new(v1());
    let pipeline = pipeline_for(&vendor, &db);
    db.clone().close().await;

    let broker = MemoryBroker::new();
    broker.publish(VPMAP, r#"{"ident":"IDEN001","vendor":"V1"}"#);

    let (result, _) = consume_until_drained(&broker, VPMAP, &pipeline).await;

    assert!(matches!(
        result,
        Err(LoopError::Pipeline {
            source: PipelineError::Persistence(_),
            ..
        })
    ));
    assert!(broker.acked(VPMAP).is_empty());
    assert_eq!(broker.ready(VPMAP), 1);
}
