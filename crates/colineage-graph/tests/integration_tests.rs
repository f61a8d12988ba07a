//! Integration tests: SQL in, impact and payload out

use colineage_core::TableId;
use colineage_graph::{export, export_scoped, LineageIndex, LineagePayload, TableRole};
use colineage_sql::LineageBatch;
use tempfile::TempDir;

fn warehouse() -> LineageBatch {
    let mut batch = LineageBatch::default();
    batch.add_sql(
        "SELECT o.id, o.customer_id, o.amount FROM raw.orders o",
        Some("stg_orders"),
    );
    batch.add_sql(
        "SELECT c.id, c.region FROM raw.customers c",
        Some("stg_customers"),
    );
    batch.add_sql(
        "WITH joined AS ( \
           SELECT c.region, o.amount FROM stg_orders o \
           JOIN stg_customers c ON o.customer_id = c.id \
         ) \
         SELECT j.region, SUM(j.amount) AS revenue FROM joined j GROUP BY j.region",
        Some("revenue_by_region"),
    );
    batch.add_sql("SELECT e.kind FROM raw.events e", Some("stg_events"));
    batch
}

#[test]
fn impact_of_a_staging_model() {
    let batch = warehouse();
    let index = LineageIndex::new(batch.graph());
    let impact = index.impact_of("stg_orders");

    let upstream: Vec<&str> = impact.upstream_tables().map(TableId::as_str).collect();
    assert!(upstream.contains(&"raw.orders"));

    let downstream: Vec<&str> = impact.downstream_tables().map(TableId::as_str).collect();
    assert!(downstream.contains(&"joined"));
    assert!(downstream.contains(&"revenue_by_region"));

    assert_eq!(
        impact.role(&TableId::normalize("stg_events")),
        TableRole::Unrelated
    );
    assert_eq!(
        impact.role(&TableId::normalize("raw.events")),
        TableRole::Unrelated
    );
}

#[test]
fn join_pulls_in_the_partner_table() {
    let batch = warehouse();
    let index = LineageIndex::new(batch.graph());
    let impact = index.impact_of("stg_orders");

    // stg_orders.customer_id is joined to stg_customers.id
    assert_ne!(
        impact.role(&TableId::normalize("stg_customers")),
        TableRole::Unrelated
    );
}

#[test]
fn unknown_table_has_no_impact() {
    let batch = warehouse();
    let impact = LineageIndex::new(batch.graph()).impact_of("nope");
    assert!(impact.is_empty());
}

#[test]
fn payload_written_and_read_back() {
    let batch = warehouse();
    let payload = export(batch.graph());

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out/lineage.json");
    payload.save_to_file(&path).unwrap();

    let json = std::fs::read_to_string(&path).unwrap();
    let read: LineagePayload = serde_json::from_str(&json).unwrap();

    assert_eq!(read, payload);
    assert_eq!(
        read.defined_tables,
        vec!["revenue_by_region", "stg_customers", "stg_events", "stg_orders"]
    );
}

#[test]
fn scoped_payload_is_a_subset() {
    let batch = warehouse();
    let graph = batch.graph();
    let impact = LineageIndex::new(graph).impact_of("revenue_by_region");

    let full = export(graph);
    let scoped = export_scoped(graph, &impact);

    assert!(scoped.elements.len() < full.elements.len());
    assert!(scoped.nodes().all(|node| full.elements.iter().any(|e| e.data == node.data)));
    assert!(scoped.nodes().all(|node| !node.data.id().starts_with("stg_events")));
}
