use std::sync::Arc;

use anyhow::Result;
use graphlink_common::types::{InternalId, LogicalType, NodeSnapshot, TypeTag, Value};
use graphlink_common::{Error, ErrorKind};
use graphlink_core::{Bridge, BridgeConfig, CursorState, QuerySummary, ValueExt};
use graphlink_native::{MemoryEngine, ResultSet};

fn setup() -> (Arc<MemoryEngine>, Bridge) {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
    let engine = Arc::new(MemoryEngine::new());
    let bridge = Bridge::new(engine.clone()).expect("bridge");
    (engine, bridge)
}

fn movies() -> ResultSet {
    ResultSet::new()
        .column("title", TypeTag::String)
        .column("year", TypeTag::Int64)
        .column("rating", TypeTag::Double)
        .row(vec![Value::from("Alien"), Value::Int64(1979), Value::Double(8.5)])
        .row(vec![Value::from("Heat"), Value::Int64(1995), Value::Null])
        .row(vec![Value::from("Up"), Value::Int64(2009), Value::Double(8.3)])
        .with_summary(0.25, 1.75)
}

#[test]
fn three_rows_then_exhausted() -> Result<()> {
    let (engine, bridge) = setup();
    let mut cursor = bridge.open_cursor(engine.open_result(movies()))?;
    assert_eq!(cursor.num_tuples()?, 3);

    let mut titles = Vec::new();
    for _ in 0..3 {
        assert!(cursor.has_next()?);
        let row = cursor.next()?;
        titles.push(row.get_by_name("title")?.to_value()?);
    }
    assert_eq!(
        titles,
        vec![Value::from("Alien"), Value::from("Heat"), Value::from("Up")]
    );

    assert!(!cursor.has_next()?);
    assert_eq!(cursor.state(), CursorState::Exhausted);
    let err = cursor.next().unwrap_err();
    assert_eq!(err, Error::Exhausted);
    assert_eq!(err.kind(), ErrorKind::Exhausted);
    assert!(cursor.try_next()?.is_none());
    Ok(())
}

#[test]
fn reset_replays_the_same_rows() -> Result<()> {
    let (engine, bridge) = setup();
    let mut cursor = bridge.open_cursor(engine.open_result(movies()))?;

    let first: Vec<Vec<Value>> = cursor.owned_rows().collect::<Result<_, _>>()?;
    cursor.reset()?;
    assert_eq!(cursor.state(), CursorState::Created);
    let second: Vec<Vec<Value>> = cursor.owned_rows().collect::<Result<_, _>>()?;

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    assert_eq!(first[1][2], Value::Null);
    Ok(())
}

#[test]
fn reset_after_partial_consumption() -> Result<()> {
    let (engine, bridge) = setup();
    let mut cursor = bridge.open_cursor(engine.open_result(movies()))?;

    cursor.next()?;
    let second = cursor.next()?;
    assert_eq!(second.get(0)?.to_value()?, Value::from("Heat"));
    drop(second);
    assert_eq!(cursor.state(), CursorState::Advanced);

    cursor.reset()?;
    assert_eq!(cursor.state(), CursorState::Created);
    let rows: Vec<Vec<Value>> = cursor.owned_rows().collect::<Result<_, _>>()?;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][0], Value::from("Alien"));
    assert_eq!(rows[2][0], Value::from("Up"));
    assert_eq!(cursor.state(), CursorState::Exhausted);

    drop(cursor);
    bridge.flush_releases();
    let stats = engine.stats();
    assert_eq!(stats.tuple_destroys, 5);
    assert_eq!(engine.live_objects(), 0);
    Ok(())
}

#[test]
fn null_cell_keeps_column_type() -> Result<()> {
    let (engine, bridge) = setup();
    let mut cursor = bridge.open_cursor(engine.open_result(movies()))?;
    cursor.next()?;
    let row = cursor.next()?;
    let rating = row.get(2)?;
    assert!(rating.is_null()?);
    assert_eq!(rating.data_type()?, LogicalType::scalar(TypeTag::Double));
    Ok(())
}

#[test]
fn column_lookup_is_case_insensitive() -> Result<()> {
    let (engine, bridge) = setup();
    let result = ResultSet::new()
        .column("Name", TypeTag::String)
        .column("NAME", TypeTag::Int64)
        .row(vec![Value::from("first"), Value::Int64(2)]);
    let mut cursor = bridge.open_cursor(engine.open_result(result))?;

    // duplicates resolve to the first column
    assert_eq!(cursor.column_index("name")?, 0);
    assert_eq!(cursor.column_names()?, ["Name", "NAME"]);
    let row = cursor.next()?;
    assert_eq!(row.get_by_name("nAmE")?.to_value()?, Value::from("first"));
    assert_eq!(row.get(1)?.to_value()?, Value::Int64(2));
    Ok(())
}

#[test]
fn failed_query_surfaces_engine_message() {
    let (engine, bridge) = setup();
    let err = bridge
        .open_cursor(engine.open_result(ResultSet::failed("Parser exception: invalid input")))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Native);
    assert!(err.to_string().contains("Parser exception: invalid input"));

    bridge.flush_releases();
    assert_eq!(engine.stats().result_destroys, 1);
    assert_eq!(engine.live_objects(), 0);
}

#[test]
fn summary_and_column_types() -> Result<()> {
    let (engine, bridge) = setup();
    let result = movies().column("tags", LogicalType::list(TypeTag::String.into()));
    let cursor = bridge.open_cursor(engine.open_result(result))?;

    assert_eq!(
        cursor.summary()?,
        QuerySummary {
            compiling_ms: 0.25,
            execution_ms: 1.75,
        }
    );
    assert_eq!(cursor.column_count()?, 4);
    assert_eq!(cursor.column_data_type(0)?, LogicalType::scalar(TypeTag::String));
    assert_eq!(cursor.column_data_type(3)?.to_string(), "LIST<STRING>");
    assert_eq!(cursor.column_data_type(4).unwrap_err().kind(), ErrorKind::Range);
    Ok(())
}

#[test]
fn node_cells_read_lazily() -> Result<()> {
    let (engine, bridge) = setup();
    let alice = NodeSnapshot {
        id: InternalId::new(0, 1),
        label: "Person".into(),
        properties: vec![("name".into(), Value::from("Alice"))],
    };
    let result = ResultSet::new()
        .column("p", TypeTag::Node)
        .row(vec![Value::Node(alice.clone())]);
    let mut cursor = bridge.open_cursor(engine.open_result(result))?;
    let row = cursor.next()?;
    let cell = row.get(0)?;
    let node = cell.as_node().expect("node");

    assert_eq!(node.id()?, InternalId::new(0, 1));
    assert_eq!(node.label()?, "Person");
    assert_eq!(node.snapshot()?, alice);
    Ok(())
}

#[test]
fn everything_is_released_after_flush() -> Result<()> {
    let (engine, bridge) = setup();
    for _ in 0..10 {
        let mut cursor = bridge.open_cursor(engine.open_result(movies()))?;
        while let Some(row) = cursor.try_next()? {
            let _ = row.to_values()?;
            let _ = row.to_native_string()?;
        }
        let _ = cursor.to_native_string()?;
        let _ = cursor.column_data_type(1)?;
    }
    bridge.flush_releases();

    let stats = engine.stats();
    assert_eq!(engine.live_objects(), 0);
    assert_eq!(stats.result_destroys, 10);
    assert_eq!(stats.tuple_destroys, 30);
    assert_eq!(stats.invalid_frees, 0);
    assert_eq!(stats.borrowed_destroys, 0);
    assert_eq!(stats.dangling_accesses, 0);
    Ok(())
}

#[test]
fn blocking_release_mode() -> Result<()> {
    let engine = Arc::new(MemoryEngine::new());
    let bridge = Bridge::with_config(
        engine.clone(),
        BridgeConfig::default().with_wait_for_release(true),
    )?;
    {
        let mut cursor = bridge.open_cursor(engine.open_result(movies()))?;
        cursor.next()?;
    }
    // no flush: each release already waited for its destroy
    assert_eq!(engine.live_objects(), 0);
    Ok(())
}
