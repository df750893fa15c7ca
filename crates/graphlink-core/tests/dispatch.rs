use std::sync::Arc;

use graphlink_common::types::{
    Date, InternalId, Interval, LogicalType, NodeSnapshot, RelSnapshot, Timestamp, TimestampUnit,
    TypeTag, Value,
};
use graphlink_common::{Error, ErrorKind};
use graphlink_core::{Bridge, NativeValue, Ownership, ValueExt};
use graphlink_native::{MemoryEngine, NativeApi};

fn setup() -> (Arc<MemoryEngine>, Bridge) {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
    let engine = Arc::new(MemoryEngine::new());
    let bridge = Bridge::new(engine.clone()).expect("bridge");
    (engine, bridge)
}

fn person(offset: u64, name: &str) -> NodeSnapshot {
    NodeSnapshot {
        id: InternalId::new(0, offset),
        label: "Person".into(),
        properties: vec![("name".into(), Value::from(name))],
    }
}

fn knows(src: u64, dst: u64) -> RelSnapshot {
    RelSnapshot {
        id: InternalId::new(1, src * 10 + dst),
        src: InternalId::new(0, src),
        dst: InternalId::new(0, dst),
        label: "KNOWS".into(),
        properties: vec![("since".into(), Value::Int64(2020))],
    }
}

/// One representative value per modelled tag, except `Any`.
fn samples() -> Vec<Value> {
    vec![
        Value::Node(person(0, "Alice")),
        Value::Rel(knows(0, 1)),
        Value::RecursiveRel {
            nodes: vec![Value::Node(person(0, "Alice")), Value::Node(person(1, "Bob"))],
            rels: vec![Value::Rel(knows(0, 1))],
        },
        Value::Bool(true),
        Value::Int64(-64),
        Value::Int32(-32),
        Value::Int16(-16),
        Value::Int8(-8),
        Value::UInt64(u64::MAX),
        Value::UInt32(32),
        Value::UInt16(16),
        Value::UInt8(8),
        Value::Int128(i128::MIN),
        Value::Double(0.1),
        Value::Float(0.5),
        Value::Date(Date::from_days(-1)),
        Value::Timestamp(Timestamp::new(1_700_000_000_000_000, TimestampUnit::Micros)),
        Value::Timestamp(Timestamp::new(1_700_000_000, TimestampUnit::Seconds)),
        Value::Timestamp(Timestamp::new(1_700_000_000_000, TimestampUnit::Millis)),
        Value::Timestamp(Timestamp::new(1_700_000_000_000_000_000, TimestampUnit::Nanos)),
        Value::Timestamp(Timestamp::new(1_700_000_000_000_000, TimestampUnit::MicrosTz)),
        Value::Interval(Interval::new(1, 2, 3_000_000)),
        Value::InternalId(InternalId::new(4, 5)),
        Value::from("grüße"),
        Value::Blob(vec![0xDE, 0xAD, 0xBE, 0xEF]),
        Value::List(vec![Value::Int64(1), Value::Int64(2)]),
        Value::Array(vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)]),
        Value::Struct(vec![("a".into(), Value::Int32(1)), ("b".into(), Value::from("x"))]),
        Value::Map(vec![(Value::from("k"), Value::Int64(1))]),
        Value::Uuid(uuid::Uuid::from_u128(0x1234)),
    ]
}

#[test]
fn every_modelled_tag_dispatches_to_its_variant() {
    let (engine, bridge) = setup();
    let values = samples();
    assert_eq!(values.len(), TypeTag::ALL.len() - 1);

    for value in &values {
        let native = bridge.adopt_value(engine.load_value(value)).unwrap();
        assert_eq!(native.tag(), value.tag(), "{value:?}");
        assert!(!native.is_null().unwrap());
        assert_eq!(&native.to_value().unwrap(), value);
    }

    bridge.flush_releases();
    let stats = engine.stats();
    assert_eq!(engine.live_objects(), 0);
    assert_eq!(stats.invalid_frees, 0);
    assert_eq!(stats.borrowed_destroys, 0);
}

#[test]
fn null_dispatches_with_declared_type() {
    let (engine, bridge) = setup();
    let raw = engine.load_typed_value(&Value::Null, &LogicalType::scalar(TypeTag::Int64));
    let native = bridge.adopt_value(raw).unwrap();

    let NativeValue::Null(null) = &native else {
        panic!("expected a null, got {native:?}");
    };
    assert_eq!(null.declared_type(), &LogicalType::scalar(TypeTag::Int64));
    assert!(native.is_null().unwrap());
    assert_eq!(native.to_value().unwrap(), Value::Null);
}

#[test]
fn unknown_type_id_falls_back_to_any() {
    let (engine, bridge) = setup();
    let decimal = LogicalType::from_native_id(41);

    // null first: the null check wins over the unknown id
    let raw = engine.load_typed_value(&Value::Null, &decimal);
    assert!(bridge.adopt_value(raw).unwrap().is_null_variant());

    let raw = engine.load_typed_value(&Value::Null, &decimal);
    engine.value_set_null(raw, false);
    let native = bridge.adopt_value(raw).unwrap();
    let NativeValue::Any(any) = &native else {
        panic!("expected Any, got {native:?}");
    };
    assert_eq!(any.logical_type().native_id(), 41);
    assert_eq!(native.data_type().unwrap(), decimal);
    assert_eq!(native.to_value().unwrap_err().kind(), ErrorKind::Native);
}

#[test]
fn timestamp_units_keep_their_variant() {
    let (engine, bridge) = setup();
    let units = [
        (TimestampUnit::Seconds, TypeTag::TimestampSec),
        (TimestampUnit::Millis, TypeTag::TimestampMs),
        (TimestampUnit::Micros, TypeTag::Timestamp),
        (TimestampUnit::Nanos, TypeTag::TimestampNs),
        (TimestampUnit::MicrosTz, TypeTag::TimestampTz),
    ];
    for (unit, tag) in units {
        let native = bridge
            .adopt_value(engine.load_value(&Value::Timestamp(Timestamp::new(5, unit))))
            .unwrap();
        assert_eq!(native.tag(), tag);
        let ts = match &native {
            NativeValue::Timestamp(ts)
            | NativeValue::TimestampSec(ts)
            | NativeValue::TimestampMs(ts)
            | NativeValue::TimestampNs(ts)
            | NativeValue::TimestampTz(ts) => ts,
            other => panic!("expected a timestamp, got {other:?}"),
        };
        assert_eq!(ts.unit(), unit);
        assert_eq!(ts.value().unwrap().value(), 5);
    }
}

#[test]
fn graph_values_expose_identity_and_properties() {
    let (engine, bridge) = setup();
    let native = bridge
        .adopt_value(engine.load_value(&Value::Rel(knows(2, 3))))
        .unwrap();
    let rel = native.as_rel().expect("rel");

    assert_eq!(rel.label().unwrap(), "KNOWS");
    assert_eq!(rel.src_id().unwrap(), InternalId::new(0, 2));
    assert_eq!(rel.dst_id().unwrap(), InternalId::new(0, 3));
    assert_eq!(rel.property_names().unwrap(), vec!["since".to_string()]);
    let since = rel.property("SINCE").unwrap().expect("property");
    assert_eq!(since.to_value().unwrap(), Value::Int64(2020));
    assert!(rel.property("missing").unwrap().is_none());
    assert_eq!(rel.snapshot().unwrap(), knows(2, 3));
}

#[test]
fn empty_path_is_a_domain_error() {
    let (engine, bridge) = setup();
    let native = bridge
        .adopt_value(engine.load_value(&Value::RecursiveRel {
            nodes: vec![],
            rels: vec![],
        }))
        .unwrap();
    let NativeValue::RecursiveRel(path) = &native else {
        panic!("expected a path");
    };
    assert!(matches!(path.nodes(), Err(Error::Domain(_))));
    assert!(matches!(native.to_value(), Err(Error::Domain(_))));
}

#[test]
fn children_borrow_and_clones_own() {
    let (engine, bridge) = setup();
    let native = bridge
        .adopt_value(engine.load_value(&Value::List(vec![Value::from("a"), Value::from("b")])))
        .unwrap();
    assert_eq!(native.handle().ownership(), Some(Ownership::Owned));

    let list = native.as_list().unwrap();
    let element = list.element_at(0).unwrap();
    assert_eq!(element.handle().ownership(), Some(Ownership::Borrowed));

    let cloned = element.clone_owned().unwrap();
    assert_eq!(cloned.handle().ownership(), Some(Ownership::Owned));
    drop(element);
    drop(native);

    // the clone outlives its source
    assert_eq!(cloned.to_value().unwrap(), Value::from("a"));
    drop(cloned);

    bridge.flush_releases();
    let stats = engine.stats();
    assert_eq!(stats.value_destroys, 2);
    assert_eq!(stats.borrowed_destroys, 0);
    assert_eq!(engine.live_objects(), 0);
}

#[test]
fn copy_from_and_set_null() {
    let (engine, bridge) = setup();
    let target = bridge.create_value(&Value::Int64(1)).unwrap();
    let source = bridge.create_value(&Value::Int64(99)).unwrap();

    let target = target.copy_from(&source).unwrap();
    assert_eq!(target.to_value().unwrap(), Value::Int64(99));
    assert_eq!(target.to_native_string().unwrap(), "99");

    let target = target.set_null(true).unwrap();
    assert!(target.is_null_variant());
    assert!(target.is_null().unwrap());
    assert_eq!(target.to_value().unwrap(), Value::Null);
    assert_eq!(target.to_native_string().unwrap(), "");

    let target = target.set_null(false).unwrap();
    assert_eq!(target.tag(), TypeTag::Int64);
    assert_eq!(target.to_value().unwrap(), Value::Int64(99));

    drop((target, source));
    bridge.flush_releases();
    assert_eq!(engine.live_objects(), 0);
}

#[test]
fn date_target_reflects_copy_and_null() {
    let (engine, bridge) = setup();
    let target = bridge.create_value(&Value::Date(Date::from_days(1))).unwrap();
    let source = bridge.create_value(&Value::Date(Date::from_days(20_000))).unwrap();

    let target = target.copy_from(&source).unwrap();
    let NativeValue::Date(date) = &target else {
        panic!("expected a date, got {target:?}");
    };
    assert_eq!(date.value(), Date::from_days(20_000));
    assert_eq!(target.to_value().unwrap(), Value::Date(Date::from_days(20_000)));

    let target = target.set_null(true).unwrap();
    let NativeValue::Null(null) = &target else {
        panic!("expected a null, got {target:?}");
    };
    assert_eq!(null.declared_type(), &LogicalType::scalar(TypeTag::Date));
    assert_eq!(target.to_value().unwrap(), Value::Null);

    drop((target, source));
    bridge.flush_releases();
    assert_eq!(engine.live_objects(), 0);
}

#[test]
fn copy_from_another_type_redispatches() {
    let (engine, bridge) = setup();
    let target = bridge.create_value(&Value::Int64(1)).unwrap();
    let source = bridge.create_value(&Value::from("text")).unwrap();

    // wrappers convert through the same path as NativeValue
    let NativeValue::Int64(int) = target else {
        panic!("expected an int64");
    };
    let target = int.copy_from(&source).unwrap();
    assert_eq!(target.tag(), TypeTag::String);
    assert_eq!(target.as_string().unwrap().value().unwrap(), "text");
    assert_eq!(target.data_type().unwrap(), LogicalType::scalar(TypeTag::String));

    drop((target, source));
    bridge.flush_releases();
    let stats = engine.stats();
    assert_eq!(stats.value_destroys, 2);
    assert_eq!(engine.live_objects(), 0);
}
