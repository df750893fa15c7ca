//! The engine's text format for values, rows and tables.

use std::fmt::{Display, Write};

use graphlink_common::types::{LogicalType, Value};

/// Renders a value in the engine's text format.
pub(super) fn render(value: &Value) -> String {
    let mut out = String::new();
    render_into(value, &mut out);
    out
}

fn render_into(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push_str(if *b { "True" } else { "False" }),
        Value::Int8(v) => push(out, v),
        Value::Int16(v) => push(out, v),
        Value::Int32(v) => push(out, v),
        Value::Int64(v) => push(out, v),
        Value::UInt8(v) => push(out, v),
        Value::UInt16(v) => push(out, v),
        Value::UInt32(v) => push(out, v),
        Value::UInt64(v) => push(out, v),
        Value::Int128(v) => push(out, v),
        Value::Float(v) => push(out, v),
        Value::Double(v) => push(out, v),
        Value::Date(v) => push(out, v),
        Value::Timestamp(v) => push(out, v),
        Value::Interval(v) => push(out, v),
        Value::InternalId(v) => push(out, v),
        Value::String(s) => out.push_str(s),
        Value::Blob(bytes) => {
            for byte in bytes {
                let _ = write!(out, "\\x{byte:02X}");
            }
        }
        Value::Uuid(v) => push(out, v),
        Value::List(items) | Value::Array(items) => render_seq(items, out),
        Value::Struct(fields) => {
            out.push('{');
            render_named(fields, out);
            out.push('}');
        }
        Value::Map(entries) => {
            out.push('{');
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_into(k, out);
                out.push('=');
                render_into(v, out);
            }
            out.push('}');
        }
        Value::Node(node) => {
            let _ = write!(out, "{{_ID: {}, _LABEL: {}", node.id, node.label);
            if !node.properties.is_empty() {
                out.push_str(", ");
                render_named(&node.properties, out);
            }
            out.push('}');
        }
        Value::Rel(rel) => {
            let _ = write!(out, "({})-{{_LABEL: {}, _ID: {}", rel.src, rel.label, rel.id);
            if !rel.properties.is_empty() {
                out.push_str(", ");
                render_named(&rel.properties, out);
            }
            let _ = write!(out, "}}->({})", rel.dst);
        }
        Value::RecursiveRel { nodes, rels } => {
            out.push_str("{_NODES: ");
            render_seq(nodes, out);
            out.push_str(", _RELS: ");
            render_seq(rels, out);
            out.push('}');
        }
    }
}

fn push(out: &mut String, value: impl Display) {
    let _ = write!(out, "{value}");
}

fn render_seq(items: &[Value], out: &mut String) {
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        render_into(item, out);
    }
    out.push(']');
}

fn render_named(fields: &[(String, Value)], out: &mut String) {
    for (i, (name, value)) in fields.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(name);
        out.push_str(": ");
        render_into(value, out);
    }
}

/// Renders one row as `|`-separated cells.
pub(super) fn render_row<'v>(cells: impl IntoIterator<Item = &'v Value>) -> String {
    cells.into_iter().map(render).collect::<Vec<_>>().join("|")
}

/// Renders a header line of column names followed by one line per row.
pub(super) fn render_table(columns: &[(String, LogicalType)], rows: &[Vec<Value>]) -> String {
    let mut text = columns
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join("|");
    text.push('\n');
    for row in rows {
        text.push_str(&render_row(row));
        text.push('\n');
    }
    text
}
