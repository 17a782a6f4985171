use crate::errors::StoreError;
use bson::{Bson, Document as BsonDocument};

use super::types::{CmpOp, Filter, MAX_IN_SET};

/// Parses a filter document into a `Filter`.
///
/// Top-level keys are field paths matched by equality, unless the value is an
/// operator document (`{"$gt": 3}`). `$and`, `$or` and `$nor` take arrays of
/// sub-filters. An empty document matches everything.
///
/// # Errors
/// Returns `StoreError::InvalidFilter` for unknown operators or malformed operands.
pub fn parse_filter(doc: &BsonDocument) -> Result<Filter, StoreError> {
    let mut clauses = doc
        .iter()
        .map(|(key, value)| parse_clause(key, value))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(match clauses.len() {
        0 => Filter::True,
        1 => clauses.remove(0),
        _ => Filter::And(clauses),
    })
}

fn parse_clause(key: &str, value: &Bson) -> Result<Filter, StoreError> {
    match key {
        "$and" => Ok(Filter::And(parse_branches(key, value)?)),
        "$or" => Ok(Filter::Or(parse_branches(key, value)?)),
        "$nor" => Ok(Filter::Nor(parse_branches(key, value)?)),
        k if k.starts_with('$') => Err(invalid(format!("unknown top-level operator {k}"))),
        "" => Err(invalid("empty field name".into())),
        path => match value {
            Bson::Document(ops) if is_operator_doc(ops) => parse_operators(path, ops),
            v => Ok(Filter::Cmp { path: path.to_string(), op: CmpOp::Eq, value: v.clone() }),
        },
    }
}

fn parse_branches(op: &str, value: &Bson) -> Result<Vec<Filter>, StoreError> {
    let Bson::Array(items) = value else {
        return Err(invalid(format!("{op} requires an array")));
    };
    if items.is_empty() {
        return Err(invalid(format!("{op} requires a non-empty array")));
    }
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => parse_filter(d),
            _ => Err(invalid(format!("{op} entries must be documents"))),
        })
        .collect()
}

fn is_operator_doc(doc: &BsonDocument) -> bool {
    doc.keys().next().is_some_and(|k| k.starts_with('$'))
}

fn parse_operators(path: &str, ops: &BsonDocument) -> Result<Filter, StoreError> {
    let mut out = Vec::with_capacity(ops.len());
    for (op, arg) in ops {
        let cmp = |kind| Filter::Cmp { path: path.to_string(), op: kind, value: arg.clone() };
        let f = match op.as_str() {
            "$eq" => cmp(CmpOp::Eq),
            "$ne" => cmp(CmpOp::Ne),
            "$gt" => cmp(CmpOp::Gt),
            "$gte" => cmp(CmpOp::Gte),
            "$lt" => cmp(CmpOp::Lt),
            "$lte" => cmp(CmpOp::Lte),
            "$in" => Filter::In { path: path.to_string(), values: set_operand(op, arg)? },
            "$nin" => Filter::Nin { path: path.to_string(), values: set_operand(op, arg)? },
            "$exists" => Filter::Exists { path: path.to_string(), exists: truthy(arg) },
            "$not" => match arg {
                Bson::Document(inner) if is_operator_doc(inner) => {
                    Filter::Not(Box::new(parse_operators(path, inner)?))
                }
                _ => return Err(invalid("$not requires an operator document".into())),
            },
            other => return Err(invalid(format!("unknown operator {other}"))),
        };
        out.push(f);
    }
    Ok(if out.len() == 1 { out.remove(0) } else { Filter::And(out) })
}

fn set_operand(op: &str, arg: &Bson) -> Result<Vec<Bson>, StoreError> {
    match arg {
        Bson::Array(values) if values.len() <= MAX_IN_SET => Ok(values.clone()),
        Bson::Array(values) => Err(invalid(format!(
            "{op} accepts at most {MAX_IN_SET} values, got {}",
            values.len()
        ))),
        _ => Err(invalid(format!("{op} requires an array"))),
    }
}

fn truthy(v: &Bson) -> bool {
    match v {
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(f) => *f != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

fn invalid(msg: String) -> StoreError {
    StoreError::InvalidFilter(msg)
}
