use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use super::types::{CmpOp, Filter, MAX_PATH_DEPTH};

#[must_use]
pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Nor(fs) => !fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::Exists { path, exists } => get_path(doc, path).is_some() == *exists,
        Filter::In { path, values } => in_set(get_path(doc, path), values),
        Filter::Nin { path, values } => !in_set(get_path(doc, path), values),
        Filter::Cmp { path, op, value } => {
            let field = get_path(doc, path);
            match op {
                CmpOp::Eq => equals(field, value),
                CmpOp::Ne => !equals(field, value),
                CmpOp::Gt | CmpOp::Gte | CmpOp::Lt | CmpOp::Lte => {
                    field.is_some_and(|v| any_element(v, |x| ordered(x, value, *op)))
                }
            }
        }
    }
}

// A null query value also matches a missing field.
fn equals(field: Option<&Bson>, value: &Bson) -> bool {
    match field {
        None => matches!(value, Bson::Null),
        Some(v) if matches!(value, Bson::Array(_)) => bson_equal(v, value),
        Some(v) => any_element(v, |x| bson_equal(x, value)),
    }
}

fn in_set(field: Option<&Bson>, values: &[Bson]) -> bool {
    values.iter().any(|x| equals(field, x))
}

fn ordered(v: &Bson, value: &Bson, op: CmpOp) -> bool {
    bson_cmp(v, value).is_some_and(|o| match op {
        CmpOp::Gt => o == Ordering::Greater,
        CmpOp::Gte => o != Ordering::Less,
        CmpOp::Lt => o == Ordering::Less,
        CmpOp::Lte => o != Ordering::Greater,
        CmpOp::Eq | CmpOp::Ne => false,
    })
}

/// Applies `pred` to `v`, or to each element when `v` is an array.
fn any_element(v: &Bson, pred: impl Fn(&Bson) -> bool) -> bool {
    match v {
        Bson::Array(items) => items.iter().any(&pred),
        other => pred(other),
    }
}

fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    let mut iter = path.split('.');
    let first = iter.next()?;
    let mut depth = 1usize;
    let mut cur: Option<&Bson> = doc.get(first);
    for part in iter {
        depth += 1;
        if depth > MAX_PATH_DEPTH {
            return None;
        }
        match cur {
            Some(Bson::Document(d)) => cur = d.get(part),
            _ => return None,
        }
    }
    cur
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(b: &Bson) -> Option<f64> {
    match b {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

#[allow(clippy::float_cmp, clippy::cast_precision_loss)]
fn bson_equal(a: &Bson, b: &Bson) -> bool {
    match (a, b) {
        (Bson::Int32(x), Bson::Int64(y)) => i64::from(*x) == *y,
        (Bson::Int64(x), Bson::Int32(y)) => *x == i64::from(*y),
        (Bson::Int32(x), Bson::Double(y)) => f64::from(*x) == *y,
        (Bson::Double(x), Bson::Int32(y)) => *x == f64::from(*y),
        (Bson::Int64(x), Bson::Double(y)) => (*x as f64) == *y,
        (Bson::Double(x), Bson::Int64(y)) => *x == (*y as f64),
        _ => a == b,
    }
}

fn bson_cmp(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(af), Some(bf)) = (to_f64(a), to_f64(b)) {
        return af.partial_cmp(&bf);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
