//! In-process evaluation of filters, updates and pipelines over JSON documents.
//!
//! Semantics follow the subset of MongoDB behaviour the services rely on: array fields match
//! element-wise, missing fields compare equal to null, and `$lookup` joins by value.

use super::pipeline::{Accumulator, Group, GroupKey, Lookup, Pipeline, SortOrder, Stage};
use super::{Document, Filter, StoreError, StoreResult, Update, UpdateOp};
use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Resolves a dotted path. Arrays of objects are traversed element-wise and the results
/// flattened, so `contents.kit_id` yields every kit id in a parcel.
pub(crate) fn resolve_path(doc: &Document, path: &str) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let (head, rest) = segments.split_first()?;
    doc.get(*head).and_then(|v| resolve(v, rest))
}

fn resolve(value: &Value, segments: &[&str]) -> Option<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value.clone());
    };
    match value {
        Value::Object(map) => map.get(*head).and_then(|v| resolve(v, rest)),
        Value::Array(items) => {
            let mut found = Vec::new();
            for item in items.iter().filter(|i| i.is_object()) {
                match resolve(item, segments) {
                    Some(Value::Array(inner)) => found.extend(inner),
                    Some(v) => found.push(v),
                    None => {}
                }
            }
            if found.is_empty() {
                None
            } else {
                Some(Value::Array(found))
            }
        }
        _ => None,
    }
}

pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Does a stored field value satisfy `field == expected`?
pub(crate) fn value_matches(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        None | Some(Value::Null) => expected.is_null(),
        Some(Value::Array(items)) => {
            values_equal(&Value::Array(items.clone()), expected)
                || items.iter().any(|item| values_equal(item, expected))
        }
        Some(v) => values_equal(v, expected),
    }
}

pub(crate) fn matches(doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::All => true,
        Filter::Eq(path, expected) => value_matches(resolve_path(doc, path).as_ref(), expected),
        Filter::In(path, candidates) => {
            let field = resolve_path(doc, path);
            candidates
                .iter()
                .any(|c| value_matches(field.as_ref(), c))
        }
        Filter::And(parts) => parts.iter().all(|f| matches(doc, f)),
        Filter::Or(parts) => parts.iter().any(|f| matches(doc, f)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// Total order used by `Sort` stages: null < numbers < strings < objects < arrays < booleans.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Object(x), Value::Object(y)) => Value::Object(x.clone())
            .to_string()
            .cmp(&Value::Object(y.clone()).to_string()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn not_an_array(field: &str) -> StoreError {
    StoreError::Backend(format!("field '{field}' is not an array").into())
}

/// Returns the value at a dotted path for writing, creating intermediate objects and a null
/// leaf when missing.
fn slot_mut<'a>(doc: &'a mut Document, path: &str) -> StoreResult<&'a mut Value> {
    let mut segments = path.split('.');
    let first = segments.next().unwrap_or(path);
    let mut slot = doc.entry(first.to_owned()).or_insert(Value::Null);
    for segment in segments {
        if slot.is_null() {
            *slot = Value::Object(Document::new());
        }
        slot = match slot {
            Value::Object(map) => map.entry(segment.to_owned()).or_insert(Value::Null),
            _ => {
                return Err(StoreError::Backend(
                    format!("cannot traverse non-object at '{path}'").into(),
                ))
            }
        };
    }
    Ok(slot)
}

fn array_slot<'a>(doc: &'a mut Document, field: &str) -> StoreResult<&'a mut Vec<Value>> {
    let slot = slot_mut(doc, field)?;
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    match slot {
        Value::Array(items) => Ok(items),
        _ => Err(not_an_array(field)),
    }
}

/// Applies `update` to `doc` in place and reports whether anything changed.
pub(crate) fn apply_update(doc: &mut Document, update: &Update) -> StoreResult<bool> {
    let mut modified = false;
    for op in update.ops() {
        match op {
            UpdateOp::Set(field, value) => {
                let slot = slot_mut(doc, field)?;
                if slot != value {
                    *slot = value.clone();
                    modified = true;
                }
            }
            UpdateOp::Push(field, value) => {
                array_slot(doc, field)?.push(value.clone());
                modified = true;
            }
            UpdateOp::AddToSet(field, values) => {
                let items = array_slot(doc, field)?;
                for value in values {
                    if !items.iter().any(|i| values_equal(i, value)) {
                        items.push(value.clone());
                        modified = true;
                    }
                }
            }
            UpdateOp::PullAll(field, values) => {
                if resolve_path(doc, field).is_none() {
                    continue;
                }
                match slot_mut(doc, field)? {
                    Value::Array(items) => {
                        let before = items.len();
                        items.retain(|i| !values.iter().any(|v| values_equal(i, v)));
                        modified |= items.len() != before;
                    }
                    Value::Null => {}
                    _ => return Err(not_an_array(field)),
                }
            }
            UpdateOp::Inc(field, by) => {
                let slot = slot_mut(doc, field)?;
                let current = if slot.is_null() { Value::from(0) } else { slot.clone() };
                *slot = add_numbers(&current, by).ok_or_else(|| {
                    StoreError::Backend(format!("cannot increment non-numeric field '{field}'").into())
                })?;
                modified = true;
            }
        }
    }
    Ok(modified)
}

fn add_numbers(a: &Value, b: &Value) -> Option<Value> {
    let (Value::Number(x), Value::Number(y)) = (a, b) else {
        return None;
    };
    if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
        return Some(Value::from(x.checked_add(y)?));
    }
    Number::from_f64(x.as_f64()? + y.as_f64()?).map(Value::Number)
}

/// Evaluates `pipeline` over `input`. `collections` supplies the right-hand side of lookups.
pub(crate) fn evaluate(
    pipeline: &Pipeline,
    input: Vec<Document>,
    collections: &HashMap<String, Vec<Document>>,
) -> Vec<Document> {
    pipeline
        .stages()
        .iter()
        .fold(input, |docs, stage| apply_stage(stage, docs, collections))
}

fn apply_stage(
    stage: &Stage,
    docs: Vec<Document>,
    collections: &HashMap<String, Vec<Document>>,
) -> Vec<Document> {
    match stage {
        Stage::Match(filter) => docs.into_iter().filter(|d| matches(d, filter)).collect(),
        Stage::Lookup(lookup) => docs
            .into_iter()
            .map(|d| apply_lookup(lookup, d, collections))
            .collect(),
        Stage::Unwind(field) => docs.into_iter().flat_map(|d| unwind(field, d)).collect(),
        Stage::Group(group) => apply_group(group, &docs),
        Stage::Sort(keys) => {
            let mut docs = docs;
            docs.sort_by(|a, b| {
                for (key, order) in keys {
                    let null = Value::Null;
                    let left = resolve_path(a, key);
                    let right = resolve_path(b, key);
                    let ord = compare_values(
                        left.as_ref().unwrap_or(&null),
                        right.as_ref().unwrap_or(&null),
                    );
                    let ord = match order {
                        SortOrder::Ascending => ord,
                        SortOrder::Descending => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
            docs
        }
        Stage::Facet(facets) => {
            let mut out = Document::new();
            for (name, sub) in facets {
                let results = evaluate(sub, docs.clone(), collections);
                out.insert(
                    name.clone(),
                    Value::Array(results.into_iter().map(Value::Object).collect()),
                );
            }
            vec![out]
        }
    }
}

fn apply_lookup(
    lookup: &Lookup,
    mut doc: Document,
    collections: &HashMap<String, Vec<Document>>,
) -> Document {
    let locals = match resolve_path(&doc, &lookup.local_field) {
        None => vec![Value::Null],
        Some(Value::Array(items)) => items,
        Some(v) => vec![v],
    };
    let joined: Vec<Value> = collections
        .get(&lookup.from)
        .map(|foreign| {
            foreign
                .iter()
                .filter(|f| {
                    let field = resolve_path(f, &lookup.foreign_field);
                    locals.iter().any(|l| value_matches(field.as_ref(), l))
                })
                .cloned()
                .map(Value::Object)
                .collect()
        })
        .unwrap_or_default();
    doc.insert(lookup.as_field.clone(), Value::Array(joined));
    doc
}

fn unwind(field: &str, doc: Document) -> Vec<Document> {
    match doc.get(field) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                let mut copy = doc.clone();
                copy.insert(field.to_owned(), item.clone());
                copy
            })
            .collect(),
        None | Some(Value::Null) => Vec::new(),
        Some(_) => vec![doc],
    }
}

fn group_key(key: &GroupKey, doc: &Document) -> Value {
    match key {
        GroupKey::Field(path) => resolve_path(doc, path).unwrap_or(Value::Null),
        GroupKey::Month(path) => match resolve_path(doc, path) {
            Some(Value::String(s)) if s.len() >= 7 && s.is_char_boundary(7) => {
                Value::String(s[..7].to_owned())
            }
            _ => Value::Null,
        },
    }
}

fn apply_group(group: &Group, docs: &[Document]) -> Vec<Document> {
    let mut buckets: Vec<(Value, Vec<&Document>)> = Vec::new();
    for doc in docs {
        let key = group_key(&group.key, doc);
        match buckets.iter_mut().find(|(k, _)| values_equal(k, &key)) {
            Some((_, members)) => members.push(doc),
            None => buckets.push((key, vec![doc])),
        }
    }

    buckets
        .into_iter()
        .map(|(key, members)| {
            let mut out = Document::new();
            out.insert("_id".into(), key);
            for (name, acc) in &group.fields {
                out.insert(name.clone(), accumulate(acc, &members));
            }
            out
        })
        .collect()
}

fn numbers_at(path: &str, members: &[&Document]) -> Vec<Number> {
    members
        .iter()
        .filter_map(|d| match resolve_path(d, path) {
            Some(Value::Number(n)) => Some(n),
            _ => None,
        })
        .collect()
}

fn accumulate(acc: &Accumulator, members: &[&Document]) -> Value {
    match acc {
        Accumulator::Count => Value::from(members.len() as i64),
        Accumulator::Sum(path) => {
            let numbers = numbers_at(path, members);
            if numbers.iter().all(|n| n.is_i64()) {
                Value::from(numbers.iter().filter_map(Number::as_i64).sum::<i64>())
            } else {
                let total: f64 = numbers.iter().filter_map(Number::as_f64).sum();
                Number::from_f64(total).map(Value::Number).unwrap_or(Value::Null)
            }
        }
        Accumulator::Avg(path) => {
            let numbers = numbers_at(path, members);
            if numbers.is_empty() {
                return Value::Null;
            }
            let total: f64 = numbers.iter().filter_map(Number::as_f64).sum();
            Number::from_f64(total / numbers.len() as f64)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
        Accumulator::Push(path) => Value::Array(
            members
                .iter()
                .filter_map(|d| resolve_path(d, path))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn eq_matches_array_membership() {
        let site = doc(json!({"site_id": "SITE001", "associated_trials": ["T1", "T2"]}));
        assert!(matches(&site, &Filter::eq("associated_trials", "T2")));
        assert!(!matches(&site, &Filter::eq("associated_trials", "T3")));
    }

    #[test]
    fn eq_compares_numbers_numerically() {
        let d = doc(json!({"weight": 2}));
        assert!(matches(&d, &Filter::eq("weight", json!(2.0))));
    }

    #[test]
    fn missing_field_matches_null_only() {
        let d = doc(json!({"a": 1}));
        assert!(matches(&d, &Filter::eq("b", Value::Null)));
        assert!(!matches(&d, &Filter::eq("b", "x")));
    }

    #[test]
    fn dotted_path_resolves_through_arrays() {
        let parcel = doc(json!({"contents": [{"kit_id": "K1", "quantity": 2}, {"kit_id": "K2"}]}));
        assert_eq!(
            resolve_path(&parcel, "contents.kit_id"),
            Some(json!(["K1", "K2"]))
        );
    }

    #[test]
    fn or_filter_matches_either_side() {
        let shipment = doc(json!({"origin": "S1", "destination": "S2"}));
        let f = Filter::Or(vec![Filter::eq("origin", "S2"), Filter::eq("destination", "S2")]);
        assert!(matches(&shipment, &f));
    }

    #[test]
    fn add_to_set_skips_existing_values() {
        let mut trial = doc(json!({"associated_sites": ["S1"]}));
        let modified = apply_update(
            &mut trial,
            &Update::new().add_to_set("associated_sites", ["S1", "S2", "S2"]),
        )
        .unwrap();
        assert!(modified);
        assert_eq!(trial["associated_sites"], json!(["S1", "S2"]));
    }

    #[test]
    fn pull_all_removes_every_occurrence() {
        let mut trial = doc(json!({"associated_patients": ["P1", "P2", "P1"]}));
        apply_update(&mut trial, &Update::new().pull_all("associated_patients", ["P1"])).unwrap();
        assert_eq!(trial["associated_patients"], json!(["P2"]));
    }

    #[test]
    fn push_onto_scalar_is_rejected() {
        let mut d = doc(json!({"failures": "oops"}));
        assert!(apply_update(&mut d, &Update::new().push("failures", "x")).is_err());
    }

    #[test]
    fn set_same_value_reports_unmodified() {
        let mut d = doc(json!({"status": "PENDING"}));
        let modified = apply_update(&mut d, &Update::new().set("status", "PENDING")).unwrap();
        assert!(!modified);
    }

    #[test]
    fn inc_creates_missing_counter() {
        let mut d = doc(json!({}));
        apply_update(&mut d, &Update::new().inc("kit_inventory.inventory_count", 5)).unwrap();
        assert_eq!(d["kit_inventory"]["inventory_count"], json!(5));
    }

    #[test]
    fn inc_adds_to_nested_counter() {
        let mut d = doc(json!({"kit_inventory": {"inventory_count": 3, "inventory_threshold": 10}}));
        apply_update(&mut d, &Update::new().inc("kit_inventory.inventory_count", -2)).unwrap();
        assert_eq!(d["kit_inventory"], json!({"inventory_count": 1, "inventory_threshold": 10}));
    }

    #[test]
    fn unwind_drops_empty_arrays() {
        let docs = vec![
            doc(json!({"tracking_number": "A", "failures": ["x", "y"]})),
            doc(json!({"tracking_number": "B", "failures": []})),
            doc(json!({"tracking_number": "C"})),
        ];
        let out = evaluate(&Pipeline::new().unwind("failures"), docs, &HashMap::new());
        assert_eq!(out.len(), 2);
        assert_eq!(out[1]["failures"], json!("y"));
    }

    #[test]
    fn group_by_month_sums_costs() {
        let docs = vec![
            doc(json!({"created_at": "2024-01-15T10:00:00Z", "cost": 10.5})),
            doc(json!({"created_at": "2024-01-20T10:00:00Z", "cost": 4.5})),
            doc(json!({"created_at": "2024-02-01T10:00:00Z"})),
        ];
        let pipeline = Pipeline::new()
            .group(
                Group::by(GroupKey::Month("created_at".into()))
                    .count("shipment_count")
                    .sum("total_cost", "cost"),
            )
            .sort(&[("_id", SortOrder::Ascending)]);
        let out = evaluate(&pipeline, docs, &HashMap::new());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["_id"], json!("2024-01"));
        assert_eq!(out[0]["shipment_count"], json!(2));
        assert_eq!(out[0]["total_cost"], json!(15.0));
        assert_eq!(out[1]["total_cost"], json!(0));
    }

    #[test]
    fn avg_of_no_numbers_is_null() {
        let docs = vec![doc(json!({"status": "PENDING"}))];
        let pipeline = Pipeline::new()
            .group(Group::by(GroupKey::Field("status".into())).avg("avg_cost", "cost"));
        let out = evaluate(&pipeline, docs, &HashMap::new());
        assert_eq!(out[0]["avg_cost"], Value::Null);
    }

    #[test]
    fn lookup_joins_by_value_and_keeps_unmatched_parents() {
        let mut collections = HashMap::new();
        collections.insert(
            "sites".to_owned(),
            vec![doc(json!({"site_id": "S1"})), doc(json!({"site_id": "S2"}))],
        );
        let trials = vec![
            doc(json!({"trial_id": "T1", "associated_sites": ["S2", "S9"]})),
            doc(json!({"trial_id": "T2", "associated_sites": []})),
        ];
        let pipeline = Pipeline::new().lookup("sites", "associated_sites", "site_id", "site_details");
        let out = evaluate(&pipeline, trials, &collections);
        assert_eq!(out[0]["site_details"], json!([{"site_id": "S2"}]));
        assert_eq!(out[1]["site_details"], json!([]));
    }

    #[test]
    fn sort_orders_mixed_types_by_rank() {
        assert_eq!(compare_values(&Value::Null, &json!(1)), Ordering::Less);
        assert_eq!(compare_values(&json!(2), &json!("a")), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
    }
}
