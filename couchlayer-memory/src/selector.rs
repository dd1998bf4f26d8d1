//! Mango selector evaluation for in-memory document filtering.
//!
//! A selector is parsed once into a [`Condition`] tree and then matched against each document.
//! Parsing is where unsupported operators are rejected, so a bad selector fails even when the
//! database is empty.
//!
//! Values are compared with CouchDB's collation order:
//! `null < false < true < numbers < strings < arrays < objects`. Strings compare by code point
//! rather than by ICU collation.

use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A parsed selector.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Nor(Vec<Condition>),
    Not(Box<Condition>),
    Field { path: Vec<String>, test: FieldTest },
}

/// A single operator applied to the value at a field path.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FieldTest {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Exists(bool),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Size(usize),
}

impl Condition {
    /// Parses a selector object. The error names the offending operator or operand.
    pub(crate) fn parse(selector: &Map<String, Value>) -> Result<Self, String> {
        parse_object(selector, &[])
    }

    pub(crate) fn matches(&self, document: &Map<String, Value>) -> bool {
        match self {
            Condition::And(conditions) => conditions.iter().all(|c| c.matches(document)),
            Condition::Or(conditions) => conditions.iter().any(|c| c.matches(document)),
            Condition::Nor(conditions) => !conditions.iter().any(|c| c.matches(document)),
            Condition::Not(condition) => !condition.matches(document),
            Condition::Field { path, test } => test.matches(lookup(document, path)),
        }
    }
}

impl FieldTest {
    fn matches(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return matches!(self, FieldTest::Exists(false));
        };

        match self {
            FieldTest::Exists(should_exist) => *should_exist,
            FieldTest::Eq(expected) => collate(value, expected) == Ordering::Equal,
            FieldTest::Ne(expected) => collate(value, expected) != Ordering::Equal,
            FieldTest::Gt(bound) => collate(value, bound) == Ordering::Greater,
            FieldTest::Gte(bound) => collate(value, bound) != Ordering::Less,
            FieldTest::Lt(bound) => collate(value, bound) == Ordering::Less,
            FieldTest::Lte(bound) => collate(value, bound) != Ordering::Greater,
            FieldTest::In(candidates) => contains_any(value, candidates),
            FieldTest::Nin(candidates) => !contains_any(value, candidates),
            FieldTest::Size(size) => value.as_array().is_some_and(|items| items.len() == *size),
        }
    }
}

/// A value is "in" a list when it equals a candidate, or, for arrays, when any element does.
fn contains_any(value: &Value, candidates: &[Value]) -> bool {
    let is_candidate = |item: &Value| {
        candidates
            .iter()
            .any(|candidate| collate(item, candidate) == Ordering::Equal)
    };

    match value {
        Value::Array(items) => is_candidate(value) || items.iter().any(is_candidate),
        _ => is_candidate(value),
    }
}

fn parse_object(object: &Map<String, Value>, path: &[String]) -> Result<Condition, String> {
    let mut conditions = object
        .iter()
        .map(|(key, value)| parse_entry(key, value, path))
        .collect::<Result<Vec<_>, _>>()?;

    if conditions.len() == 1 {
        return Ok(conditions.remove(0));
    }
    Ok(Condition::And(conditions))
}

fn parse_entry(key: &str, value: &Value, path: &[String]) -> Result<Condition, String> {
    match key {
        "$and" => Ok(Condition::And(parse_list(key, value, path)?)),
        "$or" => Ok(Condition::Or(parse_list(key, value, path)?)),
        "$nor" => Ok(Condition::Nor(parse_list(key, value, path)?)),
        "$not" => match value {
            Value::Object(object) => Ok(Condition::Not(Box::new(parse_object(object, path)?))),
            other => Err(format!("$not requires an object, got {other}")),
        },
        operator if operator.starts_with('$') => {
            if path.is_empty() {
                return Err(format!("{operator} must be applied to a field"));
            }
            Ok(Condition::Field {
                path: path.to_vec(),
                test: parse_test(operator, value)?,
            })
        }
        field => {
            let mut nested = path.to_vec();
            nested.extend(field.split('.').map(str::to_string));

            match value {
                Value::Object(object) => parse_object(object, &nested),
                other => Ok(Condition::Field {
                    path: nested,
                    test: FieldTest::Eq(other.clone()),
                }),
            }
        }
    }
}

fn parse_list(operator: &str, value: &Value, path: &[String]) -> Result<Vec<Condition>, String> {
    let items = value
        .as_array()
        .ok_or_else(|| format!("{operator} requires an array, got {value}"))?;

    items
        .iter()
        .map(|item| match item {
            Value::Object(object) => parse_object(object, path),
            other => Err(format!("{operator} elements must be objects, got {other}")),
        })
        .collect()
}

fn parse_test(operator: &str, operand: &Value) -> Result<FieldTest, String> {
    let test = match operator {
        "$eq" => FieldTest::Eq(operand.clone()),
        "$ne" => FieldTest::Ne(operand.clone()),
        "$gt" => FieldTest::Gt(operand.clone()),
        "$gte" => FieldTest::Gte(operand.clone()),
        "$lt" => FieldTest::Lt(operand.clone()),
        "$lte" => FieldTest::Lte(operand.clone()),
        "$exists" => FieldTest::Exists(
            operand
                .as_bool()
                .ok_or_else(|| format!("$exists requires a boolean, got {operand}"))?,
        ),
        "$in" | "$nin" => {
            let candidates = operand
                .as_array()
                .ok_or_else(|| format!("{operator} requires an array, got {operand}"))?
                .clone();
            if operator == "$in" {
                FieldTest::In(candidates)
            } else {
                FieldTest::Nin(candidates)
            }
        }
        "$size" => FieldTest::Size(
            operand
                .as_u64()
                .and_then(|size| usize::try_from(size).ok())
                .ok_or_else(|| format!("$size requires a non-negative integer, got {operand}"))?,
        ),
        other => return Err(format!("Invalid operator: {other}")),
    };

    Ok(test)
}

fn lookup<'a>(document: &'a Map<String, Value>, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(document.get(first)?, |value, key| value.as_object()?.get(key))
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// Total order over JSON values following CouchDB's view collation.
pub(crate) fn collate(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => a
            .iter()
            .zip(b)
            .map(|(x, y)| collate(x, y))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        (Value::Object(a), Value::Object(b)) => a
            .iter()
            .zip(b)
            .map(|((ka, va), (kb, vb))| ka.cmp(kb).then_with(|| collate(va, vb)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        _ => type_rank(left).cmp(&type_rank(right)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn selector(value: Value) -> Condition {
        Condition::parse(value.as_object().unwrap()).unwrap()
    }

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn implicit_equality_and_dotted_paths() {
        let document = doc(json!({ "name": "joe", "address": { "city": "Oslo" } }));

        assert!(selector(json!({ "name": "joe" })).matches(&document));
        assert!(selector(json!({ "address.city": "Oslo" })).matches(&document));
        assert!(selector(json!({ "address": { "city": "Oslo" } })).matches(&document));
        assert!(!selector(json!({ "address.city": "Bergen" })).matches(&document));
        assert!(!selector(json!({ "name.first": "joe" })).matches(&document));
    }

    #[test]
    fn range_operators_combine_on_one_field() {
        let condition = selector(json!({ "age": { "$gte": 18, "$lt": 65 } }));

        assert!(condition.matches(&doc(json!({ "age": 18 }))));
        assert!(condition.matches(&doc(json!({ "age": 64.5 }))));
        assert!(!condition.matches(&doc(json!({ "age": 65 }))));
        assert!(!condition.matches(&doc(json!({}))));
    }

    #[test]
    fn everything_collates_after_null() {
        let condition = selector(json!({ "_id": { "$gt": null } }));

        for id in [json!(false), json!(3), json!("a"), json!([]), json!({})] {
            assert!(condition.matches(&doc(json!({ "_id": id }))));
        }
        assert!(!condition.matches(&doc(json!({ "_id": null }))));
    }

    #[test]
    fn membership_and_size() {
        let document = doc(json!({ "tags": ["red", "blue"], "kind": "car" }));

        assert!(selector(json!({ "kind": { "$in": ["car", "bike"] } })).matches(&document));
        assert!(selector(json!({ "tags": { "$in": ["blue"] } })).matches(&document));
        assert!(selector(json!({ "tags": { "$nin": ["green"] } })).matches(&document));
        assert!(selector(json!({ "tags": { "$size": 2 } })).matches(&document));
        assert!(!selector(json!({ "kind": { "$size": 3 } })).matches(&document));
    }

    #[test]
    fn existence_and_negation() {
        let document = doc(json!({ "name": "joe" }));

        assert!(selector(json!({ "email": { "$exists": false } })).matches(&document));
        assert!(!selector(json!({ "name": { "$exists": false } })).matches(&document));
        assert!(selector(json!({ "$not": { "name": "ann" } })).matches(&document));
        assert!(selector(json!({ "name": { "$ne": "ann" } })).matches(&document));
        assert!(!selector(json!({ "email": { "$ne": "ann" } })).matches(&document));
    }

    #[test]
    fn combination_operators() {
        let document = doc(json!({ "a": 1, "b": 2 }));

        assert!(selector(json!({ "$and": [{ "a": 1 }, { "b": 2 }] })).matches(&document));
        assert!(selector(json!({ "$or": [{ "a": 5 }, { "b": 2 }] })).matches(&document));
        assert!(!selector(json!({ "$nor": [{ "a": 5 }, { "b": 2 }] })).matches(&document));
        assert!(selector(json!({ "a": { "$or": [{ "$lt": 0 }, { "$eq": 1 }] } })).matches(&document));
    }

    #[test]
    fn unsupported_or_malformed_operators_are_rejected() {
        for bad in [
            json!({ "name": { "$regex": "^j" } }),
            json!({ "$eq": 1 }),
            json!({ "$or": { "a": 1 } }),
            json!({ "tags": { "$size": -1 } }),
            json!({ "name": { "$exists": "yes" } }),
        ] {
            assert!(Condition::parse(bad.as_object().unwrap()).is_err(), "{bad}");
        }
    }

    #[test]
    fn collation_orders_across_types() {
        let ordered = [
            json!(null),
            json!(false),
            json!(true),
            json!(-1),
            json!(2.5),
            json!("A"),
            json!("a"),
            json!([1]),
            json!([1, 2]),
            json!({ "a": 1 }),
        ];

        for pair in ordered.windows(2) {
            assert_eq!(collate(&pair[0], &pair[1]), Ordering::Less, "{} < {}", pair[0], pair[1]);
        }
        assert_eq!(collate(&json!(1), &json!(1.0)), Ordering::Equal);
    }
}
