//! DynamoDB-shaped attribute values: the typed wire encoding
//! (`{"S": "..."}`, `{"N": "123"}`, ...) and the comparisons the
//! condition/filter and update expression evaluators need (spec §3, §4.8).

use std::cmp::Ordering;
use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

pub type Item = BTreeMap<String, AttributeValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    S(String),
    N(Decimal),
    B(Vec<u8>),
    Bool(bool),
    Null,
    Ss(Vec<String>),
    Ns(Vec<Decimal>),
    Bs(Vec<Vec<u8>>),
    L(Vec<AttributeValue>),
    M(Item),
}

impl AttributeValue {
    /// Name used by the `attribute_type` condition function: `S | N | B |
    /// BOOL | NULL | SS | NS | BS | L | M`.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::B(_) => "B",
            AttributeValue::Bool(_) => "BOOL",
            AttributeValue::Null => "NULL",
            AttributeValue::Ss(_) => "SS",
            AttributeValue::Ns(_) => "NS",
            AttributeValue::Bs(_) => "BS",
            AttributeValue::L(_) => "L",
            AttributeValue::M(_) => "M",
        }
    }

    /// `size(path)`: string char count, binary byte count, set/list/map
    /// element count.
    pub fn size(&self) -> usize {
        match self {
            AttributeValue::S(s) => s.chars().count(),
            AttributeValue::B(b) => b.len(),
            AttributeValue::Ss(s) => s.len(),
            AttributeValue::Ns(s) => s.len(),
            AttributeValue::Bs(s) => s.len(),
            AttributeValue::L(l) => l.len(),
            AttributeValue::M(m) => m.len(),
            AttributeValue::N(_) | AttributeValue::Bool(_) | AttributeValue::Null => 0,
        }
    }

    /// Ordering used for sort keys and `Query`'s sort-key comparators.
    /// Mixed-type comparisons are not meaningful for keys; the table
    /// invariant (key attributes share a declared scalar type) makes this
    /// safe to call only on same-typed pairs.
    pub fn key_cmp(&self, other: &AttributeValue) -> Option<Ordering> {
        match (self, other) {
            (AttributeValue::S(a), AttributeValue::S(b)) => Some(a.cmp(b)),
            (AttributeValue::N(a), AttributeValue::N(b)) => a.partial_cmp(b),
            (AttributeValue::B(a), AttributeValue::B(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn from_json(json: &Json) -> Result<Self, String> {
        let obj = json.as_object().ok_or("attribute value must be a JSON object")?;
        let (tag, payload) = obj.iter().next().ok_or("attribute value object must have one key")?;
        Ok(match tag.as_str() {
            "S" => AttributeValue::S(payload.as_str().ok_or("S value must be a string")?.to_string()),
            "N" => AttributeValue::N(
                payload
                    .as_str()
                    .ok_or("N value must be a stringified number")?
                    .parse()
                    .map_err(|_| "N value is not a valid number".to_string())?,
            ),
            "B" => AttributeValue::B(
                BASE64
                    .decode(payload.as_str().ok_or("B value must be base64")?)
                    .map_err(|e| format!("invalid base64 in B value: {e}"))?,
            ),
            "BOOL" => AttributeValue::Bool(payload.as_bool().ok_or("BOOL value must be a bool")?),
            "NULL" => AttributeValue::Null,
            "SS" => AttributeValue::Ss(json_str_array(payload)?),
            "NS" => {
                let raw = json_str_array(payload)?;
                let mut values = Vec::with_capacity(raw.len());
                for v in raw {
                    values.push(v.parse().map_err(|_| format!("invalid NS entry '{v}'"))?);
                }
                AttributeValue::Ns(values)
            }
            "BS" => {
                let raw = json_str_array(payload)?;
                let mut values = Vec::with_capacity(raw.len());
                for v in raw {
                    values.push(BASE64.decode(&v).map_err(|e| format!("invalid base64 in BS entry: {e}"))?);
                }
                AttributeValue::Bs(values)
            }
            "L" => {
                let arr = payload.as_array().ok_or("L value must be an array")?;
                let mut values = Vec::with_capacity(arr.len());
                for v in arr {
                    values.push(AttributeValue::from_json(v)?);
                }
                AttributeValue::L(values)
            }
            "M" => {
                let obj = payload.as_object().ok_or("M value must be an object")?;
                let mut map = Item::new();
                for (k, v) in obj {
                    map.insert(k.clone(), AttributeValue::from_json(v)?);
                }
                AttributeValue::M(map)
            }
            other => return Err(format!("unrecognized attribute value tag '{other}'")),
        })
    }

    pub fn to_json(&self) -> Json {
        match self {
            AttributeValue::S(s) => serde_json::json!({ "S": s }),
            AttributeValue::N(n) => serde_json::json!({ "N": n.normalize().to_string() }),
            AttributeValue::B(b) => serde_json::json!({ "B": BASE64.encode(b) }),
            AttributeValue::Bool(b) => serde_json::json!({ "BOOL": b }),
            AttributeValue::Null => serde_json::json!({ "NULL": true }),
            AttributeValue::Ss(s) => serde_json::json!({ "SS": s }),
            AttributeValue::Ns(n) => {
                serde_json::json!({ "NS": n.iter().map(|v| v.normalize().to_string()).collect::<Vec<_>>() })
            }
            AttributeValue::Bs(b) => {
                serde_json::json!({ "BS": b.iter().map(|v| BASE64.encode(v)).collect::<Vec<_>>() })
            }
            AttributeValue::L(items) => serde_json::json!({ "L": items.iter().map(AttributeValue::to_json).collect::<Vec<_>>() }),
            AttributeValue::M(map) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in map {
                    obj.insert(k.clone(), v.to_json());
                }
                serde_json::json!({ "M": obj })
            }
        }
    }
}

fn json_str_array(json: &Json) -> Result<Vec<String>, String> {
    json.as_array()
        .ok_or("expected a JSON array")?
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(|| "expected a string entry".to_string()))
        .collect()
}

impl Serialize for AttributeValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Json::deserialize(deserializer)?;
        AttributeValue::from_json(&json).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trips_through_json() {
        let value = AttributeValue::S("hello".to_string());
        let json = value.to_json();
        assert_eq!(json, serde_json::json!({"S": "hello"}));
        assert_eq!(AttributeValue::from_json(&json).unwrap(), value);
    }

    #[test]
    fn number_normalizes_trailing_zeros() {
        let value = AttributeValue::N("3.140".parse().unwrap());
        assert_eq!(value.to_json(), serde_json::json!({"N": "3.14"}));
    }

    #[test]
    fn binary_round_trips_through_base64() {
        let value = AttributeValue::B(vec![1, 2, 3]);
        let json = value.to_json();
        assert_eq!(AttributeValue::from_json(&json).unwrap(), value);
    }

    #[test]
    fn nested_map_round_trips() {
        let mut inner = Item::new();
        inner.insert("a".to_string(), AttributeValue::N(1.into()));
        let value = AttributeValue::M(inner);
        let json = value.to_json();
        assert_eq!(AttributeValue::from_json(&json).unwrap(), value);
    }

    #[test]
    fn key_cmp_orders_numbers_numerically_not_lexically() {
        let a = AttributeValue::N("9".parse().unwrap());
        let b = AttributeValue::N("10".parse().unwrap());
        assert_eq!(a.key_cmp(&b), Some(Ordering::Less));
    }

    #[test]
    fn key_cmp_is_none_across_mismatched_types() {
        let a = AttributeValue::S("9".to_string());
        let b = AttributeValue::N("10".parse().unwrap());
        assert_eq!(a.key_cmp(&b), None);
    }
}
