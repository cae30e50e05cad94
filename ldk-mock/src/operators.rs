//! Match operator DSL for body/header matchers, a direct port of
//! `operators.py::evaluate_operator` and `match_value`.

use serde_json::Value;

#[derive(Debug, Clone)]
pub enum MatchOperator {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Regex(String),
    Exists(bool),
    In(Vec<Value>),
}

fn coerce_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

impl MatchOperator {
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        match self {
            MatchOperator::Eq(expected) => actual == Some(expected),
            MatchOperator::Ne(expected) => actual != Some(expected),
            MatchOperator::Gt(expected) => numeric_cmp(actual, expected, |a, b| a > b),
            MatchOperator::Gte(expected) => numeric_cmp(actual, expected, |a, b| a >= b),
            MatchOperator::Lt(expected) => numeric_cmp(actual, expected, |a, b| a < b),
            MatchOperator::Lte(expected) => numeric_cmp(actual, expected, |a, b| a <= b),
            MatchOperator::Regex(pattern) => match actual {
                Some(Value::String(s)) => regex::Regex::new(pattern)
                    .map(|re| re.is_match(s))
                    .unwrap_or(false),
                Some(other) => regex::Regex::new(pattern)
                    .map(|re| re.is_match(&other.to_string()))
                    .unwrap_or(false),
                None => false,
            },
            MatchOperator::Exists(expected) => actual.is_some() == *expected,
            MatchOperator::In(list) => match actual {
                Some(v) => list.contains(v),
                None => false,
            },
        }
    }
}

fn numeric_cmp(actual: Option<&Value>, expected: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (actual.and_then(coerce_numeric), coerce_numeric(expected)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

/// A body matcher: either a set of `$`-prefixed operators, or a bare value
/// meaning exact equality (mirrors `match_value`'s dict-vs-scalar dispatch).
#[derive(Debug, Clone)]
pub enum Matcher {
    Operators(Vec<MatchOperator>),
    Exact(Value),
}

impl Matcher {
    pub fn matches(&self, actual: Option<&Value>) -> bool {
        match self {
            Matcher::Operators(ops) => ops.iter().all(|op| op.matches(actual)),
            Matcher::Exact(expected) => actual == Some(expected),
        }
    }

    /// Parse a matcher from its JSON form: an object with `$`-keys becomes
    /// `Operators`, anything else is `Exact`.
    pub fn from_json(value: &Value) -> Matcher {
        if let Value::Object(map) = value {
            let ops: Vec<MatchOperator> = map
                .iter()
                .filter_map(|(k, v)| match k.as_str() {
                    "$eq" => Some(MatchOperator::Eq(v.clone())),
                    "$ne" => Some(MatchOperator::Ne(v.clone())),
                    "$gt" => Some(MatchOperator::Gt(v.clone())),
                    "$gte" => Some(MatchOperator::Gte(v.clone())),
                    "$lt" => Some(MatchOperator::Lt(v.clone())),
                    "$lte" => Some(MatchOperator::Lte(v.clone())),
                    "$regex" => v.as_str().map(|s| MatchOperator::Regex(s.to_string())),
                    "$exists" => v.as_bool().map(MatchOperator::Exists),
                    "$in" => v.as_array().map(|a| MatchOperator::In(a.clone())),
                    _ => None,
                })
                .collect();
            if !ops.is_empty() {
                return Matcher::Operators(ops);
            }
        }
        Matcher::Exact(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn exact_matcher_requires_equality() {
        let m = Matcher::from_json(&json!("hello"));
        assert!(m.matches(Some(&json!("hello"))));
        assert!(!m.matches(Some(&json!("world"))));
    }

    #[test]
    fn gte_operator_coerces_numeric_strings() {
        let m = Matcher::from_json(&json!({"$gte": 10}));
        assert!(m.matches(Some(&json!("15"))));
        assert!(!m.matches(Some(&json!("5"))));
    }

    #[test]
    fn exists_false_matches_absent_value() {
        let m = Matcher::from_json(&json!({"$exists": false}));
        assert!(m.matches(None));
        assert!(!m.matches(Some(&json!("present"))));
    }

    #[test]
    fn multiple_operators_are_all_required() {
        let m = Matcher::from_json(&json!({"$gte": 1, "$lte": 10}));
        assert!(m.matches(Some(&json!(5))));
        assert!(!m.matches(Some(&json!(20))));
    }

    #[test]
    fn in_operator_checks_membership() {
        let m = Matcher::from_json(&json!({"$in": ["a", "b"]}));
        assert!(m.matches(Some(&json!("b"))));
        assert!(!m.matches(Some(&json!("c"))));
    }
}
