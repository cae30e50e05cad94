//! Condition/filter expression evaluator (spec §4.8). Mixed-type
//! comparisons and references to missing attributes resolve to `false`
//! rather than erroring, matching AWS behavior.

use crate::value::{AttributeValue, Item};

use super::ast::{CmpOp, Condition, Operand};
use super::context::ExprContext;

pub fn evaluate(condition: &Condition, item: &Item, ctx: &ExprContext<'_>) -> Result<bool, String> {
    Ok(match condition {
        Condition::Cmp(lhs, op, rhs) => {
            let (Some(l), Some(r)) = (ctx.resolve_operand(lhs, item)?, ctx.resolve_operand(rhs, item)?) else {
                return Ok(false);
            };
            compare(*op, &l, &r)
        }
        Condition::Between(operand, low, high) => {
            let (Some(v), Some(lo), Some(hi)) = (
                ctx.resolve_operand(operand, item)?,
                ctx.resolve_operand(low, item)?,
                ctx.resolve_operand(high, item)?,
            ) else {
                return Ok(false);
            };
            compare(CmpOp::Ge, &v, &lo) && compare(CmpOp::Le, &v, &hi)
        }
        Condition::In(operand, candidates) => {
            let Some(v) = ctx.resolve_operand(operand, item)? else {
                return Ok(false);
            };
            let mut found = false;
            for candidate in candidates {
                if let Some(c) = ctx.resolve_operand(candidate, item)? {
                    if v == c {
                        found = true;
                        break;
                    }
                }
            }
            found
        }
        Condition::AttributeExists(path) => ctx.get(path, item)?.is_some(),
        Condition::AttributeNotExists(path) => ctx.get(path, item)?.is_none(),
        Condition::AttributeType(path, operand) => {
            let (Some(v), Some(AttributeValue::S(expected))) = (ctx.get(path, item)?, ctx.resolve_operand(operand, item)?) else {
                return Ok(false);
            };
            v.type_name() == expected
        }
        Condition::BeginsWith(path, operand) => {
            let (Some(AttributeValue::S(v)), Some(AttributeValue::S(prefix))) =
                (ctx.get(path, item)?, ctx.resolve_operand(operand, item)?)
            else {
                return Ok(false);
            };
            v.starts_with(prefix.as_str())
        }
        Condition::Contains(path, operand) => {
            let Some(container) = ctx.get(path, item)? else {
                return Ok(false);
            };
            let Some(needle) = ctx.resolve_operand(operand, item)? else {
                return Ok(false);
            };
            match container {
                AttributeValue::S(s) => matches!(&needle, AttributeValue::S(n) if s.contains(n.as_str())),
                AttributeValue::Ss(set) => matches!(&needle, AttributeValue::S(n) if set.contains(n)),
                AttributeValue::Ns(set) => matches!(&needle, AttributeValue::N(n) if set.contains(n)),
                AttributeValue::Bs(set) => matches!(&needle, AttributeValue::B(n) if set.contains(n)),
                AttributeValue::L(list) => list.contains(&needle),
                _ => false,
            }
        }
        Condition::And(a, b) => evaluate(a, item, ctx)? && evaluate(b, item, ctx)?,
        Condition::Or(a, b) => evaluate(a, item, ctx)? || evaluate(b, item, ctx)?,
        Condition::Not(a) => !evaluate(a, item, ctx)?,
    })
}

fn compare(op: CmpOp, a: &AttributeValue, b: &AttributeValue) -> bool {
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
        _ => match a.key_cmp(b) {
            Some(ordering) => match op {
                CmpOp::Lt => ordering.is_lt(),
                CmpOp::Le => ordering.is_le(),
                CmpOp::Gt => ordering.is_gt(),
                CmpOp::Ge => ordering.is_ge(),
                CmpOp::Eq | CmpOp::Ne => unreachable!(),
            },
            None => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse_condition_expression;
    use std::collections::BTreeMap;

    fn eval_str(expr: &str, item: &Item, values: &BTreeMap<String, AttributeValue>) -> bool {
        let condition = parse_condition_expression(expr).unwrap();
        let names = BTreeMap::new();
        let ctx = ExprContext { names: &names, values };
        evaluate(&condition, item, &ctx).unwrap()
    }

    #[test]
    fn numeric_comparison_uses_decimal_value_not_string() {
        let mut item = Item::new();
        item.insert("n".to_string(), AttributeValue::N("10".parse().unwrap()));
        let mut values = BTreeMap::new();
        values.insert("v".to_string(), AttributeValue::N("9".parse().unwrap()));
        assert!(eval_str("n > :v", &item, &values));
    }

    #[test]
    fn mixed_type_comparison_is_false_not_error() {
        let mut item = Item::new();
        item.insert("n".to_string(), AttributeValue::S("10".to_string()));
        let mut values = BTreeMap::new();
        values.insert("v".to_string(), AttributeValue::N("9".parse().unwrap()));
        assert!(!eval_str("n > :v", &item, &values));
    }

    #[test]
    fn attribute_not_exists_true_when_missing() {
        let item = Item::new();
        let values = BTreeMap::new();
        assert!(eval_str("attribute_not_exists(missing)", &item, &values));
    }

    #[test]
    fn begins_with_and_contains() {
        let mut item = Item::new();
        item.insert("name".to_string(), AttributeValue::S("hello-world".to_string()));
        item.insert("tags".to_string(), AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]));
        let mut values = BTreeMap::new();
        values.insert("p".to_string(), AttributeValue::S("hello".to_string()));
        values.insert("t".to_string(), AttributeValue::S("a".to_string()));
        assert!(eval_str("begins_with(name, :p)", &item, &values));
        assert!(eval_str("contains(tags, :t)", &item, &values));
    }

    #[test]
    fn between_is_inclusive() {
        let mut item = Item::new();
        item.insert("n".to_string(), AttributeValue::N("5".parse().unwrap()));
        let mut values = BTreeMap::new();
        values.insert("lo".to_string(), AttributeValue::N("5".parse().unwrap()));
        values.insert("hi".to_string(), AttributeValue::N("10".parse().unwrap()));
        assert!(eval_str("n BETWEEN :lo AND :hi", &item, &values));
    }
}
