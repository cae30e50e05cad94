//! Update expression AST and evaluator: `SET`/`REMOVE`/`ADD`/`DELETE`
//! clauses applied in that order against an item (spec §4.8).

use crate::value::{AttributeValue, Item};

use super::ast::{Operand, Path, PathSegment};
use super::context::ExprContext;

#[derive(Debug, Clone, PartialEq)]
pub enum SetValue {
    Operand(Operand),
    Add(Operand, Operand),
    Sub(Operand, Operand),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetClause {
    pub path: Path,
    pub value: SetValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoveClause {
    pub path: Path,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddClause {
    pub path: Path,
    pub operand: Operand,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DelClause {
    pub path: Path,
    pub operand: Operand,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateExpr {
    pub set: Vec<SetClause>,
    pub remove: Vec<RemoveClause>,
    pub add: Vec<AddClause>,
    pub delete: Vec<DelClause>,
}

pub fn apply(update: &UpdateExpr, item: &mut Item, ctx: &ExprContext<'_>) -> Result<(), String> {
    for clause in &update.set {
        let value = resolve_set_value(&clause.value, item, ctx)?;
        let resolved_path = ctx.resolved_path_names(&clause.path)?;
        set_value(item, &resolved_path, value)?;
    }
    for clause in &update.remove {
        let resolved_path = ctx.resolved_path_names(&clause.path)?;
        remove_value(item, &resolved_path);
    }
    for clause in &update.add {
        let resolved_path = ctx.resolved_path_names(&clause.path)?;
        let value = ctx
            .resolve_operand(&clause.operand, item)?
            .ok_or_else(|| "ADD operand value not found in expression_attribute_values".to_string())?;
        add_value(item, &resolved_path, value)?;
    }
    for clause in &update.delete {
        let resolved_path = ctx.resolved_path_names(&clause.path)?;
        let value = ctx
            .resolve_operand(&clause.operand, item)?
            .ok_or_else(|| "DELETE operand value not found in expression_attribute_values".to_string())?;
        delete_value(item, &resolved_path, value)?;
    }
    Ok(())
}

fn resolve_set_value(value: &SetValue, item: &Item, ctx: &ExprContext<'_>) -> Result<AttributeValue, String> {
    match value {
        SetValue::Operand(op) => ctx
            .resolve_operand(op, item)?
            .ok_or_else(|| "SET value does not exist".to_string()),
        SetValue::Add(a, b) => {
            let (Some(AttributeValue::N(x)), Some(AttributeValue::N(y))) =
                (ctx.resolve_operand(a, item)?, ctx.resolve_operand(b, item)?)
            else {
                return Err("arithmetic SET requires two numeric operands".to_string());
            };
            Ok(AttributeValue::N(x + y))
        }
        SetValue::Sub(a, b) => {
            let (Some(AttributeValue::N(x)), Some(AttributeValue::N(y))) =
                (ctx.resolve_operand(a, item)?, ctx.resolve_operand(b, item)?)
            else {
                return Err("arithmetic SET requires two numeric operands".to_string());
            };
            Ok(AttributeValue::N(x - y))
        }
    }
}

fn set_value(item: &mut Item, path: &[PathSegment], value: AttributeValue) -> Result<(), String> {
    let PathSegment::Attribute(top) = &path[0] else {
        return Err("update path must start with an attribute name".to_string());
    };
    if path.len() == 1 {
        item.insert(top.clone(), value);
        return Ok(());
    }
    let top_value = item
        .get_mut(top)
        .ok_or_else(|| format!("cannot SET nested path: '{top}' does not exist"))?;
    set_nested(top_value, &path[1..], value)
}

fn set_nested(current: &mut AttributeValue, path: &[PathSegment], value: AttributeValue) -> Result<(), String> {
    let (last, prefix) = path.split_last().expect("path is non-empty");
    let mut target = current;
    for segment in prefix {
        target = match (segment, target) {
            (PathSegment::Attribute(name), AttributeValue::M(map)) => {
                map.get_mut(name).ok_or_else(|| format!("cannot SET nested path: '{name}' does not exist"))?
            }
            (PathSegment::Index(idx), AttributeValue::L(list)) => {
                list.get_mut(*idx).ok_or_else(|| format!("list index {idx} out of bounds"))?
            }
            _ => return Err("path segment type mismatch".to_string()),
        };
    }
    match (last, target) {
        (PathSegment::Attribute(name), AttributeValue::M(map)) => {
            map.insert(name.clone(), value);
            Ok(())
        }
        (PathSegment::Index(idx), AttributeValue::L(list)) => {
            if *idx < list.len() {
                list[*idx] = value;
            } else if *idx == list.len() {
                list.push(value);
            } else {
                return Err(format!("list index {idx} out of bounds"));
            }
            Ok(())
        }
        _ => Err("path segment type mismatch".to_string()),
    }
}

fn remove_value(item: &mut Item, path: &[PathSegment]) {
    let PathSegment::Attribute(top) = &path[0] else { return };
    if path.len() == 1 {
        item.remove(top);
        return;
    }
    if let Some(value) = item.get_mut(top) {
        remove_nested(value, &path[1..]);
    }
}

fn remove_nested(current: &mut AttributeValue, path: &[PathSegment]) {
    let Some((last, prefix)) = path.split_last() else { return };
    let mut target = current;
    for segment in prefix {
        target = match (segment, target) {
            (PathSegment::Attribute(name), AttributeValue::M(map)) => match map.get_mut(name) {
                Some(v) => v,
                None => return,
            },
            (PathSegment::Index(idx), AttributeValue::L(list)) => match list.get_mut(*idx) {
                Some(v) => v,
                None => return,
            },
            _ => return,
        };
    }
    match (last, target) {
        (PathSegment::Attribute(name), AttributeValue::M(map)) => {
            map.remove(name);
        }
        (PathSegment::Index(idx), AttributeValue::L(list)) => {
            if *idx < list.len() {
                list.remove(*idx);
            }
        }
        _ => {}
    }
}

fn add_value(item: &mut Item, path: &[PathSegment], operand_value: AttributeValue) -> Result<(), String> {
    let [PathSegment::Attribute(name)] = path else {
        return Err("ADD only supports top-level attributes".to_string());
    };
    match item.get_mut(name) {
        Some(AttributeValue::N(current)) => {
            let AttributeValue::N(delta) = operand_value else {
                return Err("ADD on a number requires a numeric value".to_string());
            };
            *current += delta;
        }
        Some(AttributeValue::Ss(set)) => {
            let AttributeValue::Ss(additions) = operand_value else {
                return Err("ADD on a string set requires an SS value".to_string());
            };
            for v in additions {
                if !set.contains(&v) {
                    set.push(v);
                }
            }
        }
        Some(AttributeValue::Ns(set)) => {
            let AttributeValue::Ns(additions) = operand_value else {
                return Err("ADD on a number set requires an NS value".to_string());
            };
            for v in additions {
                if !set.contains(&v) {
                    set.push(v);
                }
            }
        }
        Some(AttributeValue::Bs(set)) => {
            let AttributeValue::Bs(additions) = operand_value else {
                return Err("ADD on a binary set requires a BS value".to_string());
            };
            for v in additions {
                if !set.contains(&v) {
                    set.push(v);
                }
            }
        }
        Some(_) => return Err(format!("ADD is not supported on attribute '{name}' of this type")),
        None => {
            item.insert(name.clone(), operand_value);
        }
    }
    Ok(())
}

fn delete_value(item: &mut Item, path: &[PathSegment], operand_value: AttributeValue) -> Result<(), String> {
    let [PathSegment::Attribute(name)] = path else {
        return Err("DELETE only supports top-level attributes".to_string());
    };
    match item.get_mut(name) {
        Some(AttributeValue::Ss(set)) => {
            if let AttributeValue::Ss(removals) = operand_value {
                set.retain(|v| !removals.contains(v));
            }
        }
        Some(AttributeValue::Ns(set)) => {
            if let AttributeValue::Ns(removals) = operand_value {
                set.retain(|v| !removals.contains(v));
            }
        }
        Some(AttributeValue::Bs(set)) => {
            if let AttributeValue::Bs(removals) = operand_value {
                set.retain(|v| !removals.contains(v));
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse_update_expression;
    use std::collections::BTreeMap;

    fn apply_str(expr: &str, item: &mut Item, values: &BTreeMap<String, AttributeValue>) {
        let update = parse_update_expression(expr).unwrap();
        let names = BTreeMap::new();
        let ctx = ExprContext { names: &names, values };
        apply(&update, item, &ctx).unwrap();
    }

    #[test]
    fn set_creates_new_top_level_attribute() {
        let mut item = Item::new();
        let mut values = BTreeMap::new();
        values.insert("v".to_string(), AttributeValue::S("hi".to_string()));
        apply_str("SET greeting = :v", &mut item, &values);
        assert_eq!(item.get("greeting"), Some(&AttributeValue::S("hi".to_string())));
    }

    #[test]
    fn add_initializes_missing_number_to_delta() {
        let mut item = Item::new();
        let mut values = BTreeMap::new();
        values.insert("incr".to_string(), AttributeValue::N("3".parse().unwrap()));
        apply_str("ADD counter :incr", &mut item, &values);
        assert_eq!(item.get("counter"), Some(&AttributeValue::N("3".parse().unwrap())));
    }

    #[test]
    fn add_sums_existing_number() {
        let mut item = Item::new();
        item.insert("counter".to_string(), AttributeValue::N("10".parse().unwrap()));
        let mut values = BTreeMap::new();
        values.insert("incr".to_string(), AttributeValue::N("5".parse().unwrap()));
        apply_str("ADD counter :incr", &mut item, &values);
        assert_eq!(item.get("counter"), Some(&AttributeValue::N("15".parse().unwrap())));
    }

    #[test]
    fn remove_deletes_attribute() {
        let mut item = Item::new();
        item.insert("gone".to_string(), AttributeValue::S("x".to_string()));
        let values = BTreeMap::new();
        apply_str("REMOVE gone", &mut item, &values);
        assert!(item.get("gone").is_none());
    }

    #[test]
    fn delete_subtracts_from_string_set() {
        let mut item = Item::new();
        item.insert("tags".to_string(), AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]));
        let mut values = BTreeMap::new();
        values.insert("rm".to_string(), AttributeValue::Ss(vec!["a".to_string()]));
        apply_str("DELETE tags :rm", &mut item, &values);
        assert_eq!(item.get("tags"), Some(&AttributeValue::Ss(vec!["b".to_string()])));
    }

    #[test]
    fn if_not_exists_keeps_current_value_when_present() {
        let mut item = Item::new();
        item.insert("counter".to_string(), AttributeValue::N("7".parse().unwrap()));
        let mut values = BTreeMap::new();
        values.insert("zero".to_string(), AttributeValue::N("0".parse().unwrap()));
        values.insert("incr".to_string(), AttributeValue::N("1".parse().unwrap()));
        apply_str("SET counter = if_not_exists(counter, :zero) + :incr", &mut item, &values);
        assert_eq!(item.get("counter"), Some(&AttributeValue::N("8".parse().unwrap())));
    }

    #[test]
    fn list_append_concatenates_lists() {
        let mut item = Item::new();
        item.insert("items".to_string(), AttributeValue::L(vec![AttributeValue::S("a".to_string())]));
        let mut values = BTreeMap::new();
        values.insert("more".to_string(), AttributeValue::L(vec![AttributeValue::S("b".to_string())]));
        apply_str("SET items = list_append(items, :more)", &mut item, &values);
        assert_eq!(
            item.get("items"),
            Some(&AttributeValue::L(vec![AttributeValue::S("a".to_string()), AttributeValue::S("b".to_string())]))
        );
    }
}
