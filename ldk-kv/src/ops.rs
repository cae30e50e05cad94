//! Item-level operations on a single table: `PutItem`, `GetItem`,
//! `DeleteItem`, `UpdateItem`, `Query`, `Scan` (spec §4.8). Transactional
//! and batch variants that span tables live in `registry.rs`, which
//! composes the condition-check / commit split this module exposes.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::KvError;
use crate::expr::ast::Condition;
use crate::expr::context::ExprContext;
use crate::expr::{eval, update};
use crate::stream::{DeliverFn, EventName, StreamLog, StreamRecord};
use crate::table::{StreamViewType, TableSchema};
use crate::store::{ItemKey, KeyCondition, Table};
use crate::value::{AttributeValue, Item};

/// One page of a `Query`/`Scan`: the items surviving `Limit` and the
/// filter expression, plus a continuation key when the evaluated set was
/// truncated by `Limit` (spec §4.8).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    pub items: Vec<Item>,
    pub last_evaluated_key: Option<Item>,
}

pub struct TableHandle {
    pub table: Arc<Table>,
    pub stream: Arc<StreamLog>,
}

impl TableHandle {
    pub fn new(schema: TableSchema, deliver: Option<DeliverFn>) -> Self {
        let stream = match (schema.stream.is_some(), deliver) {
            (true, Some(d)) => StreamLog::with_subscriber(d),
            _ => StreamLog::new(),
        };
        TableHandle { table: Arc::new(Table::new(schema)), stream }
    }

    pub fn name(&self) -> &str {
        &self.table.schema.name
    }

    pub fn get_item(&self, key: &Item) -> Result<Option<Item>, KvError> {
        let key = self.table.primary_key_of(key).map_err(KvError::validation)?;
        Ok(self.table.get(&key))
    }

    /// Evaluates `condition` (if any) against the item currently stored
    /// at `key`'s primary key, without mutating the store. AWS semantics:
    /// a missing item behaves as an item with no attributes.
    pub fn check_condition(
        &self,
        key_or_item: &Item,
        condition: Option<&Condition>,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, AttributeValue>,
    ) -> Result<(), KvError> {
        let Some(condition) = condition else { return Ok(()) };
        let key = self.table.primary_key_of(key_or_item).map_err(KvError::validation)?;
        let current = self.table.get(&key).unwrap_or_default();
        let ctx = ExprContext { names, values };
        let holds = eval::evaluate(condition, &current, &ctx).map_err(KvError::validation)?;
        if holds {
            Ok(())
        } else {
            Err(KvError::ConditionalCheckFailed("condition expression evaluated to false".to_string()))
        }
    }

    pub fn put_item(
        &self,
        item: Item,
        condition: Option<&Condition>,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, AttributeValue>,
    ) -> Result<Option<Item>, KvError> {
        self.check_condition(&item, condition, names, values)?;
        self.commit_put(item)
    }

    pub fn commit_put(&self, item: Item) -> Result<Option<Item>, KvError> {
        let (key, previous) = self.table.put(item.clone()).map_err(KvError::validation)?;
        let event = if previous.is_some() { EventName::Modify } else { EventName::Insert };
        self.emit_stream(event, &key, previous.clone(), Some(item));
        Ok(previous)
    }

    pub fn delete_item(
        &self,
        key_item: &Item,
        condition: Option<&Condition>,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, AttributeValue>,
    ) -> Result<Option<Item>, KvError> {
        self.check_condition(key_item, condition, names, values)?;
        self.commit_delete(key_item)
    }

    pub fn commit_delete(&self, key_item: &Item) -> Result<Option<Item>, KvError> {
        let key = self.table.primary_key_of(key_item).map_err(KvError::validation)?;
        let previous = self.table.delete(&key);
        if let Some(previous) = previous.clone() {
            self.emit_stream(EventName::Remove, &key, Some(previous), None);
        }
        Ok(previous)
    }

    pub fn update_item(
        &self,
        key_item: &Item,
        update_expr: &update::UpdateExpr,
        condition: Option<&Condition>,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, AttributeValue>,
    ) -> Result<Item, KvError> {
        self.check_condition(key_item, condition, names, values)?;
        let key = self.table.primary_key_of(key_item).map_err(KvError::validation)?;
        let mut next = self.table.get(&key).unwrap_or_else(|| key_item.clone());
        let ctx = ExprContext { names, values };
        update::apply(update_expr, &mut next, &ctx).map_err(KvError::validation)?;
        self.commit_put(next.clone())?;
        Ok(next)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn query(
        &self,
        condition: &KeyCondition,
        index: Option<&str>,
        filter: Option<&Condition>,
        forward: bool,
        limit: Option<usize>,
        exclusive_start_key: Option<&Item>,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, AttributeValue>,
    ) -> Result<PageResult, KvError> {
        let items = match index {
            Some(name) => self.table.query_gsi(name, condition, forward).map_err(KvError::validation)?,
            None => self.table.query_partition(condition, forward),
        };
        self.paginate(items, limit, exclusive_start_key, filter, names, values)
    }

    pub fn scan(
        &self,
        filter: Option<&Condition>,
        segment: Option<(usize, usize)>,
        limit: Option<usize>,
        exclusive_start_key: Option<&Item>,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, AttributeValue>,
    ) -> Result<PageResult, KvError> {
        let items = self.table.scan_all(segment);
        self.paginate(items, limit, exclusive_start_key, filter, names, values)
    }

    /// Applies, in order: resume past `exclusive_start_key`, truncate to
    /// `limit`, THEN the filter expression — AWS evaluates `Limit`
    /// against the raw key-condition/scan page and only narrows that
    /// page with `FilterExpression` afterward, so a `Limit` can yield
    /// fewer (or zero) items than requested even with matching data
    /// still beyond `LastEvaluatedKey` (spec §4.8, §8).
    #[allow(clippy::too_many_arguments)]
    fn paginate(
        &self,
        mut items: Vec<Item>,
        limit: Option<usize>,
        exclusive_start_key: Option<&Item>,
        filter: Option<&Condition>,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, AttributeValue>,
    ) -> Result<PageResult, KvError> {
        if let Some(start) = exclusive_start_key {
            let start_key = self.table.primary_key_of(start).map_err(KvError::validation)?;
            let mut past_start = false;
            items.retain(|item| {
                if past_start {
                    return true;
                }
                if self.table.primary_key_of(item).map(|k| k == start_key).unwrap_or(false) {
                    past_start = true;
                }
                false
            });
        }

        let last_evaluated_key = match limit {
            Some(limit) if items.len() > limit => {
                let key = self.table.primary_key_of(&items[limit - 1]).map_err(KvError::validation)?;
                items.truncate(limit);
                Some(self.key_item(&key))
            }
            _ => None,
        };

        let kept = self.apply_filter(items, filter, names, values)?;
        Ok(PageResult { items: kept, last_evaluated_key })
    }

    fn key_item(&self, key: &ItemKey) -> Item {
        let mut item = Item::new();
        item.insert(self.table.schema.key_schema.partition_key.clone(), key.partition.clone());
        if let (Some(sort_name), Some(sort_value)) = (&self.table.schema.key_schema.sort_key, &key.sort) {
            item.insert(sort_name.clone(), sort_value.clone());
        }
        item
    }

    fn apply_filter(
        &self,
        items: Vec<Item>,
        filter: Option<&Condition>,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, AttributeValue>,
    ) -> Result<Vec<Item>, KvError> {
        let Some(filter) = filter else { return Ok(items) };
        let ctx = ExprContext { names, values };
        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            if eval::evaluate(filter, &item, &ctx).map_err(KvError::validation)? {
                kept.push(item);
            }
        }
        Ok(kept)
    }

    fn emit_stream(&self, event_name: EventName, key: &crate::store::ItemKey, old: Option<Item>, new: Option<Item>) {
        let Some(stream_config) = &self.table.schema.stream else { return };
        let mut keys = Item::new();
        keys.insert(self.table.schema.key_schema.partition_key.clone(), key.partition.clone());
        if let Some(sort_name) = &self.table.schema.key_schema.sort_key {
            if let Some(sort_value) = &key.sort {
                keys.insert(sort_name.clone(), sort_value.clone());
            }
        }
        let (new_image, old_image) = match stream_config.view_type {
            StreamViewType::NewImage => (new, None),
            StreamViewType::OldImage => (None, old),
            StreamViewType::NewAndOldImages => (new, old),
            StreamViewType::KeysOnly => (None, None),
        };
        self.stream.append(StreamRecord {
            sequence_number: self.stream.next_sequence(),
            event_name,
            keys,
            new_image,
            old_image,
            approximate_creation_date_time: chrono::Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{AttributeDefinition, KeySchema, ScalarType};

    fn schema() -> TableSchema {
        TableSchema {
            name: "widgets".to_string(),
            key_schema: KeySchema { partition_key: "pk".to_string(), sort_key: None },
            attribute_definitions: vec![AttributeDefinition { name: "pk".to_string(), attr_type: ScalarType::S }],
            global_secondary_indexes: vec![],
            stream: None,
        }
    }

    fn item(pk: &str) -> Item {
        let mut item = Item::new();
        item.insert("pk".to_string(), AttributeValue::S(pk.to_string()));
        item
    }

    #[test]
    fn put_then_get_round_trips() {
        let handle = TableHandle::new(schema(), None);
        let names = BTreeMap::new();
        let values = BTreeMap::new();
        handle.put_item(item("a"), None, &names, &values).unwrap();
        assert_eq!(handle.get_item(&item("a")).unwrap(), Some(item("a")));
    }

    #[test]
    fn put_with_failing_condition_is_rejected() {
        let handle = TableHandle::new(schema(), None);
        let names = BTreeMap::new();
        let values = BTreeMap::new();
        let condition = crate::expr::parser::parse_condition_expression("attribute_exists(pk)").unwrap();
        let err = handle.put_item(item("a"), Some(&condition), &names, &values).unwrap_err();
        assert!(matches!(err, KvError::ConditionalCheckFailed(_)));
    }

    #[test]
    fn update_item_creates_item_when_absent() {
        let handle = TableHandle::new(schema(), None);
        let names = BTreeMap::new();
        let mut values = BTreeMap::new();
        values.insert("v".to_string(), AttributeValue::S("hi".to_string()));
        let update_expr = crate::expr::parser::parse_update_expression("SET greeting = :v").unwrap();
        let result = handle.update_item(&item("a"), &update_expr, None, &names, &values).unwrap();
        assert_eq!(result.get("greeting"), Some(&AttributeValue::S("hi".to_string())));
    }

    #[test]
    fn delete_item_returns_previous_value() {
        let handle = TableHandle::new(schema(), None);
        let names = BTreeMap::new();
        let values = BTreeMap::new();
        handle.put_item(item("a"), None, &names, &values).unwrap();
        let previous = handle.delete_item(&item("a"), None, &names, &values).unwrap();
        assert_eq!(previous, Some(item("a")));
        assert_eq!(handle.get_item(&item("a")).unwrap(), None);
    }

    #[test]
    fn scan_applies_filter_expression() {
        let handle = TableHandle::new(schema(), None);
        let names = BTreeMap::new();
        let values = BTreeMap::new();
        handle.put_item(item("a"), None, &names, &values).unwrap();
        handle.put_item(item("b"), None, &names, &values).unwrap();
        let filter = crate::expr::parser::parse_condition_expression("pk = :target").unwrap();
        let mut filter_values = BTreeMap::new();
        filter_values.insert("target".to_string(), AttributeValue::S("a".to_string()));
        let page = handle.scan(Some(&filter), None, None, None, &names, &filter_values).unwrap();
        assert_eq!(page.items, vec![item("a")]);
        assert!(page.last_evaluated_key.is_none());
    }

    #[test]
    fn scan_limit_truncates_before_filter_is_applied() {
        let handle = TableHandle::new(schema(), None);
        let names = BTreeMap::new();
        let values = BTreeMap::new();
        handle.put_item(item("a"), None, &names, &values).unwrap();
        handle.put_item(item("b"), None, &names, &values).unwrap();
        // "a" sorts first; a Limit of 1 evaluates only "a" before the
        // filter runs, so a filter matching "b" finds nothing even
        // though "b" exists beyond the truncated page.
        let filter = crate::expr::parser::parse_condition_expression("pk = :target").unwrap();
        let mut filter_values = BTreeMap::new();
        filter_values.insert("target".to_string(), AttributeValue::S("b".to_string()));
        let page = handle.scan(Some(&filter), None, Some(1), None, &names, &filter_values).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.last_evaluated_key, Some(item("a")));
    }

    #[test]
    fn scan_resumes_after_exclusive_start_key() {
        let handle = TableHandle::new(schema(), None);
        let names = BTreeMap::new();
        let values = BTreeMap::new();
        handle.put_item(item("a"), None, &names, &values).unwrap();
        handle.put_item(item("b"), None, &names, &values).unwrap();
        handle.put_item(item("c"), None, &names, &values).unwrap();
        let page = handle.scan(None, None, None, Some(&item("a")), &names, &values).unwrap();
        assert_eq!(page.items, vec![item("b"), item("c")]);
    }
}
