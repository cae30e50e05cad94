//! Per-table in-memory store: key encoding, GSIs, and the scan/query
//! primitives `ops.rs` layers condition evaluation and streaming on top
//! of (spec §4.8).

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::table::TableSchema;
use crate::value::{AttributeValue, Item};

#[derive(Debug, Clone, PartialEq)]
pub struct ItemKey {
    pub partition: AttributeValue,
    pub sort: Option<AttributeValue>,
}

impl Eq for ItemKey {}

impl Ord for ItemKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_partition = self.partition.key_cmp(&other.partition).unwrap_or(Ordering::Equal);
        if by_partition != Ordering::Equal {
            return by_partition;
        }
        match (&self.sort, &other.sort) {
            (Some(a), Some(b)) => a.key_cmp(b).unwrap_or(Ordering::Equal),
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for ItemKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The sort-key half of a `Query` key condition; the partition key must
/// always be compared with `=` (spec §4.8).
#[derive(Debug, Clone)]
pub enum SortKeyCondition {
    Eq(AttributeValue),
    Lt(AttributeValue),
    Le(AttributeValue),
    Gt(AttributeValue),
    Ge(AttributeValue),
    Between(AttributeValue, AttributeValue),
    BeginsWith(String),
}

impl SortKeyCondition {
    fn matches(&self, value: &AttributeValue) -> bool {
        match self {
            SortKeyCondition::Eq(v) => value.key_cmp(v) == Some(Ordering::Equal),
            SortKeyCondition::Lt(v) => value.key_cmp(v) == Some(Ordering::Less),
            SortKeyCondition::Le(v) => matches!(value.key_cmp(v), Some(Ordering::Less) | Some(Ordering::Equal)),
            SortKeyCondition::Gt(v) => value.key_cmp(v) == Some(Ordering::Greater),
            SortKeyCondition::Ge(v) => matches!(value.key_cmp(v), Some(Ordering::Greater) | Some(Ordering::Equal)),
            SortKeyCondition::Between(lo, hi) => {
                matches!(value.key_cmp(lo), Some(Ordering::Greater) | Some(Ordering::Equal))
                    && matches!(value.key_cmp(hi), Some(Ordering::Less) | Some(Ordering::Equal))
            }
            SortKeyCondition::BeginsWith(prefix) => matches!(value, AttributeValue::S(s) if s.starts_with(prefix.as_str())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyCondition {
    pub partition: AttributeValue,
    pub sort: Option<SortKeyCondition>,
}

pub struct Table {
    pub schema: TableSchema,
    items: Mutex<BTreeMap<ItemKey, Item>>,
    gsi_indexes: Mutex<HashMap<String, BTreeMap<ItemKey, Vec<ItemKey>>>>,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        let mut gsi_indexes = HashMap::new();
        for gsi in &schema.global_secondary_indexes {
            gsi_indexes.insert(gsi.name.clone(), BTreeMap::new());
        }
        Table { schema, items: Mutex::new(BTreeMap::new()), gsi_indexes: Mutex::new(gsi_indexes) }
    }

    pub fn primary_key_of(&self, item: &Item) -> Result<ItemKey, String> {
        key_of(item, &self.schema.key_schema.partition_key, self.schema.key_schema.sort_key.as_deref())
    }

    fn gsi_key_of(&self, gsi_name: &str, item: &Item) -> Option<ItemKey> {
        let gsi = self.schema.global_secondary_indexes.iter().find(|g| g.name == gsi_name)?;
        key_of(item, &gsi.key_schema.partition_key, gsi.key_schema.sort_key.as_deref()).ok()
    }

    pub fn get(&self, key: &ItemKey) -> Option<Item> {
        self.items.lock().unwrap().get(key).cloned()
    }

    /// Inserts or overwrites `item` at its primary key, returning the
    /// previous item (if any) and refreshing every GSI entry.
    pub fn put(&self, item: Item) -> Result<(ItemKey, Option<Item>), String> {
        let key = self.primary_key_of(&item)?;
        let previous = {
            let mut items = self.items.lock().unwrap();
            items.insert(key.clone(), item.clone())
        };
        self.reindex_gsis(&key, previous.as_ref(), Some(&item));
        Ok((key, previous))
    }

    pub fn delete(&self, key: &ItemKey) -> Option<Item> {
        let previous = self.items.lock().unwrap().remove(key);
        self.reindex_gsis(key, previous.as_ref(), None);
        previous
    }

    fn reindex_gsis(&self, base_key: &ItemKey, previous: Option<&Item>, current: Option<&Item>) {
        let mut gsi_indexes = self.gsi_indexes.lock().unwrap();
        for gsi in &self.schema.global_secondary_indexes {
            let index = gsi_indexes.entry(gsi.name.clone()).or_default();
            if let Some(prev_item) = previous {
                if let Some(old_gsi_key) = self.gsi_key_of(&gsi.name, prev_item) {
                    if let Some(bucket) = index.get_mut(&old_gsi_key) {
                        bucket.retain(|k| k != base_key);
                        if bucket.is_empty() {
                            index.remove(&old_gsi_key);
                        }
                    }
                }
            }
            if let Some(new_item) = current {
                if let Some(new_gsi_key) = self.gsi_key_of(&gsi.name, new_item) {
                    index.entry(new_gsi_key).or_default().push(base_key.clone());
                }
            }
        }
    }

    /// Items for one partition, in sort-key order (reversed when
    /// `forward` is false), restricted by an optional sort-key condition.
    pub fn query_partition(&self, condition: &KeyCondition, forward: bool) -> Vec<Item> {
        let items = self.items.lock().unwrap();
        let lower = ItemKey { partition: condition.partition.clone(), sort: None };
        let mut matched: Vec<Item> = items
            .range(lower..)
            .take_while(|(k, _)| k.partition.key_cmp(&condition.partition) == Some(Ordering::Equal))
            .filter(|(k, _)| match (&condition.sort, &k.sort) {
                (Some(sort_condition), Some(v)) => sort_condition.matches(v),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .map(|(_, item)| item.clone())
            .collect();
        if !forward {
            matched.reverse();
        }
        matched
    }

    pub fn query_gsi(&self, index_name: &str, condition: &KeyCondition, forward: bool) -> Result<Vec<Item>, String> {
        if !self.schema.global_secondary_indexes.iter().any(|g| g.name == index_name) {
            return Err(format!("index '{index_name}' does not exist on table '{}'", self.schema.name));
        }
        let gsi_indexes = self.gsi_indexes.lock().unwrap();
        let index = gsi_indexes.get(index_name).cloned().unwrap_or_default();
        drop(gsi_indexes);
        let items = self.items.lock().unwrap();
        let lower = ItemKey { partition: condition.partition.clone(), sort: None };
        let mut matched: Vec<Item> = index
            .range(lower..)
            .take_while(|(k, _)| k.partition.key_cmp(&condition.partition) == Some(Ordering::Equal))
            .filter(|(k, _)| match (&condition.sort, &k.sort) {
                (Some(sort_condition), Some(v)) => sort_condition.matches(v),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .flat_map(|(_, base_keys)| base_keys.iter().filter_map(|bk| items.get(bk).cloned()))
            .collect();
        if !forward {
            matched.reverse();
        }
        Ok(matched)
    }

    /// All items in primary-key order, optionally restricted to one
    /// parallel-scan segment by hashing the partition-key value.
    pub fn scan_all(&self, segment: Option<(usize, usize)>) -> Vec<Item> {
        let items = self.items.lock().unwrap();
        items
            .iter()
            .filter(|(k, _)| match segment {
                Some((seg, total)) if total > 0 => partition_hash(&k.partition) % total == seg,
                _ => true,
            })
            .map(|(_, item)| item.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}

fn key_of(item: &Item, partition_attr: &str, sort_attr: Option<&str>) -> Result<ItemKey, String> {
    let partition = item.get(partition_attr).cloned().ok_or_else(|| format!("item is missing partition key '{partition_attr}'"))?;
    let sort = match sort_attr {
        Some(name) => Some(item.get(name).cloned().ok_or_else(|| format!("item is missing sort key '{name}'"))?),
        None => None,
    };
    Ok(ItemKey { partition, sort })
}

fn partition_hash(value: &AttributeValue) -> usize {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    match value {
        AttributeValue::S(s) => s.hash(&mut hasher),
        AttributeValue::N(n) => n.normalize().to_string().hash(&mut hasher),
        AttributeValue::B(b) => b.hash(&mut hasher),
        _ => {}
    }
    hasher.finish() as usize
}
