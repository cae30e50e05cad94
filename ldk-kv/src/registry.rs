//! Table lifecycle and the cross-table transactional/batch operations
//! (spec §4.8): `CreateTable`/`DeleteTable`, `TransactWriteItems`,
//! `TransactGetItems`, `BatchGetItem`, `BatchWriteItem`. Best-effort
//! snapshot persistence to `{data-dir}/dynamodb/{table}.json`; stream
//! records themselves are not persisted across restart.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

use crate::error::KvError;
use crate::expr::ast::Condition;
use crate::ops::{PageResult, TableHandle};
use crate::stream::DeliverFn;
use crate::store::KeyCondition;
use crate::table::TableSchema;
use crate::value::{AttributeValue, Item};

pub struct TableRegistry {
    data_dir: Option<PathBuf>,
    tables: DashMap<String, Arc<TableHandle>>,
}

impl TableRegistry {
    pub fn new(data_dir: Option<PathBuf>) -> Self {
        TableRegistry { data_dir, tables: DashMap::new() }
    }

    pub fn create_table(&self, schema: TableSchema, deliver: Option<DeliverFn>) -> Result<(), KvError> {
        let name = schema.name.clone();
        if self.tables.contains_key(&name) {
            return Err(KvError::TableExists(name));
        }
        self.tables.insert(name, Arc::new(TableHandle::new(schema, deliver)));
        Ok(())
    }

    pub fn delete_table(&self, name: &str) -> Result<(), KvError> {
        self.tables.remove(name).map(|_| ()).ok_or_else(|| KvError::TableNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<Arc<TableHandle>> {
        self.tables.get(name).map(|entry| entry.value().clone())
    }

    pub fn require(&self, name: &str) -> Result<Arc<TableHandle>, KvError> {
        self.get(name).ok_or_else(|| KvError::TableNotFound(name.to_string()))
    }

    pub fn list_names(&self) -> Vec<String> {
        self.tables.iter().map(|entry| entry.key().clone()).collect()
    }

    fn snapshot(&self, name: &str) {
        let Some(data_dir) = &self.data_dir else { return };
        let Some(handle) = self.get(name) else { return };
        let path = data_dir.join("dynamodb").join(format!("{name}.json"));
        let items = handle.table.scan_all(None);
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(table = name, error = %e, "failed to create snapshot directory");
                return;
            }
        }
        match serde_json::to_vec_pretty(&items) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(&path, bytes) {
                    warn!(table = name, error = %e, "failed to write table snapshot");
                }
            }
            Err(e) => warn!(table = name, error = %e, "failed to serialize table snapshot"),
        }
    }

    pub fn put_item(
        &self,
        table: &str,
        item: Item,
        condition: Option<&Condition>,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, AttributeValue>,
    ) -> Result<Option<Item>, KvError> {
        let result = self.require(table)?.put_item(item, condition, names, values)?;
        self.snapshot(table);
        Ok(result)
    }

    pub fn delete_item(
        &self,
        table: &str,
        key: &Item,
        condition: Option<&Condition>,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, AttributeValue>,
    ) -> Result<Option<Item>, KvError> {
        let result = self.require(table)?.delete_item(key, condition, names, values)?;
        self.snapshot(table);
        Ok(result)
    }

    pub fn update_item(
        &self,
        table: &str,
        key: &Item,
        update_expr: &crate::expr::update::UpdateExpr,
        condition: Option<&Condition>,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, AttributeValue>,
    ) -> Result<Item, KvError> {
        let result = self.require(table)?.update_item(key, update_expr, condition, names, values)?;
        self.snapshot(table);
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn query(
        &self,
        table: &str,
        condition: &KeyCondition,
        index: Option<&str>,
        filter: Option<&Condition>,
        forward: bool,
        limit: Option<usize>,
        exclusive_start_key: Option<&Item>,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, AttributeValue>,
    ) -> Result<PageResult, KvError> {
        self.require(table)?.query(condition, index, filter, forward, limit, exclusive_start_key, names, values)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn scan(
        &self,
        table: &str,
        filter: Option<&Condition>,
        segment: Option<(usize, usize)>,
        limit: Option<usize>,
        exclusive_start_key: Option<&Item>,
        names: &BTreeMap<String, String>,
        values: &BTreeMap<String, AttributeValue>,
    ) -> Result<PageResult, KvError> {
        self.require(table)?.scan(filter, segment, limit, exclusive_start_key, names, values)
    }
}

/// One entry in a `TransactWriteItems` request. Only one of `put`,
/// `delete`, `update`, `condition_check` is set per AWS's request shape;
/// `table` and `key_or_item` identify the target.
pub struct TransactWrite {
    pub table: String,
    pub item: Item,
    pub condition: Option<Condition>,
    pub names: BTreeMap<String, String>,
    pub values: BTreeMap<String, AttributeValue>,
    pub kind: TransactWriteKind,
}

pub enum TransactWriteKind {
    Put,
    Delete,
    Update(crate::expr::update::UpdateExpr),
    ConditionCheck,
}

impl TableRegistry {
    /// All-or-nothing across tables: every condition is checked first
    /// without committing; only if every entry passes are the writes
    /// applied. On failure returns one reason per entry (`None` where
    /// that entry's own condition held) via `KvError::TransactionCanceled`.
    pub fn transact_write_items(&self, items: Vec<TransactWrite>) -> Result<(), KvError> {
        let mut handles = Vec::with_capacity(items.len());
        for entry in &items {
            handles.push(self.require(&entry.table)?);
        }

        let mut reasons: Vec<Option<String>> = Vec::with_capacity(items.len());
        let mut any_failed = false;
        for (entry, handle) in items.iter().zip(&handles) {
            match handle.check_condition(&entry.item, entry.condition.as_ref(), &entry.names, &entry.values) {
                Ok(()) => reasons.push(None),
                Err(e) => {
                    any_failed = true;
                    reasons.push(Some(e.to_string()));
                }
            }
        }
        if any_failed {
            return Err(KvError::TransactionCanceled(reasons));
        }

        for (entry, handle) in items.into_iter().zip(handles) {
            match entry.kind {
                TransactWriteKind::Put => {
                    handle.commit_put(entry.item)?;
                }
                TransactWriteKind::Delete => {
                    handle.commit_delete(&entry.item)?;
                }
                TransactWriteKind::Update(update_expr) => {
                    let ctx = crate::expr::context::ExprContext { names: &entry.names, values: &entry.values };
                    let key = handle.table.primary_key_of(&entry.item).map_err(KvError::validation)?;
                    let mut next = handle.table.get(&key).unwrap_or_else(|| entry.item.clone());
                    crate::expr::update::apply(&update_expr, &mut next, &ctx).map_err(KvError::validation)?;
                    handle.commit_put(next)?;
                }
                TransactWriteKind::ConditionCheck => {}
            }
            self.snapshot(&entry.table);
        }
        Ok(())
    }

    pub fn transact_get_items(&self, requests: Vec<(String, Item)>) -> Result<Vec<Option<Item>>, KvError> {
        let mut results = Vec::with_capacity(requests.len());
        for (table, key) in requests {
            let handle = self.require(&table)?;
            results.push(handle.get_item(&key)?);
        }
        Ok(results)
    }

    pub fn batch_get_item(&self, requests: Vec<(String, Item)>) -> Result<Vec<(String, Option<Item>)>, KvError> {
        let mut results = Vec::with_capacity(requests.len());
        for (table, key) in requests {
            let handle = self.require(&table)?;
            let item = handle.get_item(&key)?;
            results.push((table, item));
        }
        Ok(results)
    }

    /// Non-transactional per AWS's real semantics (batch writes don't
    /// support conditions); aborts without partial effect only on a
    /// structural error such as an unknown table name.
    pub fn batch_write_item(&self, writes: Vec<(String, BatchWrite)>) -> Result<(), KvError> {
        let mut handles = Vec::with_capacity(writes.len());
        for (table, _) in &writes {
            handles.push(self.require(table)?);
        }
        for ((table, write), handle) in writes.into_iter().zip(handles) {
            match write {
                BatchWrite::Put(item) => {
                    handle.commit_put(item)?;
                }
                BatchWrite::Delete(key) => {
                    handle.commit_delete(&key)?;
                }
            }
            self.snapshot(&table);
        }
        Ok(())
    }
}

pub enum BatchWrite {
    Put(Item),
    Delete(Item),
}
