use crate::{
    db::{
        query::CompareOp,
        store::{
            AdapterError, ColumnFilter, Operation, SelectOperation, StoreAdapter, StoreResponse,
            StoreRow,
        },
    },
    value::{Value, compare_order},
};
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::Mutex,
};

///
/// MemoryAdapter
///
/// Reference store adapter over in-process maps: key assignment, version
/// checking, filter evaluation, and pagination, exactly as the adapter
/// contract describes them. Backs the engine test suites. A `Mutex`
/// guards the state so one adapter can serve many single-threaded
/// sessions.
///

#[derive(Debug, Default)]
pub struct MemoryAdapter {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    relations: BTreeMap<String, Relation>,
    journal: Vec<Operation>,
    writes_done: u64,
    fail_after: Option<u64>,
}

#[derive(Debug, Default)]
struct Relation {
    rows: BTreeMap<Value, BTreeMap<String, Value>>,
    next_key: u64,
}

impl MemoryAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `count` write operations succeed, then fail every later write.
    /// Drives partial-flush scenarios in tests.
    pub fn fail_after(&self, count: u64) {
        self.lock().fail_after = Some(count);
    }

    /// Every operation received so far, in arrival order, including any
    /// write that was rejected.
    #[must_use]
    pub fn ops(&self) -> Vec<Operation> {
        self.lock().journal.clone()
    }

    /// The write operations received so far, in arrival order.
    #[must_use]
    pub fn writes(&self) -> Vec<Operation> {
        self.lock()
            .journal
            .iter()
            .filter(|op| op.is_write())
            .cloned()
            .collect()
    }

    pub fn clear_ops(&self) {
        self.lock().journal.clear();
    }

    /// Fetch one stored row for assertions.
    #[must_use]
    pub fn row(&self, relation: &str, key: &Value) -> Option<Vec<(String, Value)>> {
        self.lock()
            .relations
            .get(relation)
            .and_then(|rel| rel.rows.get(key))
            .map(|row| row.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    #[must_use]
    pub fn row_count(&self, relation: &str) -> usize {
        self.lock()
            .relations
            .get(relation)
            .map_or(0, |rel| rel.rows.len())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().expect("memory adapter mutex poisoned")
    }
}

impl StoreAdapter for MemoryAdapter {
    fn execute(&self, operation: Operation) -> Result<StoreResponse, AdapterError> {
        let mut state = self.lock();
        state.journal.push(operation.clone());

        if operation.is_write() {
            if let Some(limit) = state.fail_after
                && state.writes_done >= limit
            {
                return Err(AdapterError::Other("injected store failure".to_string()));
            }
            state.writes_done += 1;
        }

        match operation {
            Operation::Insert {
                relation,
                key_column,
                key,
                values,
            } => state.insert(&relation, &key_column, key, values),
            Operation::Update {
                relation,
                key,
                changed,
                expected_version,
                ..
            } => state.update(&relation, &key, changed, expected_version),
            Operation::Delete { relation, key, .. } => state.delete(&relation, &key),
            Operation::Select(select) => state.select(&select),
        }
    }
}

impl MemoryState {
    fn insert(
        &mut self,
        relation: &str,
        key_column: &str,
        key: Option<Value>,
        values: Vec<(String, Value)>,
    ) -> Result<StoreResponse, AdapterError> {
        let rel = self.relations.entry(relation.to_string()).or_default();

        let key = match key {
            Some(key) => key,
            None => {
                rel.next_key += 1;
                Value::Uint(rel.next_key)
            }
        };
        if rel.rows.contains_key(&key) {
            return Err(AdapterError::Other(format!(
                "duplicate key {key} in '{relation}'"
            )));
        }

        let mut row: BTreeMap<String, Value> = values.into_iter().collect();
        row.insert(key_column.to_string(), key.clone());
        rel.rows.insert(key.clone(), row);

        Ok(StoreResponse::InsertedKey(key))
    }

    fn update(
        &mut self,
        relation: &str,
        key: &Value,
        changed: Vec<(String, Value)>,
        expected_version: Option<(String, Value)>,
    ) -> Result<StoreResponse, AdapterError> {
        let row = self
            .relations
            .get_mut(relation)
            .and_then(|rel| rel.rows.get_mut(key));

        let Some(row) = row else {
            // A vanished row is a conflict when the caller is version
            // checking, a plain failure otherwise.
            if expected_version.is_some() {
                return Err(AdapterError::Conflict {
                    relation: relation.to_string(),
                    key: key.clone(),
                });
            }
            return Err(AdapterError::Other(format!(
                "no row {key} in '{relation}'"
            )));
        };

        if let Some((column, expected)) = expected_version {
            let stored = row.get(&column).unwrap_or(&Value::Null);
            if *stored != expected {
                return Err(AdapterError::Conflict {
                    relation: relation.to_string(),
                    key: key.clone(),
                });
            }
        }

        for (column, value) in changed {
            row.insert(column, value);
        }

        Ok(StoreResponse::Affected(1))
    }

    fn delete(&mut self, relation: &str, key: &Value) -> Result<StoreResponse, AdapterError> {
        let removed = self
            .relations
            .get_mut(relation)
            .and_then(|rel| rel.rows.remove(key));

        Ok(StoreResponse::Affected(u64::from(removed.is_some())))
    }

    fn select(&self, select: &SelectOperation) -> Result<StoreResponse, AdapterError> {
        let rows = self
            .relations
            .get(&select.relation)
            .map(|rel| &rel.rows);

        let mut matched = Vec::new();
        for row in rows.into_iter().flatten().map(|(_, row)| row) {
            if matches_all(row, &select.filters)? {
                matched.push(StoreRow::new(
                    row.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                ));
            }
        }

        let offset = usize::try_from(select.page.offset.unwrap_or(0)).unwrap_or(usize::MAX);
        let limit = select
            .page
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
        let page: Vec<StoreRow> = matched.into_iter().skip(offset).take(limit).collect();

        Ok(StoreResponse::Rows(page))
    }
}

fn matches_all(
    row: &BTreeMap<String, Value>,
    filters: &[ColumnFilter],
) -> Result<bool, AdapterError> {
    for filter in filters {
        if !matches_one(row, filter)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_one(row: &BTreeMap<String, Value>, filter: &ColumnFilter) -> Result<bool, AdapterError> {
    let actual = row.get(&filter.column).unwrap_or(&Value::Null);

    let matched = match filter.op {
        CompareOp::Eq => *actual == filter.value,
        CompareOp::Ne => *actual != filter.value,
        CompareOp::Lt => order_is(actual, &filter.value, Ordering::Less),
        CompareOp::Lte => !order_is(actual, &filter.value, Ordering::Greater)
            && compare_order(actual, &filter.value).is_some(),
        CompareOp::Gt => order_is(actual, &filter.value, Ordering::Greater),
        CompareOp::Gte => !order_is(actual, &filter.value, Ordering::Less)
            && compare_order(actual, &filter.value).is_some(),
        CompareOp::In => list_contains(&filter.value, actual)?,
        CompareOp::NotIn => !list_contains(&filter.value, actual)?,
        CompareOp::Contains | CompareOp::StartsWith | CompareOp::EndsWith => {
            return Err(AdapterError::Other(format!(
                "comparator {:?} not implemented by the memory store",
                filter.op
            )));
        }
    };

    Ok(matched)
}

fn order_is(actual: &Value, literal: &Value, expected: Ordering) -> bool {
    compare_order(actual, literal) == Some(expected)
}

fn list_contains(list: &Value, actual: &Value) -> Result<bool, AdapterError> {
    let Value::List(members) = list else {
        return Err(AdapterError::Other(
            "membership filter requires a list literal".to_string(),
        ));
    };

    Ok(members.iter().any(|member| member == actual))
}

// ---- tests -------------------------------------------------------------
