use crate::error::{Error, ErrorKind, ErrorOrigin, QueryErrorKind};
use rowmap_core::{
    db::{
        self,
        instance::InstanceHandle,
        query::Predicate,
        store::{Page, StoreAdapter},
        unit::{FlushReport, SessionState},
    },
    model::Registry,
    obs::MetricsSink,
    value::Value,
};
use std::{collections::BTreeMap, sync::Arc};

///
/// Session
///
/// Public facade for one unit of work. Wraps the core session and converts
/// core errors into `rowmap::Error` at the boundary.
///

pub struct Session {
    inner: db::Session,
}

impl Session {
    // ------------------------------------------------------------------
    // Lifecycle & configuration
    // ------------------------------------------------------------------

    /// Open a session over a sealed registry and a store adapter.
    #[must_use]
    pub fn open(registry: Arc<Registry>, adapter: Arc<dyn StoreAdapter>) -> Self {
        Self {
            inner: db::Session::new(registry, adapter),
        }
    }

    /// Enable debug traces for operations executed in this session.
    #[must_use]
    pub fn debug(mut self) -> Self {
        self.inner = self.inner.debug();
        self
    }

    /// Override the metrics sink for this session.
    #[must_use]
    pub fn metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.inner = self.inner.metrics_sink(sink);
        self
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.inner.state()
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.is_dirty()
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Fetch one instance by primary key.
    pub fn get(
        &mut self,
        type_name: &str,
        key: impl Into<Value>,
    ) -> Result<Option<InstanceHandle>, Error> {
        Ok(self.inner.get(type_name, &key.into())?)
    }

    /// Start a query over one mapped type.
    pub fn query<'a>(&'a mut self, type_name: &str) -> SessionQuery<'a> {
        SessionQuery {
            session: self,
            type_name: type_name.to_string(),
            predicate: Predicate::all(),
            page: Page::default(),
        }
    }

    /// Resolve a relationship on first access; later calls reuse the
    /// recorded target keys.
    pub fn load_relation(
        &mut self,
        handle: &InstanceHandle,
        name: &str,
    ) -> Result<Vec<InstanceHandle>, Error> {
        Ok(self.inner.load_relation(handle, name)?)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Admit a newly created instance with the given attribute values.
    pub fn add<K, I>(&mut self, type_name: &str, values: I) -> Result<InstanceHandle, Error>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let values: BTreeMap<String, Value> = values
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();

        Ok(self.inner.add(type_name, values)?)
    }

    /// Mark an instance for deletion at the next flush.
    pub fn delete(&mut self, handle: &InstanceHandle) -> Result<(), Error> {
        Ok(self.inner.delete(handle)?)
    }

    // ------------------------------------------------------------------
    // Unit-of-work lifecycle
    // ------------------------------------------------------------------

    /// Write tracked changes to the store in dependency order.
    pub fn flush(&mut self) -> Result<FlushReport, Error> {
        Ok(self.inner.flush()?)
    }

    /// Flush if dirty, then finalize the session.
    pub fn commit(&mut self) -> Result<FlushReport, Error> {
        Ok(self.inner.commit()?)
    }

    /// Discard tracked changes and evict every instance; the session stays
    /// open and usable.
    pub fn rollback(&mut self) -> Result<(), Error> {
        Ok(self.inner.rollback()?)
    }

    /// Terminate the session. Idempotent.
    pub fn close(&mut self) {
        self.inner.close();
    }
}

///
/// SessionQuery
///
/// Builder for attribute-predicate queries: conjunction filters plus
/// opaque pagination, executed against the session's store adapter.
///

pub struct SessionQuery<'a> {
    session: &'a mut Session,
    type_name: String,
    predicate: Predicate,
    page: Page,
}

impl SessionQuery<'_> {
    /// Add clauses to the conjunction.
    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicate = self.predicate & predicate;
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.page = self.page.offset(offset);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.page = self.page.limit(limit);
        self
    }

    /// Execute and return every match.
    pub fn all(self) -> Result<Vec<InstanceHandle>, Error> {
        Ok(self
            .session
            .inner
            .query(&self.type_name, &self.predicate, self.page)?)
    }

    /// Execute and return the first match, if any.
    pub fn first(self) -> Result<Option<InstanceHandle>, Error> {
        let mut handles = self.limit(1).all()?;
        Ok(handles.pop())
    }

    /// Execute and require exactly one match.
    pub fn one(self) -> Result<InstanceHandle, Error> {
        let type_name = self.type_name.clone();
        let mut handles = self.limit(2).all()?;

        match handles.len() {
            1 => Ok(handles.swap_remove(0)),
            0 => Err(Error::new(
                ErrorKind::Query(QueryErrorKind::NotFound),
                ErrorOrigin::Response,
                format!("no '{type_name}' row matched"),
            )),
            _ => Err(Error::new(
                ErrorKind::Query(QueryErrorKind::NotUnique),
                ErrorOrigin::Response,
                format!("more than one '{type_name}' row matched"),
            )),
        }
    }
}
