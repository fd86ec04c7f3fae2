//! Shared fakes for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use multi_db_mcp::config::BackendSettings;
use multi_db_mcp::db::{ConnectionHandle, Connector, Dialect, Row, RowSource};
use multi_db_mcp::error::{DbError, DbResult};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One statement seen by a [`RecordingSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub sql: String,
    pub params: Vec<String>,
}

/// Row source that records every statement and answers with canned rows.
#[derive(Debug, Default)]
pub struct RecordingSource {
    calls: Mutex<Vec<Recorded>>,
    rows: Vec<Row>,
    closed: Mutex<bool>,
}

impl RecordingSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_rows(rows: Vec<JsonValue>) -> Arc<Self> {
        Arc::new(Self {
            rows: rows.into_iter().map(row).collect(),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Recorded {
        self.calls().pop().expect("no statement was executed")
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

#[async_trait]
impl RowSource for RecordingSource {
    async fn fetch_rows(&self, sql: &str, params: &[String]) -> DbResult<Vec<Row>> {
        self.calls.lock().unwrap().push(Recorded {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        Ok(self.rows.clone())
    }

    async fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }
}

/// Connector that hands out recording sources and fails for chosen names.
#[derive(Debug, Default)]
pub struct FakeConnector {
    pub failing: Vec<String>,
    pub sources: Mutex<HashMap<String, Arc<RecordingSource>>>,
}

impl FakeConnector {
    pub fn failing(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn source(&self, name: &str) -> Arc<RecordingSource> {
        self.sources.lock().unwrap()[name].clone()
    }
}

impl Connector for FakeConnector {
    fn connect(&self, settings: &BackendSettings) -> DbResult<Arc<dyn RowSource>> {
        if self.failing.contains(&settings.name) {
            return Err(DbError::construction(&settings.name, "simulated failure"));
        }
        let source = RecordingSource::new();
        self.sources
            .lock()
            .unwrap()
            .insert(settings.name.clone(), source.clone());
        Ok(source)
    }
}

pub fn row(value: JsonValue) -> Row {
    value.as_object().cloned().expect("row must be a JSON object")
}

pub fn handle(name: &str, dialect: Dialect, source: Arc<RecordingSource>) -> ConnectionHandle {
    ConnectionHandle::new(name, dialect, source)
}

/// Environment lookup backed by a fixed map.
pub fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}
