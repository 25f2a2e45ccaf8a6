use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One row of backend analytics data. The column set is feature-specific.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_object(obj: serde_json::Map<String, Value>) -> Self {
        Self {
            data: obj.into_iter().collect(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.data.insert(key.to_string(), value.into());
    }

    /// Display text of a column; `None` for missing or null values.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.data.get(key)? {
            Value::Null => None,
            v => Some(display_text(v)),
        }
    }

    /// Column names in a stable (sorted) order.
    pub fn columns(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.keys().cloned().collect();
        keys.sort();
        keys
    }
}

pub fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Query parameters understood by the dashboard endpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub country: Option<String>,
    pub store: Option<String>,
    pub status: Option<String>,
    pub extra: Vec<(String, String)>,
}

impl QueryParams {
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(d) = self.date_from {
            pairs.push(("data_inicio".to_string(), d.format("%Y-%m-%d").to_string()));
        }
        if let Some(d) = self.date_to {
            pairs.push(("data_fim".to_string(), d.format("%Y-%m-%d").to_string()));
        }
        if let Some(c) = &self.country {
            pairs.push(("pais".to_string(), c.clone()));
        }
        if let Some(s) = &self.store {
            pairs.push(("loja".to_string(), s.clone()));
        }
        if let Some(s) = &self.status {
            pairs.push(("status".to_string(), s.clone()));
        }
        pairs.extend(self.extra.iter().cloned());
        pairs
    }
}
