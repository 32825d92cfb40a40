use std::{collections::HashMap, str::FromStr};

use serde_json::Value;

use super::error::TypeError;

pub type FormData = HashMap<String, Value>;

/// Query parameters or form fields as decoded by the HTTP layer.
pub struct Form {
    inner: HashMap<String, Value>,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    pub fn from_query(query: HashMap<String, String>) -> Self {
        Self {
            inner: query
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect(),
        }
    }

    /// Numbers may arrive either as JSON numbers or as strings.
    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, TypeError>
    where
        T: FromStr,
    {
        match self.inner.get(key) {
            Some(Value::Null) | None => Ok(None),
            Some(Value::Number(n)) => n
                .to_string()
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new("Invalid type conversion")),
            Some(Value::String(v)) if v.trim().is_empty() => Ok(None),
            Some(Value::String(v)) => v
                .trim()
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new("Invalid type conversion")),
            Some(_) => Err(TypeError::new("Failed to parse value as number")),
        }
    }

    pub fn get_flag(&self, key: &str) -> Result<bool, TypeError> {
        match self.inner.get(key) {
            Some(Value::Null) | None => Ok(false),
            Some(Value::Bool(v)) => Ok(*v),
            Some(Value::Number(n)) => Ok(n.as_i64().map(|n| n != 0).unwrap_or(false)),
            Some(Value::String(v)) => match v.trim() {
                "1" | "true" => Ok(true),
                "" | "0" | "false" => Ok(false),
                _ => Err(TypeError::new("Invalid flag value")),
            },
            Some(_) => Err(TypeError::new("Failed to parse value as flag")),
        }
    }

    /// A repeated parameter is an array; a single occurrence is a plain string.
    pub fn get_list(&self, key: &str) -> Result<Vec<String>, TypeError> {
        match self.inner.get(key) {
            Some(Value::Null) | None => Ok(vec![]),
            Some(Value::String(v)) => Ok(vec![v.to_owned()]),
            Some(Value::Array(values)) => values
                .iter()
                .map(|value| {
                    value
                        .as_str()
                        .map(|v| v.to_string())
                        .ok_or_else(|| TypeError::new("Failed to parse value as str"))
                })
                .collect(),
            Some(_) => Err(TypeError::new("Failed to parse value as list")),
        }
    }
}
