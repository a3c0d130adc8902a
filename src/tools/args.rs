use serde_json::{Map, Value};

use crate::error::ToolError;
use crate::tools::{ParamType, ToolParameter};

/// A parameter value converted to its declared semantic type.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Number(f64),
    /// Canonical (declared) spelling of the matched enum name.
    Enum(String),
}

/// Bound arguments handed to a tool handler, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    values: Vec<(String, ToolValue)>,
}

impl ToolArguments {
    pub fn get(&self, name: &str) -> Option<&ToolValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            ToolValue::String(s) | ToolValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            ToolValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            ToolValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value; integers widen.
    pub fn f64(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            ToolValue::Number(n) => Some(*n),
            ToolValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ToolValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// Converts a loosely-typed payload (object, JSON string or null) into typed
/// arguments for `parameters`. Undeclared keys are ignored.
pub fn bind_arguments(parameters: &[ToolParameter], payload: &Value) -> Result<ToolArguments, ToolError> {
    let object = payload_object(payload)?;

    let mut values = Vec::with_capacity(parameters.len());
    for parameter in parameters {
        let raw = object.get(&parameter.name).filter(|v| !v.is_null());
        let value = match raw {
            Some(raw) => convert(parameter, raw)?,
            None if parameter.required => return Err(ToolError::MissingParameter(parameter.name.clone())),
            None => parameter
                .default
                .clone()
                .unwrap_or_else(|| parameter.kind.zero_value()),
        };
        values.push((parameter.name.clone(), value));
    }
    Ok(ToolArguments { values })
}

fn payload_object(payload: &Value) -> Result<Map<String, Value>, ToolError> {
    match payload {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map.clone()),
        Value::String(text) if text.trim().is_empty() => Ok(Map::new()),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(Value::Null) => Ok(Map::new()),
            Ok(other) => Err(ToolError::InvalidPayload(format!("expected an object, got {other}"))),
            Err(e) => Err(ToolError::InvalidPayload(e.to_string())),
        },
        other => Err(ToolError::InvalidPayload(format!("expected an object, got {other}"))),
    }
}

fn convert(parameter: &ToolParameter, raw: &Value) -> Result<ToolValue, ToolError> {
    let invalid = || ToolError::InvalidArgument {
        name: parameter.name.clone(),
        expected: parameter.kind.type_name(),
    };

    match &parameter.kind {
        ParamType::String => Ok(ToolValue::String(match raw {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        ParamType::Boolean => match raw {
            Value::Bool(b) => Ok(ToolValue::Boolean(*b)),
            Value::String(s) => s.trim().to_ascii_lowercase().parse().map(ToolValue::Boolean).map_err(|_| invalid()),
            _ => Err(invalid()),
        },
        ParamType::Integer => match raw {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(ToolValue::Integer)
                .ok_or_else(invalid),
            Value::String(s) => s.trim().parse().map(ToolValue::Integer).map_err(|_| invalid()),
            _ => Err(invalid()),
        },
        ParamType::Number => match raw {
            Value::Number(n) => n.as_f64().map(ToolValue::Number).ok_or_else(invalid),
            Value::String(s) => s.trim().parse().map(ToolValue::Number).map_err(|_| invalid()),
            _ => Err(invalid()),
        },
        ParamType::Enum(names) => {
            let Value::String(s) = raw else {
                return Err(invalid());
            };
            names
                .iter()
                .find(|name| name.eq_ignore_ascii_case(s.trim()))
                .map(|name| ToolValue::Enum(name.clone()))
                .ok_or_else(invalid)
        }
    }
}
