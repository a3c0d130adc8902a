use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{json, Map, Value};

use crate::tools::{ToolArguments, ToolValue};
use crate::types::tools::{FunctionTool, Tool};

/// Semantic type of a tool parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    String,
    Boolean,
    Integer,
    Number,
    /// String restricted to the listed names, matched case-insensitively.
    Enum(Vec<String>),
}

impl ParamType {
    pub fn json_type(&self) -> &'static str {
        match self {
            ParamType::String | ParamType::Enum(_) => "string",
            ParamType::Boolean => "boolean",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ParamType::Enum(_) => "enum",
            other => other.json_type(),
        }
    }

    /// Value substituted for an absent optional parameter without a declared default.
    pub fn zero_value(&self) -> ToolValue {
        match self {
            ParamType::String => ToolValue::String(String::new()),
            ParamType::Boolean => ToolValue::Boolean(false),
            ParamType::Integer => ToolValue::Integer(0),
            ParamType::Number => ToolValue::Number(0.0),
            ParamType::Enum(values) => ToolValue::Enum(values.first().cloned().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolParameter {
    pub name: String,
    pub description: String,
    pub kind: ParamType,
    pub required: bool,
    pub default: Option<ToolValue>,
}

impl ToolParameter {
    pub fn new(name: &str, description: &str, kind: ParamType) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            kind,
            required: true,
            default: None,
        }
    }

    pub fn string(name: &str, description: &str) -> Self {
        Self::new(name, description, ParamType::String)
    }

    pub fn boolean(name: &str, description: &str) -> Self {
        Self::new(name, description, ParamType::Boolean)
    }

    pub fn integer(name: &str, description: &str) -> Self {
        Self::new(name, description, ParamType::Integer)
    }

    pub fn number(name: &str, description: &str) -> Self {
        Self::new(name, description, ParamType::Number)
    }

    pub fn enumeration(name: &str, description: &str, values: &[&str]) -> Self {
        let values = values.iter().map(|v| v.to_string()).collect();
        Self::new(name, description, ParamType::Enum(values))
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Declares a default; the parameter becomes optional.
    pub fn with_default(mut self, default: ToolValue) -> Self {
        self.required = false;
        self.default = Some(default);
        self
    }

    fn schema(&self) -> Value {
        let mut property = Map::new();
        property.insert("type".to_string(), json!(self.kind.json_type()));
        if !self.description.trim().is_empty() {
            property.insert("description".to_string(), json!(self.description));
        }
        if let ParamType::Enum(values) = &self.kind {
            property.insert("enum".to_string(), json!(values));
        }
        Value::Object(property)
    }
}

/// What a tool handler hands back. Text passes through untouched; structured
/// values are serialized to JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Empty,
    Text(String),
    Json(Value),
}

impl ToolOutput {
    pub fn json<T: serde::Serialize>(value: &T) -> anyhow::Result<Self> {
        Ok(ToolOutput::Json(serde_json::to_value(value)?))
    }

    pub fn into_text(self) -> String {
        match self {
            ToolOutput::Empty => "{}".to_string(),
            ToolOutput::Text(text) if text.trim().is_empty() => "{}".to_string(),
            ToolOutput::Text(text) => text,
            ToolOutput::Json(Value::String(text)) => text,
            ToolOutput::Json(Value::Null) => "{}".to_string(),
            ToolOutput::Json(value) => value.to_string(),
        }
    }
}

impl From<()> for ToolOutput {
    fn from(_: ()) -> Self {
        ToolOutput::Empty
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        ToolOutput::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        ToolOutput::Text(text.to_string())
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        ToolOutput::Json(value)
    }
}

pub trait ToolHandler: Send + Sync {
    fn call(&self, args: ToolArguments) -> BoxFuture<'static, anyhow::Result<ToolOutput>>;
}

impl<F, Fut> ToolHandler for F
where
    F: Fn(ToolArguments) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<ToolOutput>> + Send + 'static,
{
    fn call(&self, args: ToolArguments) -> BoxFuture<'static, anyhow::Result<ToolOutput>> {
        Box::pin(self(args))
    }
}

/// Returns an optional replacement for the event's template message.
pub trait EventHandler: Send + Sync {
    fn call(&self) -> anyhow::Result<Option<String>>;
}

impl<F> EventHandler for F
where
    F: Fn() -> anyhow::Result<Option<String>> + Send + Sync,
{
    fn call(&self) -> anyhow::Result<Option<String>> {
        self()
    }
}

#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
    pub handler: Arc<dyn ToolHandler>,
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl ToolDefinition {
    pub fn new<H>(name: &str, description: &str, handler: H) -> Self
    where
        H: ToolHandler + 'static,
    {
        Self {
            name: name.trim().to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn with_parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Function schema sent in `session.update`.
    pub fn schema(&self) -> Tool {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.schema()))
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        let mut parameters = json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            parameters["required"] = json!(required);
        }
        Tool::Function(FunctionTool::new(&self.name, &self.description, parameters))
    }
}

#[derive(Clone)]
pub struct EventDefinition {
    pub name: String,
    pub description: String,
    /// Template sent as a user message when the event fires.
    pub message: String,
    pub interrupt_response: bool,
    pub request_response: bool,
    pub handler: Option<Arc<dyn EventHandler>>,
}

impl fmt::Debug for EventDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDefinition")
            .field("name", &self.name)
            .field("message", &self.message)
            .field("interrupt_response", &self.interrupt_response)
            .field("request_response", &self.request_response)
            .finish_non_exhaustive()
    }
}

impl EventDefinition {
    pub fn new(name: &str, description: &str, message: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            description: description.to_string(),
            message: message.trim().to_string(),
            interrupt_response: true,
            request_response: true,
            handler: None,
        }
    }

    pub fn with_interrupt_response(mut self, interrupt_response: bool) -> Self {
        self.interrupt_response = interrupt_response;
        self
    }

    pub fn with_request_response(mut self, request_response: bool) -> Self {
        self.request_response = request_response;
        self
    }

    pub fn with_handler<H>(mut self, handler: H) -> Self
    where
        H: EventHandler + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: ToolArguments) -> futures::future::Ready<anyhow::Result<ToolOutput>> {
        futures::future::ready(Ok(ToolOutput::Empty))
    }

    #[test]
    fn schema_lists_properties_enums_and_required_names() {
        let tool = ToolDefinition::new("move_sphere", "Moves the sphere", noop)
            .with_parameter(ToolParameter::number("x", "Horizontal position"))
            .with_parameter(ToolParameter::enumeration("speed", "", &["Slow", "Fast"]).optional());

        let Tool::Function(function) = tool.schema();
        assert_eq!(function.name(), "move_sphere");
        assert_eq!(
            function.parameters(),
            &json!({
                "type": "object",
                "properties": {
                    "x": {"type": "number", "description": "Horizontal position"},
                    "speed": {"type": "string", "enum": ["Slow", "Fast"]}
                },
                "required": ["x"]
            })
        );
    }

    #[test]
    fn schema_omits_empty_required_list() {
        let tool = ToolDefinition::new("ping", "No arguments", noop);
        let Tool::Function(function) = tool.schema();
        assert!(function.parameters().get("required").is_none());
    }

    #[test]
    fn outputs_serialize_to_text() {
        assert_eq!(ToolOutput::from("done").into_text(), "done");
        assert_eq!(ToolOutput::from(()).into_text(), "{}");
        assert_eq!(ToolOutput::from(json!({"ok": true})).into_text(), r#"{"ok":true}"#);
        assert_eq!(ToolOutput::from(json!("plain")).into_text(), "plain");
    }
}
