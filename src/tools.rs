//! Host capabilities exposed to the model: parameterized tools and
//! fire-and-forget events.
mod args;
mod definition;
mod registry;

pub use args::{bind_arguments, ToolArguments, ToolValue};
pub use definition::{
    EventDefinition, EventHandler, ParamType, ToolDefinition, ToolHandler, ToolOutput, ToolParameter,
};
pub use registry::{Capability, CapabilityProvider, CapabilityRegistry, PendingInvocation};

use serde_json::Value;

use crate::types::events::ClientToolCall;
use crate::types::FunctionCallItem;

/// Which protocol a call arrived on; decides the shape of the result frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolProtocol {
    /// `client_tool_call` answered with `client_tool_result`.
    ClientTool,
    /// Model function call answered with a `function_call_output` item and `response.create`.
    FunctionCall,
}

/// A remote request to run a tool. Transient; lives only for one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub call_id: Option<String>,
    pub name: Option<String>,
    /// Object or JSON-encoded string.
    pub arguments: Value,
    pub protocol: ToolProtocol,
}

impl ToolCall {
    pub fn function_call(call_id: Option<&str>, name: Option<&str>, arguments: Option<&str>) -> Self {
        Self {
            call_id: call_id.map(str::to_string),
            name: name.map(str::to_string),
            arguments: arguments.map(|a| Value::String(a.to_string())).unwrap_or(Value::Null),
            protocol: ToolProtocol::FunctionCall,
        }
    }
}

impl From<&ClientToolCall> for ToolCall {
    fn from(call: &ClientToolCall) -> Self {
        Self {
            call_id: call.tool_call_id().map(str::to_string),
            name: call.tool_name().map(str::to_string),
            arguments: call.parameters().clone(),
            protocol: ToolProtocol::ClientTool,
        }
    }
}

impl From<&FunctionCallItem> for ToolCall {
    fn from(item: &FunctionCallItem) -> Self {
        Self::function_call(item.call_id(), item.name(), item.arguments())
    }
}
