use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde_json::Value;

use crate::error::ToolError;
use crate::tools::{bind_arguments, EventDefinition, ToolDefinition, ToolOutput};
use crate::types::tools::Tool;

/// One entry of the host's capability surface.
#[derive(Debug, Clone)]
pub enum Capability {
    Tool(ToolDefinition),
    Event(EventDefinition),
}

impl From<ToolDefinition> for Capability {
    fn from(tool: ToolDefinition) -> Self {
        Capability::Tool(tool)
    }
}

impl From<EventDefinition> for Capability {
    fn from(event: EventDefinition) -> Self {
        Capability::Event(event)
    }
}

/// Supplies the current capability list. Called on every discovery pass, so a
/// provider may return a different list as the host registers more handlers.
pub trait CapabilityProvider: Send + Sync {
    fn capabilities(&self) -> Vec<Capability>;
}

impl<F> CapabilityProvider for F
where
    F: Fn() -> Vec<Capability> + Send + Sync,
{
    fn capabilities(&self) -> Vec<Capability> {
        self()
    }
}

impl CapabilityProvider for Vec<Capability> {
    fn capabilities(&self) -> Vec<Capability> {
        self.clone()
    }
}

/// A triggered event ready to be sent as a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInvocation {
    pub event: String,
    pub message: String,
    pub interrupt_response: bool,
    pub request_response: bool,
}

/// Tools and events discovered from the registered providers. Names are unique
/// per namespace, compared case-insensitively; the first registration wins.
#[derive(Default)]
pub struct CapabilityRegistry {
    providers: Vec<Box<dyn CapabilityProvider>>,
    tools: Vec<ToolDefinition>,
    events: Vec<EventDefinition>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider<P>(mut self, provider: P) -> Self
    where
        P: CapabilityProvider + 'static,
    {
        self.add_provider(provider);
        self
    }

    pub fn add_provider<P>(&mut self, provider: P)
    where
        P: CapabilityProvider + 'static,
    {
        self.providers.push(Box::new(provider));
    }

    /// Rebuilds both maps from scratch.
    pub fn discover(&mut self) {
        self.tools.clear();
        self.events.clear();

        let capabilities: Vec<Capability> = self.providers.iter().flat_map(|p| p.capabilities()).collect();
        for capability in capabilities {
            match capability {
                Capability::Tool(tool) => self.register_tool(tool),
                Capability::Event(event) => self.register_event(event),
            }
        }
        tracing::debug!(tools = self.tools.len(), events = self.events.len(), "capability discovery finished");
    }

    fn register_tool(&mut self, mut tool: ToolDefinition) {
        tool.name = tool.name.trim().to_string();
        if tool.name.is_empty() {
            tracing::warn!("ignoring tool without a name");
            return;
        }
        if self.tool(&tool.name).is_some() {
            tracing::warn!(tool = %tool.name, "duplicate tool name; keeping the first registration");
            return;
        }
        self.tools.push(tool);
    }

    fn register_event(&mut self, mut event: EventDefinition) {
        event.name = event.name.trim().to_string();
        event.message = event.message.trim().to_string();
        if event.name.is_empty() || event.message.is_empty() {
            tracing::warn!(event = %event.name, "ignoring event without a name or message");
            return;
        }
        if self.event(&event.name).is_some() {
            tracing::warn!(event = %event.name, "duplicate event name; keeping the first registration");
            return;
        }
        self.events.push(event);
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDefinition> {
        let name = name.trim();
        self.tools.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn event(&self, name: &str) -> Option<&EventDefinition> {
        let name = name.trim();
        self.events.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn events(&self) -> &[EventDefinition] {
        &self.events
    }

    pub fn tool_schemas(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDefinition::schema).collect()
    }

    fn resolve_tool(&mut self, name: &str) -> Option<ToolDefinition> {
        if self.tool(name).is_none() {
            tracing::debug!(tool = %name, "tool not found; rediscovering");
            self.discover();
        }
        self.tool(name).cloned()
    }

    fn resolve_event(&mut self, name: &str) -> Option<EventDefinition> {
        if self.event(name).is_none() {
            tracing::debug!(event = %name, "event not found; rediscovering");
            self.discover();
        }
        self.event(name).cloned()
    }

    /// Resolves, binds and runs a tool. Every failure, including a panicking
    /// handler, comes back as a [`ToolError`].
    pub async fn invoke_tool(&mut self, name: &str, payload: &Value) -> Result<ToolOutput, ToolError> {
        let tool = self
            .resolve_tool(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let args = bind_arguments(&tool.parameters, payload)?;

        let handler = tool.handler.clone();
        let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| handler.call(args))) {
            Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
            Err(panic) => Err(panic),
        };

        match outcome {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(ToolError::Handler {
                tool: tool.name,
                message: format!("{e:#}"),
            }),
            Err(panic) => Err(ToolError::Handler {
                tool: tool.name,
                message: panic_message(panic.as_ref()),
            }),
        }
    }

    /// Runs the event's handler and returns the message to send, or `None` if the
    /// event is unknown or its handler failed.
    pub fn trigger_event(&mut self, name: &str) -> Option<PendingInvocation> {
        let Some(event) = self.resolve_event(name) else {
            tracing::warn!(event = %name, "event is not available");
            return None;
        };

        let replacement = match &event.handler {
            None => None,
            Some(handler) => match std::panic::catch_unwind(AssertUnwindSafe(|| handler.call())) {
                Ok(Ok(replacement)) => replacement,
                Ok(Err(e)) => {
                    tracing::error!(event = %event.name, "event handler failed: {:#}", e);
                    return None;
                }
                Err(panic) => {
                    tracing::error!(event = %event.name, "event handler panicked: {}", panic_message(panic.as_ref()));
                    return None;
                }
            },
        };

        let message = replacement
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or(event.message);

        Some(PendingInvocation {
            event: event.name,
            message,
            interrupt_response: event.interrupt_response,
            request_response: event.request_response,
        })
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::tools::{ToolArguments, ToolParameter};

    fn constant(text: &'static str) -> impl Fn(ToolArguments) -> futures::future::Ready<anyhow::Result<ToolOutput>> {
        move |_| futures::future::ready(Ok(ToolOutput::from(text)))
    }

    #[tokio::test]
    async fn duplicate_names_keep_first_registration() {
        let mut registry = CapabilityRegistry::new().with_provider(vec![
            Capability::from(ToolDefinition::new("Lookup", "first", constant("first"))),
            Capability::from(ToolDefinition::new("lookup", "second", constant("second"))),
        ]);
        registry.discover();

        assert_eq!(registry.tools().len(), 1);
        assert_eq!(registry.tool("LOOKUP").map(|t| t.description.as_str()), Some("first"));
        let output = registry.invoke_tool("lookup", &Value::Null).await.unwrap();
        assert_eq!(output.into_text(), "first");
    }

    #[tokio::test]
    async fn padded_names_are_trimmed_at_registration() {
        let mut tool = ToolDefinition::new("lookup", "", constant("found"));
        tool.name = " lookup ".to_string();
        let mut event = EventDefinition::new("waved", "", "The user waved.");
        event.name = "\twaved ".to_string();
        let mut blank = EventDefinition::new("blank", "", "unused");
        blank.message = "   ".to_string();
        let mut registry = CapabilityRegistry::new().with_provider(vec![
            Capability::from(tool),
            Capability::from(event),
            Capability::from(blank),
        ]);
        registry.discover();

        assert_eq!(registry.tool("lookup").map(|t| t.name.as_str()), Some("lookup"));
        let output = registry.invoke_tool(" Lookup", &Value::Null).await.unwrap();
        assert_eq!(output.into_text(), "found");
        assert_eq!(registry.trigger_event("waved").map(|p| p.event), Some("waved".to_string()));
        assert!(registry.event("blank").is_none());
    }

    #[tokio::test]
    async fn unknown_tool_triggers_one_rediscovery() {
        let passes = Arc::new(AtomicUsize::new(0));
        let counter = passes.clone();
        let mut registry = CapabilityRegistry::new().with_provider(move || {
            // The tool appears only after the host finishes registering.
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Vec::new()
            } else {
                vec![Capability::from(ToolDefinition::new("late", "", constant("ok")))]
            }
        });
        registry.discover();
        assert!(registry.tool("late").is_none());

        let output = registry.invoke_tool("late", &Value::Null).await.unwrap();
        assert_eq!(output.into_text(), "ok");
        assert_eq!(passes.load(Ordering::SeqCst), 2);

        let err = registry.invoke_tool("missing", &Value::Null).await.unwrap_err();
        assert_eq!(err.to_string(), "Tool 'missing' is not available.");
        assert_eq!(passes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn handler_receives_raw_unclamped_value() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let sink = seen.clone();
        let tool = ToolDefinition::new("set_position", "Moves within [-1, 1]", move |args: ToolArguments| {
            *sink.lock().unwrap() = args.f64("x");
            futures::future::ready(Ok::<_, anyhow::Error>(ToolOutput::Empty))
        })
        .with_parameter(ToolParameter::number("x", ""));
        let mut registry = CapabilityRegistry::new().with_provider(vec![Capability::from(tool)]);
        registry.discover();

        let output = registry.invoke_tool("set_position", &json!({"x": 5.0})).await.unwrap();
        assert_eq!(output, ToolOutput::Empty);
        assert_eq!(*seen.lock().unwrap(), Some(5.0));
    }

    #[tokio::test]
    async fn failing_and_panicking_handlers_become_errors() {
        async fn fail(_: ToolArguments) -> anyhow::Result<ToolOutput> {
            anyhow::bail!("disk full")
        }
        async fn explode(_: ToolArguments) -> anyhow::Result<ToolOutput> {
            panic!("exploded")
        }
        let failing = ToolDefinition::new("fail", "", fail);
        let panicking = ToolDefinition::new("boom", "", explode);
        let mut registry =
            CapabilityRegistry::new().with_provider(vec![Capability::from(failing), Capability::from(panicking)]);
        registry.discover();

        let err = registry.invoke_tool("fail", &Value::Null).await.unwrap_err();
        assert_eq!(err.to_string(), "Tool 'fail' failed: disk full");

        let err = registry.invoke_tool("boom", &Value::Null).await.unwrap_err();
        assert!(err.to_string().contains("exploded"));
    }

    #[test]
    fn event_uses_replacement_message_when_not_blank() {
        let mut registry = CapabilityRegistry::new().with_provider(vec![
            Capability::from(
                EventDefinition::new("waved", "", "The user waved.")
                    .with_handler(|| Ok(Some("  The user waved twice. ".to_string()))),
            ),
            Capability::from(EventDefinition::new("blank", "", "Template.").with_handler(|| Ok(Some(" ".to_string())))),
            Capability::from(
                EventDefinition::new("broken", "", "Never sent.").with_handler(|| anyhow::bail!("no camera")),
            ),
            Capability::from(EventDefinition::new("empty", "", "")),
        ]);
        registry.discover();

        let pending = registry.trigger_event("WAVED").unwrap();
        assert_eq!(pending.message, "The user waved twice.");
        assert!(pending.interrupt_response && pending.request_response);

        assert_eq!(registry.trigger_event("blank").unwrap().message, "Template.");
        assert_eq!(registry.trigger_event("broken"), None);
        assert_eq!(registry.trigger_event("empty"), None);
        assert_eq!(registry.events().len(), 3);
    }
}
