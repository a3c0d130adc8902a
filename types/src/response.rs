use crate::content::items::FunctionCallItem;

/// The response resource carried by `response.created` and `response.done`.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResponseResource {
    #[serde(default)]
    id: Option<String>,
    /// "in_progress", "completed", "cancelled", "failed" or "incomplete"
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    status_details: Option<StatusDetails>,
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    usage: Option<Usage>,
}

impl ResponseResource {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn status_details(&self) -> Option<&StatusDetails> {
        self.status_details.as_ref()
    }

    pub fn output(&self) -> &[OutputItem] {
        &self.output
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    /// The server cancelled this response because the user started a new turn.
    pub fn is_turn_detected_cancellation(&self) -> bool {
        let cancelled = self
            .status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("cancelled"));
        let turn_detected = self
            .status_details
            .as_ref()
            .and_then(|d| d.reason.as_deref())
            .is_some_and(|r| r.eq_ignore_ascii_case("turn_detected"));
        cancelled && turn_detected
    }

    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCallItem> {
        self.output.iter().filter_map(|item| match item {
            OutputItem::FunctionCall(call) => Some(call),
            OutputItem::Other => None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StatusDetails {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Output items of a response. Only function calls matter to the engine.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum OutputItem {
    #[serde(rename = "function_call")]
    FunctionCall(FunctionCallItem),
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}
