/// Server-side turn detection. Manual turns are expressed as `Option::<TurnDetection>::None`,
/// which the session serializes as an explicit `null`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    #[serde(rename = "server_vad")]
    ServerVad(ServerVadTurnDetection),
    #[serde(rename = "semantic_vad")]
    SemanticVad(SemanticVadTurnDetection),
}

impl TurnDetection {
    pub fn server_vad() -> Self {
        TurnDetection::ServerVad(ServerVadTurnDetection::default())
    }

    pub fn semantic_vad() -> Self {
        TurnDetection::SemanticVad(SemanticVadTurnDetection::default())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TurnDetection::ServerVad(_) => "server_vad",
            TurnDetection::SemanticVad(_) => "semantic_vad",
        }
    }

    pub fn create_response(&self) -> bool {
        match self {
            TurnDetection::ServerVad(vad) => vad.create_response,
            TurnDetection::SemanticVad(vad) => vad.create_response,
        }
    }

    pub fn interrupt_response(&self) -> bool {
        match self {
            TurnDetection::ServerVad(vad) => vad.interrupt_response,
            TurnDetection::SemanticVad(vad) => vad.interrupt_response,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ServerVadTurnDetection {
    /// Activation threshold for VAD (0.0 to 1.0).
    threshold: f32,
    /// Amount of audio to include before speech starts (in milliseconds).
    prefix_padding_ms: u32,
    /// Duration of silence to detect speech stop (in milliseconds).
    silence_duration_ms: u32,
    create_response: bool,
    interrupt_response: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    idle_timeout_ms: Option<u32>,
}

impl Default for ServerVadTurnDetection {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
            create_response: true,
            interrupt_response: true,
            idle_timeout_ms: None,
        }
    }
}

impl ServerVadTurnDetection {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_prefix_padding_ms(mut self, prefix_padding_ms: u32) -> Self {
        self.prefix_padding_ms = prefix_padding_ms;
        self
    }

    pub fn with_silence_duration_ms(mut self, silence_duration_ms: u32) -> Self {
        self.silence_duration_ms = silence_duration_ms;
        self
    }

    pub fn with_create_response(mut self, create_response: bool) -> Self {
        self.create_response = create_response;
        self
    }

    pub fn with_interrupt_response(mut self, interrupt_response: bool) -> Self {
        self.interrupt_response = interrupt_response;
        self
    }

    pub fn with_idle_timeout_ms(mut self, idle_timeout_ms: Option<u32>) -> Self {
        self.idle_timeout_ms = idle_timeout_ms;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn prefix_padding_ms(&self) -> u32 {
        self.prefix_padding_ms
    }

    pub fn silence_duration_ms(&self) -> u32 {
        self.silence_duration_ms
    }

    pub fn idle_timeout_ms(&self) -> Option<u32> {
        self.idle_timeout_ms
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eagerness {
    #[default]
    Auto,
    Low,
    Medium,
    High,
}

impl std::str::FromStr for Eagerness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Eagerness::Auto),
            "low" => Ok(Eagerness::Low),
            "medium" => Ok(Eagerness::Medium),
            "high" => Ok(Eagerness::High),
            other => Err(format!("unknown eagerness '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SemanticVadTurnDetection {
    eagerness: Eagerness,
    create_response: bool,
    interrupt_response: bool,
}

impl Default for SemanticVadTurnDetection {
    fn default() -> Self {
        Self {
            eagerness: Eagerness::Auto,
            create_response: true,
            interrupt_response: true,
        }
    }
}

impl SemanticVadTurnDetection {
    pub fn with_eagerness(mut self, eagerness: Eagerness) -> Self {
        self.eagerness = eagerness;
        self
    }

    pub fn with_create_response(mut self, create_response: bool) -> Self {
        self.create_response = create_response;
        self
    }

    pub fn with_interrupt_response(mut self, interrupt_response: bool) -> Self {
        self.interrupt_response = interrupt_response;
        self
    }

    pub fn eagerness(&self) -> Eagerness {
        self.eagerness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn server_vad_serializes_flat_with_type_tag() {
        let td = TurnDetection::ServerVad(
            ServerVadTurnDetection::default()
                .with_silence_duration_ms(700)
                .with_idle_timeout_ms(Some(15_000)),
        );
        let value = serde_json::to_value(&td).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "server_vad",
                "threshold": 0.5,
                "prefix_padding_ms": 300,
                "silence_duration_ms": 700,
                "create_response": true,
                "interrupt_response": true,
                "idle_timeout_ms": 15000
            })
        );
    }

    #[test]
    fn semantic_vad_carries_lowercase_eagerness() {
        let td = TurnDetection::SemanticVad(
            SemanticVadTurnDetection::default()
                .with_eagerness(Eagerness::High)
                .with_interrupt_response(false),
        );
        let value = serde_json::to_value(&td).unwrap();
        assert_eq!(value["type"], "semantic_vad");
        assert_eq!(value["eagerness"], "high");
        assert_eq!(value["interrupt_response"], false);
        assert!(!td.interrupt_response());
        assert!(td.create_response());
    }

    #[test]
    fn manual_turns_serialize_as_null() {
        let manual: Option<TurnDetection> = None;
        assert_eq!(serde_json::to_value(&manual).unwrap(), serde_json::Value::Null);
    }
}
