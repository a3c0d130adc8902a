use crate::audio::{AudioFormat, InputAudioTranscription, TurnDetection, Voice};
use crate::tools::{Tool, ToolChoice};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Session {
    /// The set of modalities the model can respond with. To disable audio, set this to ["text"].
    modalities: Vec<String>,

    /// The default system instructions prepended to model calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    voice: Option<Voice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_audio_format: Option<AudioFormat>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_audio_format: Option<AudioFormat>,

    /// `null` turns transcription off.
    #[serde(default)]
    input_audio_transcription: Option<InputAudioTranscription>,

    /// Always transmitted; `null` selects manual turns.
    #[serde(default)]
    turn_detection: Option<TurnDetection>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// "inf" or number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_response_output_tokens: Option<MaxOutputTokens>,
}

impl Session {
    pub fn modalities(&self) -> &[String] {
        &self.modalities
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    pub fn turn_detection(&self) -> Option<&TurnDetection> {
        self.turn_detection.as_ref()
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum MaxOutputTokens {
    Number(u32),
    Infinity(String),
}

pub struct SessionConfigurator {
    session: Session,
}

impl Default for SessionConfigurator {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfigurator {
    pub fn new() -> Self {
        Self {
            session: Session {
                modalities: vec!["text".to_string(), "audio".to_string()],
                instructions: None,
                voice: None,
                input_audio_format: Some(AudioFormat::Pcm16),
                output_audio_format: Some(AudioFormat::Pcm16),
                input_audio_transcription: None,
                turn_detection: None,
                tools: vec![],
                tool_choice: None,
                temperature: None,
                max_response_output_tokens: None,
            },
        }
    }

    pub fn with_modalities_disable_audio(mut self) -> Self {
        self.session.modalities = vec!["text".to_string()];
        self
    }

    pub fn with_modalities_enable_audio(mut self) -> Self {
        self.session.modalities = vec!["text".to_string(), "audio".to_string()];
        self
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.session.instructions = Some(instructions.to_string());
        self
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.session.voice = Some(voice);
        self
    }

    pub fn with_input_audio_transcription(mut self, transcription: Option<InputAudioTranscription>) -> Self {
        self.session.input_audio_transcription = transcription;
        self
    }

    pub fn with_turn_detection(mut self, turn_detection: Option<TurnDetection>) -> Self {
        self.session.turn_detection = turn_detection;
        self
    }

    /// Tool choice is set to `auto` whenever tools are present.
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.session.tool_choice = if tools.is_empty() { None } else { Some(ToolChoice::Auto) };
        self.session.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.session.tool_choice = Some(tool_choice);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.session.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: MaxOutputTokens) -> Self {
        self.session.max_response_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn build(self) -> Session {
        self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ServerVadTurnDetection;
    use crate::tools::FunctionTool;
    use serde_json::json;

    #[test]
    fn manual_turn_session_sends_explicit_null() {
        let session = SessionConfigurator::new()
            .with_voice(Voice::Alloy)
            .with_instructions("be brief")
            .build();
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["turn_detection"], serde_json::Value::Null);
        assert!(value.as_object().unwrap().contains_key("turn_detection"));
        assert!(value.get("tools").is_none());
        assert!(value.get("tool_choice").is_none());
        assert_eq!(value["modalities"], json!(["text", "audio"]));
        assert_eq!(value["input_audio_format"], "pcm16");
    }

    #[test]
    fn tools_enable_auto_tool_choice() {
        let tool = Tool::Function(FunctionTool::new("wave", "Wave a hand", json!({"type": "object", "properties": {}})));
        let session = SessionConfigurator::new()
            .with_turn_detection(Some(TurnDetection::ServerVad(ServerVadTurnDetection::default())))
            .with_tools(vec![tool])
            .build();
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["tool_choice"], "auto");
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["name"], "wave");
        assert_eq!(value["turn_detection"]["type"], "server_vad");
    }
}
