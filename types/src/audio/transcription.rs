use crate::audio::TranscriptionModel;

/// Input transcription settings. Omitted from the session (`null`) when transcription is off.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct InputAudioTranscription {
    model: TranscriptionModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

impl Default for InputAudioTranscription {
    fn default() -> Self {
        Self::new(TranscriptionModel::Whisper)
    }
}

impl InputAudioTranscription {
    pub fn new(model: TranscriptionModel) -> Self {
        Self { model, language: None }
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn model(&self) -> &TranscriptionModel {
        &self.model
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}
