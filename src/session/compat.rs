//! Compatibility shim for message shapes that differ between endpoint versions.
//!
//! The typed schema in `realtime-voice-types` covers the current protocol. The
//! helpers here only exist for the agent-style shapes some endpoints send: audio
//! nested somewhere under an `audio` key, an `is_final` flag closing the segment,
//! the output format announced as `agent_output_audio_format`, and a
//! `client_tool_call` object riding on an unrelated message.

use serde_json::Value;

use crate::types::events::ClientToolCall;

const AUDIO_KEY: &str = "audio";
const CLIENT_TOOL_CALL_KEY: &str = "client_tool_call";
const FINAL_KEY: &str = "is_final";
const OUTPUT_FORMAT_KEY: &str = "agent_output_audio_format";
const MIN_OUTPUT_RATE: u32 = 8_000;
const MAX_OUTPUT_RATE: u32 = 48_000;

/// Finds a base64 payload stored under an `audio` key at any depth. The value may
/// be the string itself or wrap it in objects and arrays.
pub(crate) fn find_audio_payload(message: &Value) -> Option<String> {
    match message {
        Value::Object(map) => {
            if let Some(payload) = map.get(AUDIO_KEY).and_then(first_string) {
                return Some(payload);
            }
            map.iter()
                .filter(|(key, _)| key.as_str() != AUDIO_KEY)
                .find_map(|(_, value)| find_audio_payload(value))
        }
        Value::Array(items) => items.iter().find_map(find_audio_payload),
        _ => None,
    }
}

fn first_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_string),
        Value::Object(map) => map.values().find_map(first_string),
        _ => None,
    }
}

/// First value stored under `key` at any depth, searched depth-first.
fn find_key<'a>(message: &'a Value, key: &str) -> Option<&'a Value> {
    match message {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|value| find_key(value, key))),
        Value::Array(items) => items.iter().find_map(|item| find_key(item, key)),
        _ => None,
    }
}

/// Whether the message carries `is_final: true` anywhere. Non-boolean flags are ignored.
pub(crate) fn is_final_chunk(message: &Value) -> bool {
    find_key(message, FINAL_KEY)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Sample rate announced by an `agent_output_audio_format` such as `pcm_16000`,
/// clamped to 8000..=48000 Hz.
pub(crate) fn find_output_sample_rate(message: &Value) -> Option<u32> {
    let format = find_key(message, OUTPUT_FORMAT_KEY)?.as_str()?;
    let digits: String = format.chars().filter(char::is_ascii_digit).collect();
    let rate = digits.parse::<u64>().ok()?;
    if rate == 0 {
        return None;
    }
    Some(rate.clamp(MIN_OUTPUT_RATE as u64, MAX_OUTPUT_RATE as u64) as u32)
}

/// A `client_tool_call` object attached to a message of another type.
pub(crate) fn nested_tool_call(message: &Value) -> Option<ClientToolCall> {
    let nested = message.get(CLIENT_TOOL_CALL_KEY)?;
    if !nested.is_object() {
        return None;
    }
    match serde_json::from_value(nested.clone()) {
        Ok(call) => Some(call),
        Err(e) => {
            tracing::warn!("ignoring malformed nested client_tool_call: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_audio_in_nested_and_array_wrapped_shapes() {
        assert_eq!(find_audio_payload(&json!({"audio": "AAA="})).as_deref(), Some("AAA="));
        assert_eq!(
            find_audio_payload(&json!({"type": "x", "item": {"audio": {"data": "BBB="}}})).as_deref(),
            Some("BBB=")
        );
        assert_eq!(
            find_audio_payload(&json!({"content": [{"text": "hi"}, {"audio": ["", "CCC="]}]})).as_deref(),
            Some("CCC=")
        );
        assert_eq!(find_audio_payload(&json!({"audio": ""})), None);
        assert_eq!(find_audio_payload(&json!({"type": "response.audio.delta"})), None);
    }

    #[test]
    fn final_flag_is_found_at_any_depth() {
        assert!(is_final_chunk(&json!({"type": "audio", "audio_event": {"audio": "AAA=", "is_final": true}})));
        assert!(is_final_chunk(&json!({"parts": [{"meta": {"is_final": true}}]})));
        assert!(!is_final_chunk(&json!({"audio_event": {"is_final": false}})));
        assert!(!is_final_chunk(&json!({"audio_event": {"is_final": "true"}})));
        assert!(!is_final_chunk(&json!({"type": "audio"})));
    }

    #[test]
    fn output_rate_is_parsed_from_format_and_clamped() {
        let metadata = json!({
            "type": "conversation_initiation_metadata",
            "conversation_initiation_metadata_event": {"agent_output_audio_format": "pcm_16000"}
        });
        assert_eq!(find_output_sample_rate(&metadata), Some(16_000));
        assert_eq!(find_output_sample_rate(&json!({"agent_output_audio_format": "ulaw_8000"})), Some(8_000));
        assert_eq!(find_output_sample_rate(&json!({"agent_output_audio_format": "pcm_96000"})), Some(48_000));
        assert_eq!(find_output_sample_rate(&json!({"agent_output_audio_format": "pcm_4000"})), Some(8_000));
        assert_eq!(find_output_sample_rate(&json!({"agent_output_audio_format": "pcm"})), None);
        assert_eq!(find_output_sample_rate(&json!({"agent_output_audio_format": 16000})), None);
        assert_eq!(find_output_sample_rate(&json!({"type": "audio"})), None);
    }

    #[test]
    fn extracts_nested_tool_call() {
        let message = json!({
            "type": "agent_response",
            "client_tool_call": {"tool_call_id": "t1", "tool_name": "wave", "parameters": "{}"}
        });
        let call = nested_tool_call(&message).unwrap();
        assert_eq!(call.tool_call_id(), Some("t1"));
        assert_eq!(call.tool_name(), Some("wave"));

        assert!(nested_tool_call(&json!({"client_tool_call": "bogus"})).is_none());
        assert!(nested_tool_call(&json!({"type": "ping"})).is_none());
    }
}
