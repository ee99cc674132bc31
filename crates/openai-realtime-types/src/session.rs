//! Session configuration shared by `session.update`, `session.created` and
//! `session.updated`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Mutable configuration of a realtime session.
///
/// The server assigns `id`; it must never be sent back in a `session.update`
/// (see [`Session::without_id`]). Every field has a default so partially
/// populated server payloads still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    /// Server-assigned session id. Never serialized when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub model: String,
    /// System instructions prepended to every model call.
    pub instructions: String,
    pub modalities: Vec<Modality>,
    pub voice: Voice,
    pub input_audio_format: AudioFormat,
    pub output_audio_format: AudioFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<InputAudioTranscription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_detection: Option<TurnDetection>,
    pub tools: Vec<Tool>,
    pub tool_choice: ToolChoice,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_response_output_tokens: Option<MaxOutputTokens>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            id: None,
            model: String::new(),
            instructions: String::new(),
            modalities: vec![Modality::Text, Modality::Audio],
            voice: Voice::Alloy,
            input_audio_format: AudioFormat::Pcm16,
            output_audio_format: AudioFormat::Pcm16,
            input_audio_transcription: None,
            turn_detection: None,
            tools: Vec::new(),
            tool_choice: ToolChoice::Auto,
            temperature: 0.8,
            max_response_output_tokens: None,
        }
    }
}

impl Session {
    /// Returns a copy with the server-assigned id cleared, ready to be sent
    /// in a `session.update`.
    pub fn without_id(&self) -> Self {
        Self {
            id: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Audio,
}

/// Output voice. Voices the server adds later decode into `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Sage,
    Shimmer,
    Verse,
    #[serde(untagged)]
    Custom(String),
}

impl std::str::FromStr for Voice {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "alloy" => Voice::Alloy,
            "ash" => Voice::Ash,
            "ballad" => Voice::Ballad,
            "coral" => Voice::Coral,
            "echo" => Voice::Echo,
            "sage" => Voice::Sage,
            "shimmer" => Voice::Shimmer,
            "verse" => Voice::Verse,
            _ => Voice::Custom(s.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioFormat {
    Pcm16,
    G711Ulaw,
    G711Alaw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    /// Transcription model, e.g. `whisper-1`.
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDetectionType {
    ServerVad,
    SemanticVad,
}

/// Voice-activity based turn detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnDetection {
    #[serde(rename = "type")]
    pub kind: TurnDetectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_padding_ms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silence_duration_ms: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_response: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupt_response: Option<bool>,
}

impl TurnDetection {
    pub fn server_vad() -> Self {
        Self {
            kind: TurnDetectionType::ServerVad,
            threshold: None,
            prefix_padding_ms: None,
            silence_duration_ms: None,
            create_response: None,
            interrupt_response: None,
        }
    }
}

/// A tool the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tool {
    Function {
        name: String,
        #[serde(default)]
        description: String,
        /// JSON schema of the arguments object.
        #[serde(default)]
        parameters: serde_json::Value,
    },
}

/// Tool-choice policy.
///
/// On the wire this is either one of the strings `"auto"`, `"none"`,
/// `"required"`, or the object `{"type":"function","function":{"name":..}}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToolChoice {
    #[default]
    Auto,
    None,
    Required,
    Function(String),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ToolChoiceMode {
    Auto,
    None,
    Required,
}

#[derive(Serialize, Deserialize)]
struct FunctionName {
    name: String,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum NamedToolChoice {
    Function { function: FunctionName },
}

// Variant order matters: the plain string form is tried before the object.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ToolChoiceRepr {
    Mode(ToolChoiceMode),
    Named(NamedToolChoice),
}

impl Serialize for ToolChoice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = match self {
            ToolChoice::Auto => ToolChoiceRepr::Mode(ToolChoiceMode::Auto),
            ToolChoice::None => ToolChoiceRepr::Mode(ToolChoiceMode::None),
            ToolChoice::Required => ToolChoiceRepr::Mode(ToolChoiceMode::Required),
            ToolChoice::Function(name) => ToolChoiceRepr::Named(NamedToolChoice::Function {
                function: FunctionName { name: name.clone() },
            }),
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ToolChoice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        let repr = ToolChoiceRepr::deserialize(deserializer).map_err(|_| {
            D::Error::custom(
                "tool_choice must be \"auto\", \"none\", \"required\" or a function object",
            )
        })?;
        Ok(match repr {
            ToolChoiceRepr::Mode(ToolChoiceMode::Auto) => ToolChoice::Auto,
            ToolChoiceRepr::Mode(ToolChoiceMode::None) => ToolChoice::None,
            ToolChoiceRepr::Mode(ToolChoiceMode::Required) => ToolChoice::Required,
            ToolChoiceRepr::Named(NamedToolChoice::Function { function }) => {
                ToolChoice::Function(function.name)
            }
        })
    }
}

/// Cap on output tokens: a count or `"inf"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOutputTokens {
    Limited(u32),
    Infinite,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum MaxOutputTokensRepr {
    Count(u32),
    Text(String),
}

impl Serialize for MaxOutputTokens {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MaxOutputTokens::Limited(count) => serializer.serialize_u32(*count),
            MaxOutputTokens::Infinite => serializer.serialize_str("inf"),
        }
    }
}

impl<'de> Deserialize<'de> for MaxOutputTokens {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        match MaxOutputTokensRepr::deserialize(deserializer)? {
            MaxOutputTokensRepr::Count(count) => Ok(MaxOutputTokens::Limited(count)),
            MaxOutputTokensRepr::Text(text) if text == "inf" => Ok(MaxOutputTokens::Infinite),
            MaxOutputTokensRepr::Text(text) => Err(D::Error::custom(format!(
                "max_response_output_tokens must be an integer or \"inf\", got {text:?}"
            ))),
        }
    }
}
