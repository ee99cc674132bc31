//! Base64 (de)serialization for raw audio buffers.
//!
//! Audio travels over the wire as base64 text but is held in memory as raw
//! bytes. These modules are meant for `#[serde(with = "...")]`.

use base64::{Engine, engine::general_purpose::STANDARD};

/// Encodes raw bytes as standard (padded) base64.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes standard base64 into raw bytes.
pub fn decode(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(text)
}

/// `Vec<u8>` <-> base64 string.
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let text = String::deserialize(deserializer)?;
        super::decode(&text).map_err(|e| D::Error::custom(format!("invalid base64 audio: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Chunk {
        #[serde(with = "super::base64_bytes")]
        audio: Vec<u8>,
    }

    #[test]
    fn test_bytes_are_base64_on_the_wire() {
        let chunk = Chunk {
            audio: vec![0x01, 0x02, 0xff],
        };
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["audio"], "AQL/");

        let back: Chunk = serde_json::from_value(json).unwrap();
        assert_eq!(back, chunk);
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let err = serde_json::from_str::<Chunk>(r#"{"audio":"not base64!"}"#).unwrap_err();
        assert!(err.to_string().contains("invalid base64 audio"));
    }

    #[test]
    fn test_empty_audio() {
        let chunk: Chunk = serde_json::from_str(r#"{"audio":""}"#).unwrap();
        assert!(chunk.audio.is_empty());
    }
}
