//! Bedrock `rawtext` JSON bodies used by `tellraw` and `titleraw`.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
struct RawTextPart {
    text: String,
}

/// A `{"rawtext":[{"text":...}]}` document.
#[derive(Debug, Clone, Serialize)]
pub struct RawText {
    rawtext: Vec<RawTextPart>,
}

impl RawText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            rawtext: vec![RawTextPart { text: text.into() }],
        }
    }

    pub fn push(mut self, text: impl Into<String>) -> Self {
        self.rawtext.push(RawTextPart { text: text.into() });
        self
    }

    /// Compact JSON, suitable for appending to a command line.
    pub fn to_json(&self) -> String {
        // Serializing a struct of strings cannot fail.
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize rawtext: {}", e);
            String::from(r#"{"rawtext":[]}"#)
        })
    }
}
