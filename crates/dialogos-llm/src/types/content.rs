use serde::{Deserialize, Serialize};

/// Content carried by a message
/// Either plain text or a sequence of parts (text, file references, tool results)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Simple text content
    Text(String),

    /// Multipart content
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text {
        text: String,
    },

    /// Reference to a binary file (image, audio, document)
    File {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },

    /// Structured result of an earlier tool call
    ToolResult {
        tool_call_id: String,
        output: String,
    },
}

impl Content {
    /// Create text content
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Empty text content (assistant turns that only carry tool calls)
    pub fn empty() -> Self {
        Self::Text(String::new())
    }

    /// Get as plain text (if possible)
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Parts(parts) => {
                if parts.len() == 1 {
                    if let ContentPart::Text { text } = &parts[0] {
                        return Some(text);
                    }
                }
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Parts(parts) => parts.is_empty(),
        }
    }

    /// Append a text delta in place
    ///
    /// Used by the stream mergers while a message is still being assembled;
    /// completed messages are not mutated.
    pub fn push_str(&mut self, delta: &str) {
        match self {
            Self::Text(s) => s.push_str(delta),
            Self::Parts(parts) => {
                if let Some(ContentPart::Text { text }) = parts.last_mut() {
                    text.push_str(delta);
                } else {
                    parts.push(ContentPart::Text {
                        text: delta.to_string(),
                    });
                }
            }
        }
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}
