//! Wire types for the Gemini REST API.
//!
//! Only the fields this service reads or writes are modelled; unknown response fields are ignored.

use serde::{Deserialize, Serialize};

use super::{ContentPart, UploadedFile};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct StartUploadRequest<'a> {
    pub file: StartUploadFile<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct StartUploadFile<'a> {
    pub display_name: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct UploadFileResponse {
    pub file: GeminiFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiFile {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub(super) struct GenerateContentRequest<'a> {
    pub contents: Vec<GeminiContent<'a>>,
}

impl<'a> GenerateContentRequest<'a> {
    /// A single user turn holding `parts` in order.
    pub fn user(parts: &'a [ContentPart]) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: "user",
                parts: parts.iter().map(GeminiPart::from).collect(),
            }],
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub(super) struct GeminiContent<'a> {
    pub role: &'static str,
    pub parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", untagged)]
pub(super) enum GeminiPart<'a> {
    Text {
        text: &'a str,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: GeminiFileData<'a>,
    },
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiFileData<'a> {
    pub mime_type: &'a str,
    pub file_uri: &'a str,
}

impl<'a> From<&'a ContentPart> for GeminiPart<'a> {
    fn from(part: &'a ContentPart) -> Self {
        match part {
            ContentPart::Text(text) => GeminiPart::Text { text },
            ContentPart::File(UploadedFile { uri, mime_type, .. }) => GeminiPart::FileData {
                file_data: GeminiFileData {
                    mime_type,
                    file_uri: uri,
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GeminiResponseContent {
    #[serde(default)]
    pub parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GeminiResponsePart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiPromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// The text of the first candidate: all non-thought text parts, concatenated.
    ///
    /// Returns `None` when there is no candidate at all.
    pub fn text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generate_request_shape() {
        let parts = vec![
            ContentPart::Text("Estimate the concrete volume.".to_string()),
            ContentPart::File(UploadedFile {
                name: "files/abc".to_string(),
                uri: "https://example.test/v1beta/files/abc".to_string(),
                mime_type: "application/pdf".to_string(),
            }),
        ];

        let body = serde_json::to_value(GenerateContentRequest::user(&parts)).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "Estimate the concrete volume."},
                        {"fileData": {"mimeType": "application/pdf", "fileUri": "https://example.test/v1beta/files/abc"}}
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_response_text_concatenates_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"role": "model", "parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "<p>Total: "},
                    {"text": "42 m3</p>"}
                ]}, "finishReason": "STOP"},
                {"content": {"parts": [{"text": "ignored"}]}}
            ],
            "usageMetadata": {"promptTokenCount": 10}
        }))
        .unwrap();

        assert_eq!(response.text().as_deref(), Some("<p>Total: 42 m3</p>"));
    }

    #[test]
    fn test_response_without_candidates() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();

        assert_eq!(
            response.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()),
            Some("SAFETY")
        );
        assert!(response.text().is_none());
    }

    #[test]
    fn test_candidate_without_content_is_empty_text() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();

        assert_eq!(response.text().as_deref(), Some(""));
    }
}
