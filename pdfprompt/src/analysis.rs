//! Prompt assembly and response rendering around a generation call.

use askama::Template;

/// MIME type the uploaded documents are announced with.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// The instruction text: the fixed template followed by the caller's prompt.
pub fn build_instruction(template: &str, prompt_text: &str) -> String {
    format!("{template}\n\nUser text:{prompt_text}")
}

#[derive(Template)]
#[template(
    source = "<h3>Gemini API Response:</h3><p>{% if escape %}{{ text }}{% else %}{{ text|safe }}{% endif %}</p>",
    ext = "html"
)]
struct GeneratedResponse<'a> {
    text: &'a str,
    escape: bool,
}

/// Embed generated text in the response fragment.
///
/// Unless `escape` is set the text is inserted as-is: the model is asked for HTML, and the caller
/// gets whatever markup it produced.
pub fn render_response(text: &str, escape: bool) -> askama::Result<String> {
    GeneratedResponse { text, escape }.render()
}
