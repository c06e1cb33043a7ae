//! Output rendering
//!
//! A pure mapping from [`Output`] to a display form. Total over every output
//! kind: anything this client cannot show becomes a visible placeholder, never
//! an error and never a silently dropped output.

use crate::output::{
    ErrorOutput, MimeBundle, Output, DISPLAY_DATA, ERROR, EXECUTE_RESULT, STREAM,
};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

pub const TEXT_HTML: &str = "text/html";
pub const IMAGE_PNG: &str = "image/png";
pub const TEXT_PLAIN: &str = "text/plain";

/// Representation priority for `execute_result` and `display_data`, richest
/// first. The first MIME type with a non-empty value wins.
pub const MIME_PRIORITY: [&str; 3] = [TEXT_HTML, IMAGE_PNG, TEXT_PLAIN];

/// What a view layer should draw for one output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayForm {
    /// Stream text, shown preformatted
    Preformatted(String),

    Html(String),

    /// Base64 payload as sent by the kernel
    Image { mime: String, base64: String },

    /// `text/plain` representation, shown preformatted
    PlainText(String),

    /// Exception header (`ename: evalue`) and traceback lines
    Error { header: String, traceback: String },

    /// Placeholder for formats or kinds this client cannot show
    Unsupported(String),
}

impl DisplayForm {
    /// Projection for terminals and logs
    pub fn to_plain_text(&self) -> String {
        match self {
            DisplayForm::Preformatted(text)
            | DisplayForm::Html(text)
            | DisplayForm::PlainText(text)
            | DisplayForm::Unsupported(text) => text.clone(),
            DisplayForm::Image { mime, base64 } => {
                format!("[{} image, {} base64 bytes]", mime, base64.len())
            }
            DisplayForm::Error { header, traceback } if traceback.is_empty() => header.clone(),
            DisplayForm::Error { header, traceback } => format!("{}\n\n{}", header, traceback),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, DisplayForm::Unsupported(_))
    }
}

/// Render one output
pub fn render(output: &Output) -> DisplayForm {
    match output {
        Output::Stream(stream) => DisplayForm::Preformatted(stream.text.joined()),
        Output::ExecuteResult(rich) | Output::DisplayData(rich) => render_bundle(&rich.data),
        Output::Error(error) => render_error(error),
        Output::Unknown(_) => match output.output_type() {
            kind @ (STREAM | EXECUTE_RESULT | DISPLAY_DATA | ERROR) => {
                DisplayForm::Unsupported(format!("Malformed {} output", kind))
            }
            kind => DisplayForm::Unsupported(format!("Unknown output type: {}", kind)),
        },
    }
}

/// Render every output of a cell, in order
pub fn render_all(outputs: &[Output]) -> Vec<DisplayForm> {
    outputs.iter().map(render).collect()
}

fn render_bundle(data: &MimeBundle) -> DisplayForm {
    for mime in MIME_PRIORITY {
        let Some(text) = data.get(mime).and_then(representation) else {
            continue;
        };

        return match mime {
            TEXT_HTML => DisplayForm::Html(text),
            IMAGE_PNG => DisplayForm::Image {
                mime: mime.to_string(),
                // Kernels may wrap long base64 payloads
                base64: text.split_whitespace().collect(),
            },
            _ => DisplayForm::PlainText(text),
        };
    }

    let formats: Vec<&str> = data.keys().map(String::as_str).collect();
    DisplayForm::Unsupported(format!("Unsupported output format: {}", formats.join(", ")))
}

/// A MIME value as text: strings as-is, lists of strings concatenated
fn representation(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts.iter().filter_map(Value::as_str).collect(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn render_error(error: &ErrorOutput) -> DisplayForm {
    let traceback: Vec<String> = error
        .traceback
        .iter()
        .map(|line| strip_ansi(line))
        .collect();

    DisplayForm::Error {
        header: format!("{}: {}", error.ename, error.evalue),
        traceback: traceback.join("\n"),
    }
}

/// Remove terminal colour/control sequences that kernels embed in tracebacks
pub fn strip_ansi(text: &str) -> String {
    static ANSI: OnceLock<Option<Regex>> = OnceLock::new();

    match ANSI.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").ok()) {
        Some(pattern) => pattern.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}
