use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form metadata attached to notebooks, columns, cells and outputs
pub type Metadata = Map<String, Value>;

/// MIME-type keyed representations of a rich output
pub type MimeBundle = Map<String, Value>;

pub const STREAM: &str = "stream";
pub const EXECUTE_RESULT: &str = "execute_result";
pub const DISPLAY_DATA: &str = "display_data";
pub const ERROR: &str = "error";

/// One result of a cell execution, tagged by `output_type` on the wire.
///
/// Outputs are never patched in place: a cell's outputs only change when the
/// whole notebook is replaced by a fetch from the backend. Kinds this client
/// does not know about are kept verbatim in [`Output::Unknown`] so they
/// survive a save unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Output {
    Stream(StreamOutput),
    ExecuteResult(RichOutput),
    DisplayData(RichOutput),
    Error(ErrorOutput),

    /// Any other `output_type`; holds the complete JSON object
    Unknown(Map<String, Value>),
}

/// Text written to stdout/stderr during execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamOutput {
    #[serde(default = "default_stream_name")]
    pub name: String,
    pub text: MultilineText,

    /// Fields this client does not interpret (`data`, `metadata`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload shared by `execute_result` and `display_data`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RichOutput {
    #[serde(default)]
    pub data: MimeBundle,

    #[serde(default)]
    pub metadata: Metadata,

    /// Only present on `execute_result`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_count: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Exception raised by the kernel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorOutput {
    #[serde(default)]
    pub ename: String,

    #[serde(default)]
    pub evalue: String,

    #[serde(default)]
    pub traceback: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Text that the backend may send either as one string or as a list of
/// fragments to be concatenated in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultilineText {
    Single(String),
    Lines(Vec<String>),
}

impl MultilineText {
    /// Concatenate all fragments
    pub fn joined(&self) -> String {
        match self {
            MultilineText::Single(text) => text.clone(),
            MultilineText::Lines(lines) => lines.concat(),
        }
    }
}

impl From<&str> for MultilineText {
    fn from(text: &str) -> Self {
        MultilineText::Single(text.to_string())
    }
}

impl From<String> for MultilineText {
    fn from(text: String) -> Self {
        MultilineText::Single(text)
    }
}

fn default_stream_name() -> String {
    "stdout".to_string()
}

impl Output {
    /// Create a stream output
    pub fn stream(name: impl Into<String>, text: impl Into<MultilineText>) -> Self {
        Output::Stream(StreamOutput {
            name: name.into(),
            text: text.into(),
            extra: Map::new(),
        })
    }

    /// Create an `execute_result` output
    pub fn execute_result(data: MimeBundle, execution_count: Option<u64>) -> Self {
        Output::ExecuteResult(RichOutput {
            data,
            metadata: Metadata::new(),
            execution_count,
            extra: Map::new(),
        })
    }

    /// Create a `display_data` output
    pub fn display_data(data: MimeBundle) -> Self {
        Output::DisplayData(RichOutput {
            data,
            ..RichOutput::default()
        })
    }

    /// Create an error output
    pub fn error(
        ename: impl Into<String>,
        evalue: impl Into<String>,
        traceback: Vec<String>,
    ) -> Self {
        Output::Error(ErrorOutput {
            ename: ename.into(),
            evalue: evalue.into(),
            traceback,
            extra: Map::new(),
        })
    }

    /// The wire value of `output_type`
    pub fn output_type(&self) -> &str {
        match self {
            Output::Stream(_) => STREAM,
            Output::ExecuteResult(_) => EXECUTE_RESULT,
            Output::DisplayData(_) => DISPLAY_DATA,
            Output::Error(_) => ERROR,
            Output::Unknown(fields) => fields
                .get("output_type")
                .and_then(Value::as_str)
                .unwrap_or(""),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Output::Error(_))
    }
}

impl TryFrom<Value> for Output {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Output, serde_json::Error> {
        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(serde_json::Error::custom(format!(
                    "output must be a JSON object, got {}",
                    other
                )))
            }
        };

        let kind = fields
            .get("output_type")
            .and_then(Value::as_str)
            .map(str::to_owned);

        let payload = || {
            let mut payload = fields.clone();
            payload.remove("output_type");
            Value::Object(payload)
        };

        let decoded = match kind.as_deref() {
            Some(STREAM) => serde_json::from_value(payload()).map(Output::Stream),
            Some(EXECUTE_RESULT) => serde_json::from_value(payload()).map(Output::ExecuteResult),
            Some(DISPLAY_DATA) => serde_json::from_value(payload()).map(Output::DisplayData),
            Some(ERROR) => serde_json::from_value(payload()).map(Output::Error),
            _ => return Ok(Output::Unknown(fields)),
        };

        // A malformed payload must not reject the whole notebook
        Ok(decoded.unwrap_or_else(|e| {
            tracing::warn!("Keeping malformed {} output as-is: {}", kind.as_deref().unwrap_or(""), e);
            Output::Unknown(fields)
        }))
    }
}

impl From<Output> for Value {
    fn from(output: Output) -> Value {
        let (kind, payload) = match output {
            Output::Stream(stream) => (STREAM, serde_json::to_value(stream)),
            Output::ExecuteResult(rich) => (EXECUTE_RESULT, serde_json::to_value(rich)),
            Output::DisplayData(rich) => (DISPLAY_DATA, serde_json::to_value(rich)),
            Output::Error(error) => (ERROR, serde_json::to_value(error)),
            Output::Unknown(fields) => return Value::Object(fields),
        };

        let mut fields = match payload {
            Ok(Value::Object(fields)) => fields,
            _ => Map::new(),
        };
        fields.insert("output_type".to_string(), Value::String(kind.to_string()));
        Value::Object(fields)
    }
}
