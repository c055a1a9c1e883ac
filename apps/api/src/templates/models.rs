//! Data model for template extraction. Every value here is built fresh for
//! one log line and never mutated after the pipeline hands it out.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

/// Sentinel template used when extraction could not produce a record.
pub const PARSE_ERROR_TEMPLATE: &str = "<PARSE_ERROR>";

/// Placeholder name → literal value extracted from one log line.
pub type Variables = BTreeMap<String, String>;

/// How the extraction prompt is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptMode {
    ZeroShot,
    #[default]
    FewShot,
}

/// Result of template extraction for one log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRecord {
    pub template: String,
    pub variables: Variables,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_log: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl ExtractionRecord {
    /// Builds the sentinel record used for every line-level extraction failure.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            template: PARSE_ERROR_TEMPLATE.to_string(),
            variables: Variables::new(),
            original_log: None,
            parse_error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.parse_error.is_some()
    }

    /// True when the record may be normalized and embedded.
    pub fn is_embeddable(&self) -> bool {
        !self.is_failed() && !self.template.trim().is_empty()
    }
}

/// The shape the extraction service is asked to return. Field names follow
/// the prompt, not the outward camelCase serialization.
#[derive(Debug, Deserialize)]
pub(crate) struct ModelExtraction {
    pub template: String,
    #[serde(default, deserialize_with = "deserialize_variables")]
    pub variables: Variables,
    #[serde(default)]
    pub original_log: Option<String>,
}

impl From<ModelExtraction> for ExtractionRecord {
    fn from(raw: ModelExtraction) -> Self {
        Self {
            template: raw.template,
            variables: raw.variables,
            original_log: raw.original_log,
            parse_error: None,
        }
    }
}

/// Accepts a JSON object whose values are any scalar. Strings are taken as-is,
/// other values keep their compact JSON text. `null` is treated as empty.
fn deserialize_variables<'de, D>(deserializer: D) -> Result<Variables, D::Error>
where
    D: Deserializer<'de>,
{
    struct VariablesVisitor;

    impl<'de> Visitor<'de> for VariablesVisitor {
        type Value = Variables;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a JSON object of placeholder values")
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(Variables::new())
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut variables = Variables::new();
            while let Some((key, value)) = map.next_entry::<String, serde_json::Value>()? {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                variables.insert(key, value);
            }
            Ok(variables)
        }
    }

    deserializer.deserialize_any(VariablesVisitor)
}

/// A worked example steering few-shot extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FewShotExample {
    pub log_line: String,
    pub record: ExtractionRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExampleError {
    #[error("few-shot example for '{0}' has an empty template")]
    EmptyTemplate(String),

    #[error("few-shot example for '{0}' carries a parse error")]
    FailedRecord(String),
}

impl FewShotExample {
    /// Builds an example, rejecting records that are not valid extractions.
    pub fn new(log_line: impl Into<String>, record: ExtractionRecord) -> Result<Self, ExampleError> {
        let log_line = log_line.into();
        if record.is_failed() {
            return Err(ExampleError::FailedRecord(log_line));
        }
        if record.template.trim().is_empty() {
            return Err(ExampleError::EmptyTemplate(log_line));
        }
        Ok(Self { log_line, record })
    }
}

/// One extraction record plus its embedding, if one was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub record: ExtractionRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_error: Option<String>,
}

impl PipelineResult {
    pub fn without_embedding(record: ExtractionRecord) -> Self {
        Self {
            record,
            normalized_template: None,
            embedding: None,
            embedding_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_extraction_stringifies_scalar_variables() {
        let json = r#"{"template": "port <PORT> open <FLAG>", "variables": {"PORT": 8080, "FLAG": true}}"#;
        let raw: ModelExtraction = serde_json::from_str(json).unwrap();
        assert_eq!(raw.variables["PORT"], "8080");
        assert_eq!(raw.variables["FLAG"], "true");
    }

    #[test]
    fn test_model_extraction_null_variables_is_empty() {
        let raw: ModelExtraction =
            serde_json::from_str(r#"{"template": "ok", "variables": null}"#).unwrap();
        assert!(raw.variables.is_empty());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let mut record = ExtractionRecord::failed("boom");
        record.original_log = Some("line".to_string());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["template"], "<PARSE_ERROR>");
        assert_eq!(value["originalLog"], "line");
        assert_eq!(value["parseError"], "boom");
    }

    #[test]
    fn test_successful_record_omits_parse_error() {
        let record = ExtractionRecord {
            template: "Started <SERVICE>".to_string(),
            variables: Variables::from([("SERVICE".to_string(), "nginx".to_string())]),
            original_log: None,
            parse_error: None,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("parseError").is_none());
        assert!(value.get("originalLog").is_none());
        assert!(record.is_embeddable());
    }

    #[test]
    fn test_whitespace_template_is_not_embeddable() {
        let record = ExtractionRecord {
            template: "   ".to_string(),
            variables: Variables::new(),
            original_log: None,
            parse_error: None,
        };
        assert!(!record.is_embeddable());
        assert!(!ExtractionRecord::failed("x").is_embeddable());
    }

    #[test]
    fn test_few_shot_example_rejects_failed_record() {
        let err = FewShotExample::new("line", ExtractionRecord::failed("bad")).unwrap_err();
        assert_eq!(err, ExampleError::FailedRecord("line".to_string()));
    }

    #[test]
    fn test_few_shot_example_rejects_empty_template() {
        let record = ExtractionRecord {
            template: String::new(),
            variables: Variables::new(),
            original_log: None,
            parse_error: None,
        };
        let err = FewShotExample::new("line", record).unwrap_err();
        assert_eq!(err, ExampleError::EmptyTemplate("line".to_string()));
    }

    #[test]
    fn test_prompt_mode_serde() {
        let mode: PromptMode = serde_json::from_str(r#""zero_shot""#).unwrap();
        assert_eq!(mode, PromptMode::ZeroShot);
        assert_eq!(PromptMode::default(), PromptMode::FewShot);
    }
}
