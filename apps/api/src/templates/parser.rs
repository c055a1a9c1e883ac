//! Structured response parser: decodes the completion service's raw text into
//! an [`ExtractionRecord`]. Decode failures never escape this module; they
//! become a `<PARSE_ERROR>` record carrying the decoder's message.

use tracing::warn;

use crate::templates::models::{ExtractionRecord, ModelExtraction};

/// Strictly decodes `raw_text` (trimmed) as a JSON object. No repair is attempted.
pub fn parse_response(raw_text: &str) -> ExtractionRecord {
    match serde_json::from_str::<ModelExtraction>(raw_text.trim()) {
        Ok(raw) => raw.into(),
        Err(e) => {
            warn!("Model output is not a valid extraction object: {e}");
            ExtractionRecord::failed(format!("invalid JSON from extraction service: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::models::{Variables, PARSE_ERROR_TEMPLATE};

    fn vars(pairs: &[(&str, &str)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_well_formed_response_maps_fields() {
        let raw = r#"
            {"template": "<TIMESTAMP> User <USERNAME> logged in from <IP_ADDRESS>",
             "variables": {
               "TIMESTAMP": "2023-01-01 10:23:45",
               "USERNAME": "alice",
               "IP_ADDRESS": "192.168.1.1"
             }}
        "#;
        let record = parse_response(raw);
        assert_eq!(
            record.template,
            "<TIMESTAMP> User <USERNAME> logged in from <IP_ADDRESS>"
        );
        assert_eq!(
            record.variables,
            vars(&[
                ("TIMESTAMP", "2023-01-01 10:23:45"),
                ("USERNAME", "alice"),
                ("IP_ADDRESS", "192.168.1.1"),
            ])
        );
        assert!(record.parse_error.is_none());
        assert!(record.original_log.is_none());
    }

    #[test]
    fn test_original_log_is_kept_and_unknown_fields_ignored() {
        let raw = r#"{"template": "ok", "variables": {}, "original_log": "ok", "confidence": 0.9}"#;
        let record = parse_response(raw);
        assert_eq!(record.original_log.as_deref(), Some("ok"));
        assert!(record.parse_error.is_none());
    }

    #[test]
    fn test_missing_variables_defaults_to_empty() {
        let record = parse_response(r#"{"template": "Service started"}"#);
        assert_eq!(record.template, "Service started");
        assert!(record.variables.is_empty());
        assert!(record.parse_error.is_none());
    }

    #[test]
    fn test_truncated_json_falls_back() {
        let record = parse_response(r#"{"template": "<TIMESTAMP> x", "variables": {"#);
        assert_eq!(record.template, PARSE_ERROR_TEMPLATE);
        assert!(record.variables.is_empty());
        assert!(record.parse_error.is_some());
    }

    #[test]
    fn test_prose_falls_back() {
        let record = parse_response("Sure! Here is the template you asked for.");
        assert_eq!(record.template, PARSE_ERROR_TEMPLATE);
        assert!(record.parse_error.unwrap().contains("invalid JSON"));
    }

    #[test]
    fn test_code_fences_are_not_repaired() {
        let record = parse_response("```json\n{\"template\": \"x\"}\n```");
        assert_eq!(record.template, PARSE_ERROR_TEMPLATE);
    }

    #[test]
    fn test_non_object_json_falls_back() {
        assert!(parse_response(r#"["template", "variables"]"#).is_failed());
        assert!(parse_response(r#"{"variables": {}}"#).is_failed());
        assert!(parse_response("").is_failed());
    }
}
