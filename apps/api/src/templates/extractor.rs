//! Template extraction: prompt, completion call, parsed record.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::llm_client::CompletionService;
use crate::templates::models::{ExtractionRecord, PromptMode};
use crate::templates::parser::parse_response;
use crate::templates::prompts::build_prompt;

/// Extraction always decodes greedily so repeated calls stay reproducible.
pub const EXTRACTION_TEMPERATURE: f32 = 0.0;

/// Stateless across calls; cheap to clone and share between tasks.
#[derive(Clone)]
pub struct TemplateExtractor {
    completions: Arc<dyn CompletionService>,
}

impl TemplateExtractor {
    pub fn new(completions: Arc<dyn CompletionService>) -> Self {
        Self { completions }
    }

    /// Extracts a template and variables from one log line.
    ///
    /// Service failures and undecodable output both come back as a
    /// `<PARSE_ERROR>` record; this never fails. `original_log` is always set.
    pub async fn extract(
        &self,
        log_line: &str,
        mode: PromptMode,
        few_shot_examples: Option<&str>,
    ) -> ExtractionRecord {
        let prompt = build_prompt(log_line, mode, few_shot_examples);

        let mut record = match self
            .completions
            .complete(&prompt, EXTRACTION_TEMPERATURE)
            .await
        {
            Ok(raw) => {
                debug!("Raw model output:\n{raw}");
                parse_response(&raw)
            }
            Err(e) => {
                warn!("Completion call failed for log line {log_line:?}: {e}");
                ExtractionRecord::failed(format!("completion service error: {e}"))
            }
        };

        if record.is_failed() || record.original_log.is_none() {
            record.original_log = Some(log_line.to_string());
        }
        record
    }
}
