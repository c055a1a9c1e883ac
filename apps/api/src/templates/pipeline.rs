//! Runs extraction then embedding over a batch of log lines.
//!
//! Flow per line: extract → (skip if failed or empty) → normalize → embed.
//! Lines are independent units of work, so up to `concurrency` of them run at
//! once; results are still yielded in input order. A failure on one line is
//! recorded on that line's result and never stops the batch.

use std::pin::pin;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::llm_client::{CompletionService, EmbeddingService};
use crate::templates::embedding::EmbeddingGenerator;
use crate::templates::extractor::TemplateExtractor;
use crate::templates::models::{PipelineResult, PromptMode};
use crate::templates::normalizer::normalize;

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Clone)]
pub struct Pipeline {
    extractor: TemplateExtractor,
    embedder: EmbeddingGenerator,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(
        completions: Arc<dyn CompletionService>,
        embeddings: Arc<dyn EmbeddingService>,
        concurrency: usize,
    ) -> Self {
        Self {
            extractor: TemplateExtractor::new(completions),
            embedder: EmbeddingGenerator::new(embeddings),
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Processes every line. Output has one result per input line, in order.
    pub async fn run(
        &self,
        log_lines: &[String],
        mode: PromptMode,
        few_shot_examples: Option<&str>,
    ) -> Vec<PipelineResult> {
        self.run_until_cancelled(log_lines, mode, few_shot_examples, &CancellationToken::new())
            .await
    }

    /// Like [`Pipeline::run`], but stops once `cancel` fires. The results
    /// completed before that point are returned in order; in-flight calls are
    /// dropped.
    pub async fn run_until_cancelled(
        &self,
        log_lines: &[String],
        mode: PromptMode,
        few_shot_examples: Option<&str>,
        cancel: &CancellationToken,
    ) -> Vec<PipelineResult> {
        info!(
            "Processing {} log lines ({:?}, concurrency {})",
            log_lines.len(),
            mode,
            self.concurrency
        );

        // Futures are lazy; `buffered` still starts at most `concurrency` at once.
        let per_line: Vec<_> = log_lines
            .iter()
            .map(|line| self.process_line(line, mode, few_shot_examples))
            .collect();
        let mut pending = pin!(stream::iter(per_line).buffered(self.concurrency));

        let mut results = Vec::with_capacity(log_lines.len());
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(
                        "Pipeline cancelled after {} of {} lines",
                        results.len(),
                        log_lines.len()
                    );
                    break;
                }
                next = pending.next() => match next {
                    Some(result) => results.push(result),
                    None => break,
                },
            }
        }

        let extracted = results.iter().filter(|r| !r.record.is_failed()).count();
        let embedded = results.iter().filter(|r| r.embedding.is_some()).count();
        info!(
            "Pipeline finished: {} results, {} extracted, {} embedded",
            results.len(),
            extracted,
            embedded
        );

        results
    }

    async fn process_line(
        &self,
        log_line: &str,
        mode: PromptMode,
        few_shot_examples: Option<&str>,
    ) -> PipelineResult {
        let record = self.extractor.extract(log_line, mode, few_shot_examples).await;
        if !record.is_embeddable() {
            return PipelineResult::without_embedding(record);
        }

        let normalized = normalize(&record.template);
        match self.embedder.embed(&normalized).await {
            Ok(embedding) => PipelineResult {
                record,
                normalized_template: Some(normalized),
                embedding: Some(embedding),
                embedding_error: None,
            },
            Err(e) => {
                warn!("Skipping embedding for template {normalized:?}: {e}");
                PipelineResult {
                    record,
                    normalized_template: Some(normalized),
                    embedding: None,
                    embedding_error: Some(e.to_string()),
                }
            }
        }
    }
}
