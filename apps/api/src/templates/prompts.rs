// Prompt constants and builders for log template extraction.
// The log line and example block are inserted verbatim; the completion
// service is trusted, so nothing is escaped.

use serde_json::json;

use crate::templates::models::{ExtractionRecord, FewShotExample, PromptMode, Variables};

/// Task description shared by both modes; `fields` names the required output fields.
fn task_instructions(fields: &str) -> String {
    format!(
        "You are a log parser. For the given log line:
1. Identify a generalized log template by replacing variable parts (timestamp, usernames, IPs, IDs, numbers, etc.) with clearly typed placeholders like <TIMESTAMP>, <USERNAME>, <IP_ADDRESS>.
2. Extract the values of those variables in a JSON dictionary.
3. Output the JSON object with {fields}."
    )
}

const ZERO_SHOT_FIELDS: &str = r#"two fields: "template" and "variables""#;
const FEW_SHOT_FIELDS: &str = r#"three fields: "template", "variables", "original_log""#;

/// Builds the extraction prompt for `log_line`.
///
/// In few-shot mode `few_shot_examples` is inserted as-is; when absent the
/// rendered [`default_few_shot_examples`] are used. Zero-shot ignores it.
/// Inserted text is never rescanned, so braces in the line or examples stay literal.
pub fn build_prompt(log_line: &str, mode: PromptMode, few_shot_examples: Option<&str>) -> String {
    match mode {
        PromptMode::ZeroShot => {
            let instructions = task_instructions(ZERO_SHOT_FIELDS);
            format!("{instructions}\n\nLog Line: {log_line}")
        }
        PromptMode::FewShot => {
            let instructions = task_instructions(FEW_SHOT_FIELDS);
            let examples = match few_shot_examples {
                Some(block) => block.to_string(),
                None => render_few_shot_block(&default_few_shot_examples()),
            };
            format!(
                "{instructions}\n\n\
                 If possible, make use of the examples to improve accuracy:\n\n\
                 {examples}\n\n\
                 Now process the following:\n\n\
                 Log Line: {log_line}"
            )
        }
    }
}

/// Renders examples into the literal block embedded in few-shot prompts.
pub fn render_few_shot_block(examples: &[FewShotExample]) -> String {
    examples
        .iter()
        .enumerate()
        .map(|(i, example)| {
            let expected = json!({
                "template": example.record.template,
                "variables": example.record.variables,
            });
            format!("Example {}:\nLog Line:\n{}\n{}", i + 1, example.log_line, expected)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The two documented worked examples: a login line and a database failure.
pub fn default_few_shot_examples() -> Vec<FewShotExample> {
    vec![
        builtin_example(
            "2023-01-01 10:23:45 User alice logged in from 192.168.1.1",
            "<TIMESTAMP> User <USERNAME> logged in from <IP_ADDRESS>",
            &[
                ("TIMESTAMP", "2023-01-01 10:23:45"),
                ("USERNAME", "alice"),
                ("IP_ADDRESS", "192.168.1.1"),
            ],
        ),
        builtin_example(
            "Error: failed to connect to database db42 on host 10.0.0.2",
            "Error: failed to connect to database <DB_NAME> on host <IP_ADDRESS>",
            &[("DB_NAME", "db42"), ("IP_ADDRESS", "10.0.0.2")],
        ),
    ]
}

fn builtin_example(log_line: &str, template: &str, variables: &[(&str, &str)]) -> FewShotExample {
    FewShotExample {
        log_line: log_line.to_string(),
        record: ExtractionRecord {
            template: template.to_string(),
            variables: variables
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Variables>(),
            original_log: Some(log_line.to_string()),
            parse_error: None,
        },
    }
}
