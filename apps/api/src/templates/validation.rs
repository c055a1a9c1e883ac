//! Consumer-side consistency check between a template's placeholders and its
//! variables. The pipeline passes records through unvalidated; callers that
//! need strict records opt in here.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::templates::models::ExtractionRecord;
use crate::templates::normalizer::placeholders;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("template/variables mismatch: missing variables {missing_variables:?}, unreferenced variables {unreferenced_variables:?}")]
pub struct ValidationError {
    /// Placeholders in the template with no variable entry.
    pub missing_variables: Vec<String>,
    /// Variables whose name never appears as a placeholder.
    pub unreferenced_variables: Vec<String>,
}

/// Checks that every placeholder has a value and every value has a placeholder.
/// Failed records are not checked.
pub fn check_consistency(record: &ExtractionRecord) -> Result<(), ValidationError> {
    if record.is_failed() {
        return Ok(());
    }

    let referenced: BTreeSet<&str> = placeholders(&record.template).into_iter().collect();

    let missing_variables: Vec<String> = referenced
        .iter()
        .filter(|name| !record.variables.contains_key(**name))
        .map(|name| name.to_string())
        .collect();

    let unreferenced_variables: Vec<String> = record
        .variables
        .keys()
        .filter(|key| !referenced.contains(key.as_str()))
        .cloned()
        .collect();

    if missing_variables.is_empty() && unreferenced_variables.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            missing_variables,
            unreferenced_variables,
        })
    }
}
