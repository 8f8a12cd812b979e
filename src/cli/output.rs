//! Output formatting for probe results

use anyhow::{Context, Result};
use serde::Serialize;

use crate::probe::InvocationResult;

/// Print each invocation result, as JSON lines or plain text.
pub fn print_results(results: &[InvocationResult], json: bool) -> Result<()> {
    for result in results {
        if json {
            print_json(result)?;
        } else {
            println!("{}", render_text(result));
        }
    }
    Ok(())
}

/// `<status>` on success, `<status>: <error>` on failure.
pub fn render_text(result: &InvocationResult) -> String {
    match &result.error {
        Some(error) => format!("{}: {}", result.status, error),
        None => result.status.clone(),
    }
}

/// Print data as single-line JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}
