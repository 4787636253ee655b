use std::path::PathBuf;
use std::time::Instant;

use super::{CallToolResult, Content, JsonRpcError};
use crate::prelude::eprintln;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

#[derive(Deserialize)]
struct PathArgs {
    path: PathBuf,
}

fn parse_args<T: serde::de::DeserializeOwned>(
    arguments: Option<serde_json::Value>,
) -> Result<T, JsonRpcError> {
    serde_json::from_value(arguments.unwrap_or(serde_json::Value::Null)).map_err(|e| JsonRpcError {
        code: INVALID_PARAMS,
        message: format!("Invalid arguments: {e}"),
        data: None,
    })
}

fn internal_err(message: String) -> JsonRpcError {
    JsonRpcError {
        code: INTERNAL_ERROR,
        message,
        data: None,
    }
}

fn to_text_result(value: &impl serde::Serialize) -> Result<serde_json::Value, JsonRpcError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| internal_err(format!("Serialization error: {e}")))?;

    serde_json::to_value(CallToolResult {
        content: vec![Content::Text { text: json }],
        is_error: None,
    })
    .map_err(|e| internal_err(format!("Internal error: {e}")))
}

async fn run_blocking<T, F>(f: F) -> Result<T, JsonRpcError>
where
    T: Send + 'static,
    F: FnOnce() -> color_eyre::eyre::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| internal_err(format!("Task join error: {e}")))?
        .map_err(|e| internal_err(format!("{e:#}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn handle_pdf_paragraphs(
    arguments: Option<serde_json::Value>,
    global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    let args: PathArgs = parse_args(arguments)?;
    let started = Instant::now();

    let article = run_blocking(move || crate::pdf::load_article(&args.path)).await?;

    if global.verbose {
        eprintln!(
            "Parsed {} paragraphs in {:.2?}",
            article.paragraphs.len(),
            started.elapsed()
        );
    }

    to_text_result(&article)
}

pub async fn handle_pdf_info(
    arguments: Option<serde_json::Value>,
    _global: &crate::Global,
) -> Result<serde_json::Value, JsonRpcError> {
    let args: PathArgs = parse_args(arguments)?;

    let info = run_blocking(move || {
        let bytes = crate::pdf::read_pdf(&args.path)?;
        lectern_pdf::info(&bytes).map_err(|e| color_eyre::eyre::eyre!(e))
    })
    .await?;

    to_text_result(&info)
}
