//! Web search: open results in the system browser, read them off the screen
//! and summarize them with the model.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use autofill_providers::{CompletionRequest, Message};
use tempfile::TempPath;
use tracing::{debug, info};

use crate::error_handling::CapabilityFailure;
use crate::prompts::{search_analysis_prompt, SEARCH_SYSTEM_PROMPT};
use crate::tool_definitions::WEB_SEARCH;
use crate::tools::executor::ToolContext;
use crate::ui_writer::UiWriter;

/// `<engine_url>?q=<query>`, with the query form-urlencoded.
pub fn build_search_url(engine_url: &str, query: &str) -> Result<String> {
    let url = url::Url::parse_with_params(engine_url, &[("q", query)])
        .with_context(|| format!("Invalid search engine URL: {}", engine_url))?;
    Ok(url.to_string())
}

/// Reserve a PNG path that is deleted when the returned guard drops.
fn screenshot_path(dir: Option<&str>) -> Result<TempPath> {
    let dir = match dir {
        Some(dir) => PathBuf::from(shellexpand::tilde(dir).as_ref()),
        None => std::env::temp_dir(),
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create screenshot directory {}", dir.display()))?;

    let file = tempfile::Builder::new()
        .prefix("autofill-search-")
        .suffix(".png")
        .tempfile_in(&dir)
        .with_context(|| format!("Failed to create screenshot file in {}", dir.display()))?;
    Ok(file.into_temp_path())
}

/// Execute the `search_google` tool.
pub async fn execute_web_search<W: UiWriter>(
    query: &str,
    ctx: &ToolContext<'_, W>,
) -> Result<String, CapabilityFailure> {
    search_and_summarize(query, ctx)
        .await
        .map_err(|e| CapabilityFailure::from_error(WEB_SEARCH, &e))
}

async fn search_and_summarize<W: UiWriter>(query: &str, ctx: &ToolContext<'_, W>) -> Result<String> {
    let search = &ctx.config.search;
    let collaborators = ctx.collaborators;

    let url = build_search_url(&search.engine_url, query)?;
    info!("Searching for '{}'", query);
    collaborators.url_opener.open(&url).await?;

    debug!("Waiting {}ms for the results page to render", search.render_delay_ms);
    tokio::time::sleep(Duration::from_millis(search.render_delay_ms)).await;

    let screenshot = screenshot_path(search.screenshot_dir.as_deref())?;
    let path = screenshot
        .to_str()
        .context("Screenshot path is not valid UTF-8")?
        .to_string();

    collaborators
        .screen_capture
        .take_screenshot(&path)
        .await
        .context("Failed to capture the screen")?;

    let text = collaborators
        .ocr
        .extract_text(&path)
        .await
        .with_context(|| format!("{} could not read the screenshot", collaborators.ocr.name()))?;
    drop(screenshot);

    if text.trim().is_empty() {
        anyhow::bail!("No text could be read from the search results page");
    }
    debug!("OCR extracted {} chars", text.len());

    let request = CompletionRequest::new(vec![
        Message::system(SEARCH_SYSTEM_PROMPT),
        Message::user(search_analysis_prompt(&text, query)),
    ]);
    let response = ctx
        .provider
        .complete(request)
        .await
        .context("Failed to summarize the search results")?;

    if response.content.trim().is_empty() {
        anyhow::bail!("The model returned an empty summary");
    }

    info!("Search for '{}' answered", query);
    Ok(response.content)
}
