//! Fill the external data-entry form.
//!
//! The form page is fetched over HTTP and its `<input>`/`<textarea>` fields
//! are parsed out of the markup. The model maps the free text onto those
//! fields, and a WebDriver session types each value into the live page.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use autofill_providers::{CompletionRequest, LLMProvider, Message, ResponseFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error_handling::CapabilityFailure;
use crate::prompts::field_mapping_prompt;
use crate::tool_definitions::FILL_FORM;
use crate::tools::executor::ToolContext;
use crate::ui_writer::UiWriter;
use crate::webdriver_session::FormBrowser;

// Quoted attribute values may contain '>'
static FIELD_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<(input|textarea)\b((?:"[^"]*"|'[^']*'|[^'">])*)>"#).unwrap()
});
static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .unwrap()
});
static NUMERIC_ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]+)|([0-9]+));").unwrap());

/// Input types that carry no user-entered data.
const NON_DATA_INPUT_TYPES: &[&str] = &["hidden", "submit", "button", "reset", "image"];

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url` and return the body. Non-2xx statuses are errors.
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpPageFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpPageFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?
            .error_for_status()
            .with_context(|| format!("Form page {} returned an error status", url))?;

        response
            .text()
            .await
            .with_context(|| format!("Failed to read the body of {}", url))
    }
}

/// A data-carrying field found in the form markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: Option<String>,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub field_type: String,
    pub placeholder: Option<String>,
}

impl FormField {
    /// Key the model is asked to use; id wins over name.
    pub fn key(&self) -> Option<&str> {
        self.id.as_deref().or(self.name.as_deref())
    }

    fn matches_key(&self, key: &str) -> bool {
        self.id.as_deref() == Some(key) || self.name.as_deref() == Some(key)
    }
}

/// Extract the `<input>` and `<textarea>` fields of a page, in document order.
///
/// Hidden and button-like inputs are skipped, as are fields with neither an
/// id nor a name since nothing could locate them later.
pub fn parse_form_fields(html: &str) -> Vec<FormField> {
    let html = COMMENT_RE.replace_all(html, "");
    FIELD_TAG_RE
        .captures_iter(&html)
        .filter_map(|tag| {
            let tag_name = tag[1].to_ascii_lowercase();
            let attributes = parse_attributes(&tag[2]);
            let attr = |key: &str| {
                attributes
                    .iter()
                    .find(|(name, _)| name == key)
                    .map(|(_, value)| value.clone())
                    .filter(|value| !value.is_empty())
            };

            let field_type = if tag_name == "textarea" {
                "textarea".to_string()
            } else {
                attr("type")
                    .map(|t| t.to_ascii_lowercase())
                    .unwrap_or_else(|| "text".to_string())
            };
            if NON_DATA_INPUT_TYPES.contains(&field_type.as_str()) {
                return None;
            }

            let field = FormField {
                name: attr("name"),
                id: attr("id"),
                field_type,
                placeholder: attr("placeholder"),
            };
            field.key().is_some().then_some(field)
        })
        .collect()
}

fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    ATTRIBUTE_RE
        .captures_iter(raw)
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| decode_entities(m.as_str()))
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

pub fn decode_entities(text: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(text, |caps: &regex::Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, Some(dec)) => dec.as_str().parse().ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    // &amp; last so "&amp;lt;" decodes to "&lt;"
    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

/// Strip a surrounding markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Turn the model's reply into ordered `(field key, value)` pairs.
///
/// Pairs follow form order; keys the form does not know come last.
pub fn parse_field_mapping(reply: &str, fields: &[FormField]) -> Result<Vec<(String, String)>> {
    let json = strip_code_fence(reply);
    let value: Value = serde_json::from_str(json)
        .with_context(|| format!("Field mapping is not valid JSON: {}", json))?;
    let Value::Object(object) = value else {
        anyhow::bail!("Field mapping must be a JSON object, got: {}", json);
    };

    let mut entries: Vec<(String, String)> = object
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s,
                other => other.to_string(),
            };
            Some((key, text))
        })
        .collect();

    let position = |key: &str| {
        fields
            .iter()
            .position(|f| f.matches_key(key))
            .unwrap_or(usize::MAX)
    };
    entries.sort_by_key(|(key, _)| position(key));

    Ok(entries)
}

pub async fn map_fields_with_model(
    provider: &dyn LLMProvider,
    fields: &[FormField],
    text: &str,
) -> Result<Vec<(String, String)>> {
    let fields_json = serde_json::to_string(fields).context("Failed to encode form fields")?;
    let request = CompletionRequest::new(vec![Message::user(field_mapping_prompt(
        &fields_json,
        text,
    ))])
    .with_temperature(0.0)
    .with_response_format(ResponseFormat::JsonObject);

    let response = provider
        .complete(request)
        .await
        .context("Failed to map the text onto the form fields")?;
    debug!("Field mapping reply: {}", response.content);

    parse_field_mapping(&response.content, fields)
}

/// What happened to each mapped field
#[derive(Debug, Default)]
pub struct FillReport {
    pub entered: Vec<(String, String)>,
    pub failed: Vec<(String, String)>,
}

impl FillReport {
    pub fn summary(&self, url: &str) -> String {
        let mut out = format!("✅ Entered {} field(s) into {}", self.entered.len(), url);
        for (key, value) in &self.entered {
            out.push_str(&format!("\n- {}: {}", key, value));
        }
        if !self.failed.is_empty() {
            out.push_str(&format!("\nFailed to fill {} field(s):", self.failed.len()));
            for (key, reason) in &self.failed {
                out.push_str(&format!("\n- {}: {}", key, reason));
            }
        }
        out
    }
}

async fn fill_page(
    browser: &mut dyn FormBrowser,
    url: &str,
    mapping: &[(String, String)],
    ready_timeout: Duration,
    poll_interval: Duration,
) -> Result<FillReport> {
    browser
        .navigate(url)
        .await
        .with_context(|| format!("Failed to open {}", url))?;
    browser
        .wait_until_ready(ready_timeout, poll_interval)
        .await
        .context("Form page did not finish loading")?;

    let mut report = FillReport::default();
    for (key, value) in mapping {
        match browser.fill_field(key, value).await {
            Ok(()) => {
                debug!("Entered data into field '{}'", key);
                report.entered.push((key.clone(), value.clone()));
            }
            Err(e) => {
                warn!("Failed to enter data into field '{}': {:#}", key, e);
                report.failed.push((key.clone(), format!("{:#}", e)));
            }
        }
    }
    Ok(report)
}

/// Execute the `enter_data` tool.
pub async fn execute_fill_form<W: UiWriter>(
    analyzed_text: &str,
    ctx: &ToolContext<'_, W>,
) -> Result<String, CapabilityFailure> {
    fill_form(analyzed_text, ctx)
        .await
        .map_err(|e| CapabilityFailure::from_error(FILL_FORM, &e))
}

async fn fill_form<W: UiWriter>(analyzed_text: &str, ctx: &ToolContext<'_, W>) -> Result<String> {
    let form = &ctx.config.form;
    let collaborators = ctx.collaborators;

    let html = collaborators.page_fetcher.fetch(&form.url).await?;
    let fields = parse_form_fields(&html);
    if fields.is_empty() {
        anyhow::bail!("No form fields found on {}", form.url);
    }
    debug!("Found {} form fields on {}", fields.len(), form.url);

    let mapping = map_fields_with_model(ctx.provider, &fields, analyzed_text).await?;
    if mapping.is_empty() {
        anyhow::bail!("None of the text could be matched to a form field");
    }

    let mut browser = collaborators.form_browser.launch().await?;
    let result = fill_page(
        browser.as_mut(),
        &form.url,
        &mapping,
        Duration::from_millis(form.ready_timeout_ms),
        Duration::from_millis(form.poll_interval_ms),
    )
    .await;

    if form.keep_browser_open {
        debug!("Leaving the form browser open");
    } else if let Err(e) = browser.quit().await {
        warn!("Failed to close the form browser: {:#}", e);
    }

    let report = result?;
    if report.entered.is_empty() {
        anyhow::bail!(
            "No field could be filled:\n{}",
            report
                .failed
                .iter()
                .map(|(key, reason)| format!("- {}: {}", key, reason))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    info!(
        "Filled {} field(s) on {} ({} failed)",
        report.entered.len(),
        form.url,
        report.failed.len()
    );
    Ok(report.summary(&form.url))
}
