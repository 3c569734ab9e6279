//! Tool dispatch module - routes tool calls to their implementations.
//!
//! Raw [`ToolCall`]s from the model are turned into typed [`ToolRequest`]s
//! up front. Unknown names and malformed arguments are rejected there, before
//! any capability runs.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error_handling::ToolError;
use crate::tool_definitions::{FETCH_TABULAR_DATA, FILL_FORM, WEB_SEARCH};
use crate::tools::executor::ToolContext;
use crate::tools::{form_fill, spreadsheet, web_search};
use crate::ui_writer::UiWriter;
use crate::ToolCall;

/// A validated request for one of the known tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolRequest {
    FetchTabularData { file_path: String },
    WebSearch { query: String },
    FillForm { analyzed_text: String },
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FetchTabularDataArgs {
    file_path: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WebSearchArgs {
    query: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FillFormArgs {
    analyzed_text: String,
}

impl ToolRequest {
    /// Validate a tool name and its arguments.
    pub fn parse(name: &str, args: &Value) -> Result<Self, ToolError> {
        match name {
            FETCH_TABULAR_DATA => {
                let parsed: FetchTabularDataArgs = parse_args(name, args)?;
                Ok(ToolRequest::FetchTabularData {
                    file_path: non_empty(name, "file_path", parsed.file_path)?,
                })
            }
            WEB_SEARCH => {
                let parsed: WebSearchArgs = parse_args(name, args)?;
                Ok(ToolRequest::WebSearch {
                    query: non_empty(name, "query", parsed.query)?,
                })
            }
            FILL_FORM => {
                let parsed: FillFormArgs = parse_args(name, args)?;
                Ok(ToolRequest::FillForm {
                    analyzed_text: non_empty(name, "analyzed_text", parsed.analyzed_text)?,
                })
            }
            _ => {
                warn!("Unknown tool: {}", name);
                Err(ToolError::UnknownTool(name.to_string()))
            }
        }
    }

    pub fn from_call(call: &ToolCall) -> Result<Self, ToolError> {
        Self::parse(&call.tool, &call.args)
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolRequest::FetchTabularData { .. } => FETCH_TABULAR_DATA,
            ToolRequest::WebSearch { .. } => WEB_SEARCH,
            ToolRequest::FillForm { .. } => FILL_FORM,
        }
    }

    /// The single argument, for display
    pub fn argument(&self) -> (&'static str, &str) {
        match self {
            ToolRequest::FetchTabularData { file_path } => ("file_path", file_path),
            ToolRequest::WebSearch { query } => ("query", query),
            ToolRequest::FillForm { analyzed_text } => ("analyzed_text", analyzed_text),
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: &Value) -> Result<T, ToolError> {
    if !args.is_object() {
        return Err(ToolError::InvalidArgument {
            tool: tool.to_string(),
            reason: format!("expected a JSON object, got {}", args),
        });
    }
    serde_json::from_value(args.clone()).map_err(|e| ToolError::InvalidArgument {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}

fn non_empty(tool: &str, field: &str, value: String) -> Result<String, ToolError> {
    if value.trim().is_empty() {
        return Err(ToolError::InvalidArgument {
            tool: tool.to_string(),
            reason: format!("`{}` must not be empty", field),
        });
    }
    Ok(value)
}

/// Run a validated request.
///
/// Capability failures come back as failure text, never as an error.
pub async fn dispatch_tool<W: UiWriter>(request: &ToolRequest, ctx: &ToolContext<'_, W>) -> String {
    debug!("Dispatching tool: {}", request.tool_name());

    let result = match request {
        ToolRequest::FetchTabularData { file_path } => {
            spreadsheet::execute_fetch_tabular_data(file_path, ctx).await
        }
        ToolRequest::WebSearch { query } => web_search::execute_web_search(query, ctx).await,
        ToolRequest::FillForm { analyzed_text } => {
            form_fill::execute_fill_form(analyzed_text, ctx).await
        }
    };

    match result {
        Ok(output) => output,
        Err(failure) => {
            warn!("{}", failure);
            failure.to_tool_output()
        }
    }
}

/// Look up `name`, validate `args` and run the tool.
pub async fn invoke<W: UiWriter>(
    name: &str,
    args: &Value,
    ctx: &ToolContext<'_, W>,
) -> Result<String, ToolError> {
    let request = ToolRequest::parse(name, args)?;
    Ok(dispatch_tool(&request, ctx).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_tools() {
        assert_eq!(
            ToolRequest::parse("get_excel_data", &json!({"file_path": "/data/company.xlsx"})),
            Ok(ToolRequest::FetchTabularData {
                file_path: "/data/company.xlsx".to_string()
            })
        );
        assert_eq!(
            ToolRequest::parse("search_google", &json!({"query": "Acme Corp HQ"})),
            Ok(ToolRequest::WebSearch {
                query: "Acme Corp HQ".to_string()
            })
        );
        assert_eq!(
            ToolRequest::parse("enter_data", &json!({"analyzed_text": "Acme, 1 Main St"})),
            Ok(ToolRequest::FillForm {
                analyzed_text: "Acme, 1 Main St".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_tool_rejected() {
        assert_eq!(
            ToolRequest::parse("nonexistent_tool", &json!({})),
            Err(ToolError::UnknownTool("nonexistent_tool".to_string()))
        );
    }

    #[test]
    fn test_schema_mismatches_rejected() {
        let cases = [
            ("get_excel_data", json!({})),
            ("get_excel_data", json!({"file_path": 42})),
            ("get_excel_data", json!({"file_path": "a.xlsx", "sheet": "x"})),
            ("get_excel_data", json!("a.xlsx")),
            ("search_google", json!({"q": "acme"})),
            ("search_google", json!({"query": "   "})),
            ("enter_data", Value::Null),
        ];

        for (name, args) in cases {
            let result = ToolRequest::parse(name, &args);
            assert!(
                matches!(result, Err(ToolError::InvalidArgument { .. })),
                "{} with {} should be InvalidArgument, got {:?}",
                name,
                args,
                result
            );
        }
    }

    #[test]
    fn test_tool_name_and_argument_round_trip() {
        let request = ToolRequest::WebSearch {
            query: "Acme".to_string(),
        };
        assert_eq!(request.tool_name(), "search_google");
        assert_eq!(request.argument(), ("query", "Acme"));
    }
}
