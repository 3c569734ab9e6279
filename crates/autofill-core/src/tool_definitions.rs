//! Tool definitions for the agent's available tools.
//!
//! JSON schema definitions sent to the model. Each tool takes exactly one
//! required string argument; [`crate::tool_dispatch::ToolRequest`] enforces
//! the same shape on the way back.

use autofill_providers::Tool;
use serde_json::json;

pub const FETCH_TABULAR_DATA: &str = "get_excel_data";
pub const WEB_SEARCH: &str = "search_google";
pub const FILL_FORM: &str = "enter_data";

/// Create tool definitions for native tool calling providers.
pub fn create_tool_definitions() -> Vec<Tool> {
    vec![
        single_string_tool(
            FETCH_TABULAR_DATA,
            "Read a spreadsheet (.xlsx, .xls, .ods or .csv) and return its rows as JSON \
             objects keyed by the header row.",
            "file_path",
            "Path to the spreadsheet file",
        ),
        single_string_tool(
            WEB_SEARCH,
            "Search the web for the query, read the results page and return a short answer \
             to the query.",
            "query",
            "What to search for, phrased as a question or search terms",
        ),
        single_string_tool(
            FILL_FORM,
            "Enter information into the target web form. Pass all the values to enter as \
             free text; they are matched to the form fields automatically.",
            "analyzed_text",
            "Free text containing every value that should be entered into the form",
        ),
    ]
}

fn single_string_tool(name: &str, description: &str, arg: &str, arg_description: &str) -> Tool {
    Tool {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                arg: {
                    "type": "string",
                    "description": arg_description
                }
            },
            "required": [arg],
            "additionalProperties": false
        }),
    }
}
