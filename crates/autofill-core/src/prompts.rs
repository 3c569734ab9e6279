use autofill_config::Config;

/// System prompt for the result-summarizing call made by `search_google`.
pub const SEARCH_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

const FIELD_MAPPING_TEMPLATE: &str = "You are an AI that helps to determine which text goes into which form fields. Here is the list of form fields:
{fields}
Here is the text to be entered: {text}
Please return a JSON object that maps form field IDs or names to the text that should be entered.
The output must be a single JSON object whose keys are the field IDs or names exactly as listed above and whose values are strings.
Leave out any field the text gives no value for. Do not wrap the object in markdown code fences.";

/// The system prompt for a run: the configured prompt, optionally followed
/// by a short block describing where the agent's inputs live.
pub fn build_system_prompt(config: &Config) -> String {
    let mut prompt = config.agent.system_prompt.trim_end().to_string();

    if config.agent.include_environment_context {
        prompt.push_str("\n\n# Environment\n");
        prompt.push_str(&format!(
            "- The data entry form is served at {}. Use enter_data to fill it.\n",
            config.form.url
        ));
        if let Some(path) = &config.spreadsheet.default_path {
            prompt.push_str(&format!(
                "- Unless told otherwise, tabular data is in {}. Use get_excel_data to read it.\n",
                path
            ));
        }
        prompt.push_str(
            "- Use search_google only for information the tabular data does not contain.\n",
        );
    }

    prompt
}

pub fn search_analysis_prompt(extracted_text: &str, query: &str) -> String {
    format!(
        "Analyze the following text extracted from a web search result: {} and answer this question: {}",
        extracted_text, query
    )
}

pub fn field_mapping_prompt(fields_json: &str, text: &str) -> String {
    FIELD_MAPPING_TEMPLATE
        .replace("{fields}", fields_json)
        .replace("{text}", text)
}
