// Prompt constants for extracting a single posting from page text.

use crate::llm_client::prompts::NO_INVENTION_INSTRUCTION;

pub const PAGE_EXTRACT_SYSTEM: &str = "You are an expert recruiter assistant. \
    Read the visible text of a job posting page and describe the posting. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Replace `{url}`, `{text}` and `{rules}` before sending.
pub const PAGE_EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract job details from the text of this page ({url}):

{text}

{rules}

Return a JSON object with this EXACT schema:
{
  "title": "Senior Rust Engineer",
  "company": "Acme",
  "location": "Berlin",
  "salaryRange": "",
  "requirements": ["5+ years Rust"],
  "description": ""
}"#;

/// Page text is truncated to this many characters before prompting.
pub const MAX_PAGE_CHARS: usize = 20_000;

pub fn build_page_prompt(url: &str, text: &str) -> String {
    let truncated = match text.char_indices().nth(MAX_PAGE_CHARS) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    };
    PAGE_EXTRACT_PROMPT_TEMPLATE
        .replace("{rules}", NO_INVENTION_INSTRUCTION)
        .replace("{url}", url)
        .replace("{text}", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_url_and_text() {
        let prompt = build_page_prompt("https://jobs.example/1", "Rust Engineer at Acme");
        assert!(prompt.contains("(https://jobs.example/1)"));
        assert!(prompt.contains("Rust Engineer at Acme"));
        assert!(!prompt.contains("{text}"));
    }
}
