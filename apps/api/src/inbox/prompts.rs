// Prompt constants for email job extraction.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::NO_INVENTION_INSTRUCTION;

/// System prompt for email extraction — enforces JSON-only output.
pub const EMAIL_EXTRACT_SYSTEM: &str = "You are an expert recruiter assistant. \
    Identify real job postings inside email content. \
    Ignore newsletters, connection requests and generic notifications. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Email extraction prompt template. Replace `{html}` and `{rules}` before sending.
pub const EMAIL_EXTRACT_PROMPT_TEMPLATE: &str = r#"Identify all job listings in this email content:

{html}

For each job, extract:
- title
- company
- location
- application URL
- salary range, if stated
- requirements, as a list of short strings
- short description if present in the email (2-3 lines)

{rules}

Return a JSON object with this EXACT schema:
{
  "jobs": [
    {
      "title": "Senior Rust Engineer",
      "company": "Acme",
      "location": "Remote",
      "applicationUrl": "https://acme.example/jobs/42",
      "salaryRange": "",
      "requirements": ["5+ years Rust"],
      "description": ""
    }
  ]
}

If the email contains no job postings, return {"jobs": []}."#;

/// Emails are truncated to this many characters before prompting.
pub const MAX_EMAIL_CHARS: usize = 20_000;

pub fn build_email_prompt(html: &str) -> String {
    let truncated = match html.char_indices().nth(MAX_EMAIL_CHARS) {
        Some((byte_index, _)) => &html[..byte_index],
        None => html,
    };
    EMAIL_EXTRACT_PROMPT_TEMPLATE
        .replace("{rules}", NO_INVENTION_INSTRUCTION)
        .replace("{html}", truncated)
}
