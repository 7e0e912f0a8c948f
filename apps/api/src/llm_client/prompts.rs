// Shared prompt fragments. Each feature module that needs LLM calls keeps its
// own prompts.rs alongside it and reuses what is here.

/// Instruction that keeps extraction from inventing fields.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    Only report values that appear in the supplied content. \
    If a value is not present, return an empty string for it. \
    Never invent application URLs.";
