//! Shared prompt fragments. Each caller that needs the LLM keeps its own
//! prompts next to it; only cross-cutting instructions live here.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction that keeps the model from filling gaps with invented data.
pub const NO_INVENTION_INSTRUCTION: &str = "If a field is unknown, return an empty string \
    or an empty array/object. Do NOT invent employers, dates, metrics or contact details.";
