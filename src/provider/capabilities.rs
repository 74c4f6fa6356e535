//! Tool-capability detection by model identifier
//!
//! A pure function of the model name: some backends serve models that
//! reject requests carrying tool schemas, so the adapters omit schemas
//! (and tool-role history) for those. Re-evaluated on every request
//! build, never cached across model switches.

/// Model-name patterns known to handle function-calling tool schemas.
/// Prefix match for versioned families, substring match for tagged local
/// models (e.g. "llama3.1:8b-instruct").
const TOOL_CAPABLE_PATTERNS: &[&str] = &[
    // Cloud chat-completions family
    "gpt-4",
    "gpt-4o",
    "gpt-5",
    "gpt-3.5-turbo",
    // Self-hosted families with function-calling templates
    "llama3.1",
    "llama3.2",
    "llama3.3",
    "mistral-nemo",
    "qwen2.5",
    "command-r",
    "firefunction",
    "hermes3",
];

/// Whether the given model accepts tool schemas.
pub fn model_supports_tools(model: &str) -> bool {
    let model = model.trim();
    TOOL_CAPABLE_PATTERNS
        .iter()
        .any(|p| model.starts_with(p) || model.contains(p))
}
