/// Placeholder replaced with retrieved knowledge-base context.
pub const CONTEXT_PLACEHOLDER: &str = "{context}";

/// Placeholder replaced with the raw query text.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Compose the final system prompt from a configured template.
///
/// Pure literal substitution: every occurrence of `{context}` becomes the
/// retrieved context (possibly empty), every occurrence of `{query}` becomes
/// the raw query. Context is substituted first, so the placeholders are not
/// nestable — a context that happens to contain `{query}` gets substituted
/// too, matching the reference behavior.
pub fn compose_prompt(template: &str, context: &str, query: &str) -> String {
    template
        .replace(CONTEXT_PLACEHOLDER, context)
        .replace(QUERY_PLACEHOLDER, query)
}

/// Append the web-search digest as a delimited trailing section. The digest
/// is never interpolated into the template itself.
pub fn append_search_digest(prompt: &str, digest: &str) -> String {
    format!("{}\n\nWeb Search Results:\n{}", prompt, digest)
}
