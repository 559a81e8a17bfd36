// src/utils/html.rs

/// Sanitizes question HTML authored in the form builder before it is shown.
///
/// Whitelist-based (ammonia): formatting tags such as `<b>`, `<p>` and lists
/// survive, while `<script>`, `<iframe>`, event-handler attributes and
/// `javascript:` links are dropped. Script bodies are removed entirely.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
