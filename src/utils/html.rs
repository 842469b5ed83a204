/// Clean user-supplied HTML with ammonia before it is stored.
///
/// Whitelist-based: harmless formatting tags (<b>, <p>, lists, links) are
/// kept, while <script>, <iframe> and event-handler attributes are dropped
/// together with their content. Applied to post bodies, replies and
/// private messages.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Sanitises, then trims; an empty result means nothing displayable was left.
pub fn clean_text_field(input: &str) -> String {
    clean_html(input).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_are_removed() {
        let cleaned = clean_html("<p>Price firm</p><script>alert(1)</script>");
        assert_eq!(cleaned, "<p>Price firm</p>");
    }

    #[test]
    fn event_handlers_are_removed() {
        let cleaned = clean_html(r#"<b onclick="steal()">bold</b>"#);
        assert_eq!(cleaned, "<b>bold</b>");
    }

    #[test]
    fn script_only_input_is_empty_after_cleaning() {
        assert!(clean_text_field("  <script>x</script> ").is_empty());
    }
}
