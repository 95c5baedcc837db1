// src/utils/html.rs

/// Strips dangerous markup from admin-supplied exam text.
///
/// Whitelist based: formatting tags such as <b> or <code> survive, <script>,
/// <iframe> and event-handler attributes are removed. Only prompts and names
/// go through this; option text and test cases are stored verbatim.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_removed_formatting_kept() {
        let cleaned = clean_html("<b>Borrow</b><script>alert(1)</script>");
        assert_eq!(cleaned, "<b>Borrow</b>");
    }
}
