/// A fetched web page. The body is kept verbatim; consumers decide how much
/// of it they want to extract.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl Page {
    /// The contents of the first `<title>` element, if any.
    pub fn title(&self) -> Option<String> {
        // All indices come from the body itself; the tag names are ASCII, so
        // case-insensitive matching never shifts byte offsets.
        let bytes = self.body.as_bytes();
        let start = find_ascii_ci(bytes, b"<title", 0)?;
        let open_end = bytes[start..].iter().position(|&b| b == b'>')? + start + 1;
        let close = find_ascii_ci(bytes, b"</title>", open_end)?;
        let title = self.body[open_end..close].trim();
        if title.is_empty() {
            None
        } else {
            Some(title.to_string())
        }
    }
}

fn find_ascii_ci(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
        .map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_body(body: &str) -> Page {
        Page {
            url: "https://example.com".to_string(),
            status: 200,
            content_type: Some("text/html".to_string()),
            body: body.to_string(),
        }
    }

    #[test]
    fn title_extracts_first_title_element() {
        let page = page_with_body("<html><head><title>Hello World</title></head></html>");
        assert_eq!(page.title(), Some("Hello World".to_string()));
    }

    #[test]
    fn title_handles_attributes_and_case() {
        let page = page_with_body("<TITLE lang=\"en\"> Spaced </TITLE>");
        assert_eq!(page.title(), Some("Spaced".to_string()));
    }

    #[test]
    fn title_survives_non_ascii_bodies() {
        // "ẞ" shrinks from 3 bytes to 2 under lowercasing; index arithmetic
        // must stay on the original body.
        let page = page_with_body("ẞ<title>Impressum</title>");
        assert_eq!(page.title(), Some("Impressum".to_string()));

        let page = page_with_body("<title>Straẞe Ünd</title>");
        assert_eq!(page.title(), Some("Straẞe Ünd".to_string()));
    }

    #[test]
    fn title_absent_or_empty_is_none() {
        assert_eq!(page_with_body("<html></html>").title(), None);
        assert_eq!(page_with_body("<title>   </title>").title(), None);
    }
}
