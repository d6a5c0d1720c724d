#[derive(Debug, Clone)]
pub struct WebUrl(String);

impl AsRef<str> for WebUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl WebUrl {
    pub fn new(base: impl Into<String>) -> Self {
        Self(base.into())
    }

    /// Append the given path to the URL.
    pub fn append_path(&self, path: &str) -> Self {
        let trimmed_url = self.0.trim_end_matches('/');
        let trimmed_path = path.trim_start_matches('/');
        Self(format!("{}/{}", trimmed_url, trimmed_path))
    }

    /// Append a form-urlencoded query parameter.
    pub fn with_query(&self, key: &str, value: &str) -> Self {
        let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
        if self.0.contains('?') {
            Self(format!("{}&{}={}", self.0, key, encoded))
        } else {
            Self(format!("{}?{}={}", self.0, key, encoded))
        }
    }
}

impl std::fmt::Display for WebUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
