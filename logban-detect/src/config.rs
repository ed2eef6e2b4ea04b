//! Detection configuration.

/// Default trailing window in seconds.
pub const DEFAULT_WINDOW_SEC: u64 = 3600;

/// Default number of in-window requests that flags an IP.
pub const DEFAULT_REQUEST_THRESHOLD: u64 = 30;

/// Default suspicious path/tool substrings.
pub const DEFAULT_KEYWORDS: &[&str] = &["wp-login.php", "xmlrpc.php", "admin", "sqlmap"];

/// Classifier configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectConfig {
    pub window_sec: u64,
    pub request_threshold: u64,
    /// Checked in order, case-sensitive substring match.
    pub keywords: Vec<String>,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            window_sec: DEFAULT_WINDOW_SEC,
            request_threshold: DEFAULT_REQUEST_THRESHOLD,
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl DetectConfig {
    /// Builder: set window_sec.
    pub fn with_window_sec(mut self, window_sec: u64) -> Self {
        self.window_sec = window_sec;
        self
    }

    /// Builder: set request_threshold.
    pub fn with_request_threshold(mut self, threshold: u64) -> Self {
        self.request_threshold = threshold;
        self
    }

    /// Builder: replace the keyword list.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// First configured keyword contained in `line`, if any.
    pub fn matching_keyword(&self, line: &str) -> Option<&str> {
        self.keywords
            .iter()
            .map(String::as_str)
            .find(|kw| !kw.is_empty() && line.contains(kw))
    }

    /// Oldest timestamp (exclusive) still inside the window ending at `now`.
    pub fn window_start(&self, now_unix_sec: i64) -> i64 {
        let window = i64::try_from(self.window_sec).unwrap_or(i64::MAX);
        now_unix_sec.saturating_sub(window)
    }
}
