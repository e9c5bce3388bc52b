/// Configuration for a [`RequestBody`][crate::RequestBody].
///
/// Constructed once per server and threaded into each body. Values can be
/// overridden per-request with [`RequestBody::set_max_content_length`][crate::RequestBody::set_max_content_length].
#[derive(Clone, Copy, Debug)]
pub struct BodyConfig {
    pub(crate) max_content_length: i64,
}

impl BodyConfig {
    /// chainable setter for the maximum content length, in bytes. A
    /// non-positive value means unlimited.
    #[must_use]
    pub fn with_max_content_length(mut self, max_content_length: i64) -> Self {
        self.max_content_length = max_content_length;
        self
    }
}

impl Default for BodyConfig {
    fn default() -> Self {
        DEFAULT_CONFIG
    }
}

/// the default configuration: unlimited content length.
pub const DEFAULT_CONFIG: BodyConfig = BodyConfig {
    max_content_length: -1,
};
