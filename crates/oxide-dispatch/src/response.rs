//! HTTP response type.

use std::collections::HashMap;

/// Content type used by [`crate::Context::json`].
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// Content type used by [`crate::Context::html`].
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

/// An HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Creates a new response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Creates a 200 OK response.
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// Creates a 403 Forbidden response.
    pub fn forbidden() -> Self {
        Self::new(403).body("Forbidden")
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        Self::new(404).body("Not Found")
    }

    /// Creates a 405 Method Not Allowed response.
    pub fn method_not_allowed() -> Self {
        Self::new(405).body("Method Not Allowed")
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Gets a header value, ignoring case.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the `Content-Type` header, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.get_header("Content-Type")
    }

    /// Returns the body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Returns the status text for the current status code.
    pub fn status_text(&self) -> &'static str {
        match self.status {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            301 => "Moved Permanently",
            302 => "Found",
            303 => "See Other",
            307 => "Temporary Redirect",
            308 => "Permanent Redirect",
            400 => "Bad Request",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            500 => "Internal Server Error",
            _ => "Unknown",
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canned_responses() {
        assert_eq!(Response::forbidden().status, 403);
        assert_eq!(
            Response::not_found().body_string(),
            Some("Not Found".to_string())
        );
        assert_eq!(Response::method_not_allowed().status_text(), "Method Not Allowed");
    }

    #[test]
    fn test_response_builder() {
        let res = Response::ok().header("X-Custom", "value").body("Hello");

        assert_eq!(res.status, 200);
        assert_eq!(res.get_header("x-custom"), Some("value"));
        assert_eq!(res.body_string(), Some("Hello".to_string()));
    }
}
