//! HTTP request type.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::RouterError;

/// HTTP request methods.
///
/// The seven verbs with registration shortcuts are listed first. Anything
/// else that is a valid method token is kept as [`Method::Custom`], which
/// allows routing non-standard methods through [`crate::Router::handle`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method
    Get,
    /// POST method
    Post,
    /// PUT method
    Put,
    /// PATCH method
    Patch,
    /// DELETE method
    Delete,
    /// HEAD method
    Head,
    /// OPTIONS method
    Options,
    /// CONNECT method
    Connect,
    /// TRACE method
    Trace,
    /// Any other method token, stored upper-cased.
    Custom(String),
}

impl Method {
    /// Returns the method as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Connect => "CONNECT",
            Self::Trace => "TRACE",
            Self::Custom(name) => name,
        }
    }

    /// Position of the method in an `Allow` header.
    pub(crate) fn order(&self) -> u8 {
        match self {
            Self::Get => 0,
            Self::Head => 1,
            Self::Post => 2,
            Self::Put => 3,
            Self::Delete => 4,
            Self::Patch => 5,
            Self::Options => 6,
            Self::Connect => 7,
            Self::Trace => 8,
            Self::Custom(_) => 9,
        }
    }
}

impl FromStr for Method {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        let method = match upper.as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            "CONNECT" => Self::Connect,
            "TRACE" => Self::Trace,
            _ => {
                // RFC 9110 token characters
                let valid = !upper.is_empty()
                    && upper
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
                if !valid {
                    return Err(RouterError::InvalidMethod(s.to_string()));
                }
                Self::Custom(upper)
            }
        };
        Ok(method)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Path parameters extracted from the URL.
#[derive(Debug, Clone, Default)]
pub struct PathParams {
    params: HashMap<String, String>,
}

impl PathParams {
    /// Creates new empty path params.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Gets a parameter value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Parses a parameter as a specific type.
    pub fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.parse().ok())
    }

    /// Returns true if no parameters were captured.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns an iterator over the parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// An HTTP request as seen by the router.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Request path, without the query string.
    pub path: String,
    /// Path parameters extracted from URL patterns.
    pub params: PathParams,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Vec<u8>,
    /// Whether the request arrived over TLS.
    pub tls: bool,
}

impl Request {
    /// Creates a new plain-transport request.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: PathParams::new(),
            headers: HashMap::new(),
            body: Vec::new(),
            tls: false,
        }
    }

    /// Creates a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Creates a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Marks the request as received over TLS (or not).
    #[must_use]
    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
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

    /// Gets a header value.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        // Case-insensitive header lookup
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Parses the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!(
            "purge".parse::<Method>().unwrap(),
            Method::Custom("PURGE".to_string())
        );
        assert!("".parse::<Method>().is_err());
        assert!("BAD METHOD".parse::<Method>().is_err());
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Options.to_string(), "OPTIONS");
        assert_eq!(Method::Custom("PURGE".into()).to_string(), "PURGE");
    }

    #[test]
    fn test_path_params() {
        let mut params = PathParams::new();
        params.insert("id", "123");
        params.insert("name", "test");

        assert_eq!(params.get("id"), Some("123"));
        assert_eq!(params.parse::<i64>("id"), Some(123));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_request_builder() {
        let req = Request::get("/users")
            .header("Content-Type", "application/json")
            .tls(true);

        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path, "/users");
        assert!(req.tls);
        assert_eq!(req.get_header("content-type"), Some("application/json"));
    }

    #[test]
    fn test_request_json_body() {
        let req = Request::post("/users").body(r#"{"name":"ada"}"#);
        let value: serde_json::Value = req.json().unwrap();
        assert_eq!(value["name"], "ada");
    }
}
