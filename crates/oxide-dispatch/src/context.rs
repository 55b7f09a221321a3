//! Per-request context.
//!
//! A [`Context`] pairs the incoming [`Request`] with the [`Response`] being
//! built. Handlers receive `&mut Context` and produce output only through
//! it.

use std::io;
use std::path::Path;

use tracing::debug;

use crate::request::{Method, PathParams, Request};
use crate::response::{Response, CONTENT_TYPE_HTML, CONTENT_TYPE_JSON};

/// The request/response pair handed to every handler.
#[derive(Debug)]
pub struct Context {
    request: Request,
    response: Response,
}

impl Context {
    /// Creates a context for a request with an empty 200 response.
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::ok(),
        }
    }

    /// Returns the request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the response built so far.
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Consumes the context, returning the response.
    pub fn into_response(self) -> Response {
        self.response
    }

    /// Request path.
    pub fn path(&self) -> &str {
        &self.request.path
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.request.method
    }

    /// Whether the request arrived over TLS.
    pub fn is_tls(&self) -> bool {
        self.request.tls
    }

    /// Path parameters captured by the matched route.
    pub fn params(&self) -> &PathParams {
        &self.request.params
    }

    /// Gets a single path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.request.params.get(name)
    }

    pub(crate) fn set_params(&mut self, params: PathParams) {
        self.request.params = params;
    }

    /// Appends bytes to the response body.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.response.body.extend_from_slice(bytes);
    }

    /// Appends a string to the response body.
    pub fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    /// Serializes `value` as JSON into the body and marks the response as JSON.
    pub fn write_json<T: serde::Serialize>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.json();
        self.write_bytes(&body);
        Ok(())
    }

    /// Sets the response status.
    pub fn set_status(&mut self, status: u16) {
        self.response.status = status;
    }

    /// Sets a response header, replacing any existing value of any case.
    pub fn set_header(&mut self, key: &str, value: impl Into<String>) {
        self.response
            .headers
            .retain(|k, _| !k.eq_ignore_ascii_case(key));
        self.response.headers.insert(key.to_string(), value.into());
    }

    /// Sets the `Content-Type` header.
    pub fn set_content_type(&mut self, content_type: &str) {
        self.set_header("Content-Type", content_type);
    }

    /// Marks the response as JSON.
    pub fn json(&mut self) {
        self.set_content_type(CONTENT_TYPE_JSON);
    }

    /// Marks the response as HTML.
    pub fn html(&mut self) {
        self.set_content_type(CONTENT_TYPE_HTML);
    }

    /// Replaces the response with a redirect to `url`.
    pub fn redirect(&mut self, url: &str, status: u16) {
        self.response = Response::new(status).header("Location", url);
    }

    /// Replaces the response with 403 Forbidden.
    pub fn forbidden(&mut self) {
        self.response = Response::forbidden();
    }

    /// Replaces the response with 404 Not Found.
    pub fn not_found(&mut self) {
        self.response = Response::not_found();
    }

    /// Replaces the response with 405 Method Not Allowed.
    pub fn method_not_allowed(&mut self) {
        self.response = Response::method_not_allowed();
    }

    /// Sends the contents of a file as the body.
    ///
    /// The content type is derived from the extension unless one is
    /// already set. A missing or unreadable file yields 404.
    pub fn send_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        match std::fs::read(path) {
            Ok(contents) => {
                if self.response.content_type().is_none() {
                    self.set_content_type(content_type_for(path));
                }
                self.response.body = contents;
            }
            Err(err) => {
                debug!(path = %path.display(), error = %err, "file not served");
                self.not_found();
            }
        }
    }
}

impl io::Write for Context {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html" | "htm") => CONTENT_TYPE_HTML,
        Some("json") => CONTENT_TYPE_JSON,
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_write_appends() {
        let mut ctx = Context::new(Request::get("/"));
        ctx.write_str("a");
        ctx.write_bytes(b"b");
        write!(ctx, "{}", 3).unwrap();
        assert_eq!(ctx.response().body_string(), Some("ab3".to_string()));
    }

    #[test]
    fn test_set_header_replaces_any_case() {
        let mut ctx = Context::new(Request::get("/"));
        ctx.set_header("content-type", "text/plain");
        ctx.html();
        assert_eq!(ctx.response().headers.len(), 1);
        assert_eq!(ctx.response().content_type(), Some(CONTENT_TYPE_HTML));
    }

    #[test]
    fn test_redirect() {
        let mut ctx = Context::new(Request::get("/old"));
        ctx.write_str("discarded");
        ctx.redirect("/new", 301);
        let res = ctx.into_response();
        assert_eq!(res.status, 301);
        assert_eq!(res.get_header("Location"), Some("/new"));
        assert!(res.body.is_empty());
    }

    #[test]
    fn test_send_missing_file() {
        let mut ctx = Context::new(Request::get("/"));
        ctx.send_file("/definitely/not/here.html");
        assert_eq!(ctx.response().status, 404);
    }

    #[test]
    fn test_write_json() {
        let mut ctx = Context::new(Request::get("/"));
        ctx.write_json(&serde_json::json!({"ok": true})).unwrap();
        assert_eq!(ctx.response().content_type(), Some(CONTENT_TYPE_JSON));
        assert_eq!(ctx.response().body_string(), Some(r#"{"ok":true}"#.to_string()));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a/index.HTML")), CONTENT_TYPE_HTML);
        assert_eq!(content_type_for(Path::new("blob")), "application/octet-stream");
    }
}
