//! Prefixed registration.

use std::path::PathBuf;

use crate::error::Result;
use crate::handler::IntoHandler;
use crate::request::Method;
use crate::router::Router;

/// Registers routes on a [`Router`] below a common prefix.
///
/// Holds no table of its own; `sub.get("/users", h)` is
/// `router.get("{prefix}/users", h)`.
///
/// ```
/// use oxide_dispatch::{Request, Router};
///
/// let router = Router::new();
/// router.sub("v1").get("/users", "users").unwrap();
///
/// assert_eq!(router.serve(Request::get("/v1/users")).status, 200);
/// assert_eq!(router.serve(Request::get("/users")).status, 404);
/// ```
#[derive(Debug, Clone)]
pub struct SubRouter<'a> {
    prefix: String,
    parent: &'a Router,
}

impl<'a> SubRouter<'a> {
    /// Creates a view of `parent` below `prefix`.
    ///
    /// A leading `/` is added to the prefix when missing.
    pub fn new(parent: &'a Router, prefix: &str) -> Self {
        let prefix = if prefix.starts_with('/') {
            prefix.to_string()
        } else {
            format!("/{prefix}")
        };
        Self { prefix, parent }
    }

    /// Returns the prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn route(&self, route: &str) -> String {
        format!("{}{}", self.prefix, route)
    }

    /// Returns a view below `prefix`, nested in this one.
    #[must_use]
    pub fn sub(&self, prefix: &str) -> Self {
        let nested = Self::new(self.parent, prefix);
        Self::new(self.parent, &self.route(nested.prefix()))
    }

    /// Registers a handler for the given method below the prefix.
    pub fn handle<M>(&self, method: Method, route: &str, handler: impl IntoHandler<M>) -> Result<&Self> {
        self.parent.handle(method, &self.route(route), handler)?;
        Ok(self)
    }

    /// Adds a GET route.
    pub fn get<M>(&self, route: &str, handler: impl IntoHandler<M>) -> Result<&Self> {
        self.handle(Method::Get, route, handler)
    }

    /// Adds a POST route.
    pub fn post<M>(&self, route: &str, handler: impl IntoHandler<M>) -> Result<&Self> {
        self.handle(Method::Post, route, handler)
    }

    /// Adds a PUT route.
    pub fn put<M>(&self, route: &str, handler: impl IntoHandler<M>) -> Result<&Self> {
        self.handle(Method::Put, route, handler)
    }

    /// Adds a PATCH route.
    pub fn patch<M>(&self, route: &str, handler: impl IntoHandler<M>) -> Result<&Self> {
        self.handle(Method::Patch, route, handler)
    }

    /// Adds a DELETE route.
    pub fn delete<M>(&self, route: &str, handler: impl IntoHandler<M>) -> Result<&Self> {
        self.handle(Method::Delete, route, handler)
    }

    /// Adds a HEAD route.
    pub fn head<M>(&self, route: &str, handler: impl IntoHandler<M>) -> Result<&Self> {
        self.handle(Method::Head, route, handler)
    }

    /// Adds an OPTIONS route.
    pub fn options<M>(&self, route: &str, handler: impl IntoHandler<M>) -> Result<&Self> {
        self.handle(Method::Options, route, handler)
    }

    /// See [`Router::json`].
    pub fn json<M>(&self, route: &str, handler: impl IntoHandler<M>) -> Result<&Self> {
        self.parent.json(&self.route(route), handler)?;
        Ok(self)
    }

    /// See [`Router::serve_file`].
    pub fn serve_file(&self, route: &str, file: impl Into<PathBuf>) -> Result<&Self> {
        self.parent.serve_file(&self.route(route), file)?;
        Ok(self)
    }

    /// See [`Router::redir`]. Only `route` is prefixed.
    pub fn redir(&self, route: &str, url: &str) -> Result<&Self> {
        self.parent.redir(&self.route(route), url)?;
        Ok(self)
    }
}
