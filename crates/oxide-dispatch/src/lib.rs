//! # oxide-dispatch
//!
//! The routing core of an HTTP server: method and path dispatch with
//! separate tables for plain and TLS traffic.
//!
//! This crate provides:
//! - Registration shortcuts for every common method, chainable with `?`
//! - Handlers given as closures, strings, bytes, numbers or any `Display`
//!   value, normalized once at registration
//! - Transport-scoped routers created on demand with [`Router::http`] and
//!   [`Router::https`]
//! - Prefixed registration with [`Router::sub`]
//! - Not-found, method-not-allowed, automatic OPTIONS and panic handling
//!
//! ## Quick Start
//!
//! ```
//! use oxide_dispatch::{Context, Request, Router};
//!
//! fn user_handler(ctx: &mut Context) {
//!     let id = ctx.param("id").unwrap_or("unknown").to_string();
//!     ctx.write_str(&format!("user {id}"));
//! }
//!
//! # fn main() -> oxide_dispatch::Result<()> {
//! let router = Router::new();
//! router
//!     .get("/", "Hello, World!")?
//!     .get("/users/{id}", user_handler)?
//!     .json("/status", r#"{"ok":true}"#)?;
//!
//! let response = router.serve(Request::get("/users/123"));
//! assert_eq!(response.body_string().as_deref(), Some("user 123"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Transport-specific routes
//!
//! ```
//! use oxide_dispatch::{Request, Router};
//!
//! # fn main() -> oxide_dispatch::Result<()> {
//! let router = Router::new();
//! router.http().redir("/login", "https://example.com/login")?;
//! router.https().get("/login", "login form")?;
//!
//! assert_eq!(router.serve(Request::get("/login")).status, 301);
//! assert_eq!(router.serve(Request::get("/login").tls(true)).status, 200);
//! # Ok(())
//! # }
//! ```
//!
//! ## Serving
//!
//! [`Router::handler`] returns the [`Handler`] a server invokes for every
//! request; [`Router::serve`] does the same for a single [`Request`].

mod config;
mod context;
mod error;
mod handler;
mod path;
mod request;
mod response;
mod router;
mod sub;
mod table;

pub use config::RouterConfig;
pub use context::Context;
pub use error::{Result, RouterError};
pub use handler::{marker, Formatted, Handler, HandlerSource, IntoHandler, PanicHandler, RenderFn};
pub use path::{PathPattern, PathSegment};
pub use request::{Method, PathParams, Request};
pub use response::{Response, CONTENT_TYPE_HTML, CONTENT_TYPE_JSON};
pub use router::{Router, Transport};
pub use sub::SubRouter;
pub use table::{PatternTable, Table, TableFactory};
