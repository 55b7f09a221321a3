//! Routing tables.
//!
//! [`Table`] is the contract the router relies on for matching and
//! fallback handling. [`PatternTable`] is the default implementation,
//! matching routes in registration order with [`PathPattern`].

use std::panic::{self, AssertUnwindSafe};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::warn;

use crate::config::RouterConfig;
use crate::context::Context;
use crate::error::{Result, RouterError};
use crate::handler::{Handler, PanicHandler};
use crate::path::PathPattern;
use crate::request::{Method, PathParams};

/// Builds a fresh table for a router.
pub type TableFactory = Arc<dyn Fn(&RouterConfig) -> Box<dyn Table> + Send + Sync>;

/// A method + path matcher with fallback handlers.
pub trait Table: Send + Sync {
    /// Registers a handler. Conflicting registrations are rejected.
    fn handle(&mut self, method: Method, path: &str, handler: Handler) -> Result<()>;

    /// Runs the handler matching `method` and `path`.
    ///
    /// Returns false if nothing handled the request; the caller then
    /// invokes [`Table::not_found`].
    fn process(&self, method: &Method, path: &str, ctx: &mut Context) -> bool;

    /// Finds the handler for `method` and `path` without running it.
    ///
    /// Path parameters are stored in `ctx`. The flag is true when the path
    /// matched without trailing-slash tolerance.
    fn lookup(&self, method: &Method, path: &str, ctx: &mut Context) -> (Option<Handler>, bool);

    /// Runs the not-found handler, or writes 404 if none is set.
    fn not_found(&self, ctx: &mut Context);

    /// Sets the not-found handler.
    fn set_not_found(&mut self, handler: Handler);

    /// Sets the handler used for 405 responses.
    fn method_not_allowed(&mut self, handler: Handler);

    /// Sets the handler receiving panics raised by route handlers.
    fn panic_handler(&mut self, handler: PanicHandler);

    /// Toggles method-not-allowed replies, returning the previous mode.
    fn handle_method_not_allowed(&mut self, enabled: bool) -> bool;

    /// Toggles automatic OPTIONS replies, returning the previous mode.
    fn handle_options(&mut self, enabled: bool) -> bool;

    /// Serves files below `root`. `path` must end in a `{*name}` segment.
    fn serve_files(&mut self, path: &str, root: PathBuf) -> Result<()>;

    /// Value of the `Allow` header for `path`, excluding `req_method`.
    fn allowed(&self, path: &str, req_method: &Method) -> String;

    /// Returns true if no route has been registered.
    ///
    /// Fallback handlers and modes do not count as routes.
    fn is_empty(&self) -> bool;
}

struct Route {
    method: Method,
    pattern: PathPattern,
    handler: Handler,
}

/// The default [`Table`]: a list of routes matched in registration order.
pub struct PatternTable {
    routes: Vec<Route>,
    not_found: Option<Handler>,
    method_not_allowed: Option<Handler>,
    panic_handler: Option<PanicHandler>,
    handle_method_not_allowed: bool,
    handle_options: bool,
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::new(&RouterConfig::default())
    }
}

impl PatternTable {
    /// Creates an empty table with the modes taken from `config`.
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            routes: Vec::new(),
            not_found: None,
            method_not_allowed: None,
            panic_handler: None,
            handle_method_not_allowed: config.handle_method_not_allowed,
            handle_options: config.handle_options,
        }
    }

    /// Factory producing `PatternTable`s.
    pub fn factory() -> TableFactory {
        Arc::new(|config: &RouterConfig| Box::new(Self::new(config)) as Box<dyn Table>)
    }

    fn find(&self, method: &Method, path: &str) -> Option<(&Route, PathParams)> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| route.pattern.match_path(path).map(|params| (route, params)))
    }

    fn invoke(&self, handler: &Handler, ctx: &mut Context) {
        let Some(panic_handler) = &self.panic_handler else {
            handler(ctx);
            return;
        };
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| handler(ctx))) {
            warn!(method = %ctx.method(), path = ctx.path(), "handler panicked");
            panic_handler(ctx, payload);
        }
    }
}

impl Table for PatternTable {
    fn handle(&mut self, method: Method, path: &str, handler: Handler) -> Result<()> {
        let pattern = PathPattern::parse(path)?;
        if self
            .routes
            .iter()
            .any(|r| r.method == method && r.pattern.same_shape(&pattern))
        {
            return Err(RouterError::DuplicateRoute {
                method: method.to_string(),
                path: path.to_string(),
            });
        }
        self.routes.push(Route {
            method,
            pattern,
            handler,
        });
        Ok(())
    }

    fn process(&self, method: &Method, path: &str, ctx: &mut Context) -> bool {
        if let Some((route, params)) = self.find(method, path) {
            ctx.set_params(params);
            self.invoke(&route.handler, ctx);
            return true;
        }

        if *method == Method::Options && self.handle_options {
            let allow = self.allowed(path, method);
            if !allow.is_empty() {
                ctx.set_header("Allow", allow);
                return true;
            }
        } else if self.handle_method_not_allowed {
            let allow = self.allowed(path, method);
            if !allow.is_empty() {
                match &self.method_not_allowed {
                    Some(handler) => {
                        ctx.set_header("Allow", allow);
                        self.invoke(handler, ctx);
                    }
                    None => {
                        ctx.method_not_allowed();
                        ctx.set_header("Allow", allow);
                    }
                }
                return true;
            }
        }

        false
    }

    fn lookup(&self, method: &Method, path: &str, ctx: &mut Context) -> (Option<Handler>, bool) {
        match self.find(method, path) {
            Some((route, params)) => {
                ctx.set_params(params);
                (Some(route.handler.clone()), route.pattern.is_exact(path))
            }
            None => (None, false),
        }
    }

    fn not_found(&self, ctx: &mut Context) {
        match &self.not_found {
            Some(handler) => self.invoke(handler, ctx),
            None => ctx.not_found(),
        }
    }

    fn set_not_found(&mut self, handler: Handler) {
        self.not_found = Some(handler);
    }

    fn method_not_allowed(&mut self, handler: Handler) {
        self.method_not_allowed = Some(handler);
    }

    fn panic_handler(&mut self, handler: PanicHandler) {
        self.panic_handler = Some(handler);
    }

    fn handle_method_not_allowed(&mut self, enabled: bool) -> bool {
        std::mem::replace(&mut self.handle_method_not_allowed, enabled)
    }

    fn handle_options(&mut self, enabled: bool) -> bool {
        std::mem::replace(&mut self.handle_options, enabled)
    }

    fn serve_files(&mut self, path: &str, root: PathBuf) -> Result<()> {
        let pattern = PathPattern::parse(path)?;
        let Some(name) = pattern.wildcard().map(str::to_string) else {
            return Err(RouterError::InvalidPattern(format!(
                "{path}: must end with a {{*name}} segment"
            )));
        };
        let handler: Handler = Arc::new(move |ctx: &mut Context| {
            let relative = ctx.param(&name).unwrap_or_default();
            let safe = Path::new(relative)
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
            if safe {
                let file = root.join(relative);
                ctx.send_file(file);
            } else {
                ctx.not_found();
            }
        });
        self.handle(Method::Get, path, handler)
    }

    fn allowed(&self, path: &str, req_method: &Method) -> String {
        let mut methods: Vec<Method> = self
            .routes
            .iter()
            .filter(|route| path == "*" || route.pattern.match_path(path).is_some())
            .map(|route| &route.method)
            .filter(|m| *m != req_method)
            .cloned()
            .collect();
        if methods.is_empty() {
            return String::new();
        }
        if self.handle_options {
            methods.push(Method::Options);
        }
        methods.sort_by(|a, b| a.order().cmp(&b.order()).then_with(|| a.as_str().cmp(b.as_str())));
        methods.dedup();
        methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
