//! Main router implementation.
//!
//! A root [`Router`] and the transport-specific routers obtained from
//! [`Router::http`] and [`Router::https`] share one `Family`: the
//! configuration, the table factory, the root table and the two lazily
//! created transport tables. Every handle into the family reaches the same
//! two transport routers, whichever handle it is called on.

use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::config::RouterConfig;
use crate::context::Context;
use crate::error::{Result, RouterError};
use crate::handler::{Handler, HandlerSource, IntoHandler};
use crate::request::{Method, Request};
use crate::response::Response;
use crate::sub::SubRouter;
use crate::table::{PatternTable, Table, TableFactory};

/// A table that may not have been created yet.
type TableSlot = RwLock<Option<Box<dyn Table>>>;

/// Transport a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// Plain HTTP.
    Plain,
    /// HTTP over TLS.
    Tls,
}

impl Transport {
    fn of(ctx: &Context) -> Self {
        if ctx.is_tls() {
            Self::Tls
        } else {
            Self::Plain
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain => "http",
            Self::Tls => "https",
        })
    }
}

/// Which part of the family a router handle registers into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Root,
    Transport(Transport),
}

struct Family {
    config: RouterConfig,
    factory: TableFactory,
    root: Arc<TableSlot>,
    http: OnceLock<Arc<TableSlot>>,
    https: OnceLock<Arc<TableSlot>>,
}

impl Family {
    fn transport_slot(&self, transport: Transport) -> &OnceLock<Arc<TableSlot>> {
        match transport {
            Transport::Plain => &self.http,
            Transport::Tls => &self.https,
        }
    }

    /// Picks the table serving `transport`.
    ///
    /// The transport's own table wins; without one the root table is used
    /// if it holds routes, then the other transport's table, then a root
    /// table holding only fallback handlers. `None` means no table was
    /// ever created.
    fn select(&self, transport: Transport) -> Option<&Arc<TableSlot>> {
        let other = match transport {
            Transport::Plain => Transport::Tls,
            Transport::Tls => Transport::Plain,
        };
        let root_state = read(&self.root).as_deref().map(|table| table.is_empty());
        self.transport_slot(transport)
            .get()
            .or_else(|| (root_state == Some(false)).then_some(&self.root))
            .or_else(|| self.transport_slot(other).get())
            .or_else(|| root_state.is_some().then_some(&self.root))
    }

    fn dispatch(&self, ctx: &mut Context) {
        let method = ctx.method().clone();
        let path = ctx.path().to_string();
        let transport = Transport::of(ctx);

        let Some(slot) = self.select(transport) else {
            warn!(%method, %path, %transport, "no routing table configured");
            ctx.not_found();
            return;
        };
        let guard = read(slot);
        match guard.as_deref() {
            Some(table) => {
                if !table.process(&method, &path, ctx) {
                    table.not_found(ctx);
                }
            }
            None => {
                warn!(%method, %path, %transport, "no routing table configured");
                ctx.not_found();
            }
        }
    }
}

fn read(slot: &TableSlot) -> std::sync::RwLockReadGuard<'_, Option<Box<dyn Table>>> {
    slot.read().unwrap_or_else(PoisonError::into_inner)
}

/// The router for handling HTTP requests.
///
/// `Router` is a cheap handle; clones refer to the same routing tables.
/// Registration is meant to happen before traffic is served.
#[derive(Clone)]
pub struct Router {
    family: Arc<Family>,
    table: Arc<TableSlot>,
    scope: Scope,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("scope", &self.scope)
            .field("config", &self.family.config)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Creates a root router with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    /// Creates a root router with the given configuration.
    pub fn with_config(config: RouterConfig) -> Self {
        Self::with_table_factory(config, PatternTable::factory())
    }

    /// Creates a root router whose tables are built by `factory`.
    pub fn with_table_factory(config: RouterConfig, factory: TableFactory) -> Self {
        let root = Arc::new(RwLock::new(None));
        Self {
            family: Arc::new(Family {
                config,
                factory,
                root: Arc::clone(&root),
                http: OnceLock::new(),
                https: OnceLock::new(),
            }),
            table: root,
            scope: Scope::Root,
        }
    }

    /// Returns the shared configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.family.config
    }

    /// Returns the transport this router is restricted to, if any.
    pub fn transport(&self) -> Option<Transport> {
        match self.scope {
            Scope::Root => None,
            Scope::Transport(transport) => Some(transport),
        }
    }

    /// Returns true if both handles register into the same table.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.table, &other.table)
    }

    /// Router that only serves plain HTTP requests.
    ///
    /// Created on first call and shared afterwards; calling it on a
    /// transport router yields the same router as calling it on the root.
    pub fn http(&self) -> Self {
        self.scoped(Transport::Plain)
    }

    /// Router that only serves requests received over TLS.
    ///
    /// See [`Router::http`].
    pub fn https(&self) -> Self {
        self.scoped(Transport::Tls)
    }

    fn scoped(&self, transport: Transport) -> Self {
        let family = &self.family;
        let table = family.transport_slot(transport).get_or_init(|| {
            debug!(%transport, "creating transport routing table");
            Arc::new(RwLock::new(Some((family.factory)(&family.config))))
        });
        Self {
            family: Arc::clone(family),
            table: Arc::clone(table),
            scope: Scope::Transport(transport),
        }
    }

    fn with_table<R>(&self, f: impl FnOnce(&mut Box<dyn Table>) -> R) -> R {
        let mut guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let table = guard.get_or_insert_with(|| (self.family.factory)(&self.family.config));
        f(table)
    }

    /// Runs a query against the table without creating it.
    ///
    /// A missing table answers like a fresh, unstored one.
    fn read_table<R>(&self, f: impl FnOnce(&dyn Table) -> R) -> R {
        let guard = read(&self.table);
        match guard.as_deref() {
            Some(table) => f(table),
            None => f(&*(self.family.factory)(&self.family.config)),
        }
    }

    fn register(&self, method: Method, route: &str, source: HandlerSource) -> Result<&Self> {
        debug!(%method, route, kind = source.kind(), scope = ?self.scope, "registering route");
        let handler = source.into_handler();
        self.with_table(|table| table.handle(method, route, handler))?;
        Ok(self)
    }

    /// Registers a handler for the given method and route.
    ///
    /// The handler may be any form accepted by [`IntoHandler`]. Use this
    /// for methods without a shortcut, including custom ones.
    pub fn handle<M>(&self, method: Method, route: &str, handler: impl IntoHandler<M>) -> Result<&Self> {
        self.register(method, route, handler.into_source())
    }

    /// Registers a dynamically typed handler.
    ///
    /// Fails with [`RouterError::UnsupportedHandler`] if `handler` is not
    /// one of the accepted forms; nothing is registered in that case.
    pub fn handle_any(
        &self,
        method: Method,
        route: &str,
        handler: Box<dyn Any + Send + Sync>,
    ) -> Result<&Self> {
        let Some(source) = HandlerSource::from_any(handler) else {
            return Err(RouterError::UnsupportedHandler {
                method: method.to_string(),
                path: route.to_string(),
            });
        };
        self.register(method, route, source)
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

    /// Adds a GET route whose response is marked as JSON.
    pub fn json<M>(&self, route: &str, handler: impl IntoHandler<M>) -> Result<&Self> {
        let inner = handler.into_source().into_handler();
        self.get(route, move |ctx: &mut Context| {
            ctx.json();
            inner(ctx);
        })
    }

    /// Serves a single file on a GET route.
    pub fn serve_file(&self, route: &str, file: impl Into<PathBuf>) -> Result<&Self> {
        let file = file.into();
        self.get(route, move |ctx: &mut Context| ctx.send_file(&file))
    }

    /// Serves `path` as HTML for every request that matches no route.
    ///
    /// Used as the fallback of single-page applications.
    pub fn spa_index(&self, path: impl Into<PathBuf>) -> &Self {
        let path = path.into();
        self.not_found(move |ctx: &mut Context| {
            ctx.html();
            ctx.send_file(&path);
        })
    }

    /// Redirects GET requests on `route` to `url`.
    ///
    /// The status code comes from [`RouterConfig::redirect_code`].
    pub fn redir(&self, route: &str, url: &str) -> Result<&Self> {
        let url = url.to_string();
        let code = self.family.config.redirect_code;
        self.get(route, move |ctx: &mut Context| ctx.redirect(&url, code))
    }

    /// Handler answering 403 Forbidden.
    ///
    /// ```
    /// use oxide_dispatch::{Request, Router};
    ///
    /// let router = Router::new();
    /// router.get("/admin", Router::forbidden).unwrap();
    /// assert_eq!(router.serve(Request::get("/admin")).status, 403);
    /// ```
    pub fn forbidden(ctx: &mut Context) {
        ctx.forbidden();
    }

    /// Returns a view registering every route below `prefix`.
    pub fn sub(&self, prefix: &str) -> SubRouter<'_> {
        SubRouter::new(self, prefix)
    }

    /// Sets the handler for panics raised by route handlers.
    pub fn panic_handler(
        &self,
        handler: impl Fn(&mut Context, Box<dyn Any + Send>) + Send + Sync + 'static,
    ) -> &Self {
        self.with_table(|table| table.panic_handler(Arc::new(handler)));
        self
    }

    /// Sets the handler called when no route matches.
    pub fn not_found<M>(&self, handler: impl IntoHandler<M>) -> &Self {
        let handler = handler.into_source().into_handler();
        self.with_table(|table| table.set_not_found(handler));
        self
    }

    /// Sets the handler used when the path exists for other methods only.
    pub fn method_not_allowed<M>(&self, handler: impl IntoHandler<M>) -> &Self {
        let handler = handler.into_source().into_handler();
        self.with_table(|table| table.method_not_allowed(handler));
        self
    }

    /// Changes the method-not-allowed mode, returning the previous one.
    pub fn handle_method_not_allowed(&self, enabled: bool) -> bool {
        self.with_table(|table| table.handle_method_not_allowed(enabled))
    }

    /// Changes the automatic OPTIONS mode, returning the previous one.
    pub fn handle_options(&self, enabled: bool) -> bool {
        self.with_table(|table| table.handle_options(enabled))
    }

    /// Serves files from the directory `root`.
    ///
    /// `path` must end with a wildcard segment, e.g. `/static/{*file}`;
    /// a request for `/static/css/site.css` reads `root/css/site.css`.
    pub fn serve_files(&self, path: &str, root: impl Into<PathBuf>) -> Result<&Self> {
        let root = root.into();
        debug!(path, root = %root.display(), "serving files");
        self.with_table(|table| table.serve_files(path, root))?;
        Ok(self)
    }

    /// Looks up the handler for a method and path without running it.
    ///
    /// Path parameters are stored in `ctx`. The flag is true when the path
    /// matched exactly, without trailing-slash tolerance.
    pub fn lookup(&self, method: &Method, path: &str, ctx: &mut Context) -> (Option<Handler>, bool) {
        self.read_table(|table| table.lookup(method, path, ctx))
    }

    /// Value of the `Allow` header for `path`, excluding `req_method`.
    pub fn allowed(&self, path: &str, req_method: &Method) -> String {
        self.read_table(|table| table.allowed(path, req_method))
    }

    /// The entry point for every request.
    ///
    /// Requests are served by the table of their transport. Without one,
    /// the root table is used if it holds routes, then the other
    /// transport's table, then the root's fallback handlers; if no table
    /// exists at all the response is 404. Any handle of the family returns
    /// an equivalent entry point.
    ///
    /// The selected table stays read-locked while its handler runs. A
    /// handler must not register routes or change modes on the same
    /// router family; doing so deadlocks.
    pub fn handler(&self) -> Handler {
        let family = Arc::clone(&self.family);
        Arc::new(move |ctx: &mut Context| family.dispatch(ctx))
    }

    /// Runs a request through [`Router::handler`] and returns the response.
    pub fn serve(&self, request: Request) -> Response {
        let mut ctx = Context::new(request);
        self.family.dispatch(&mut ctx);
        ctx.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello_handler(ctx: &mut Context) {
        ctx.write_str("Hello, World!");
    }

    fn user_handler(ctx: &mut Context) {
        let id = ctx.param("id").unwrap_or("unknown").to_string();
        ctx.write_str(&format!("User: {id}"));
    }

    #[test]
    fn test_basic_routing() {
        let router = Router::new();
        router
            .get("/", hello_handler)
            .unwrap()
            .get("/users/{id}", user_handler)
            .unwrap();

        let res = router.serve(Request::get("/"));
        assert_eq!(res.status, 200);
        assert_eq!(res.body_string(), Some("Hello, World!".to_string()));
    }

    #[test]
    fn test_path_params() {
        let router = Router::new();
        router.get("/users/{id}", user_handler).unwrap();

        let res = router.serve(Request::get("/users/123"));
        assert_eq!(res.body_string(), Some("User: 123".to_string()));
    }

    #[test]
    fn test_not_found() {
        let router = Router::new();
        router.get("/", hello_handler).unwrap();

        let res = router.serve(Request::get("/nonexistent"));
        assert_eq!(res.status, 404);
    }

    #[test]
    fn test_method_not_allowed() {
        let router = Router::new();
        router.get("/", hello_handler).unwrap();

        let res = router.serve(Request::post("/"));
        assert_eq!(res.status, 405);
    }

    #[test]
    fn test_every_shortcut_registers_its_method() {
        let router = Router::new();
        router
            .get("/m", "GET")
            .unwrap()
            .post("/m", "POST")
            .unwrap()
            .put("/m", "PUT")
            .unwrap()
            .patch("/m", "PATCH")
            .unwrap()
            .delete("/m", "DELETE")
            .unwrap()
            .head("/m", "HEAD")
            .unwrap()
            .options("/m", "OPTIONS")
            .unwrap();

        for method in [
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Patch,
            Method::Delete,
            Method::Head,
            Method::Options,
        ] {
            let res = router.serve(Request::new(method.clone(), "/m"));
            assert_eq!(res.body_string().as_deref(), Some(method.as_str()));
        }
    }

    #[test]
    fn test_custom_method() {
        let router = Router::new();
        let purge: Method = "PURGE".parse().unwrap();
        router.handle(purge.clone(), "/cache", "purged").unwrap();

        let res = router.serve(Request::new(purge, "/cache"));
        assert_eq!(res.body_string(), Some("purged".to_string()));
    }

    #[test]
    fn test_table_created_lazily() {
        let router = Router::new();
        assert!(read(&router.table).is_none());
        assert_eq!(router.allowed("/", &Method::Get), "");
        assert!(read(&router.table).is_none());
        router.handle_options(false);
        assert!(read(&router.table).is_some());
    }

    #[test]
    fn test_handle_any_rejects_unknown_value() {
        let router = Router::new();
        let err = router
            .handle_any(Method::Get, "/bad", Box::new(vec![1u32, 2, 3]))
            .unwrap_err();
        assert!(matches!(err, RouterError::UnsupportedHandler { .. }));
        assert_eq!(router.serve(Request::get("/bad")).status, 404);

        router
            .handle_any(Method::Get, "/good", Box::new(String::from("ok")))
            .unwrap();
        assert_eq!(
            router.serve(Request::get("/good")).body_string(),
            Some("ok".to_string())
        );
    }

    #[test]
    fn test_scope_and_identity() {
        let root = Router::new();
        assert_eq!(root.transport(), None);
        let http = root.http();
        assert_eq!(http.transport(), Some(Transport::Plain));
        assert!(http.ptr_eq(&root.http()));
        assert!(!http.ptr_eq(&root));
        assert!(root.https().https().ptr_eq(&http.https()));
    }

    #[test]
    fn test_unconfigured_family_answers_404() {
        let router = Router::new();
        let res = router.serve(Request::get("/").tls(true));
        assert_eq!(res.status, 404);
    }
}
