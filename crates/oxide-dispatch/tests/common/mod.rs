#![allow(dead_code)]

use oxide_dispatch::{Context, Method, Request, Response, Router};

pub fn send(router: &Router, method: Method, path: &str) -> Response {
    router.serve(Request::new(method, path))
}

pub fn get(router: &Router, path: &str) -> Response {
    send(router, Method::Get, path)
}

pub fn get_tls(router: &Router, path: &str) -> Response {
    router.serve(Request::get(path).tls(true))
}

/// Runs a request through the entry point returned by `Router::handler`.
pub fn through_handler(router: &Router, request: Request) -> Response {
    let handler = router.handler();
    let mut ctx = Context::new(request);
    handler(&mut ctx);
    ctx.into_response()
}

pub fn body(res: &Response) -> String {
    res.body_string()
        .unwrap_or_else(|| panic!("Body is not UTF-8: {:?}", res.body))
}
