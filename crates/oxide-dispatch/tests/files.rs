//! Tests for file-backed routes.

mod common;
use common::*;

use std::fs;

use oxide_dispatch::{Router, CONTENT_TYPE_HTML};
use tempfile::TempDir;

fn site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<html>app</html>").unwrap();
    fs::create_dir(dir.path().join("css")).unwrap();
    fs::write(dir.path().join("css").join("site.css"), "body{}").unwrap();
    dir
}

#[test]
fn spa_index_serves_index_for_unknown_paths() {
    let dir = site();
    let router = Router::new();
    router.get("/api/health", "ok").unwrap();
    router.spa_index(dir.path().join("index.html"));

    let res = get(&router, "/anything");
    assert_eq!(res.status, 200);
    assert_eq!(res.content_type(), Some(CONTENT_TYPE_HTML));
    assert_eq!(body(&res), "<html>app</html>");

    assert_eq!(body(&get(&router, "/api/health")), "ok");
}

#[test]
fn serve_file_on_route() {
    let dir = site();
    let router = Router::new();
    router
        .serve_file("/style.css", dir.path().join("css/site.css"))
        .unwrap();

    let res = get(&router, "/style.css");
    assert_eq!(res.content_type(), Some("text/css; charset=utf-8"));
    assert_eq!(body(&res), "body{}");
}

#[test]
fn serve_file_missing_is_not_found() {
    let dir = site();
    let router = Router::new();
    router
        .serve_file("/gone", dir.path().join("nope.txt"))
        .unwrap();

    assert_eq!(get(&router, "/gone").status, 404);
}

#[test]
fn serve_files_from_directory() {
    let dir = site();
    let router = Router::new();
    router.serve_files("/static/{*file}", dir.path()).unwrap();

    let res = get(&router, "/static/css/site.css");
    assert_eq!(res.status, 200);
    assert_eq!(body(&res), "body{}");

    assert_eq!(get(&router, "/static/missing.js").status, 404);
    assert_eq!(get(&router, "/static/../secret").status, 404);
}

#[test]
fn serve_files_needs_wildcard() {
    let dir = site();
    let router = Router::new();
    assert!(router.serve_files("/static", dir.path()).is_err());
}

#[test]
fn sub_router_serves_files_below_prefix() {
    let dir = site();
    let router = Router::new();
    router
        .sub("assets")
        .serve_file("/index", dir.path().join("index.html"))
        .unwrap();

    let res = get(&router, "/assets/index");
    assert_eq!(res.content_type(), Some(CONTENT_TYPE_HTML));
}
