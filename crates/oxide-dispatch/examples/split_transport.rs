//! Plain and TLS traffic routed through separate tables.
//!
//! Run with: cargo run -p oxide-dispatch --example split_transport

use oxide_dispatch::{Context, Method, Request, Router, RouterConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn account(ctx: &mut Context) {
    let id = ctx.param("id").unwrap_or("unknown").to_string();
    let body = serde_json::json!({ "account": id, "secure": ctx.is_tls() });
    if let Err(err) = ctx.write_json(&body) {
        ctx.set_status(500);
        ctx.write_str(&err.to_string());
    }
}

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let router = Router::with_config(RouterConfig::from_json(r#"{"redirect_code": 308}"#)?);

    router
        .http()
        .redir("/account/{id}", "https://localhost/account")?
        .get("/health", "ok")?;

    router
        .https()
        .get("/account/{id}", account)?
        .get("/health", "ok (tls)")?;
    router.https().sub("admin").get("/", Router::forbidden)?;

    let requests = [
        Request::get("/health"),
        Request::get("/health").tls(true),
        Request::get("/account/42"),
        Request::get("/account/42").tls(true),
        Request::get("/admin/").tls(true),
        Request::new(Method::Options, "/health").tls(true),
        Request::get("/nowhere"),
    ];

    for request in requests {
        let line = format!("{} {} tls={}", request.method, request.path, request.tls);
        let response = router.serve(request);
        info!(
            "{line} -> {} {} {}",
            response.status,
            response.status_text(),
            response.body_string().unwrap_or_default()
        );
    }

    Ok(())
}
