use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use handlerchain::{
    handler,
    interceptor::{HeaderTokenInterceptor, LoggingInterceptor, SecurityHeadersInterceptor},
    Dispatcher, DispatcherConfig, Error, MappedInterceptor, Method, Request, RequestContext,
};

#[derive(Serialize, Deserialize)]
struct Item {
    id: String,
    name: String,
    description: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct ItemList {
    items: Vec<Item>,
}

// ヘルスチェック
fn health_handler(_ctx: &RequestContext) -> Result<serde_json::Value, Error> {
    Ok(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// アイテム一覧
fn get_items(_ctx: &RequestContext) -> Result<ItemList, Error> {
    let items = vec![
        Item {
            id: "1".to_string(),
            name: "Item 1".to_string(),
            description: Some("Description for item 1".to_string()),
        },
        Item {
            id: "2".to_string(),
            name: "Item 2".to_string(),
            description: None,
        },
    ];

    Ok(ItemList { items })
}

// アイテム作成（認証が必要）
fn create_item(_ctx: &RequestContext, item: Item) -> Result<Item, Error> {
    info!("Creating new item: {}", item.name);
    Ok(item)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    let config = DispatcherConfig::from_env();
    let timeout = config.async_timeout.unwrap_or(Duration::from_secs(5));

    let dispatcher = Dispatcher::builder()
        .route(handler::get("/", health_handler))
        .route(handler::get("/items", get_items))
        .route(handler::post("/items", create_item))
        .route(handler::deferred(Method::GET, "/report", |_req, completer| {
            // 別タスクで結果を作ってチェーンを再開させる
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let report = serde_json::json!({ "generated": true });
                if let Ok(response) = handlerchain::Response::ok().json(&report) {
                    completer.succeed(response);
                }
            });
            Ok(())
        }))
        .interceptor(LoggingInterceptor::new())
        .mapped(
            MappedInterceptor::new(HeaderTokenInterceptor::new("X-Auth-Token", "secret-token"))
                .include("/items")
                .exclude("/"),
        )
        .interceptor(SecurityHeadersInterceptor)
        .config(config.with_async_timeout(timeout))
        .build()?;

    info!("Starting handlerchain demo");

    let requests = vec![
        Request::new(Method::GET, "/"),
        Request::new(Method::GET, "/items").with_header("X-Auth-Token", "secret-token"),
        Request::new(Method::POST, "/items")
            .with_header("Content-Type", "application/json")
            .with_body(br#"{"id":"3","name":"Item 3"}"#.to_vec()),
        Request::new(Method::GET, "/report"),
        Request::new(Method::GET, "/missing"),
    ];

    for request in requests {
        let label = format!("{} {}", request.method, request.path);
        let response = dispatcher.dispatch(request).await;
        info!(
            "{} -> {} {}",
            label,
            response.status,
            response.body_text().unwrap_or_default()
        );
    }

    Ok(())
}
