use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use shelf_app::modules::books::{
    insight::{InsightService, INSIGHT_FAILED},
    repository::BookRepository,
    routes::BooksState,
    service::BookService,
    BooksModule,
};
use shelf_db::MemoryStore;
use shelf_kernel::settings::{DatabaseSettings, InsightSettings, Settings};
use shelf_kernel::{InitCtx, ModuleRegistry};
use tower::ServiceExt;

async fn app() -> Router {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let settings = Settings {
        database: DatabaseSettings::in_memory(),
        insight: InsightSettings {
            api_url: format!("http://{addr}"),
            timeout_ms: 2000,
            ..InsightSettings::default()
        },
        ..Settings::default()
    };

    let state = BooksState {
        books: Arc::new(BookService::new(BookRepository::new(Arc::new(
            MemoryStore::new(),
        )))),
        insights: Arc::new(InsightService::new(settings.insight.clone()).unwrap()),
    };

    let mut registry = ModuleRegistry::new();
    registry.register(Arc::new(BooksModule::with_state(state)));
    let ctx = InitCtx {
        settings: &settings,
    };
    registry.init_modules(&ctx).await.unwrap();

    shelf_http::build_router(&registry, &settings)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 4 * 1024 * 1024).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn book(title: &str, author: &str) -> Value {
    json!({
        "title": title,
        "author": author,
        "isbn": "1234567890",
        "publicationYear": 2021,
        "description": format!("All about {title}")
    })
}

#[tokio::test]
async fn catalog_round_trip() {
    let app = app().await;

    let (status, created) = call(&app, "POST", "/books", Some(book("Spring Boot Guide", "John Doe"))).await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_i64().unwrap();

    call(&app, "POST", "/books", Some(book("Rust in Action", "Tim McNamara"))).await;

    let (status, all) = call(&app, "GET", "/books", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, hits) = call(&app, "GET", "/books/search?title=SPRING", None).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["id"], id);

    let (_, hits) = call(&app, "GET", "/books/search?author=mcnamara", None).await;
    assert_eq!(hits[0]["title"], "Rust in Action");

    let (status, updated) = call(
        &app,
        "PUT",
        &format!("/books/{id}"),
        Some(book("Spring Boot Guide, 2nd Edition", "John Doe")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], id);

    let (status, insight) = call(&app, "GET", &format!("/books/{id}/ai-insights"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(insight["book"]["title"], "Spring Boot Guide, 2nd Edition");
    assert_eq!(insight["insights"], INSIGHT_FAILED);

    let (status, _) = call(&app, "DELETE", &format!("/books/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, error) = call(&app, "GET", &format!("/books/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        error["error"]["message"],
        format!("Book with ID {id} not found.")
    );
}

#[tokio::test]
async fn validation_errors_use_envelope() {
    let app = app().await;
    let mut body = book("", "John Doe");
    body.as_object_mut().unwrap().remove("publicationYear");

    let (status, error) = call(&app, "POST", "/books", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["fields"]["title"], "Title is required");
    assert_eq!(
        error["error"]["fields"]["publicationYear"],
        "Publication year is required"
    );
    assert!(error["error"]["trace_id"].is_string());
}

#[tokio::test]
async fn health_and_docs_are_served() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let (status, doc) = call(&app, "GET", "/docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/books/{id}/ai-insights"]["get"].is_object());
    assert!(doc["paths"]["/books"]["post"].is_object());
    assert!(doc["components"]["schemas"]["Book"].is_object());
}
