pub mod insight;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use once_cell::sync::OnceCell;
use shelf_kernel::{InitCtx, Module};

use insight::InsightService;
use models::Book;
use repository::BookRepository;
use routes::BooksState;
use service::BookService;

const TABLE: &str = "books";

/// Book catalog: CRUD, search and generated taglines.
///
/// Collaborators are wired in [`Module::init`]; until then the module
/// serves no routes.
pub struct BooksModule {
    state: OnceCell<BooksState>,
}

impl BooksModule {
    pub const fn new() -> Self {
        Self {
            state: OnceCell::new(),
        }
    }

    /// Module with collaborators already wired; `init` keeps them.
    pub fn with_state(state: BooksState) -> Self {
        Self {
            state: OnceCell::with_value(state),
        }
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if self.state.get().is_some() {
            tracing::debug!(module = self.name(), "books module already wired");
            return Ok(());
        }

        let store = shelf_db::open::<Book>(&ctx.settings.database, TABLE)
            .context("failed to open book store")?;
        let insights = InsightService::new(ctx.settings.insight.clone())
            .context("failed to build insight client")?;

        let state = BooksState {
            books: Arc::new(BookService::new(BookRepository::new(store))),
            insights: Arc::new(insights),
        };
        // A concurrent init may have won; either state is equivalent.
        let _ = self.state.set(state);

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = ?ctx.settings.database.backend,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        match self.state.get() {
            Some(state) => routes::router(state.clone()),
            None => {
                tracing::warn!(module = self.name(), "routes requested before init");
                Router::new()
            }
        }
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": { "schema": schema }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let book = serde_json::json!({ "$ref": "#/components/schemas/Book" });
    let books = serde_json::json!({ "type": "array", "items": book });
    let input_body = serde_json::json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/BookInput" }
            }
        }
    });
    let id_param = serde_json::json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    });

    serde_json::json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("Every stored book", books.clone()),
                        "500": error_response("Internal server error")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": input_body.clone(),
                    "responses": {
                        "200": json_response("The stored book with its id", book.clone()),
                        "400": error_response("Validation failed"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/search": {
                "get": {
                    "summary": "Search books by title or author",
                    "tags": ["Books"],
                    "parameters": [
                        {
                            "name": "title",
                            "in": "query",
                            "required": false,
                            "schema": { "type": "string", "default": "" }
                        },
                        {
                            "name": "author",
                            "in": "query",
                            "required": false,
                            "schema": { "type": "string", "default": "" }
                        }
                    ],
                    "responses": {
                        "200": json_response("Matching books", books),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": {
                                "text/plain": { "schema": { "type": "string" } }
                            }
                        }
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Fetch a book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "responses": {
                        "200": json_response("The book", book.clone()),
                        "404": error_response("Book not found")
                    }
                },
                "put": {
                    "summary": "Replace a book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "requestBody": input_body,
                    "responses": {
                        "200": json_response("The updated book", book),
                        "400": error_response("Validation failed"),
                        "404": error_response("Book not found")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_param.clone()],
                    "responses": {
                        "204": { "description": "Deleted" },
                        "404": error_response("Book not found")
                    }
                }
            },
            "/{id}/ai-insights": {
                "get": {
                    "summary": "Book with a generated tagline",
                    "tags": ["Books"],
                    "parameters": [id_param],
                    "responses": {
                        "200": json_response(
                            "The book and its tagline",
                            serde_json::json!({ "$ref": "#/components/schemas/BookInsights" })
                        ),
                        "404": error_response("Book not found")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "title": { "type": "string", "maxLength": 180 },
                        "author": { "type": "string", "maxLength": 50 },
                        "isbn": { "type": "string", "minLength": 10, "maxLength": 13 },
                        "publicationYear": { "type": "integer", "format": "int32" },
                        "description": { "type": "string", "maxLength": 500 }
                    },
                    "required": ["id", "title", "author", "isbn", "publicationYear", "description"]
                },
                "BookInput": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string", "maxLength": 180 },
                        "author": { "type": "string", "maxLength": 50 },
                        "isbn": { "type": "string", "minLength": 10, "maxLength": 13 },
                        "publicationYear": { "type": "integer", "format": "int32" },
                        "description": { "type": "string", "maxLength": 500 }
                    },
                    "required": ["title", "author", "isbn", "publicationYear", "description"]
                },
                "BookInsights": {
                    "type": "object",
                    "properties": {
                        "book": { "$ref": "#/components/schemas/Book" },
                        "insights": { "type": "string" }
                    },
                    "required": ["book", "insights"]
                }
            }
        }
    })
}

/// Create a new instance of the books module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(BooksModule::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use shelf_kernel::settings::{DatabaseSettings, Settings};
    use tower::ServiceExt;

    fn memory_settings() -> Settings {
        Settings {
            database: DatabaseSettings::in_memory(),
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn routes_are_empty_before_init() {
        let module = BooksModule::new();
        let response = module
            .routes()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn init_wires_store_and_routes() {
        let settings = memory_settings();
        let module = BooksModule::new();
        module.init(&InitCtx { settings: &settings }).await.unwrap();

        let response = module
            .routes()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn openapi_documents_every_route() {
        let spec = openapi_fragment();
        for path in ["/", "/search", "/health", "/{id}", "/{id}/ai-insights"] {
            assert!(spec["paths"][path].is_object(), "missing {path}");
        }
        assert!(spec["paths"]["/{id}"]["delete"].is_object());
        assert!(spec["components"]["schemas"]["BookInsights"].is_object());
    }
}
