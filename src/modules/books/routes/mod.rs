use std::sync::Arc;

use axum::{
    extract::{FromRequest, Path, Query, Request, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use shelf_db::RecordId;
use shelf_http::error::AppError;

use super::insight::InsightService;
use super::models::{Book, BookInput, BookInsights, SearchParams};
use super::service::{BookError, BookService};

/// Shared state of the book handlers.
#[derive(Debug, Clone)]
pub struct BooksState {
    pub books: Arc<BookService>,
    pub insights: Arc<InsightService>,
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/search", get(search_books))
        .route("/health", get(health_check))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/{id}/ai-insights", get(book_insights))
        .with_state(state)
}

/// JSON body that passed every book constraint.
pub struct ValidBook(pub Book);

impl<S> FromRequest<S> for ValidBook
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(input) = Json::<BookInput>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

        input
            .validate()
            .map(ValidBook)
            .map_err(|fields| AppError::validation(fields, "Validation failed"))
    }
}

async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(State(state): State<BooksState>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(state.books.retrieve_all().await?))
}

async fn create_book(
    State(state): State<BooksState>,
    ValidBook(book): ValidBook,
) -> Result<Json<Book>, AppError> {
    Ok(Json(state.books.create(book).await?))
}

async fn get_book(
    State(state): State<BooksState>,
    Path(id): Path<RecordId>,
) -> Result<Json<Book>, AppError> {
    let book = state
        .books
        .retrieve_by_id(id)
        .await?
        .ok_or(BookError::NotFound(id))?;
    Ok(Json(book))
}

async fn update_book(
    State(state): State<BooksState>,
    Path(id): Path<RecordId>,
    ValidBook(book): ValidBook,
) -> Result<Json<Book>, AppError> {
    Ok(Json(state.books.update(id, book).await?))
}

async fn delete_book(
    State(state): State<BooksState>,
    Path(id): Path<RecordId>,
) -> Result<StatusCode, AppError> {
    state.books.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn search_books(
    State(state): State<BooksState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(state.books.search(&params.title, &params.author).await?))
}

async fn book_insights(
    State(state): State<BooksState>,
    Path(id): Path<RecordId>,
) -> Result<Json<BookInsights>, AppError> {
    let book = state
        .books
        .retrieve_by_id(id)
        .await?
        .ok_or(BookError::NotFound(id))?;
    let insights = state.insights.generate_insight(&book.description).await;
    Ok(Json(BookInsights { book, insights }))
}
