use shelf_db::{RecordId, StoreError};
use shelf_http::error::AppError;
use thiserror::Error;

use super::models::Book;
use super::repository::BookRepository;

#[derive(Debug, Error)]
pub enum BookError {
    #[error("Book with ID {0} not found.")]
    NotFound(RecordId),

    #[error("book store failure: {0}")]
    Store(#[from] StoreError),
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::NotFound(_) => AppError::not_found(err.to_string()),
            BookError::Store(source) => AppError::Internal(source.into()),
        }
    }
}

pub type BookResult<T> = Result<T, BookError>;

/// Business rules around the book catalog.
#[derive(Debug, Clone)]
pub struct BookService {
    repository: BookRepository,
}

impl BookService {
    pub fn new(repository: BookRepository) -> Self {
        Self { repository }
    }

    /// Store a new book. Ids are always allocated by the store.
    pub async fn create(&self, book: Book) -> BookResult<Book> {
        let created = self.repository.save(Book { id: None, ..book }).await?;
        tracing::info!(book_id = ?created.id, "book created");
        Ok(created)
    }

    pub async fn retrieve_all(&self) -> BookResult<Vec<Book>> {
        Ok(self.repository.find_all().await?)
    }

    pub async fn retrieve_by_id(&self, id: RecordId) -> BookResult<Option<Book>> {
        Ok(self.repository.find_by_id(id).await?)
    }

    /// Replace every field of book `id`.
    pub async fn update(&self, id: RecordId, book: Book) -> BookResult<Book> {
        if !self.repository.exists_by_id(id).await? {
            return Err(BookError::NotFound(id));
        }

        let updated = self.repository.save(Book { id: Some(id), ..book }).await?;
        tracing::info!(book_id = id, "book updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: RecordId) -> BookResult<()> {
        if !self.repository.exists_by_id(id).await? {
            return Err(BookError::NotFound(id));
        }

        self.repository.delete_by_id(id).await?;
        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }

    pub async fn search(&self, title: &str, author: &str) -> BookResult<Vec<Book>> {
        Ok(self
            .repository
            .search_by_title_or_author(title, author)
            .await?)
    }
}
