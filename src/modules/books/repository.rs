use std::sync::Arc;

use shelf_db::{RecordId, RecordStore, StoreResult};

use super::models::Book;

/// Book persistence on top of a generic [`RecordStore`].
#[derive(Clone)]
pub struct BookRepository {
    store: Arc<dyn RecordStore<Book>>,
}

impl BookRepository {
    pub fn new(store: Arc<dyn RecordStore<Book>>) -> Self {
        Self { store }
    }

    pub async fn save(&self, book: Book) -> StoreResult<Book> {
        self.store.save(book).await
    }

    pub async fn find_by_id(&self, id: RecordId) -> StoreResult<Option<Book>> {
        self.store.find_by_id(id).await
    }

    pub async fn find_all(&self) -> StoreResult<Vec<Book>> {
        self.store.find_all().await
    }

    pub async fn exists_by_id(&self, id: RecordId) -> StoreResult<bool> {
        self.store.exists_by_id(id).await
    }

    pub async fn delete_by_id(&self, id: RecordId) -> StoreResult<()> {
        self.store.delete_by_id(id).await
    }

    /// Case-insensitive substring match on title or author.
    ///
    /// An empty term never matches anything on its own; with both terms
    /// empty every book is returned.
    pub async fn search_by_title_or_author(
        &self,
        title: &str,
        author: &str,
    ) -> StoreResult<Vec<Book>> {
        let title = title.to_lowercase();
        let author = author.to_lowercase();

        if title.is_empty() && author.is_empty() {
            return self.find_all().await;
        }

        self.store
            .find_where(&move |book: &Book| {
                (!title.is_empty() && book.title.to_lowercase().contains(&title))
                    || (!author.is_empty() && book.author.to_lowercase().contains(&author))
            })
            .await
    }
}

impl std::fmt::Debug for BookRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookRepository").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_db::MemoryStore;

    fn book(title: &str, author: &str) -> Book {
        Book {
            id: None,
            title: title.to_string(),
            author: author.to_string(),
            isbn: "1234567890".to_string(),
            publication_year: 2020,
            description: "A book".to_string(),
        }
    }

    async fn seeded() -> BookRepository {
        let repo = BookRepository::new(Arc::new(MemoryStore::new()));
        repo.save(book("Spring Boot Guide", "John Doe")).await.unwrap();
        repo.save(book("Rust in Action", "Tim McNamara")).await.unwrap();
        repo.save(book("Learning Spring", "Jane Johnson")).await.unwrap();
        repo
    }

    fn titles(books: &[Book]) -> Vec<&str> {
        books.iter().map(|b| b.title.as_str()).collect()
    }

    #[tokio::test]
    async fn search_matches_title_ignoring_case() {
        let repo = seeded().await;
        let hits = repo.search_by_title_or_author("spring", "").await.unwrap();
        assert_eq!(titles(&hits), vec!["Spring Boot Guide", "Learning Spring"]);
    }

    #[tokio::test]
    async fn search_matches_either_field() {
        let repo = seeded().await;
        let hits = repo
            .search_by_title_or_author("rust", "JOHNSON")
            .await
            .unwrap();
        assert_eq!(titles(&hits), vec!["Rust in Action", "Learning Spring"]);
    }

    #[tokio::test]
    async fn search_without_terms_returns_everything() {
        let repo = seeded().await;
        let hits = repo.search_by_title_or_author("", "").await.unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn search_without_match_is_empty() {
        let repo = seeded().await;
        let hits = repo
            .search_by_title_or_author("nomatch", "nomatch")
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
