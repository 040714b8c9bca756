use crate::models::{
    AuthorFilter, Book, BookFilter, BookPatch, BookWithAuthor, DeleteBookError,
    DeleteBookRequest, FindAuthorsRequest, FindBookError, FindBookRequest,
    FindBooksByAuthorError, FindBooksError, FindBooksRequest, UpdateBookError,
    UpdateBookRequest,
};
use crate::repositories::{AuthorRepository, BookRepository};
use std::sync::Arc;
use tracing::{info, warn};

/// Criteria for listing books. Unset criteria match every book.
#[derive(Debug, Clone, Default)]
pub struct ListBooksQuery {
    pub published_year: Option<i32>,
    /// Case-insensitive substring of the owning author's name.
    pub author_name: Option<String>,
}

/// Book reads, updates and deletes. Books are created through
/// [`AuthorService::create_book_for_author`](crate::services::AuthorService::create_book_for_author).
#[derive(Debug)]
pub struct BookService<AR, BR> {
    author_repo: Arc<AR>,
    book_repo: Arc<BR>,
}

impl<AR: AuthorRepository, BR: BookRepository> BookService<AR, BR> {
    pub const fn new(author_repo: Arc<AR>, book_repo: Arc<BR>) -> Self {
        Self {
            author_repo,
            book_repo,
        }
    }

    /// Books matching `query`, each with its author. No match is an empty list.
    pub async fn list_books(
        &self,
        query: &ListBooksQuery,
    ) -> Result<Vec<BookWithAuthor>, FindBooksError> {
        let mut filter = BookFilter {
            published_year: query.published_year,
            author_ids: None,
        };

        let author_name = query
            .author_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());
        if let Some(name) = author_name {
            let authors = self
                .author_repo
                .find_authors(&FindAuthorsRequest::new(AuthorFilter {
                    name_contains: Some(name.to_string()),
                    ids: None,
                }))
                .await
                .map_err(|err| FindBooksError(err.0))?;
            if authors.is_empty() {
                return Ok(Vec::new());
            }
            filter.author_ids = Some(authors.iter().map(|a| a.author().id()).collect());
        }

        self.book_repo
            .find_books(&FindBooksRequest::new(filter).with_author())
            .await
    }

    /// Like [`Self::list_books`] filtered by author name, except that finding
    /// nothing is an error.
    pub async fn list_books_by_author_name(
        &self,
        name: &str,
    ) -> Result<Vec<BookWithAuthor>, FindBooksByAuthorError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FindBooksByAuthorError::NotFound { name: name.into() });
        }

        let query = ListBooksQuery {
            published_year: None,
            author_name: Some(name.to_string()),
        };
        let books = self.list_books(&query).await.map_err(|err| err.0)?;
        if books.is_empty() {
            return Err(FindBooksByAuthorError::NotFound { name: name.into() });
        }
        Ok(books)
    }

    pub async fn get_book(&self, id: i64) -> Result<BookWithAuthor, FindBookError> {
        self.book_repo
            .find_book(&FindBookRequest::new(id).with_author())
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_book(&self, id: i64, patch: &BookPatch) -> Result<Book, UpdateBookError> {
        let existing = self.book_repo.find_book(&FindBookRequest::new(id)).await?;
        let req = UpdateBookRequest::from_patch(existing.book(), patch)?;
        let book = self
            .book_repo
            .update_book(&req)
            .await
            .inspect_err(|err| warn!(%err, "Rejected book update"))?;

        info!(book_id = id, "Updated book");
        Ok(book)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_book(&self, id: i64) -> Result<(), DeleteBookError> {
        self.book_repo
            .delete_book(&DeleteBookRequest::new(id))
            .await?;

        info!(book_id = id, "Deleted book");
        Ok(())
    }
}
