use crate::models::{
    Author, AuthorPatch, AuthorPayload, AuthorWithBooks, Book, BookPayload, CreateAuthorError,
    CreateAuthorRequest, CreateBookError, CreateBookRequest, DeleteAuthorError,
    DeleteAuthorRequest, FindAuthorError, FindAuthorRequest, FindAuthorsError,
    FindAuthorsRequest, UpdateAuthorError, UpdateAuthorRequest,
};
use crate::repositories::{AuthorRepository, BookRepository};
use std::sync::Arc;
use tracing::{info, warn};

/// Author CRUD plus the author-scoped book operations.
#[derive(Debug)]
pub struct AuthorService<AR, BR> {
    author_repo: Arc<AR>,
    book_repo: Arc<BR>,
}

impl<AR: AuthorRepository, BR: BookRepository> AuthorService<AR, BR> {
    pub const fn new(author_repo: Arc<AR>, book_repo: Arc<BR>) -> Self {
        Self {
            author_repo,
            book_repo,
        }
    }

    /// All authors ordered by id, with their books when `include_books` is set.
    pub async fn list_authors(
        &self,
        include_books: bool,
    ) -> Result<Vec<AuthorWithBooks>, FindAuthorsError> {
        let mut req = FindAuthorsRequest::default();
        if include_books {
            req = req.with_books();
        }
        self.author_repo.find_authors(&req).await
    }

    pub async fn get_author(
        &self,
        id: i64,
        include_books: bool,
    ) -> Result<AuthorWithBooks, FindAuthorError> {
        let mut req = FindAuthorRequest::new(id);
        if include_books {
            req = req.with_books();
        }
        self.author_repo.find_author(&req).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_author(&self, payload: AuthorPayload) -> Result<Author, CreateAuthorError> {
        let req = CreateAuthorRequest::try_from(payload)?;
        let author = self
            .author_repo
            .create_author(&req)
            .await
            .inspect_err(|err| warn!(%err, "Rejected author"))?;

        info!(author_id = author.id(), "Created author");
        Ok(author)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_author(
        &self,
        id: i64,
        patch: &AuthorPatch,
    ) -> Result<Author, UpdateAuthorError> {
        let existing = self.author_repo.find_author(&FindAuthorRequest::new(id)).await?;
        let req = UpdateAuthorRequest::from_patch(existing.author(), patch)?;
        let author = self
            .author_repo
            .update_author(&req)
            .await
            .inspect_err(|err| warn!(%err, "Rejected author update"))?;

        info!(author_id = id, "Updated author");
        Ok(author)
    }

    /// Deletes the author and, atomically, every book it owns.
    #[tracing::instrument(skip(self))]
    pub async fn delete_author(&self, id: i64) -> Result<(), DeleteAuthorError> {
        self.author_repo
            .delete_author_cascade(&DeleteAuthorRequest::new(id))
            .await?;

        info!(author_id = id, "Deleted author and owned books");
        Ok(())
    }

    pub async fn list_books_of_author(&self, author_id: i64) -> Result<Vec<Book>, FindAuthorError> {
        let found = self
            .author_repo
            .find_author(&FindAuthorRequest::new(author_id).with_books())
            .await?;
        let (_, books) = found.into_parts();
        Ok(books.unwrap_or_default())
    }

    /// Creates a book owned by `author_id`. The owner always comes from the
    /// caller's path, never from the payload.
    #[tracing::instrument(skip(self))]
    pub async fn create_book_for_author(
        &self,
        author_id: i64,
        payload: BookPayload,
    ) -> Result<Book, CreateBookError> {
        self.author_repo
            .find_author(&FindAuthorRequest::new(author_id))
            .await
            .map_err(|err| match err {
                FindAuthorError::NotFound { id } => CreateBookError::AuthorNotFound { author_id: id },
                FindAuthorError::Other(cause) => CreateBookError::Other(cause),
            })?;

        let req = CreateBookRequest::new(author_id, payload)?;
        let book = self
            .book_repo
            .create_book(&req)
            .await
            .inspect_err(|err| warn!(%err, "Rejected book"))?;

        info!(author_id, book_id = book.id(), "Created book");
        Ok(book)
    }
}
