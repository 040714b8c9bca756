use crate::models::{
    Author, AuthorWithBooks, Book, BookWithAuthor, CreateAuthorError, CreateAuthorRequest,
    CreateBookError, CreateBookRequest, DeleteAuthorError, DeleteAuthorRequest, DeleteBookError,
    DeleteBookRequest, FindAuthorError, FindAuthorRequest, FindAuthorsError, FindAuthorsRequest,
    FindBookError, FindBookRequest, FindBooksError, FindBooksRequest, UpdateAuthorError,
    UpdateAuthorRequest, UpdateBookError, UpdateBookRequest,
};
use async_trait::async_trait;

/// Storage for authors. Uniqueness of emails is enforced here, at write time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorRepository: Send + Sync + 'static {
    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Author, CreateAuthorError>;

    async fn find_author(&self, req: &FindAuthorRequest)
    -> Result<AuthorWithBooks, FindAuthorError>;

    /// Authors matching the filter, ordered by id.
    async fn find_authors(
        &self,
        req: &FindAuthorsRequest,
    ) -> Result<Vec<AuthorWithBooks>, FindAuthorsError>;

    async fn update_author(&self, req: &UpdateAuthorRequest) -> Result<Author, UpdateAuthorError>;

    /// Removes the author and every book it owns in a single transaction.
    async fn delete_author_cascade(&self, req: &DeleteAuthorRequest)
    -> Result<(), DeleteAuthorError>;
}

/// Storage for books. ISBN uniqueness and the owning author's existence are
/// enforced here, at write time.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookRepository: Send + Sync + 'static {
    async fn create_book(&self, req: &CreateBookRequest) -> Result<Book, CreateBookError>;

    async fn find_book(&self, req: &FindBookRequest) -> Result<BookWithAuthor, FindBookError>;

    /// Books matching the filter, ordered by id.
    async fn find_books(&self, req: &FindBooksRequest)
    -> Result<Vec<BookWithAuthor>, FindBooksError>;

    async fn update_book(&self, req: &UpdateBookRequest) -> Result<Book, UpdateBookError>;

    async fn delete_book(&self, req: &DeleteBookRequest) -> Result<(), DeleteBookError>;
}
