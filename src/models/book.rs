use crate::models::Author;
use crate::models::validation::{FieldErrors, ValidationError, bounded_text};
use chrono::{DateTime, Utc};
use thiserror::Error;

pub const MAX_BOOK_TITLE_LEN: usize = 200;
pub const ISBN_LEN: usize = 13;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookTitle(String);

impl BookTitle {
    pub fn new(raw: &str) -> Result<Self, BookTitleError> {
        bounded_text(
            raw,
            MAX_BOOK_TITLE_LEN,
            BookTitleError::Empty,
            BookTitleError::TooLong,
        )
        .map(Self)
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BookTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookTitleError {
    #[error("Title is required")]
    Missing,
    #[error("Title cannot be empty")]
    Empty,
    #[error("Title must be under 200 characters")]
    TooLong,
}

/// A 13 character ISBN. Only the length is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Isbn(String);

impl Isbn {
    pub fn new(raw: &str) -> Result<Self, IsbnError> {
        let trimmed = raw.trim();
        match trimmed.chars().count() {
            0 => Err(IsbnError::Empty),
            ISBN_LEN => Ok(Self(trimmed.into())),
            _ => Err(IsbnError::Length),
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Isbn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IsbnError {
    #[error("ISBN is required")]
    Missing,
    #[error("ISBN cannot be empty")]
    Empty,
    #[error("ISBN must be exactly 13 characters")]
    Length,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    id: i64,
    title: BookTitle,
    isbn: Isbn,
    published_year: Option<i32>,
    author_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Book {
    pub const fn new(
        id: i64,
        title: BookTitle,
        isbn: Isbn,
        published_year: Option<i32>,
        author_id: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            isbn,
            published_year,
            author_id,
            created_at,
            updated_at,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn title(&self) -> &BookTitle {
        &self.title
    }

    pub const fn isbn(&self) -> &Isbn {
        &self.isbn
    }

    pub const fn published_year(&self) -> Option<i32> {
        self.published_year
    }

    pub const fn author_id(&self) -> i64 {
        self.author_id
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// A book together with its author, when it was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookWithAuthor {
    book: Book,
    author: Option<Author>,
}

impl BookWithAuthor {
    pub const fn new(book: Book, author: Option<Author>) -> Self {
        Self { book, author }
    }

    pub const fn book(&self) -> &Book {
        &self.book
    }

    pub const fn author(&self) -> Option<&Author> {
        self.author.as_ref()
    }

    pub fn into_parts(self) -> (Book, Option<Author>) {
        (self.book, self.author)
    }
}

/// Unvalidated book fields as supplied by a caller. The owning author comes
/// from the creation path, never from the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPayload {
    pub title: Option<String>,
    pub isbn: Option<String>,
    pub published_year: Option<i32>,
}

/// Fields to change on an existing book. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub isbn: Option<String>,
    pub published_year: Option<i32>,
    pub author_id: Option<i64>,
}

impl BookPatch {
    pub fn merge_onto(&self, existing: &Book) -> (i64, BookPayload) {
        let payload = BookPayload {
            title: Some(
                self.title
                    .clone()
                    .unwrap_or_else(|| existing.title().to_string()),
            ),
            isbn: Some(
                self.isbn
                    .clone()
                    .unwrap_or_else(|| existing.isbn().to_string()),
            ),
            published_year: self.published_year.or(existing.published_year()),
        };
        (self.author_id.unwrap_or(existing.author_id()), payload)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBookRequest {
    author_id: i64,
    title: BookTitle,
    isbn: Isbn,
    published_year: Option<i32>,
}

impl CreateBookRequest {
    pub fn new(author_id: i64, payload: BookPayload) -> Result<Self, ValidationError> {
        let mut errors = FieldErrors::default();
        let title = errors.check(
            payload
                .title
                .as_deref()
                .ok_or(BookTitleError::Missing)
                .and_then(BookTitle::new),
        );
        let isbn = errors.check(
            payload
                .isbn
                .as_deref()
                .ok_or(IsbnError::Missing)
                .and_then(Isbn::new),
        );

        match (title, isbn) {
            (Some(title), Some(isbn)) => Ok(Self {
                author_id,
                title,
                isbn,
                published_year: payload.published_year,
            }),
            _ => Err(errors.into_error()),
        }
    }

    pub const fn author_id(&self) -> i64 {
        self.author_id
    }

    pub const fn title(&self) -> &BookTitle {
        &self.title
    }

    pub const fn isbn(&self) -> &Isbn {
        &self.isbn
    }

    pub const fn published_year(&self) -> Option<i32> {
        self.published_year
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FindBookRequest {
    id: i64,
    include_author: bool,
}

impl FindBookRequest {
    pub const fn new(id: i64) -> Self {
        Self {
            id,
            include_author: false,
        }
    }

    pub const fn with_author(mut self) -> Self {
        self.include_author = true;
        self
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn include_author(&self) -> bool {
        self.include_author
    }
}

/// Predicates a book row must satisfy. Unset predicates match every row.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub published_year: Option<i32>,
    /// Restricts books to these owners. An empty set matches nothing.
    pub author_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default)]
pub struct FindBooksRequest {
    filter: BookFilter,
    include_author: bool,
}

impl FindBooksRequest {
    pub const fn new(filter: BookFilter) -> Self {
        Self {
            filter,
            include_author: false,
        }
    }

    #[must_use]
    pub fn with_author(mut self) -> Self {
        self.include_author = true;
        self
    }

    pub const fn filter(&self) -> &BookFilter {
        &self.filter
    }

    pub const fn include_author(&self) -> bool {
        self.include_author
    }
}

#[derive(Debug)]
pub struct UpdateBookRequest {
    id: i64,
    title: Option<BookTitle>,
    isbn: Option<Isbn>,
    published_year: Option<i32>,
    author_id: Option<i64>,
}

impl UpdateBookRequest {
    pub const fn new(id: i64) -> Self {
        Self {
            id,
            title: None,
            isbn: None,
            published_year: None,
            author_id: None,
        }
    }

    /// Applies `patch` over `existing`, validates the merged book and keeps
    /// only the patched fields.
    pub fn from_patch(existing: &Book, patch: &BookPatch) -> Result<Self, ValidationError> {
        let (author_id, payload) = patch.merge_onto(existing);
        let merged = CreateBookRequest::new(author_id, payload)?;

        let mut req = Self::new(existing.id());
        if patch.title.is_some() {
            req.set_title(merged.title);
        }
        if patch.isbn.is_some() {
            req.set_isbn(merged.isbn);
        }
        if let Some(published_year) = patch.published_year {
            req.set_published_year(published_year);
        }
        if let Some(author_id) = patch.author_id {
            req.set_author_id(author_id);
        }
        Ok(req)
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn title(&self) -> Option<&BookTitle> {
        self.title.as_ref()
    }

    pub fn set_title(&mut self, title: BookTitle) {
        self.title = Some(title);
    }

    pub const fn isbn(&self) -> Option<&Isbn> {
        self.isbn.as_ref()
    }

    pub fn set_isbn(&mut self, isbn: Isbn) {
        self.isbn = Some(isbn);
    }

    pub const fn published_year(&self) -> Option<i32> {
        self.published_year
    }

    pub fn set_published_year(&mut self, published_year: i32) {
        self.published_year = Some(published_year);
    }

    pub const fn author_id(&self) -> Option<i64> {
        self.author_id
    }

    pub fn set_author_id(&mut self, author_id: i64) {
        self.author_id = Some(author_id);
    }

    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.isbn.is_none()
            && self.published_year.is_none()
            && self.author_id.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteBookRequest {
    id: i64,
}

impl DeleteBookRequest {
    pub const fn new(id: i64) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Error, Debug)]
pub enum CreateBookError {
    #[error("Author with id \"{author_id}\" does not exist")]
    AuthorNotFound { author_id: i64 },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Book with ISBN \"{isbn}\" already exists")]
    Duplicate { isbn: String },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
pub enum FindBookError {
    #[error("Book with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct FindBooksError(#[from] pub anyhow::Error);

#[derive(Error, Debug)]
pub enum FindBooksByAuthorError {
    #[error("No books found for author matching \"{name}\"")]
    NotFound { name: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum UpdateBookError {
    #[error("Book with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Book with ISBN \"{isbn}\" already exists")]
    Duplicate { isbn: String },
    #[error("Author with id \"{author_id}\" does not exist")]
    UnknownAuthor { author_id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

impl From<FindBookError> for UpdateBookError {
    fn from(err: FindBookError) -> Self {
        match err {
            FindBookError::NotFound { id } => Self::NotFound { id },
            FindBookError::Other(cause) => Self::Other(cause),
        }
    }
}

#[derive(Error, Debug)]
pub enum DeleteBookError {
    #[error("Book with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_book() -> Book {
        let now = Utc::now();
        Book::new(
            3,
            BookTitle::new_unchecked("Notes"),
            Isbn::new_unchecked("1234567890123"),
            Some(1843),
            1,
            now,
            now,
        )
    }

    #[test]
    fn isbn_must_be_exactly_thirteen_characters() {
        assert!(Isbn::new("1234567890123").is_ok());
        assert!(Isbn::new("978-0-13-1103").is_ok());
        assert_eq!(Isbn::new("short"), Err(IsbnError::Length));
        assert_eq!(Isbn::new("12345678901234"), Err(IsbnError::Length));
        assert_eq!(Isbn::new(" "), Err(IsbnError::Empty));
    }

    #[test]
    fn title_length_is_bounded() {
        assert!(BookTitle::new(&"t".repeat(200)).is_ok());
        assert_eq!(
            BookTitle::new(&"t".repeat(201)),
            Err(BookTitleError::TooLong)
        );
        assert_eq!(BookTitle::new(""), Err(BookTitleError::Empty));
    }

    #[test]
    fn create_request_takes_the_author_from_the_caller() {
        let req = CreateBookRequest::new(
            42,
            BookPayload {
                title: Some(" Notes ".into()),
                isbn: Some("1234567890123".into()),
                published_year: Some(1843),
            },
        )
        .unwrap();

        assert_eq!(req.author_id(), 42);
        assert_eq!(req.title().as_str(), "Notes");
        assert_eq!(req.published_year(), Some(1843));
    }

    #[test]
    fn create_request_reports_title_and_isbn() {
        let err = CreateBookRequest::new(
            1,
            BookPayload {
                isbn: Some("short".into()),
                ..BookPayload::default()
            },
        )
        .unwrap_err();

        assert_eq!(
            err.messages(),
            ["Title is required", "ISBN must be exactly 13 characters"]
        );
    }

    #[test]
    fn patch_merges_over_the_stored_book() {
        let existing = stored_book();
        let patch = BookPatch {
            title: Some("Sketch".into()),
            ..BookPatch::default()
        };

        let (author_id, merged) = patch.merge_onto(&existing);
        assert_eq!(author_id, 1);
        assert_eq!(merged.title.as_deref(), Some("Sketch"));
        assert_eq!(merged.isbn.as_deref(), Some("1234567890123"));
        assert_eq!(merged.published_year, Some(1843));

        let req = UpdateBookRequest::from_patch(&existing, &patch).unwrap();
        assert_eq!(req.title().map(BookTitle::as_str), Some("Sketch"));
        assert!(req.isbn().is_none());
        assert!(req.published_year().is_none());
        assert!(req.author_id().is_none());
    }

    #[test]
    fn patch_rejects_a_bad_isbn() {
        let patch = BookPatch {
            isbn: Some("123".into()),
            ..BookPatch::default()
        };

        let err = UpdateBookRequest::from_patch(&stored_book(), &patch).unwrap_err();
        assert_eq!(err.to_string(), "ISBN must be exactly 13 characters");
    }
}
