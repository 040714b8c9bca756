use crate::models::Book;
use crate::models::validation::{FieldErrors, ValidationError, bounded_text};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

pub const MAX_AUTHOR_NAME_LEN: usize = 100;
pub const MIN_BIRTH_YEAR: i32 = 1900;
pub const MAX_BIRTH_YEAR: i32 = 2024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName(String);

impl AuthorName {
    pub fn new(raw: &str) -> Result<Self, AuthorNameError> {
        bounded_text(
            raw,
            MAX_AUTHOR_NAME_LEN,
            AuthorNameError::Empty,
            AuthorNameError::TooLong,
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

impl std::fmt::Display for AuthorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorNameError {
    #[error("Name is required")]
    Missing,
    #[error("Name cannot be empty")]
    Empty,
    #[error("Name must be under 100 characters")]
    TooLong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    pub fn new(raw: &str) -> Result<Self, EmailAddressError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Err(EmailAddressError::Empty)
        } else if Self::is_valid(trimmed) {
            Ok(Self(trimmed.into()))
        } else {
            Err(EmailAddressError::Invalid(trimmed.into()))
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_valid(s: &str) -> bool {
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[a-zA-Z0-9!#$%&'*+\-/=?^_`{|}~]+(\.[a-zA-Z0-9!#$%&'*+\-/=?^_`{|}~]+)*@[a-zA-Z0-9]+(-[a-zA-Z0-9]+)*(\.[a-zA-Z0-9]+(-[a-zA-Z0-9]+)*)*\.[a-zA-Z]{2,}$").unwrap()
        });
        RE.is_match(s)
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailAddressError {
    #[error("Email is required")]
    Missing,
    #[error("Email cannot be empty")]
    Empty,
    #[error("Email must be valid")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BirthYear(i32);

impl BirthYear {
    pub const fn new(year: i32) -> Result<Self, BirthYearError> {
        if year < MIN_BIRTH_YEAR {
            Err(BirthYearError::TooEarly)
        } else if year > MAX_BIRTH_YEAR {
            Err(BirthYearError::TooLate)
        } else {
            Ok(Self(year))
        }
    }

    pub const fn new_unchecked(year: i32) -> Self {
        Self(year)
    }

    pub const fn value(self) -> i32 {
        self.0
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BirthYearError {
    #[error("Birth year must be 1900 or later")]
    TooEarly,
    #[error("Birth year must be 2024 or earlier")]
    TooLate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    id: i64,
    name: AuthorName,
    email: EmailAddress,
    bio: Option<String>,
    birth_year: Option<BirthYear>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Author {
    pub const fn new(
        id: i64,
        name: AuthorName,
        email: EmailAddress,
        bio: Option<String>,
        birth_year: Option<BirthYear>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            email,
            bio,
            birth_year,
            created_at,
            updated_at,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn name(&self) -> &AuthorName {
        &self.name
    }

    pub const fn email(&self) -> &EmailAddress {
        &self.email
    }

    pub fn bio(&self) -> Option<&str> {
        self.bio.as_deref()
    }

    pub const fn birth_year(&self) -> Option<BirthYear> {
        self.birth_year
    }

    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// An author together with its books, when they were requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorWithBooks {
    author: Author,
    books: Option<Vec<Book>>,
}

impl AuthorWithBooks {
    pub const fn new(author: Author, books: Option<Vec<Book>>) -> Self {
        Self { author, books }
    }

    pub const fn author(&self) -> &Author {
        &self.author
    }

    pub fn books(&self) -> Option<&[Book]> {
        self.books.as_deref()
    }

    pub fn into_parts(self) -> (Author, Option<Vec<Book>>) {
        (self.author, self.books)
    }
}

/// Unvalidated author fields as supplied by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub birth_year: Option<i32>,
}

/// Fields to change on an existing author. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub birth_year: Option<i32>,
}

impl AuthorPatch {
    pub fn merge_onto(&self, existing: &Author) -> AuthorPayload {
        AuthorPayload {
            name: Some(
                self.name
                    .clone()
                    .unwrap_or_else(|| existing.name().to_string()),
            ),
            email: Some(
                self.email
                    .clone()
                    .unwrap_or_else(|| existing.email().to_string()),
            ),
            bio: self.bio.clone().or_else(|| existing.bio.clone()),
            birth_year: self
                .birth_year
                .or_else(|| existing.birth_year().map(BirthYear::value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAuthorRequest {
    name: AuthorName,
    email: EmailAddress,
    bio: Option<String>,
    birth_year: Option<BirthYear>,
}

impl CreateAuthorRequest {
    pub const fn new(
        name: AuthorName,
        email: EmailAddress,
        bio: Option<String>,
        birth_year: Option<BirthYear>,
    ) -> Self {
        Self {
            name,
            email,
            bio,
            birth_year,
        }
    }

    pub const fn name(&self) -> &AuthorName {
        &self.name
    }

    pub const fn email(&self) -> &EmailAddress {
        &self.email
    }

    pub fn bio(&self) -> Option<&str> {
        self.bio.as_deref()
    }

    pub const fn birth_year(&self) -> Option<BirthYear> {
        self.birth_year
    }
}

impl TryFrom<AuthorPayload> for CreateAuthorRequest {
    type Error = ValidationError;

    fn try_from(value: AuthorPayload) -> Result<Self, Self::Error> {
        let mut errors = FieldErrors::default();
        let name = errors.check(
            value
                .name
                .as_deref()
                .ok_or(AuthorNameError::Missing)
                .and_then(AuthorName::new),
        );
        let email = errors.check(
            value
                .email
                .as_deref()
                .ok_or(EmailAddressError::Missing)
                .and_then(EmailAddress::new),
        );
        let birth_year = errors.check(value.birth_year.map(BirthYear::new).transpose());

        match (name, email, birth_year) {
            (Some(name), Some(email), Some(birth_year)) => {
                Ok(Self::new(name, email, value.bio, birth_year))
            }
            _ => Err(errors.into_error()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FindAuthorRequest {
    id: i64,
    include_books: bool,
}

impl FindAuthorRequest {
    pub const fn new(id: i64) -> Self {
        Self {
            id,
            include_books: false,
        }
    }

    pub const fn with_books(mut self) -> Self {
        self.include_books = true;
        self
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn include_books(&self) -> bool {
        self.include_books
    }
}

/// Predicates an author row must satisfy. Unset predicates match every row.
#[derive(Debug, Clone, Default)]
pub struct AuthorFilter {
    /// Case-insensitive substring of the author name.
    pub name_contains: Option<String>,
    pub ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default)]
pub struct FindAuthorsRequest {
    filter: AuthorFilter,
    include_books: bool,
}

impl FindAuthorsRequest {
    pub const fn new(filter: AuthorFilter) -> Self {
        Self {
            filter,
            include_books: false,
        }
    }

    #[must_use]
    pub fn with_books(mut self) -> Self {
        self.include_books = true;
        self
    }

    pub const fn filter(&self) -> &AuthorFilter {
        &self.filter
    }

    pub const fn include_books(&self) -> bool {
        self.include_books
    }
}

#[derive(Debug)]
pub struct UpdateAuthorRequest {
    id: i64,
    name: Option<AuthorName>,
    email: Option<EmailAddress>,
    bio: Option<String>,
    birth_year: Option<BirthYear>,
}

impl UpdateAuthorRequest {
    pub const fn new(id: i64) -> Self {
        Self {
            id,
            name: None,
            email: None,
            bio: None,
            birth_year: None,
        }
    }

    /// Applies `patch` over `existing`, validates the merged author and keeps
    /// only the patched fields.
    pub fn from_patch(existing: &Author, patch: &AuthorPatch) -> Result<Self, ValidationError> {
        let merged = CreateAuthorRequest::try_from(patch.merge_onto(existing))?;

        let mut req = Self::new(existing.id());
        if patch.name.is_some() {
            req.set_name(merged.name);
        }
        if patch.email.is_some() {
            req.set_email(merged.email);
        }
        if let Some(bio) = merged.bio.filter(|_| patch.bio.is_some()) {
            req.set_bio(bio);
        }
        if let Some(birth_year) = merged.birth_year.filter(|_| patch.birth_year.is_some()) {
            req.set_birth_year(birth_year);
        }
        Ok(req)
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn name(&self) -> Option<&AuthorName> {
        self.name.as_ref()
    }

    pub fn set_name(&mut self, name: AuthorName) {
        self.name = Some(name);
    }

    pub const fn email(&self) -> Option<&EmailAddress> {
        self.email.as_ref()
    }

    pub fn set_email(&mut self, email: EmailAddress) {
        self.email = Some(email);
    }

    pub fn bio(&self) -> Option<&str> {
        self.bio.as_deref()
    }

    pub fn set_bio(&mut self, bio: String) {
        self.bio = Some(bio);
    }

    pub const fn birth_year(&self) -> Option<BirthYear> {
        self.birth_year
    }

    pub fn set_birth_year(&mut self, birth_year: BirthYear) {
        self.birth_year = Some(birth_year);
    }

    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.bio.is_none()
            && self.birth_year.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteAuthorRequest {
    id: i64,
}

impl DeleteAuthorRequest {
    pub const fn new(id: i64) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Error, Debug)]
pub enum CreateAuthorError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Author with email \"{email}\" already exists")]
    Duplicate { email: String },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
pub enum FindAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct FindAuthorsError(#[from] pub anyhow::Error);

#[derive(Error, Debug)]
pub enum UpdateAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Author with email \"{email}\" already exists")]
    Duplicate { email: String },
    #[error(transparent)]
    Other(anyhow::Error),
}

impl From<FindAuthorError> for UpdateAuthorError {
    fn from(err: FindAuthorError) -> Self {
        match err {
            FindAuthorError::NotFound { id } => Self::NotFound { id },
            FindAuthorError::Other(cause) => Self::Other(cause),
        }
    }
}

#[derive(Error, Debug)]
pub enum DeleteAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
