use crate::http::AppState;
use crate::http::books::BookHttpResponse;
use crate::http::handler::{ApiError, ApiSuccess};
use crate::models::{Author, AuthorPatch, AuthorPayload, AuthorWithBooks, BirthYear, BookPayload};
use crate::repositories::{AuthorRepository, BookRepository};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAuthorsHttpQuery {
    #[serde(default)]
    include_books: bool,
}

/// Author fields accepted on create. Missing fields are reported by
/// validation rather than rejected by deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuthorHttpRequest {
    name: Option<String>,
    email: Option<String>,
    bio: Option<String>,
    birth_year: Option<i32>,
}

impl From<CreateAuthorHttpRequest> for AuthorPayload {
    fn from(value: CreateAuthorHttpRequest) -> Self {
        Self {
            name: value.name,
            email: value.email,
            bio: value.bio,
            birth_year: value.birth_year,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAuthorHttpRequest {
    name: Option<String>,
    email: Option<String>,
    bio: Option<String>,
    birth_year: Option<i32>,
}

impl From<UpdateAuthorHttpRequest> for AuthorPatch {
    fn from(value: UpdateAuthorHttpRequest) -> Self {
        Self {
            name: value.name,
            email: value.email,
            bio: value.bio,
            birth_year: value.birth_year,
        }
    }
}

/// Book fields accepted on the author-scoped create. Any `authorId` in the
/// body is ignored in favour of the path.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookHttpRequest {
    title: Option<String>,
    isbn: Option<String>,
    published_year: Option<i32>,
}

impl From<CreateBookHttpRequest> for BookPayload {
    fn from(value: CreateBookHttpRequest) -> Self {
        Self {
            title: value.title,
            isbn: value.isbn,
            published_year: value.published_year,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorHttpResponse {
    id: i64,
    name: String,
    email: String,
    bio: Option<String>,
    birth_year: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    books: Option<Vec<BookHttpResponse>>,
}

impl From<Author> for AuthorHttpResponse {
    fn from(value: Author) -> Self {
        Self {
            id: value.id(),
            name: value.name().to_string(),
            email: value.email().to_string(),
            bio: value.bio().map(ToString::to_string),
            birth_year: value.birth_year().map(BirthYear::value),
            created_at: value.created_at(),
            updated_at: value.updated_at(),
            books: None,
        }
    }
}

impl From<AuthorWithBooks> for AuthorHttpResponse {
    fn from(value: AuthorWithBooks) -> Self {
        let (author, books) = value.into_parts();
        Self {
            books: books.map(|books| books.into_iter().map(Into::into).collect()),
            ..Self::from(author)
        }
    }
}

pub async fn list_authors<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    query: Result<Query<ListAuthorsHttpQuery>, QueryRejection>,
) -> Result<ApiSuccess<Vec<AuthorHttpResponse>>, ApiError> {
    let Query(query) = query?;
    let authors = state.author_service.list_authors(query.include_books).await?;
    let body: Vec<AuthorHttpResponse> = authors.into_iter().map(Into::into).collect();
    Ok(ApiSuccess::new(StatusCode::OK, body))
}

pub async fn get_author<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError> {
    let Path(id) = id?;
    let author = state.author_service.get_author(id, true).await?;
    Ok(ApiSuccess::new(StatusCode::OK, author.into()))
}

pub async fn create_author<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    body: Result<Json<CreateAuthorHttpRequest>, JsonRejection>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError> {
    let Json(body) = body?;
    let author = state.author_service.create_author(body.into()).await?;
    Ok(ApiSuccess::new(StatusCode::CREATED, author.into()))
}

pub async fn update_author<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateAuthorHttpRequest>, JsonRejection>,
) -> Result<ApiSuccess<AuthorHttpResponse>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;
    let patch = AuthorPatch::from(body);
    let author = state.author_service.update_author(id, &patch).await?;
    Ok(ApiSuccess::new(StatusCode::OK, author.into()))
}

pub async fn delete_author<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.author_service.delete_author(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_author_books<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiSuccess<Vec<BookHttpResponse>>, ApiError> {
    let Path(id) = id?;
    let books = state.author_service.list_books_of_author(id).await?;
    let body: Vec<BookHttpResponse> = books.into_iter().map(Into::into).collect();
    Ok(ApiSuccess::new(StatusCode::OK, body))
}

pub async fn create_author_book<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<CreateBookHttpRequest>, JsonRejection>,
) -> Result<ApiSuccess<BookHttpResponse>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;
    let book = state
        .author_service
        .create_book_for_author(id, body.into())
        .await?;
    Ok(ApiSuccess::new(StatusCode::CREATED, book.into()))
}
