use crate::http::AppState;
use crate::http::authors::AuthorHttpResponse;
use crate::http::handler::{ApiError, ApiSuccess};
use crate::models::{Book, BookPatch, BookWithAuthor};
use crate::repositories::{AuthorRepository, BookRepository};
use crate::services::ListBooksQuery;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw list filters. Blank values are treated as absent.
#[derive(Debug, Deserialize)]
pub struct ListBooksHttpQuery {
    #[serde(alias = "publishedYear")]
    year: Option<String>,
    author: Option<String>,
}

impl TryFrom<ListBooksHttpQuery> for ListBooksQuery {
    type Error = ApiError;

    fn try_from(value: ListBooksHttpQuery) -> Result<Self, Self::Error> {
        let published_year = match value.year.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(year) => Some(year.parse::<i32>().map_err(|_| {
                ApiError::BadRequest(format!(r#"Invalid year "{year}""#))
            })?),
        };
        Ok(Self {
            published_year,
            author_name: value.author,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookHttpRequest {
    title: Option<String>,
    isbn: Option<String>,
    published_year: Option<i32>,
    author_id: Option<i64>,
}

impl From<UpdateBookHttpRequest> for BookPatch {
    fn from(value: UpdateBookHttpRequest) -> Self {
        Self {
            title: value.title,
            isbn: value.isbn,
            published_year: value.published_year,
            author_id: value.author_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookHttpResponse {
    id: i64,
    title: String,
    isbn: String,
    published_year: Option<i32>,
    author_id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<AuthorHttpResponse>,
}

impl From<Book> for BookHttpResponse {
    fn from(value: Book) -> Self {
        Self {
            id: value.id(),
            title: value.title().to_string(),
            isbn: value.isbn().to_string(),
            published_year: value.published_year(),
            author_id: value.author_id(),
            created_at: value.created_at(),
            updated_at: value.updated_at(),
            author: None,
        }
    }
}

impl From<BookWithAuthor> for BookHttpResponse {
    fn from(value: BookWithAuthor) -> Self {
        let (book, author) = value.into_parts();
        Self {
            author: author.map(Into::into),
            ..Self::from(book)
        }
    }
}

pub async fn list_books<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    query: Result<Query<ListBooksHttpQuery>, QueryRejection>,
) -> Result<ApiSuccess<Vec<BookHttpResponse>>, ApiError> {
    let Query(query) = query?;
    let query = ListBooksQuery::try_from(query)?;
    let books = state.book_service.list_books(&query).await?;
    let body: Vec<BookHttpResponse> = books.into_iter().map(Into::into).collect();
    Ok(ApiSuccess::new(StatusCode::OK, body))
}

pub async fn list_books_by_author_name<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    last_name: Result<Path<String>, PathRejection>,
) -> Result<ApiSuccess<Vec<BookHttpResponse>>, ApiError> {
    let Path(last_name) = last_name?;
    let books = state
        .book_service
        .list_books_by_author_name(&last_name)
        .await?;
    let body: Vec<BookHttpResponse> = books.into_iter().map(Into::into).collect();
    Ok(ApiSuccess::new(StatusCode::OK, body))
}

pub async fn get_book<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ApiSuccess<BookHttpResponse>, ApiError> {
    let Path(id) = id?;
    let book = state.book_service.get_book(id).await?;
    Ok(ApiSuccess::new(StatusCode::OK, book.into()))
}

/// Books only exist under an author, so the top-level collection refuses writes.
pub async fn reject_unscoped_book() -> ApiError {
    ApiError::BadRequest(
        "Books must be created through POST /api/authors/{authorId}/books".to_string(),
    )
}

pub async fn update_book<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateBookHttpRequest>, JsonRejection>,
) -> Result<ApiSuccess<BookHttpResponse>, ApiError> {
    let Path(id) = id?;
    let Json(body) = body?;
    let patch = BookPatch::from(body);
    let book = state.book_service.update_book(id, &patch).await?;
    Ok(ApiSuccess::new(StatusCode::OK, book.into()))
}

pub async fn delete_book<AR: AuthorRepository, BR: BookRepository>(
    State(state): State<AppState<AR, BR>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    state.book_service.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
