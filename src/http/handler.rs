use crate::models::{
    CreateAuthorError, CreateBookError, DeleteAuthorError, DeleteBookError, FindAuthorError,
    FindAuthorsError, FindBookError, FindBooksByAuthorError, FindBooksError, UpdateAuthorError,
    UpdateBookError,
};
use axum::extract::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;
use tracing::error;

#[derive(Debug)]
pub struct ApiSuccess<T: Serialize>(StatusCode, Json<T>);

impl<T: Serialize> ApiSuccess<T> {
    pub const fn new(status: StatusCode, data: T) -> Self {
        Self(status, Json(data))
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> axum::response::Response {
        (self.0, self.1).into_response()
    }
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    UnprocessableEntity(String),
    InternalServerError(String),
}

impl ApiError {
    /// Logs `cause` and hides it from the client.
    fn internal(cause: &anyhow::Error) -> Self {
        error!(error = ?cause, "Request failed");
        Self::InternalServerError("Internal server error".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Self::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

pub async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => match rejected_field(&err.body_text()) {
                Some(field) => Self::BadRequest(format!(r#"Invalid value for "{field}""#)),
                None => Self::BadRequest("Request body has an unexpected shape".to_string()),
            },
            JsonRejection::JsonSyntaxError(_) => {
                Self::UnprocessableEntity("Request body is not valid JSON".to_string())
            }
            other => Self::UnprocessableEntity(other.body_text()),
        }
    }
}

/// Path of the offending field in a JSON data rejection, e.g. `birthYear`.
fn rejected_field(text: &str) -> Option<&str> {
    let (_, detail) = text.split_once("target type: ")?;
    let (path, _) = detail.split_once(": ")?;
    (!path.is_empty() && !path.contains(char::is_whitespace)).then_some(path)
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

const AUTHOR_NOT_FOUND: &str = "Author not found";
const BOOK_NOT_FOUND: &str = "Book not found";
const EMAIL_TAKEN: &str = "Email already exists";
const ISBN_TAKEN: &str = "ISBN already exists";

impl From<CreateAuthorError> for ApiError {
    fn from(err: CreateAuthorError) -> Self {
        match err {
            CreateAuthorError::Invalid(err) => Self::BadRequest(err.to_string()),
            CreateAuthorError::Duplicate { .. } => Self::Conflict(EMAIL_TAKEN.to_string()),
            CreateAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<FindAuthorError> for ApiError {
    fn from(err: FindAuthorError) -> Self {
        match err {
            FindAuthorError::NotFound { .. } => Self::NotFound(AUTHOR_NOT_FOUND.to_string()),
            FindAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<FindAuthorsError> for ApiError {
    fn from(err: FindAuthorsError) -> Self {
        Self::internal(&err.0)
    }
}

impl From<UpdateAuthorError> for ApiError {
    fn from(err: UpdateAuthorError) -> Self {
        match err {
            UpdateAuthorError::NotFound { .. } => Self::NotFound(AUTHOR_NOT_FOUND.to_string()),
            UpdateAuthorError::Invalid(err) => Self::BadRequest(err.to_string()),
            UpdateAuthorError::Duplicate { .. } => Self::Conflict(EMAIL_TAKEN.to_string()),
            UpdateAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<DeleteAuthorError> for ApiError {
    fn from(err: DeleteAuthorError) -> Self {
        match err {
            DeleteAuthorError::NotFound { .. } => Self::NotFound(AUTHOR_NOT_FOUND.to_string()),
            DeleteAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<CreateBookError> for ApiError {
    fn from(err: CreateBookError) -> Self {
        match err {
            CreateBookError::AuthorNotFound { .. } => {
                Self::NotFound(AUTHOR_NOT_FOUND.to_string())
            }
            CreateBookError::Invalid(err) => Self::BadRequest(err.to_string()),
            CreateBookError::Duplicate { .. } => Self::Conflict(ISBN_TAKEN.to_string()),
            CreateBookError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<FindBookError> for ApiError {
    fn from(err: FindBookError) -> Self {
        match err {
            FindBookError::NotFound { .. } => Self::NotFound(BOOK_NOT_FOUND.to_string()),
            FindBookError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<FindBooksError> for ApiError {
    fn from(err: FindBooksError) -> Self {
        Self::internal(&err.0)
    }
}

impl From<FindBooksByAuthorError> for ApiError {
    fn from(err: FindBooksByAuthorError) -> Self {
        match err {
            FindBooksByAuthorError::NotFound { name } => {
                Self::NotFound(format!("No books found for author matching \"{name}\""))
            }
            FindBooksByAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<UpdateBookError> for ApiError {
    fn from(err: UpdateBookError) -> Self {
        match err {
            UpdateBookError::NotFound { .. } => Self::NotFound(BOOK_NOT_FOUND.to_string()),
            UpdateBookError::Invalid(err) => Self::BadRequest(err.to_string()),
            UpdateBookError::Duplicate { .. } => Self::Conflict(ISBN_TAKEN.to_string()),
            UpdateBookError::UnknownAuthor { .. } => Self::BadRequest("Invalid authorId".to_string()),
            UpdateBookError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<DeleteBookError> for ApiError {
    fn from(err: DeleteBookError) -> Self {
        match err {
            DeleteBookError::NotFound { .. } => Self::NotFound(BOOK_NOT_FOUND.to_string()),
            DeleteBookError::Other(cause) => Self::internal(&cause),
        }
    }
}
