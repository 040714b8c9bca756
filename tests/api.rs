use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use library_catalog::database::{SqliteAuthorRepository, SqliteBookRepository, establish_pool};
use library_catalog::http::{AppState, router};
use serde_json::{Value, json};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceExt;

async fn app_with_pool() -> (Router, SqlitePool) {
    let pool = establish_pool("sqlite::memory:", 1).await.unwrap();
    let state = AppState::new(
        Arc::new(SqliteAuthorRepository::new(pool.clone())),
        Arc::new(SqliteBookRepository::new(pool.clone())),
    );
    (router(state), pool)
}

async fn app() -> Router {
    app_with_pool().await.0
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_author(app: &Router, name: &str, email: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/authors",
        Some(json!({ "name": name, "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

async fn create_book(app: &Router, author_id: i64, title: &str, isbn: &str, year: i32) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        &format!("/api/authors/{author_id}/books"),
        Some(json!({ "title": title, "isbn": isbn, "publishedYear": year })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn author_lifecycle_cascades_to_books() {
    let app = app().await;

    let (status, author) = send(
        &app,
        Method::POST,
        "/api/authors",
        Some(json!({ "name": "Ada", "email": "ada@x.io" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(author["id"], 1);
    assert_eq!(author["name"], "Ada");
    assert_eq!(author["email"], "ada@x.io");

    let (status, book) = send(
        &app,
        Method::POST,
        "/api/authors/1/books",
        Some(json!({ "title": "Notes", "isbn": "9780000000001", "authorId": 99 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(book["authorId"], 1);
    let book_id = book["id"].as_i64().unwrap();

    let (status, author) = send(&app, Method::GET, "/api/authors/1", None).await;
    assert_eq!(status, StatusCode::OK);
    let books = author["books"].as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["isbn"], "9780000000001");

    let (status, body) = send(&app, Method::DELETE, "/api/authors/1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = send(&app, Method::GET, &format!("/api/books/{book_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Book not found" }));

    let (status, _) = send(&app, Method::GET, "/api/authors/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_author_reports_every_field() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/authors",
        Some(json!({ "name": "   ", "email": "nope", "birthYear": 1800 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Name cannot be empty"), "{message}");
    assert!(message.contains("Email must be valid"), "{message}");
    assert!(message.contains("Birth year must be 1900 or later"), "{message}");

    let (_, authors) = send(&app, Method::GET, "/api/authors", None).await;
    assert_eq!(authors, json!([]));
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let app = app().await;
    let first = create_author(&app, "Ada", "ada@x.io").await;
    let second = create_author(&app, "Grace", "grace@x.io").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/authors",
        Some(json!({ "name": "Imposter", "email": "ada@x.io" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({ "error": "Email already exists" }));

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/authors/{second}"),
        Some(json!({ "email": "ada@x.io" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, author) = send(
        &app,
        Method::PUT,
        &format!("/api/authors/{first}"),
        Some(json!({ "email": "ada@x.io" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(author["email"], "ada@x.io");
}

#[tokio::test]
async fn partial_update_keeps_untouched_fields() {
    let app = app().await;
    let (_, created) = send(
        &app,
        Method::POST,
        "/api/authors",
        Some(json!({ "name": "Ada", "email": "ada@x.io", "bio": "Mathematician", "birthYear": 1915 })),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/api/authors/{id}"),
        Some(json!({ "name": "Ada Lovelace" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Ada Lovelace");
    assert_eq!(updated["email"], "ada@x.io");
    assert_eq!(updated["bio"], "Mathematician");
    assert_eq!(updated["birthYear"], 1915);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/authors/{id}"),
        Some(json!({ "birthYear": 2100 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Birth year must be 2024 or earlier" }));

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/authors/999",
        Some(json!({ "name": "Nobody" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn short_isbn_is_rejected() {
    let app = app().await;
    let author_id = create_author(&app, "Ada", "ada@x.io").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/authors/{author_id}/books"),
        Some(json!({ "title": "Notes", "isbn": "short" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "ISBN must be exactly 13 characters" }));
}

#[tokio::test]
async fn duplicate_isbn_keeps_the_first_book() {
    let app = app().await;
    let author_id = create_author(&app, "Ada", "ada@x.io").await;
    let first = create_book(&app, author_id, "Notes", "9780000000001", 1843).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/authors/{author_id}/books"),
        Some(json!({ "title": "Copy", "isbn": "9780000000001" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({ "error": "ISBN already exists" }));

    let (_, books) = send(&app, Method::GET, &format!("/api/authors/{author_id}/books"), None).await;
    let books = books.as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["id"], first);
    assert_eq!(books[0]["title"], "Notes");
}

#[tokio::test]
async fn book_for_missing_author_is_not_found() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/authors/42/books",
        Some(json!({ "title": "Orphan", "isbn": "9780000000001" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Author not found" }));
}

#[tokio::test]
async fn unscoped_book_create_is_rejected() {
    let app = app().await;
    create_author(&app, "Ada", "ada@x.io").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/books",
        Some(json!({ "title": "Notes", "isbn": "9780000000001", "authorId": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("/api/authors/"));

    let (_, books) = send(&app, Method::GET, "/api/books", None).await;
    assert_eq!(books, json!([]));
}

#[tokio::test]
async fn books_filter_by_year_and_author_name() {
    let app = app().await;
    let ada = create_author(&app, "Ada Lovelace", "ada@x.io").await;
    let grace = create_author(&app, "Grace Hopper", "grace@x.io").await;
    create_book(&app, ada, "Notes", "9780000000001", 1843).await;
    create_book(&app, ada, "Letters", "9780000000002", 1850).await;
    create_book(&app, grace, "Manual", "9780000000003", 1843).await;

    let (status, books) = send(&app, Method::GET, "/api/books?year=1843", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books.as_array().unwrap().len(), 2);

    let (_, books) = send(&app, Method::GET, "/api/books?author=lovelace", None).await;
    let books = books.as_array().unwrap();
    assert_eq!(books.len(), 2);
    assert!(books.iter().all(|book| book["author"]["name"] == "Ada Lovelace"));

    let (_, books) = send(&app, Method::GET, "/api/books?year=1843&author=hopper", None).await;
    let books = books.as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["title"], "Manual");

    let (status, books) = send(&app, Method::GET, "/api/books?author=nobody", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books, json!([]));

    let (status, body) = send(&app, Method::GET, "/api/books?year=soon", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid year \"soon\"" }));
}

#[tokio::test]
async fn blank_filters_are_ignored() {
    let app = app().await;
    let ada = create_author(&app, "Ada Lovelace", "ada@x.io").await;
    let grace = create_author(&app, "Grace Hopper", "grace@x.io").await;
    create_book(&app, ada, "Notes", "9780000000001", 1843).await;
    create_book(&app, grace, "Manual", "9780000000002", 1944).await;

    let (status, books) = send(&app, Method::GET, "/api/books?year=&author=lovelace", None).await;
    assert_eq!(status, StatusCode::OK);
    let books = books.as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["title"], "Notes");

    let (status, books) = send(&app, Method::GET, "/api/books?year=&author=", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn listings_span_more_authors_than_sqlite_can_bind() {
    const COUNT: i64 = 33_000;
    let (app, pool) = app_with_pool().await;
    let now = chrono::Utc::now();
    sqlx::query(
        "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < ?) \
         INSERT INTO authors (name, email, created_at, updated_at) \
         SELECT 'Ann ' || i, 'ann' || i || '@x.io', ?, ? FROM n",
    )
    .bind(COUNT)
    .bind(now)
    .bind(now)
    .execute(&pool)
    .await
    .unwrap();
    create_book(&app, COUNT, "Notes", "9780000000001", 1843).await;

    let (status, authors) = send(&app, Method::GET, "/api/authors?includeBooks=true", None).await;
    assert_eq!(status, StatusCode::OK);
    let authors = authors.as_array().unwrap();
    assert_eq!(authors.len(), COUNT as usize);
    assert_eq!(authors[authors.len() - 1]["books"][0]["title"], "Notes");

    let (status, books) = send(&app, Method::GET, "/api/books?author=ann", None).await;
    assert_eq!(status, StatusCode::OK);
    let books = books.as_array().unwrap();
    assert_eq!(books.len(), 1);
    assert_eq!(books[0]["author"]["id"], COUNT);
}

#[tokio::test]
async fn books_by_author_name_requires_a_match() {
    let app = app().await;
    let ada = create_author(&app, "Ada Lovelace", "ada@x.io").await;
    create_book(&app, ada, "Notes", "9780000000001", 1843).await;

    let (status, books) = send(&app, Method::GET, "/api/books/author/Lovelace", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::GET, "/api/books/author/Hopper", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body,
        json!({ "error": "No books found for author matching \"Hopper\"" })
    );

    let (status, _) = send(&app, Method::GET, "/api/books/author/%20", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_book_validates_author_and_isbn() {
    let app = app().await;
    let ada = create_author(&app, "Ada", "ada@x.io").await;
    let grace = create_author(&app, "Grace", "grace@x.io").await;
    let book = create_book(&app, ada, "Notes", "9780000000001", 1843).await;
    create_book(&app, grace, "Manual", "9780000000002", 1944).await;

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/api/books/{book}"),
        Some(json!({ "authorId": grace })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["authorId"], grace);
    assert_eq!(updated["title"], "Notes");

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/books/{book}"),
        Some(json!({ "authorId": 999 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid authorId" }));

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/books/{book}"),
        Some(json!({ "isbn": "9780000000002" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/books/{book}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, &format!("/api/books/{book}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_authors_can_embed_books() {
    let app = app().await;
    let ada = create_author(&app, "Ada", "ada@x.io").await;
    create_author(&app, "Grace", "grace@x.io").await;
    create_book(&app, ada, "Notes", "9780000000001", 1843).await;

    let (_, authors) = send(&app, Method::GET, "/api/authors", None).await;
    let authors = authors.as_array().unwrap();
    assert_eq!(authors.len(), 2);
    assert!(authors[0].get("books").is_none());

    let (_, authors) = send(&app, Method::GET, "/api/authors?includeBooks=true", None).await;
    let authors = authors.as_array().unwrap();
    assert_eq!(authors[0]["books"].as_array().unwrap().len(), 1);
    assert_eq!(authors[1]["books"], json!([]));
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let app = app().await;

    let (status, _) = send(&app, Method::GET, "/api/authors/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/authors")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/authors",
        Some(json!({ "name": "Ada", "email": "ada@x.io", "birthYear": "1950" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid value for \"birthYear\"" }));

    let (status, body) = send(&app, Method::GET, "/nowhere", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Route not found" }));
}
