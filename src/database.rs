use crate::models::{
    Author, AuthorFilter, AuthorName, AuthorWithBooks, BirthYear, Book, BookTitle, BookWithAuthor,
    CreateAuthorError, CreateAuthorRequest, CreateBookError, CreateBookRequest, DeleteAuthorError,
    DeleteAuthorRequest, DeleteBookError, DeleteBookRequest, EmailAddress, FindAuthorError,
    FindAuthorRequest, FindAuthorsError, FindAuthorsRequest, FindBookError, FindBookRequest,
    FindBooksError, FindBooksRequest, Isbn, UpdateAuthorError, UpdateAuthorRequest,
    UpdateBookError, UpdateBookRequest,
};
use crate::repositories::{AuthorRepository, BookRepository};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;
use std::str::FromStr;

static MIGRATOR: Migrator = sqlx::migrate!();

/// Most ids bound into one `IN (...)` list. Kept below SQLite's limit on
/// bound parameters per statement.
const MAX_BOUND_IDS: usize = 500;

pub async fn establish_pool(path: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(path)
        .with_context(|| format!("Invalid database path {path}"))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(opts)
        .await
        .with_context(|| format!("Failed to open database at {path}"))?;

    MIGRATOR
        .run(&pool)
        .await
        .context("Failed to apply database migrations")?;

    Ok(pool)
}

impl<'r> FromRow<'r, SqliteRow> for Author {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let name = row.try_get("name")?;
        let email = row.try_get("email")?;
        let bio = row.try_get("bio")?;
        let birth_year: Option<i32> = row.try_get("birth_year")?;
        let created_at = row.try_get("created_at")?;
        let updated_at = row.try_get("updated_at")?;

        let name = AuthorName::new_unchecked(name);
        let email = EmailAddress::new_unchecked(email);
        let birth_year = birth_year.map(BirthYear::new_unchecked);
        Ok(Self::new(
            id, name, email, bio, birth_year, created_at, updated_at,
        ))
    }
}

impl<'r> FromRow<'r, SqliteRow> for Book {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let title = row.try_get("title")?;
        let isbn = row.try_get("isbn")?;
        let published_year = row.try_get("published_year")?;
        let author_id = row.try_get("author_id")?;
        let created_at = row.try_get("created_at")?;
        let updated_at = row.try_get("updated_at")?;

        let title = BookTitle::new_unchecked(title);
        let isbn = Isbn::new_unchecked(isbn);
        Ok(Self::new(
            id,
            title,
            isbn,
            published_year,
            author_id,
            created_at,
            updated_at,
        ))
    }
}

#[derive(Debug, Clone)]
pub struct SqliteAuthorRepository {
    pool: SqlitePool,
}

impl SqliteAuthorRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorRepository for SqliteAuthorRepository {
    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Author, CreateAuthorError> {
        let now = Utc::now();
        let author = sqlx::query_as(
            "INSERT INTO authors (name, email, bio, birth_year, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(req.name().as_str())
        .bind(req.email().as_str())
        .bind(req.bio())
        .bind(req.birth_year().map(BirthYear::value))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                CreateAuthorError::Duplicate {
                    email: req.email().to_string(),
                }
            } else {
                let err = anyhow!(err).context(format!(
                    r#"Failed to create author with email "{}""#,
                    req.email()
                ));
                CreateAuthorError::Other(err)
            }
        })?;

        Ok(author)
    }

    async fn find_author(
        &self,
        req: &FindAuthorRequest,
    ) -> Result<AuthorWithBooks, FindAuthorError> {
        let fail = |err: sqlx::Error| {
            let err = anyhow!(err).context(format!(
                r#"Failed to retrieve author with id "{}""#,
                req.id()
            ));
            FindAuthorError::Other(err)
        };

        let author: Author = sqlx::query_as("SELECT * FROM authors WHERE id = ?")
            .bind(req.id())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if matches!(err, sqlx::Error::RowNotFound) {
                    FindAuthorError::NotFound { id: req.id() }
                } else {
                    fail(err)
                }
            })?;

        let books = if req.include_books() {
            Some(select_books_of(&self.pool, &[author.id()]).await.map_err(fail)?)
        } else {
            None
        };

        Ok(AuthorWithBooks::new(author, books))
    }

    async fn find_authors(
        &self,
        req: &FindAuthorsRequest,
    ) -> Result<Vec<AuthorWithBooks>, FindAuthorsError> {
        let fail = |err: sqlx::Error| {
            let err = anyhow!(err).context("Failed to retrieve authors");
            FindAuthorsError(err)
        };

        let filter = req.filter();
        let mut authors: Vec<Author> =
            fetch_by_ids(&self.pool, filter.ids.as_deref(), |ids| author_query(filter, ids))
                .await
                .map_err(fail)?;
        authors.sort_unstable_by_key(Author::id);

        if !req.include_books() {
            return Ok(authors
                .into_iter()
                .map(|author| AuthorWithBooks::new(author, None))
                .collect());
        }

        let books = if filter.name_contains.is_none() && filter.ids.is_none() {
            fetch_by_ids(&self.pool, None, |_| book_query(None, None))
                .await
                .map_err(fail)?
        } else {
            let ids: Vec<i64> = authors.iter().map(Author::id).collect();
            select_books_of(&self.pool, &ids).await.map_err(fail)?
        };

        let mut books_by_author: HashMap<i64, Vec<Book>> = HashMap::new();
        for book in books {
            books_by_author
                .entry(book.author_id())
                .or_default()
                .push(book);
        }

        Ok(authors
            .into_iter()
            .map(|author| {
                let books = books_by_author.remove(&author.id()).unwrap_or_default();
                AuthorWithBooks::new(author, Some(books))
            })
            .collect())
    }

    async fn update_author(&self, req: &UpdateAuthorRequest) -> Result<Author, UpdateAuthorError> {
        if req.is_empty() {
            let found = self.find_author(&FindAuthorRequest::new(req.id())).await?;
            return Ok(found.into_parts().0);
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE authors SET ");
        let mut parts = query.separated(", ");

        if let Some(name) = req.name() {
            parts.push("name = ").push_bind_unseparated(name.to_string());
        }
        if let Some(email) = req.email() {
            parts.push("email = ").push_bind_unseparated(email.to_string());
        }
        if let Some(bio) = req.bio() {
            parts.push("bio = ").push_bind_unseparated(bio.to_string());
        }
        if let Some(birth_year) = req.birth_year() {
            parts
                .push("birth_year = ")
                .push_bind_unseparated(birth_year.value());
        }
        parts.push("updated_at = ").push_bind_unseparated(Utc::now());

        query
            .push(" WHERE id = ")
            .push_bind(req.id())
            .push(" RETURNING *");

        let author: Option<Author> = query
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    UpdateAuthorError::Duplicate {
                        email: req.email().map(ToString::to_string).unwrap_or_default(),
                    }
                } else {
                    let err = anyhow!(err)
                        .context(format!(r#"Failed to update author with id "{}""#, req.id()));
                    UpdateAuthorError::Other(err)
                }
            })?;

        author.ok_or(UpdateAuthorError::NotFound { id: req.id() })
    }

    async fn delete_author_cascade(
        &self,
        req: &DeleteAuthorRequest,
    ) -> Result<(), DeleteAuthorError> {
        let fail = |err: sqlx::Error| {
            let err = anyhow!(err).context(format!(
                r#"Failed to delete author with id "{}""#,
                req.id()
            ));
            DeleteAuthorError::Other(err)
        };

        let mut tx = self.pool.begin().await.map_err(fail)?;

        sqlx::query("DELETE FROM books WHERE author_id = ?")
            .bind(req.id())
            .execute(&mut *tx)
            .await
            .map_err(fail)?;

        let deleted = sqlx::query("DELETE FROM authors WHERE id = ?")
            .bind(req.id())
            .execute(&mut *tx)
            .await
            .map_err(fail)?;

        if deleted.rows_affected() == 0 {
            return Err(DeleteAuthorError::NotFound { id: req.id() });
        }

        tx.commit().await.map_err(fail)?;

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SqliteBookRepository {
    pool: SqlitePool,
}

impl SqliteBookRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    async fn create_book(&self, req: &CreateBookRequest) -> Result<Book, CreateBookError> {
        let now = Utc::now();
        let book = sqlx::query_as(
            "INSERT INTO books (title, isbn, published_year, author_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(req.title().as_str())
        .bind(req.isbn().as_str())
        .bind(req.published_year())
        .bind(req.author_id())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                CreateBookError::Duplicate {
                    isbn: req.isbn().to_string(),
                }
            } else if is_foreign_key_violation(&err) {
                CreateBookError::AuthorNotFound {
                    author_id: req.author_id(),
                }
            } else {
                let err = anyhow!(err).context(format!(
                    r#"Failed to create book with ISBN "{}""#,
                    req.isbn()
                ));
                CreateBookError::Other(err)
            }
        })?;

        Ok(book)
    }

    async fn find_book(&self, req: &FindBookRequest) -> Result<BookWithAuthor, FindBookError> {
        let fail = |err: sqlx::Error| {
            let err = anyhow!(err).context(format!(
                r#"Failed to retrieve book with id "{}""#,
                req.id()
            ));
            FindBookError::Other(err)
        };

        let book: Book = sqlx::query_as("SELECT * FROM books WHERE id = ?")
            .bind(req.id())
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if matches!(err, sqlx::Error::RowNotFound) {
                    FindBookError::NotFound { id: req.id() }
                } else {
                    fail(err)
                }
            })?;

        let author = if req.include_author() {
            let author: Author = sqlx::query_as("SELECT * FROM authors WHERE id = ?")
                .bind(book.author_id())
                .fetch_one(&self.pool)
                .await
                .map_err(fail)?;
            Some(author)
        } else {
            None
        };

        Ok(BookWithAuthor::new(book, author))
    }

    async fn find_books(
        &self,
        req: &FindBooksRequest,
    ) -> Result<Vec<BookWithAuthor>, FindBooksError> {
        let fail = |err: sqlx::Error| {
            let err = anyhow!(err).context("Failed to retrieve books");
            FindBooksError(err)
        };

        let filter = req.filter();
        let mut books: Vec<Book> = fetch_by_ids(&self.pool, filter.author_ids.as_deref(), |ids| {
            book_query(filter.published_year, ids)
        })
        .await
        .map_err(fail)?;
        books.sort_unstable_by_key(Book::id);

        if !req.include_author() {
            return Ok(books
                .into_iter()
                .map(|book| BookWithAuthor::new(book, None))
                .collect());
        }

        let mut author_ids: Vec<i64> = books.iter().map(Book::author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors: HashMap<i64, Author> = select_authors(&self.pool, &author_ids)
            .await
            .map_err(fail)?
            .into_iter()
            .map(|author| (author.id(), author))
            .collect();

        Ok(books
            .into_iter()
            .map(|book| {
                let author = authors.get(&book.author_id()).cloned();
                BookWithAuthor::new(book, author)
            })
            .collect())
    }

    async fn update_book(&self, req: &UpdateBookRequest) -> Result<Book, UpdateBookError> {
        if req.is_empty() {
            let found = self.find_book(&FindBookRequest::new(req.id())).await?;
            return Ok(found.into_parts().0);
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE books SET ");
        let mut parts = query.separated(", ");

        if let Some(title) = req.title() {
            parts.push("title = ").push_bind_unseparated(title.to_string());
        }
        if let Some(isbn) = req.isbn() {
            parts.push("isbn = ").push_bind_unseparated(isbn.to_string());
        }
        if let Some(published_year) = req.published_year() {
            parts
                .push("published_year = ")
                .push_bind_unseparated(published_year);
        }
        if let Some(author_id) = req.author_id() {
            parts.push("author_id = ").push_bind_unseparated(author_id);
        }
        parts.push("updated_at = ").push_bind_unseparated(Utc::now());

        query
            .push(" WHERE id = ")
            .push_bind(req.id())
            .push(" RETURNING *");

        let book: Option<Book> = query
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    UpdateBookError::Duplicate {
                        isbn: req.isbn().map(ToString::to_string).unwrap_or_default(),
                    }
                } else if is_foreign_key_violation(&err) {
                    UpdateBookError::UnknownAuthor {
                        author_id: req.author_id().unwrap_or_default(),
                    }
                } else {
                    let err = anyhow!(err)
                        .context(format!(r#"Failed to update book with id "{}""#, req.id()));
                    UpdateBookError::Other(err)
                }
            })?;

        book.ok_or(UpdateBookError::NotFound { id: req.id() })
    }

    async fn delete_book(&self, req: &DeleteBookRequest) -> Result<(), DeleteBookError> {
        let deleted = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(req.id())
            .execute(&self.pool)
            .await
            .map_err(|err| {
                let err = anyhow!(err)
                    .context(format!(r#"Failed to delete book with id "{}""#, req.id()));
                DeleteBookError::Other(err)
            })?;

        if deleted.rows_affected() == 0 {
            return Err(DeleteBookError::NotFound { id: req.id() });
        }

        Ok(())
    }
}

async fn select_books_of(pool: &SqlitePool, author_ids: &[i64]) -> Result<Vec<Book>, sqlx::Error> {
    let mut books: Vec<Book> =
        fetch_by_ids(pool, Some(author_ids), |ids| book_query(None, ids)).await?;
    books.sort_unstable_by_key(Book::id);
    Ok(books)
}

async fn select_authors(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Author>, sqlx::Error> {
    let unfiltered = AuthorFilter::default();
    fetch_by_ids(pool, Some(ids), |ids| author_query(&unfiltered, ids)).await
}

fn author_query(filter: &AuthorFilter, ids: Option<&[i64]>) -> QueryBuilder<'static, Sqlite> {
    let mut query = QueryBuilder::new("SELECT * FROM authors WHERE 1 = 1");
    if let Some(name) = &filter.name_contains {
        query
            .push(" AND instr(lower(name), lower(")
            .push_bind(name.clone())
            .push(")) > 0");
    }
    if let Some(ids) = ids {
        push_id_set(&mut query, "id", ids);
    }
    query.push(" ORDER BY id");
    query
}

fn book_query(
    published_year: Option<i32>,
    author_ids: Option<&[i64]>,
) -> QueryBuilder<'static, Sqlite> {
    let mut query = QueryBuilder::new("SELECT * FROM books WHERE 1 = 1");
    if let Some(year) = published_year {
        query.push(" AND published_year = ").push_bind(year);
    }
    if let Some(author_ids) = author_ids {
        push_id_set(&mut query, "author_id", author_ids);
    }
    query.push(" ORDER BY id");
    query
}

/// Runs the query from `build` and collects its rows. A set of ids is bound
/// [`MAX_BOUND_IDS`] at a time with one query per slice, so rows are ordered
/// within a slice only. An empty set runs no query at all.
async fn fetch_by_ids<T, F>(
    pool: &SqlitePool,
    ids: Option<&[i64]>,
    build: F,
) -> Result<Vec<T>, sqlx::Error>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    F: Fn(Option<&[i64]>) -> QueryBuilder<'static, Sqlite>,
{
    let Some(ids) = ids else {
        let mut query = build(None);
        return query.build_query_as().fetch_all(pool).await;
    };

    let mut rows = Vec::new();
    for slice in ids.chunks(MAX_BOUND_IDS) {
        let mut query = build(Some(slice));
        rows.extend(query.build_query_as::<T>().fetch_all(pool).await?);
    }
    Ok(rows)
}

/// Appends `AND <column> IN (...)`. An empty set matches no rows.
fn push_id_set(query: &mut QueryBuilder<'_, Sqlite>, column: &str, ids: &[i64]) {
    if ids.is_empty() {
        query.push(" AND 0 = 1");
        return;
    }

    query.push(format!(" AND {column} IN ("));
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.is_unique_violation();
    }

    false
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.is_foreign_key_violation();
    }

    false
}
