mod authors;
mod books;
pub mod handler;

use crate::repositories::{AuthorRepository, BookRepository};
use crate::services::{AuthorService, BookService};
use anyhow::Context;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Debug)]
pub struct AppState<AR, BR> {
    author_service: Arc<AuthorService<AR, BR>>,
    book_service: Arc<BookService<AR, BR>>,
}

impl<AR: AuthorRepository, BR: BookRepository> AppState<AR, BR> {
    pub fn new(author_repo: Arc<AR>, book_repo: Arc<BR>) -> Self {
        Self {
            author_service: Arc::new(AuthorService::new(
                Arc::clone(&author_repo),
                Arc::clone(&book_repo),
            )),
            book_service: Arc::new(BookService::new(author_repo, book_repo)),
        }
    }
}

impl<AR, BR> Clone for AppState<AR, BR> {
    fn clone(&self) -> Self {
        Self {
            author_service: Arc::clone(&self.author_service),
            book_service: Arc::clone(&self.book_service),
        }
    }
}

#[derive(Debug)]
pub struct HttpServerConfig {
    port: u16,
}

impl HttpServerConfig {
    pub const fn new(port: u16) -> Self {
        Self { port }
    }
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new<AR: AuthorRepository, BR: BookRepository>(
        state: AppState<AR, BR>,
        config: HttpServerConfig,
    ) -> anyhow::Result<Self> {
        let router = router(state);

        let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port))
            .await
            .with_context(|| format!("Failed to bind to port {}", config.port))?;

        Ok(Self { router, listener })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        info!(
            address = %self.listener.local_addr()?,
            "Listening for HTTP requests"
        );
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Received error from running server")?;
        Ok(())
    }
}

/// The full application router, with every route mounted under `/api`.
pub fn router<AR: AuthorRepository, BR: BookRepository>(state: AppState<AR, BR>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .fallback(handler::route_not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes<AR: AuthorRepository, BR: BookRepository>() -> Router<AppState<AR, BR>> {
    Router::new()
        .route(
            "/authors",
            get(authors::list_authors::<AR, BR>).post(authors::create_author::<AR, BR>),
        )
        .route(
            "/authors/{id}",
            get(authors::get_author::<AR, BR>)
                .put(authors::update_author::<AR, BR>)
                .delete(authors::delete_author::<AR, BR>),
        )
        .route(
            "/authors/{id}/books",
            get(authors::list_author_books::<AR, BR>).post(authors::create_author_book::<AR, BR>),
        )
        .route(
            "/books",
            get(books::list_books::<AR, BR>).post(books::reject_unscoped_book),
        )
        .route(
            "/books/{id}",
            get(books::get_book::<AR, BR>)
                .put(books::update_book::<AR, BR>)
                .delete(books::delete_book::<AR, BR>),
        )
        .route(
            "/books/author/{last_name}",
            get(books::list_books_by_author_name::<AR, BR>),
        )
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(%err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
