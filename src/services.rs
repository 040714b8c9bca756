mod author_service;
mod book_service;

pub use author_service::AuthorService;
pub use book_service::{BookService, ListBooksQuery};
