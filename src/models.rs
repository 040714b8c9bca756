mod author;
mod book;
mod validation;

pub use author::{
    Author, AuthorFilter, AuthorName, AuthorNameError, AuthorPatch, AuthorPayload,
    AuthorWithBooks, BirthYear, BirthYearError, CreateAuthorError, CreateAuthorRequest,
    DeleteAuthorError, DeleteAuthorRequest, EmailAddress, EmailAddressError, FindAuthorError,
    FindAuthorRequest, FindAuthorsError, FindAuthorsRequest, MAX_AUTHOR_NAME_LEN, MAX_BIRTH_YEAR,
    MIN_BIRTH_YEAR, UpdateAuthorError, UpdateAuthorRequest,
};
pub use book::{
    Book, BookFilter, BookPatch, BookPayload, BookTitle, BookTitleError, BookWithAuthor,
    CreateBookError, CreateBookRequest, DeleteBookError, DeleteBookRequest, FindBookError,
    FindBookRequest, FindBooksByAuthorError, FindBooksError, FindBooksRequest, ISBN_LEN, Isbn,
    IsbnError, MAX_BOOK_TITLE_LEN, UpdateBookError, UpdateBookRequest,
};
pub use validation::ValidationError;
