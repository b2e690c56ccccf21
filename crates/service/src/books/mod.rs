pub mod domain;
pub mod service;
pub mod store;

pub use domain::{Book, BookCollection, BookPayload};
pub use service::{AuthorCount, BookService, BookStats};
pub use store::CollectionStore;
