//! Repository modules for database operations

pub mod documents;
pub mod progress;

pub use documents::DocumentRepository;
pub use progress::ProgressRepository;
