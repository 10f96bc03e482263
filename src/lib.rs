pub mod executor;
pub mod extract;
pub mod fetch;
pub mod model;
pub mod traits;

// Re-export common types for convenience
pub use executor::*;
pub use extract::{ExtractError, ExtractOptions, Extraction, PersistError, SqlExtractor};
pub use model::*;
pub use traits::*;
