pub mod catalog;
pub mod error;
pub mod lookup;

pub use catalog::MovieCatalog;
pub use error::StoreError;
pub use lookup::Lookup;
