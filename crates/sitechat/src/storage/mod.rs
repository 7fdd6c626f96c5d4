//! Collection storage: per-collection vector indexes and the registry that
//! owns them

mod collection;
mod registry;

pub use collection::{CollectionIndex, IndexState};
pub use registry::{validate_name, CollectionRegistry};
