//! Document loading: local files, sitemap crawling and chunking

mod chunker;
mod loader;
mod parser;
pub mod sitemap;

pub use chunker::TextChunker;
pub use loader::DocumentLoader;
pub use parser::{FileParser, ParsedFile};
pub(crate) use parser::selector;
pub use sitemap::{DomainFilter, SitemapLoader};
