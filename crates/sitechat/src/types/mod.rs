//! Core types shared across the crate

pub mod api;
pub mod document;

pub use api::{
    InitializeRequest, QueryRequest, QueryResponse, SitemapRequest, SitemapResponse,
    StatusResponse,
};
pub use document::{Chunk, Document, FileType, ScoredChunk, SOURCE_KEY};
