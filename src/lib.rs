//! docstore - documents over pluggable blob backends
//!
//! The [`document_store`] module holds the store contract, the document
//! entity model and the backends; [`cli`] is a thin command-line surface.

pub mod cli;
pub mod document_store;
