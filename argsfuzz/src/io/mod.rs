//! I/O for the generator: config documents, settings, filesystem, corpus.

pub mod corpus;
pub mod document_store;
pub mod fs;
pub mod settings;
