//! Variant and transcript metadata from the Ensembl REST service.
pub mod retriever;
