//! Position annotation against a GTF feature table.
pub mod annotator;
pub mod attributes;
pub mod feature;
