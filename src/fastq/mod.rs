//! Read-length statistics for FASTQ files.
pub mod length;
