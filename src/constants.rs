// --- GTF annotation ---

/// Column layout of a GTF feature row.
pub const GTF_COLUMNS: [&str; 9] = [
    "chr", "source", "type", "start", "end", "score", "strand", "phase", "attributes",
];

/// Attribute keys projected into the annotation output, in output order.
pub const ANNOTATION_KEYS: [&str; 5] = ["gene_id", "transcript_id", "exon_number", "exon_id", "gene_name"];

/// Header labels for the projected keys. `exon_number ` keeps its trailing
/// space so existing downstream parsers keep matching the header.
pub const ANNOTATION_HEADER_LABELS: [&str; 5] = ["gene_id", "transcript_id", "exon_number ", "exon_id", "gene_name"];

/// Value written for a recognised key that is absent.
pub const PLACEHOLDER: &str = ".";

// --- Ensembl REST ---
pub const DEFAULT_ENSEMBL_REST_URL: &str = "https://rest.ensembl.org";
pub const ENSEMBL_REST_URL_ENV: &str = "ENSEMBL_REST_URL";
pub const VARIANT_INFO_HEADER: [&str; 5] = ["Variant ID", "Alleles", "Location", "Effects", "Gene"];

// --- Banners ---
pub const BANNER_OPEN: &str = ">>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>";
pub const BANNER_CLOSE: &str = "<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<";
