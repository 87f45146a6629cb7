use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use dfci_analysis::config::{default_num_cpus, ensembl_rest_url, Operation, RunConfig};
use dfci_analysis::constants::{BANNER_CLOSE, BANNER_OPEN};
use dfci_analysis::ensembl::retriever::EnsemblVariantInfoRetriever;
use dfci_analysis::fasta::frequency;
use dfci_analysis::fastq::length::{self, format_length_table, DEFAULT_THRESHOLD};
use dfci_analysis::gtf::annotator::GtfAnnotation;
use dfci_analysis::interval::summary::{IntervalSummary, DEFAULT_BINS};
use dfci_analysis::utils::io::open_file_for_writing;
use log::info;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// DFCI analysis toolkit: exploratory analysis of FASTA, FASTQ, GTF and interval files.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of worker threads (default: available cores - 1, at least 1)
    #[arg(short = 'c', long = "cpu", global = true)]
    cpu: Option<usize>,

    /// Output directory. Must already exist. Without it, table results are
    /// printed to stdout and file results go to the current directory.
    #[arg(short = 'o', long = "output", global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find the most frequent sequences in FASTA files
    #[command(alias = "find_most_frequent_sequences")]
    FindMostFrequentSequences {
        /// A FASTA file or a directory searched recursively for .fasta files
        path: PathBuf,

        /// Number of most frequent sequences to report
        #[arg(short = 'n', long = "n-top", default_value_t = 10)]
        n_top: usize,
    },

    /// Percentage of reads longer than a threshold in FASTQ files
    #[command(alias = "count_reads_length_glt_threshold")]
    CountReadsLengthGltThreshold {
        /// A FASTQ file or a directory searched recursively for .fastq files
        path: PathBuf,

        /// Minimum nucleotide length (exclusive)
        #[arg(short = 't', long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: usize,
    },

    /// Annotate chromosome positions against a GTF file
    Annotation {
        /// Two-column (chromosome, position) file without header
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// GTF knowledge base file
        #[arg(short = 'k', long)]
        knowledge: PathBuf,

        /// Minimum number of partitions handed to a worker at once
        #[arg(long, default_value_t = 1)]
        chunk_size: usize,
    },

    /// Mean target coverage per bin of a fractional column
    #[command(alias = "interval_summary")]
    IntervalSummary {
        /// Tab-separated interval table with a header row
        path: PathBuf,

        /// Column to bin on, e.g. '%gc'
        #[arg(short = 'g', long)]
        group_by_key: String,

        /// Number of equal-width bins over (0, 1]
        #[arg(short = 'b', long, default_value_t = DEFAULT_BINS)]
        bins: usize,
    },

    /// Fetch variant and transcript metadata from Ensembl
    #[command(alias = "variant_info")]
    VariantInfo {
        /// CSV file of variant IDs
        path: PathBuf,

        /// Species name used by the VEP endpoint
        #[arg(short = 's', long, default_value = "human")]
        species: String,

        /// Treat failed requests as missing data instead of stopping
        #[arg(long, action = clap::ArgAction::SetTrue)]
        skip_bad_call: bool,
    },
}

impl Commands {
    fn operation(&self) -> Operation {
        match self {
            Commands::FindMostFrequentSequences { .. } => Operation::FindMostFrequentSequences,
            Commands::CountReadsLengthGltThreshold { .. } => Operation::CountLongReads,
            Commands::Annotation { .. } => Operation::Annotation,
            Commands::IntervalSummary { .. } => Operation::IntervalSummary,
            Commands::VariantInfo { .. } => Operation::VariantInfo,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let operation = cli.command.operation();
    let config = RunConfig::new(operation, cli.cpu.unwrap_or_else(default_num_cpus), cli.output.clone())?;

    println!("{}", BANNER_OPEN);
    println!("DFCI analysis toolkit: {}", operation);
    println!("Started at {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("Workers: {}", config.num_workers);
    println!("{}", BANNER_CLOSE);

    let start = Instant::now();
    match cli.command {
        Commands::FindMostFrequentSequences { path, n_top } => run_frequency(&path, n_top, &config)?,
        Commands::CountReadsLengthGltThreshold { path, threshold } => run_length_threshold(&path, threshold, &config)?,
        Commands::Annotation {
            input,
            knowledge,
            chunk_size,
        } => run_annotation(&input, &knowledge, &config.with_chunk_size(chunk_size))?,
        Commands::IntervalSummary {
            path,
            group_by_key,
            bins,
        } => run_interval_summary(&path, &group_by_key, bins, &config)?,
        Commands::VariantInfo {
            path,
            species,
            skip_bad_call,
        } => run_variant_info(&path, &species, skip_bad_call, &config)?,
    }

    info!("{} completed in {:.2?}", operation, start.elapsed());
    Ok(())
}

fn write_table(path: &Path, table: &str) -> Result<()> {
    let mut writer = open_file_for_writing(path)?;
    writeln!(writer, "{}", table).with_context(|| format!("Failed to write {}", path.display()))?;
    writer.flush().with_context(|| format!("Failed to flush {}", path.display()))?;
    println!("Results written to {}", path.display());
    Ok(())
}

fn run_frequency(path: &Path, n_top: usize, config: &RunConfig) -> Result<()> {
    let results = frequency::analyze(path, n_top, config)?;
    for result in &results {
        let table = result.to_table();
        match &config.output_dir {
            Some(_) => {
                let out = config.output_path_for(&result.file, &format!(".frequency_count_top_{}.tsv", n_top));
                write_table(&out, &table)?;
            }
            None => {
                println!("{}", BANNER_OPEN);
                println!("Top {} Most Frequent sequences", n_top);
                println!("File: {}:", result.file.display());
                println!("{}", table);
                println!("{}", BANNER_CLOSE);
            }
        }
    }
    Ok(())
}

fn run_length_threshold(path: &Path, threshold: usize, config: &RunConfig) -> Result<()> {
    let results = length::analyze(path, threshold, config)?;
    let table = format_length_table(&results);
    match &config.output_dir {
        Some(dir) => write_table(&dir.join("fastq_reads_length_lgt_threshold.tsv"), &table)?,
        None => {
            println!("{}", BANNER_OPEN);
            println!(
                "The percent of sequences in that file that are greater than {} nucleotides long:",
                threshold
            );
            println!("{}", table);
            println!("{}", BANNER_CLOSE);
        }
    }
    Ok(())
}

fn run_annotation(input: &Path, knowledge: &Path, config: &RunConfig) -> Result<()> {
    let output_file = config.output_path_for(input, ".annotation.tsv");
    let annotation = GtfAnnotation::new(input, knowledge, output_file, config)?;
    println!(
        "Annotating {} positions against {} features from {}",
        annotation.positions.len(),
        annotation.table.len(),
        annotation.knowledge_file.display()
    );
    let rows = annotation.annotate_all_positions()?;
    println!("{}", BANNER_OPEN);
    println!("Annotation rows: {}", rows);
    println!("Results written to {}", annotation.output_file.display());
    println!("{}", BANNER_CLOSE);
    Ok(())
}

fn run_interval_summary(path: &Path, group_by_key: &str, bins: usize, config: &RunConfig) -> Result<()> {
    let summary = IntervalSummary::new(path, group_by_key, bins)?;
    let output_file = config.output_path_for(path, ".interval_summary.tsv");
    summary.process_data(&output_file)?;
    println!("Results written to {}", output_file.display());
    Ok(())
}

fn run_variant_info(path: &Path, species: &str, skip_bad_call: bool, config: &RunConfig) -> Result<()> {
    let output_file = config.output_path_for(path, ".variant_info.tsv");
    let retriever = EnsemblVariantInfoRetriever::new(species, path, output_file, skip_bad_call, &ensembl_rest_url())?;
    let rows = retriever.fetch_and_write_variant_info()?;
    println!("Variant rows: {}", rows);
    Ok(())
}
