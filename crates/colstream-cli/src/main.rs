//! colstream CLI: validate a reader configuration, inspect the bound columns,
//! or dump rows as NDJSON/CSV.

use std::fs::{self, File};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use colstream_core::config::ReaderConfig;
use colstream_core::hash::RowDigest;
use colstream_core::types::RowBatch;
use colstream_io::writers::{CsvWriter, JsonlWriter};
use colstream_reader::{ColumnReader, RowRecord};

#[derive(Parser)]
#[command(name = "colstream")]
#[command(about = "Stream rows out of chunked column stores", long_about = None)]
struct Cli {
    /// Log at trace level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a configuration binds cleanly to its store
    Validate(SourceArgs),

    /// Show the resolved columns of a configuration
    Inspect {
        #[command(flatten)]
        source: SourceArgs,

        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write rows to stdout or a file
    Dump {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, value_enum, default_value_t = Format::Jsonl)]
        format: Format,

        /// Consume rows one at a time or in batches
        #[arg(long, value_enum, default_value_t = Mode::Bulk)]
        mode: Mode,

        /// Stop after this many rows
        #[arg(long)]
        limit: Option<u64>,

        /// Output file (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Reader configuration (YAML, or JSON with a .json extension)
    #[arg(short, long)]
    config: PathBuf,

    /// Store location (overrides config and COLSTREAM_STORE)
    #[arg(long)]
    store: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Jsonl,
    Csv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Pull,
    Bulk,
}

fn main() {
    let cli = Cli::parse();
    setup_logger(default_env_filter(cli.verbose));

    let result = match cli.command {
        Commands::Validate(source) => validate(&source),
        Commands::Inspect { source, json } => inspect(&source, json),
        Commands::Dump {
            source,
            format,
            mode,
            limit,
            output,
        } => dump(&source, format, mode, limit, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn setup_logger(filter: EnvFilter) {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_level(true)
        .with_target(false)
        .with_env_filter(filter)
        .with_ansi(io::stderr().is_terminal())
        .init();
}

fn default_env_filter(verbose: bool) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let level = if verbose {
                LevelFilter::TRACE
            } else {
                LevelFilter::INFO
            };
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy()
        }
    }
}

/// Configuration file, then environment, then command-line overrides.
fn load_config(source: &SourceArgs) -> Result<ReaderConfig, Box<dyn std::error::Error>> {
    let doc = fs::read_to_string(&source.config)
        .map_err(|e| format!("read {}: {e}", source.config.display()))?;
    let config = parse_config(&source.config, &doc)?.with_env_overrides();
    Ok(match &source.store {
        Some(store) => config.with_store(store.clone()),
        None => config,
    })
}

fn parse_config(path: &Path, doc: &str) -> colstream_core::Result<ReaderConfig> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => ReaderConfig::from_json_str(doc),
        _ => ReaderConfig::from_yaml_str(doc),
    }
}

fn open_reader(
    source: &SourceArgs,
) -> Result<(ColumnReader, ReaderConfig), Box<dyn std::error::Error>> {
    let config = load_config(source)?;
    let mut layout = RowBatch::new();
    let reader = ColumnReader::open(&config, &mut layout)?;
    Ok((reader, config))
}

fn validate(source: &SourceArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (mut reader, _) = open_reader(source)?;
    let columns = reader.descriptors().count();
    let rows = reader.total_rows();
    reader.done()?;
    println!("✓ Configuration is valid: {columns} columns, {rows} rows");
    Ok(())
}

fn inspect(source: &SourceArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (mut reader, config) = open_reader(source)?;
    if json {
        let descriptors: Vec<_> = reader.descriptors().collect();
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
    } else {
        println!("Store: {}", config.store_location()?);
        println!("Rows:  {}", reader.total_rows());
        println!();
        println!(
            "{:<16} {:<24} {:<8} {:<7} {:>10}  source",
            "field", "column", "type", "order", "chunk"
        );
        for d in reader.descriptors() {
            println!(
                "{:<16} {:<24} {:<8} {:<7} {:>10}  {:?}",
                d.name,
                d.column,
                d.data_type.to_string(),
                format!("{:?}", d.byte_order).to_lowercase(),
                d.chunk_size,
                d.chunk_source
            );
        }
    }
    reader.done()?;
    Ok(())
}

enum BatchWriter {
    Jsonl(JsonlWriter<Box<dyn Write>>),
    Csv(CsvWriter<Box<dyn Write>>),
}

impl BatchWriter {
    fn new(format: Format, out: Box<dyn Write>) -> Self {
        match format {
            Format::Jsonl => BatchWriter::Jsonl(JsonlWriter::to_writer(out, None)),
            Format::Csv => BatchWriter::Csv(CsvWriter::to_writer(out, None)),
        }
    }

    fn write(&mut self, batch: &RowBatch) -> colstream_core::Result<()> {
        match self {
            BatchWriter::Jsonl(w) => w.write_batch(batch),
            BatchWriter::Csv(w) => w.write_batch(batch),
        }
    }
}

fn dump(
    source: &SourceArgs,
    format: Format,
    mode: Mode,
    limit: Option<u64>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut reader, _) = open_reader(source)?;
    let out: Box<dyn Write> = match output {
        Some(path) => Box::new(
            File::create(path).map_err(|e| format!("create {}: {e}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BatchWriter::new(format, out);
    let mut digest = RowDigest::new();
    let limit = limit.unwrap_or(u64::MAX);
    let batch_size = reader.batch_size();

    let rows = match mode {
        Mode::Bulk => {
            let mut rows = 0u64;
            while rows < limit {
                let Some(batch) = reader.next_batch(batch_size.min(limit - rows))? else {
                    break;
                };
                fold_batch(&mut digest, &batch);
                writer.write(&batch)?;
                rows += batch.num_rows() as u64;
            }
            rows
        }
        Mode::Pull => pull_rows(&mut reader, &mut writer, &mut digest, limit, batch_size)?,
    };

    let stats = reader.stats();
    reader.done()?;
    eprintln!(
        "{rows} rows, {} chunk reads, blake3 {}",
        stats.total_refills(),
        digest.finalize()
    );
    Ok(())
}

/// Pull rows one at a time, regrouping them into batches for the writer.
fn pull_rows(
    reader: &mut ColumnReader,
    writer: &mut BatchWriter,
    digest: &mut RowDigest,
    limit: u64,
    batch_size: u64,
) -> Result<u64, Box<dyn std::error::Error>> {
    let fields = reader.fields().to_vec();
    let schema = reader.schema();
    let mut record = RowRecord::new();
    let mut batch = RowBatch::with_schema(&schema);
    let mut rows = 0u64;

    while rows < limit && reader.pull(&mut record)? {
        let local = batch.num_rows() as u64;
        for (col, field) in fields.iter().enumerate() {
            let value = record
                .get(*field)
                .ok_or_else(|| format!("pulled row is missing {field}"))?;
            batch.set_value(col, local, value)?;
        }
        rows += 1;
        if batch.num_rows() as u64 >= batch_size {
            fold_batch(digest, &batch);
            writer.write(&batch)?;
            batch = RowBatch::with_schema(&schema);
        }
    }
    if batch.num_rows() > 0 {
        fold_batch(digest, &batch);
        writer.write(&batch)?;
    }
    Ok(rows)
}

fn fold_batch(digest: &mut RowDigest, batch: &RowBatch) {
    for r in 0..batch.num_rows() {
        for c in &batch.columns {
            if let Some(v) = c.values.get(r) {
                digest.update(v);
            }
        }
    }
}
