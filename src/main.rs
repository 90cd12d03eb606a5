use anyhow::{Context, Error, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use ripline::line_buffer::LineBufferBuilder;
use std::io::{self, Write};
use std::process::ExitCode;

use geoipenrich::input::{self, FileOrStdin};
use geoipenrich::ProcessorRegistry;

/// Check if the error chain contains a broken pipe error.
#[inline(always)]
fn is_broken_pipe(err: &Error) -> bool {
    // Look for a broken pipe error in the error chain
    for cause in err.chain() {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if io_err.kind() == io::ErrorKind::BrokenPipe {
                return true;
            }
        }
        // serde_json hides the io::Error from source(), only its kind is kept
        if let Some(json_err) = cause.downcast_ref::<serde_json::Error>() {
            if json_err.io_error_kind() == Some(io::ErrorKind::BrokenPipe) {
                return true;
            }
        }
    }
    false
}

/// Enrich JSON-lines telemetry records with GeoIP city and ASN fields
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Processor configuration file (TOML). See --sample-config for the format
    #[clap(
        short,
        long,
        value_name = "FILE",
        value_hint = clap::ValueHint::FilePath,
        env = "GEOIPENRICH_CONFIG"
    )]
    config: Option<Utf8PathBuf>,

    /// Override the city database path. An empty value disables city lookups
    #[clap(long, value_name = "PATH")]
    city_db: Option<String>,

    /// Override the ASN database path. An empty value disables ASN lookups
    #[clap(long, value_name = "PATH")]
    asn_db: Option<String>,

    /// Number of records handed to the processor per batch
    #[clap(long, default_value_t = 1000)]
    batch_size: usize,

    /// Print a sample configuration and exit
    #[clap(long)]
    sample_config: bool,

    /// Print the processor description and exit
    #[clap(long)]
    description: bool,

    /// Input file(s) of JSON-lines records. Leave empty or use "-" to read from stdin
    #[clap(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    input: Vec<Utf8PathBuf>,
}

const PROCESSOR: &str = "geoip";

fn main() -> ExitCode {
    init_logging();

    let err = match run_main() {
        Ok(code) => return code,
        Err(err) => err,
    };

    // Handle broken pipe errors gracefully
    if is_broken_pipe(&err) {
        return ExitCode::SUCCESS;
    }

    if std::env::var("RUST_BACKTRACE").is_ok_and(|v| v == "1")
        && std::env::var("RUST_LIB_BACKTRACE").map_or(true, |v| v == "1")
    {
        let _ = writeln!(&mut std::io::stderr(), "{:?}", err);
    } else {
        let _ = writeln!(&mut std::io::stderr(), "{:#}", err);
    }

    ExitCode::FAILURE
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("geoipenrich=warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn load_table(args: &Args) -> Result<toml::Table> {
    let mut table = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {}", path))?;
            toml::from_str::<toml::Table>(&text)
                .with_context(|| format!("failed to parse config file: {}", path))?
        }
        None => toml::Table::new(),
    };

    if let Some(city) = &args.city_db {
        table.insert("city_db_path".into(), toml::Value::String(city.clone()));
    }
    if let Some(asn) = &args.asn_db {
        table.insert("asn_db_path".into(), toml::Value::String(asn.clone()));
    }
    Ok(table)
}

fn run_main() -> Result<ExitCode> {
    let mut args = Args::parse();
    let registry = ProcessorRegistry::default();

    // Informational flags never depend on the config file
    if args.description || args.sample_config {
        let processor = registry.create(PROCESSOR, toml::Table::new())?;
        if args.description {
            println!("{}", processor.description());
        } else {
            println!("{}", processor.sample_config());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut processor = registry.create(PROCESSOR, load_table(&args)?)?;

    // if no files specified, add stdin
    if args.input.is_empty() {
        args.input.push(Utf8PathBuf::from("-"));
    }

    processor
        .init()
        .with_context(|| format!("failed to initialize {} processor", PROCESSOR))?;

    let mut out = io::BufWriter::with_capacity(65536, io::stdout().lock());
    let mut line_buffer = LineBufferBuilder::new().capacity(65536).build();

    for path in args.input {
        let source = FileOrStdin::from_path(path);
        input::for_each_batch(&source, &mut line_buffer, args.batch_size, |batch| {
            for record in processor.apply(batch) {
                serde_json::to_writer(&mut out, &record).map_err(io::Error::from)?;
                out.write_all(b"\n")?;
            }
            Ok(())
        })?;
        out.flush()?;
    }

    Ok(ExitCode::SUCCESS)
}
