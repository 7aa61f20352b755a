//! Command-line rack scanner.
//!
//! Decodes the datamatrix symbols of every well in a rack image and prints
//! one line per well. A JSON report can be written with `--output`.

use clap::{Args, Parser, Subcommand};
use dmscan::{
    load::load_dib, ColumnOrder, DecodeOptions, DmScanConfig, DmScanLib, PlateScanConfig,
    PlateScanReport, ScanError, SymbolDecoder,
};
use log::LevelFilter;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "dmscan")]
#[command(version)]
#[command(about = "Decode datamatrix-labelled tubes in rack images", long_about = None)]
struct Cli {
    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: LevelFilter,

    /// Increase log verbosity; overrides --log-level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit JSON log lines through tracing
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode every well of an SBS rack image
    Plate(PlateArgs),
    /// Decode every symbol in an image without a well grid
    Image(ImageArgs),
    /// Run a saved JSON job
    Config {
        /// Path to a PlateScanConfig JSON file
        config: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ImageArgs {
    /// Rack image
    image: PathBuf,

    /// Image resolution; read from the file when omitted
    #[arg(long)]
    dpi: Option<u32>,

    /// Worker threads; defaults to one per CPU
    #[arg(long)]
    workers: Option<usize>,

    /// Write a JSON report here
    #[arg(long, short)]
    output: Option<PathBuf>,

    #[command(flatten)]
    options: OptionArgs,
}

#[derive(Args, Debug)]
struct PlateArgs {
    #[command(flatten)]
    common: ImageArgs,

    #[arg(long, default_value_t = dmscan::SBS_ROWS)]
    rows: u32,

    #[arg(long, default_value_t = dmscan::SBS_COLS)]
    cols: u32,

    /// Number columns right to left (mirrored scanner bed)
    #[arg(long)]
    descending: bool,

    /// Plate width in inches; defaults to the image width
    #[arg(long)]
    plate_width: Option<f64>,

    /// Plate height in inches; defaults to the image height
    #[arg(long)]
    plate_height: Option<f64>,
}

#[derive(Args, Debug)]
struct OptionArgs {
    #[arg(long, default_value_t = DecodeOptions::default().scan_gap)]
    scan_gap: f64,
    #[arg(long, default_value_t = DecodeOptions::default().square_dev)]
    square_dev: i64,
    #[arg(long, default_value_t = DecodeOptions::default().edge_thresh)]
    edge_thresh: i64,
    #[arg(long, default_value_t = DecodeOptions::default().corrections, allow_negative_numbers = true)]
    corrections: i64,
    #[arg(long, default_value_t = DecodeOptions::default().shrink)]
    shrink: i64,
}

impl OptionArgs {
    fn to_options(&self) -> DecodeOptions {
        DecodeOptions::new(
            self.scan_gap,
            self.square_dev,
            self.edge_thresh,
            self.corrections,
            self.shrink,
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli.cmd) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose > 0 {
        dmscan::core::level_from_verbosity(cli.verbose)
    } else {
        cli.log_level
    };
    #[cfg(feature = "tracing")]
    {
        // `log` records from the library crates are bridged into tracing.
        let _ = tracing_log::LogTracer::init_with_filter(level);
        dmscan::core::init_tracing(cli.json_logs, level);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let _ = dmscan::core::init_with_level(level);
    }
}

fn run(cmd: Command) -> Result<(), Box<dyn Error>> {
    match cmd {
        Command::Plate(args) => {
            let mut cfg = job_config(&args.common);
            cfg.rows = args.rows;
            cfg.cols = args.cols;
            cfg.plate_width = args.plate_width;
            cfg.plate_height = args.plate_height;
            if args.descending {
                cfg.column_order = ColumnOrder::Descending;
            }
            run_plate(&cfg, args.common.output.as_deref())
        }
        Command::Image(args) => {
            let cfg = job_config(&args);
            run_image(&cfg, args.output.as_deref())
        }
        Command::Config { config } => {
            let cfg = PlateScanConfig::load_json(&config)?;
            let output = cfg.output_path();
            run_plate(&cfg, Some(output.as_path()))
        }
    }
}

fn job_config(args: &ImageArgs) -> PlateScanConfig {
    let mut cfg = PlateScanConfig::new(args.image.display().to_string());
    cfg.dpi = args.dpi;
    cfg.workers = args.workers;
    cfg.options = args.options.to_options();
    cfg.output_path = args.output.as_ref().map(|p| p.display().to_string());
    cfg
}

fn run_plate(cfg: &PlateScanConfig, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let mut report = PlateScanReport::new(&cfg.image_path, cfg.options);
    let result = load_dib(&cfg.image_path, cfg.dpi).and_then(|image| {
        let wells = cfg.plate_grid(&image).well_rects()?;
        scanner(cfg.scan_config())?.decode_wells(image, cfg.options, &wells)
    });

    match result {
        Ok(scan) => {
            for well in &scan.wells {
                match well.message() {
                    Some(message) => println!("{}\t{}", well.label, message),
                    None => println!("{}\t-", well.label),
                }
            }
            println!("decoded {}/{} wells", scan.decoded_count(), scan.wells.len());
            if scan.systemic_failure() {
                eprintln!("warning: the symbol decoder failed on every well");
            }
            report.set_plate(&scan);
            write_report(&report, output)?;
            Ok(())
        }
        Err(err) => {
            report.set_error(&err);
            write_report(&report, output)?;
            Err(err.into())
        }
    }
}

fn run_image(cfg: &PlateScanConfig, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let mut report = PlateScanReport::new(&cfg.image_path, cfg.options);
    let result = load_dib(&cfg.image_path, cfg.dpi)
        .and_then(|image| scanner(cfg.scan_config())?.decode_image(image, cfg.options));

    match result {
        Ok(scan) => {
            for symbol in &scan.symbols {
                println!("{}\t{}", symbol.rect, symbol.message);
            }
            println!("decoded {} symbols", scan.symbols.len());
            report.set_image(&scan);
            write_report(&report, output)?;
            Ok(())
        }
        Err(err) => {
            report.set_error(&err);
            write_report(&report, output)?;
            Err(err.into())
        }
    }
}

fn write_report(report: &PlateScanReport, output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    if let Some(path) = output {
        report.write_json(path)?;
        log::info!("report written to {}", path.display());
    }
    Ok(())
}

fn scanner(config: DmScanConfig) -> Result<DmScanLib, ScanError> {
    DmScanLib::with_config(config, backend()?)
}

#[cfg(feature = "rxing")]
fn backend() -> Result<Arc<dyn SymbolDecoder>, ScanError> {
    Ok(Arc::new(dmscan::RxingDecoder::new()))
}

#[cfg(not(feature = "rxing"))]
fn backend() -> Result<Arc<dyn SymbolDecoder>, ScanError> {
    Err(ScanError::NoBackend)
}

