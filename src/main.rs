use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use matbench::kernels::suggest_tile_size;
use matbench::report::{write_report, ReportFormat};
use matbench::{
    BenchConfig, Strategy, BENCHMARK_ITERATIONS, DEFAULT_MATRIX_SIZE, DEFAULT_SEED,
    DEFAULT_TILE_SIZE, L2_CACHE_SIZE, LANE_WIDTH, MAX_MATRIX_SIZE, MIN_MATRIX_SIZE,
    WARMUP_ITERATIONS,
};

/// Time naive, cache-blocked and lane-grouped matrix multiplication on
/// square matrices and optionally verify they agree.
///
/// Examples:
///   matbench 1024          # 1024x1024 matrices
///   matbench -v 512        # with verification
///   matbench -t 32 256     # tile size 32 on 256x256 matrices
#[derive(Parser, Debug)]
#[command(name = "matbench", version, verbatim_doc_comment)]
struct Cli {
    /// Size of square matrices
    #[arg(default_value_t = DEFAULT_MATRIX_SIZE, value_parser = parse_matrix_size)]
    size: usize,

    /// Tile size for the cache-blocked strategies, or "auto"
    #[arg(short = 't', long, default_value_t = TileArg::Size(DEFAULT_TILE_SIZE), value_parser = parse_tile_size)]
    tile_size: TileArg,

    /// Verify results against the naive strategy (slower for large matrices)
    #[arg(short, long)]
    verify: bool,

    /// Columns processed per group by the lane-grouped strategies
    #[arg(long, default_value_t = LANE_WIDTH, value_parser = parse_positive)]
    lane_width: usize,

    /// Seed for operand generation
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Strategies to run (naive, tiled, lanes, tiled-lanes)
    #[arg(long, value_delimiter = ',', value_name = "LIST")]
    strategies: Vec<Strategy>,

    /// Untimed warmup runs per strategy
    #[arg(long, default_value_t = WARMUP_ITERATIONS, value_name = "N")]
    warmup: usize,

    /// Timed runs per strategy; the fastest is reported
    #[arg(long, default_value_t = BENCHMARK_ITERATIONS, value_name = "N", value_parser = parse_positive)]
    iterations: usize,

    /// Output format (text, csv, json)
    #[arg(long, default_value_t = ReportFormat::Text, value_name = "FORMAT")]
    format: ReportFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info", value_name = "LEVEL")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TileArg {
    Auto,
    Size(usize),
}

impl std::fmt::Display for TileArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileArg::Auto => f.write_str("auto"),
            TileArg::Size(n) => write!(f, "{n}"),
        }
    }
}

fn parse_positive(s: &str) -> std::result::Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("invalid number '{s}': {e}")),
    }
}

fn parse_matrix_size(s: &str) -> std::result::Result<usize, String> {
    let size = s
        .parse::<usize>()
        .map_err(|e| format!("invalid matrix size '{s}': {e}"))?;
    if !(MIN_MATRIX_SIZE..=MAX_MATRIX_SIZE).contains(&size) {
        return Err(format!(
            "matrix size must be between {MIN_MATRIX_SIZE} and {MAX_MATRIX_SIZE}"
        ));
    }
    Ok(size)
}

fn parse_tile_size(s: &str) -> std::result::Result<TileArg, String> {
    if s.eq_ignore_ascii_case("auto") {
        return Ok(TileArg::Auto);
    }
    parse_positive(s)
        .map(TileArg::Size)
        .map_err(|e| format!("invalid tile size: {e}"))
}

impl Cli {
    fn to_config(&self) -> BenchConfig {
        let tile_size = match self.tile_size {
            TileArg::Size(n) => n,
            TileArg::Auto => suggest_tile_size(L2_CACHE_SIZE, std::mem::size_of::<f64>()),
        };
        let strategies = if self.strategies.is_empty() {
            Strategy::default_set()
        } else {
            self.strategies.clone()
        };

        BenchConfig::new(self.size)
            .with_tile_size(tile_size)
            .with_lane_width(self.lane_width)
            .with_verify(self.verify)
            .with_seed(self.seed)
            .with_strategies(strategies)
            .with_iterations(self.warmup, self.iterations)
    }
}

/// Logs go to stderr so CSV/JSON on stdout stay machine-readable.
fn setup_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let config = cli.to_config();
    info!(
        size = config.size,
        tile_size = config.tile_size,
        verify = config.verify,
        "starting benchmark"
    );

    let report = matbench::run(&config).context("benchmark run failed")?;

    let mut output: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("Failed to create output file: {}", path.display())
        })?)),
        None => Box::new(io::stdout().lock()),
    };
    write_report(&mut output, &report, &config, cli.format)?;
    output.flush()?;

    if config.verify && !report.all_verified() {
        bail!("verification failed: at least one strategy differs from naive");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["matbench"]).unwrap();
        let config = cli.to_config();
        assert_eq!(config.size, DEFAULT_MATRIX_SIZE);
        assert_eq!(config.tile_size, DEFAULT_TILE_SIZE);
        assert!(!config.verify);
        assert_eq!(config.strategies, Strategy::default_set());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "matbench",
            "-t",
            "32",
            "-v",
            "--strategies",
            "naive,tiled-lanes",
            "256",
        ])
        .unwrap();
        let config = cli.to_config();
        assert_eq!(config.size, 256);
        assert_eq!(config.tile_size, 32);
        assert!(config.verify);
        assert_eq!(
            config.strategies,
            vec![Strategy::Naive, Strategy::TiledLanes]
        );
    }

    #[test]
    fn test_auto_tile_size() {
        let cli = Cli::try_parse_from(["matbench", "--tile-size", "auto"]).unwrap();
        assert_eq!(cli.to_config().tile_size, 32);
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        assert!(Cli::try_parse_from(["matbench", "1"]).is_err());
        assert!(Cli::try_parse_from(["matbench", "abc"]).is_err());
        assert!(Cli::try_parse_from(["matbench", "-t", "0"]).is_err());
        assert!(Cli::try_parse_from(["matbench", "-t", "-4"]).is_err());
        assert!(Cli::try_parse_from(["matbench", "--lane-width", "0"]).is_err());
        assert!(Cli::try_parse_from(["matbench", "--strategies", "strassen"]).is_err());
    }
}
