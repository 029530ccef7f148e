//! Command-line argument parsing for the `microgrid-sim` binary.

use std::env;
use std::path::PathBuf;

/// Parsed command-line options.
#[derive(Debug, Default)]
pub struct CliOptions {
    pub scenario: Option<PathBuf>,
    pub preset: Option<String>,
    pub seed: Option<u64>,
    pub strategy: Option<String>,
    pub telemetry_out: Option<PathBuf>,
    pub json: bool,
    pub compare: bool,
    pub quiet: bool,
    pub help: bool,
}

/// Parses the process arguments.
///
/// # Errors
///
/// Returns a message describing the first invalid argument.
pub fn parse_args() -> Result<CliOptions, String> {
    let args: Vec<String> = env::args().skip(1).collect();
    parse_args_from(args)
}

/// Parses an explicit argument list (without the program name).
///
/// # Errors
///
/// Returns a message describing the first invalid argument.
pub fn parse_args_from(args: Vec<String>) -> Result<CliOptions, String> {
    let mut opts = CliOptions::default();
    let mut i = 0usize;

    while i < args.len() {
        match args[i].as_str() {
            "--scenario" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --scenario (expected a TOML file path)")?;
                if opts.scenario.replace(PathBuf::from(path)).is_some() {
                    return Err("--scenario provided more than once".to_string());
                }
            }
            "--preset" => {
                i += 1;
                let name = args.next_or_err(i, "missing value for --preset (expected a preset name)")?;
                if opts.preset.replace(name.to_string()).is_some() {
                    return Err("--preset provided more than once".to_string());
                }
            }
            "--seed" => {
                i += 1;
                let raw = args.next_or_err(i, "missing value for --seed (expected a u64)")?;
                let seed = raw
                    .parse::<u64>()
                    .map_err(|_| format!("--seed value \"{raw}\" is not a valid u64"))?;
                opts.seed = Some(seed);
            }
            "--strategy" => {
                i += 1;
                let name = args.next_or_err(i, "missing value for --strategy (expected a strategy name)")?;
                opts.strategy = Some(name.to_string());
            }
            "--telemetry-out" => {
                i += 1;
                let path = args.next_or_err(i, "missing value for --telemetry-out (expected a file path)")?;
                if opts.telemetry_out.replace(PathBuf::from(path)).is_some() {
                    return Err("--telemetry-out provided more than once".to_string());
                }
            }
            "--json" => opts.json = true,
            "--compare" => opts.compare = true,
            "--quiet" | "-q" => opts.quiet = true,
            "--help" | "-h" => opts.help = true,
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    if opts.scenario.is_some() && opts.preset.is_some() {
        return Err(
            "arguments `--scenario` and `--preset` are mutually exclusive; choose one source"
                .to_string(),
        );
    }
    if opts.compare && opts.telemetry_out.is_some() {
        return Err("--telemetry-out cannot be combined with --compare".to_string());
    }

    Ok(opts)
}

trait SliceArgExt {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String>;
}

impl SliceArgExt for [String] {
    fn next_or_err(&self, index: usize, err: &str) -> Result<&str, String> {
        self.get(index)
            .map(String::as_str)
            .ok_or_else(|| err.to_string())
    }
}

/// Prints usage to stderr.
pub fn print_usage() {
    eprintln!("microgrid-sim: discrete-time microgrid simulator");
    eprintln!();
    eprintln!("Usage: microgrid-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!("  --preset <name>          Use a built-in preset (baseline, high_solar, islanded)");
    eprintln!("  --seed <u64>             Override the synthetic source seed");
    eprintln!("  --strategy <name>        Override the strategy (idle, pv_first, price_threshold)");
    eprintln!("  --telemetry-out <path>   Export step records to CSV");
    eprintln!("  --json                   Print the metrics summary as JSON");
    eprintln!("  --compare                Run every built-in strategy in parallel");
    eprintln!("  -q, --quiet              Do not print per-step lines");
    eprintln!("  -h, --help               Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}
