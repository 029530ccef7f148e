//! Microgrid simulator entry point: CLI wiring and config-driven engine construction.

use std::path::Path;
use std::process;

use serde::Serialize;
use tracing::info;

use microgrid_sim::cli::{self, CliOptions};
use microgrid_sim::config::ScenarioConfig;
use microgrid_sim::io::export::export_csv;
use microgrid_sim::runner::{self, BatchJob, BatchOutcome};
use microgrid_sim::sim::MetricsSummary;
use microgrid_sim::telemetry;

/// One row of `--compare --json` output.
#[derive(Serialize)]
struct CompareRow<'a> {
    strategy: &'a str,
    steps: Option<usize>,
    metrics: Option<&'a MetricsSummary>,
    error: Option<String>,
}

fn load_scenario(cli: &CliOptions) -> ScenarioConfig {
    // --scenario takes priority, then --preset, then baseline default
    let loaded = if let Some(ref path) = cli.scenario {
        ScenarioConfig::from_toml_file(path)
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    let mut scenario = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if let Some(seed) = cli.seed {
        scenario.source.seed = seed;
    }
    if let Some(ref kind) = cli.strategy {
        scenario.strategy.kind = kind.clone();
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    scenario
}

fn summary_line(m: &MetricsSummary) -> String {
    let pct = |v: Option<f64>| v.map_or("n/a".to_string(), |r| format!("{:.1}%", r * 100.0));
    let cost = m.energy_cost.map_or("n/a".to_string(), |c| format!("{c:.2}"));
    format!(
        "steps={:>4} self_suff={:>6} unmet={:>7.2} kWh curt={:>7.2} kWh imp={:>7.2} kWh exp={:>7.2} kWh cycles={:>5.2} cost={}",
        m.steps,
        pct(m.self_sufficiency),
        m.unmet_load_kwh,
        m.curtailment_kwh,
        m.grid_import_kwh,
        m.grid_export_kwh,
        m.storage_cycles,
        cost
    )
}

fn run_compare(scenario: &ScenarioConfig, json: bool) {
    let jobs = runner::compare_jobs(scenario).unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });
    let outcomes: Vec<BatchOutcome> = runner::run_batch(jobs);

    if json {
        let rows: Vec<CompareRow<'_>> = outcomes
            .iter()
            .map(|o| CompareRow {
                strategy: &o.label,
                steps: o.result.as_ref().ok().map(|(_, n)| *n),
                metrics: o.result.as_ref().ok().map(|(m, _)| m),
                error: o.result.as_ref().err().map(ToString::to_string),
            })
            .collect();
        match serde_json::to_string_pretty(&rows) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("error: failed to serialize comparison: {e}");
                process::exit(1);
            }
        }
    } else {
        for o in &outcomes {
            match &o.result {
                Ok((m, _)) => println!("{:<16} {}", o.label, summary_line(m)),
                Err(e) => println!("{:<16} failed: {e}", o.label),
            }
        }
    }

    if outcomes.iter().any(|o| o.result.is_err()) {
        process::exit(1);
    }
}

fn run_single(scenario: &ScenarioConfig, cli: &CliOptions) {
    let mut engine = BatchJob::from_scenario("main", scenario)
        .and_then(BatchJob::into_engine)
        .unwrap_or_else(|e| {
            eprintln!("error: {e}");
            process::exit(1);
        });

    let outcome = engine.run().map(|_| ());
    let summary = engine.metrics();
    let run = engine.into_run();

    // Print per-step results
    if !cli.quiet && !cli.json {
        for r in run.iter() {
            println!("{r}");
        }
    }

    // Print metrics report
    if cli.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("error: failed to serialize metrics: {e}");
                process::exit(1);
            }
        }
    } else {
        println!("\n{summary}");
    }

    // Export CSV if requested, including a partial run
    if let Some(ref path) = cli.telemetry_out {
        if let Err(e) = export_csv(&run, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        info!(path = %path.display(), rows = run.len(), "telemetry written");
    }

    if let Err(e) = outcome {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn main() {
    let cli = cli::parse_args().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        cli::print_usage();
        process::exit(1);
    });
    if cli.help {
        cli::print_usage();
        return;
    }

    telemetry::init_tracing();

    let scenario = load_scenario(&cli);
    if cli.compare {
        run_compare(&scenario, cli.json);
    } else {
        run_single(&scenario, &cli);
    }
}
