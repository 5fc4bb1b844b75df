//! Savings analyzer entry point: CLI wiring and config-driven analysis.

use std::fs;
use std::path::Path;
use std::process;

use tracing::info;
use tracing_subscriber::EnvFilter;

use savings_analyzer::config::AnalysisConfig;
use savings_analyzer::data::parser::parse_path;
use savings_analyzer::data::{SystemId, SystemSet};
use savings_analyzer::engine::{AnalysisResult, PreparedDataset, TempQuantity};
use savings_analyzer::io::export::{export_pivot, export_records};
use savings_analyzer::io::project::load_project;
use savings_analyzer::synth::SyntheticSite;

/// Parsed CLI arguments.
struct CliArgs {
    project: Option<String>,
    data: Option<String>,
    systems: Option<String>,
    demo: bool,
    config_path: Option<String>,
    preset: Option<String>,
    system: Option<SystemId>,
    quantity: Option<TempQuantity>,
    m_round: Option<f64>,
    export_dir: Option<String>,
    #[cfg(feature = "api")]
    serve: bool,
    #[cfg(feature = "api")]
    port: u16,
}

fn print_help() {
    eprintln!("savings-analyzer: Pre/Post installation energy savings analysis");
    eprintln!();
    eprintln!("Usage: savings-analyzer [INPUT] [OPTIONS]");
    eprintln!();
    eprintln!("Input (one of):");
    eprintln!("  --project <dir>          Directory with one .csv table and one .json sidecar");
    eprintln!("  --data <csv> --systems <json>");
    eprintln!("                           Raw table and sidecar given separately");
    eprintln!("  --demo                   Analyze a generated synthetic site");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>          Load analysis settings from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        AnalysisConfig::PRESETS.join(", ")
    );
    eprintln!("  --system <n>             Analyze one system (default: all)");
    eprintln!("  --quantity <q>           delta_t, temp_out or temp_gate (default: all)");
    eprintln!("  --m-round <f64>          Override the rounding step");
    eprintln!("  --export <dir>           Write annotated records and pivots as CSV");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve                  Start REST API server after the analysis");
        eprintln!("  --port <u16>             API server port (default: 3000)");
    }
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --config or --preset is given, the default preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

/// Returns the value following `args[*i]`, exiting if it is missing.
fn take_value(args: &[String], i: &mut usize, what: &str) -> String {
    let flag = &args[*i];
    *i += 1;
    if *i >= args.len() {
        eprintln!("error: {flag} requires {what}");
        process::exit(1);
    }
    args[*i].clone()
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        project: None,
        data: None,
        systems: None,
        demo: false,
        config_path: None,
        preset: None,
        system: None,
        quantity: None,
        m_round: None,
        export_dir: None,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port: 3000,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--project" => cli.project = Some(take_value(&args, &mut i, "a directory argument")),
            "--data" => cli.data = Some(take_value(&args, &mut i, "a path argument")),
            "--systems" => cli.systems = Some(take_value(&args, &mut i, "a path argument")),
            "--demo" => cli.demo = true,
            "--config" => cli.config_path = Some(take_value(&args, &mut i, "a path argument")),
            "--preset" => cli.preset = Some(take_value(&args, &mut i, "a name argument")),
            "--system" => {
                let value = take_value(&args, &mut i, "a system number");
                match value.parse::<SystemId>() {
                    Ok(id) => cli.system = Some(id),
                    Err(e) => {
                        eprintln!("error: --system: {e}");
                        process::exit(1);
                    }
                }
            }
            "--quantity" => {
                let value = take_value(&args, &mut i, "a quantity name");
                match value.parse::<TempQuantity>() {
                    Ok(q) => cli.quantity = Some(q),
                    Err(e) => {
                        eprintln!("error: --quantity: {e}");
                        process::exit(1);
                    }
                }
            }
            "--m-round" => {
                let value = take_value(&args, &mut i, "an f64 argument");
                if let Ok(m) = value.parse::<f64>() {
                    cli.m_round = Some(m);
                } else {
                    eprintln!("error: --m-round value \"{value}\" is not a valid number");
                    process::exit(1);
                }
            }
            "--export" => cli.export_dir = Some(take_value(&args, &mut i, "a directory argument")),
            #[cfg(feature = "api")]
            "--serve" => {
                cli.serve = true;
            }
            #[cfg(feature = "api")]
            "--port" => {
                let value = take_value(&args, &mut i, "a u16 argument");
                if let Ok(p) = value.parse::<u16>() {
                    cli.port = p;
                } else {
                    eprintln!("error: --port value \"{value}\" is not a valid u16");
                    process::exit(1);
                }
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Loads the dataset and system definitions selected on the command line.
fn load_input(cli: &CliArgs) -> PreparedDataset {
    let loaded = if let Some(ref dir) = cli.project {
        load_project(Path::new(dir))
    } else if let (Some(data), Some(systems)) = (&cli.data, &cli.systems) {
        parse_path(Path::new(data)).and_then(|dataset| {
            SystemSet::from_json_file(Path::new(systems))
                .map(|systems| PreparedDataset::new(dataset, systems))
        })
    } else if cli.demo {
        let (dataset, systems) = SyntheticSite::default().generate();
        Ok(PreparedDataset::new(dataset, systems))
    } else {
        eprintln!("error: no input given; use --project, --data with --systems, or --demo");
        print_help();
        process::exit(1);
    };

    loaded.unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    })
}

fn write_failed(path: &Path, e: &std::io::Error) -> ! {
    eprintln!("error: failed to write {}: {e}", path.display());
    process::exit(1);
}

/// Writes one system's annotated records and per-quantity pivots.
fn export_system(dir: &Path, result: &AnalysisResult, quantities: &[TempQuantity]) {
    let n = result.system.0;

    let path = dir.join(format!("system_{n}_records.csv"));
    if let Err(e) = export_records(&result.records, &path) {
        write_failed(&path, &e);
    }
    for &q in quantities {
        let path = dir.join(format!("system_{n}_{}_pivot.csv", q.as_str()));
        if let Err(e) = export_pivot(&result.report_for(q).pivot, &path) {
            write_failed(&path, &e);
        }
    }
    info!(system = %result.system, dir = %dir.display(), "exported CSV files");
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();

    // Load config: --config takes priority, then --preset, then the default
    let mut config = if let Some(ref path) = cli.config_path {
        match AnalysisConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match AnalysisConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        AnalysisConfig::baseline()
    };

    if let Some(m) = cli.m_round {
        config.temperature.m_round = m;
    }
    if let Some(q) = cli.quantity {
        config.temperature.quantity = q;
    }

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let prepared = load_input(&cli);

    let ids: Vec<SystemId> = match cli.system {
        Some(id) => vec![id],
        None => prepared.systems().ids().collect(),
    };
    let quantities: Vec<TempQuantity> = match cli.quantity {
        Some(q) => vec![q],
        None => TempQuantity::ALL.to_vec(),
    };

    if let Some(ref dir) = cli.export_dir {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("error: cannot create export directory \"{dir}\": {e}");
            process::exit(1);
        }
    }

    for id in ids {
        let result = config
            .request(id)
            .and_then(|request| prepared.analyze(&request));
        let result = match result {
            Ok(r) => r,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(1);
            }
        };

        println!(
            "=== {} (installed {}) ===",
            result.system, result.installation_date
        );
        println!(
            "Rows retained: {} of {} ({} excluded)",
            result.filter.retained, result.filter.total, result.filter.removed
        );
        println!("{}\n", result.breakdown);

        for &q in &quantities {
            println!("{}\n", result.report_for(q));
        }

        if let Some(ref dir) = cli.export_dir {
            export_system(Path::new(dir), &result, &quantities);
        }
    }

    // Start API server if requested
    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(savings_analyzer::api::AppState { prepared, config });
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(savings_analyzer::api::serve(state, addr)) {
            eprintln!("error: API server failed: {e}");
            process::exit(1);
        }
    }
}
