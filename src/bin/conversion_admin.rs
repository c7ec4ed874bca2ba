//! conversion-admin CLI tool
//!
//! Inspects a registry file the same way the dashboard engine would.
//!
//! Usage:
//!   conversion-admin matrix  <registry.json>
//!   conversion-admin convert <registry.json> <from> <to> <value>
//!   conversion-admin trace   <registry.json> <from> <to>
//!   conversion-admin dot     <registry.json>

use meter_conversion_core::display::format_trace;
use meter_conversion_core::{EngineConfig, EngineError, Registry, Snapshot, UnitId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_usage() {
    eprintln!("conversion-admin - Inspect unit conversions");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  conversion-admin matrix  <registry.json>                  Print the reachability matrix as JSON");
    eprintln!("  conversion-admin convert <registry.json> <from> <to> <v>  Convert a value");
    eprintln!("  conversion-admin trace   <registry.json> <from> <to>      Show the chosen conversion path");
    eprintln!("  conversion-admin dot     <registry.json>                  Print the graph in Graphviz format");
    eprintln!();
    eprintln!("Units may be given by id or by name.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CONVERSION_PARALLEL_THRESHOLD  Unit count from which the closure runs in parallel");
    eprintln!("  CONVERSION_CACHE_PATHS         Precompute path trees (default: true)");
    eprintln!("  RUST_LOG                       Log filter");
}

/// Accepts a numeric id first, then a unit name.
fn resolve_unit(registry: &Registry, arg: &str) -> Result<UnitId, EngineError> {
    if let Ok(raw) = arg.parse::<u32>() {
        if registry.unit(UnitId(raw)).is_some() {
            return Ok(UnitId(raw));
        }
    }
    registry
        .unit_by_name(arg)
        .map(|u| u.id)
        .ok_or_else(|| EngineError::Store(format!("No unit with id or name '{}'", arg)))
}

fn run(args: &[String]) -> Result<String, EngineError> {
    let command = args.first().map(String::as_str).unwrap_or("");
    let path = args.get(1).ok_or_else(|| EngineError::Config("missing registry path".into()))?;

    let config = EngineConfig::from_env()?;
    let registry = Registry::load(path)?;
    let file = registry.to_file();
    let snapshot = Snapshot::build(&file.units, &file.conversions, 0, &config)?;

    let unit_arg = |i: usize| -> Result<UnitId, EngineError> {
        let raw = args.get(i).ok_or_else(|| EngineError::Config("missing unit argument".into()))?;
        resolve_unit(&registry, raw)
    };

    match command {
        "matrix" => Ok(serde_json::to_string_pretty(&snapshot.matrix().to_view())?),
        "convert" => {
            let (from, to) = (unit_arg(2)?, unit_arg(3)?);
            let value: f64 = args
                .get(4)
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| EngineError::Config("missing or invalid value".into()))?;
            Ok(format!("{}", snapshot.convert(from, to, value)?))
        }
        "trace" => Ok(format_trace(&snapshot, unit_arg(2)?, unit_arg(3)?)),
        "dot" => Ok(snapshot.graph().to_dot()),
        other => Err(EngineError::Config(format!("unknown command '{}'", other))),
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "meter_conversion_core=info,conversion_admin=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args[0] == "-h" || args[0] == "--help" {
        print_usage();
        std::process::exit(if args.is_empty() { 1 } else { 0 });
    }

    match run(&args) {
        Ok(output) => println!("{}", output.trim_end()),
        Err(e) => {
            tracing::error!(kind = ?e.kind(), "{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
