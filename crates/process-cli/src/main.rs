use std::env;
use std::net::SocketAddr;

use contracts::RunConfig;
use process_api::{serve, EngineApi};
use process_core::graph::StageGraph;
use process_core::topology::parse_topology;

fn print_usage() {
    println!("process-cli <command>");
    println!("commands:");
    println!("  status");
    println!("  simulate <run_id> <seed> [ticks] [sqlite_path]");
    println!("    runs a deterministic simulation and persists it to sqlite");
    println!("  serve [addr]");
    println!("    default addr: 127.0.0.1:8080");
    println!("  check-topology <path>");
    println!("    parses a topology description and reports every problem");
}

fn parse_u64(value: Option<&String>, label: &str) -> Result<u64, String> {
    let raw = value.ok_or_else(|| format!("missing {label}"))?;
    raw.parse::<u64>()
        .map_err(|_| format!("invalid {label}: {raw}"))
}

fn parse_socket_addr(value: Option<&String>) -> Result<SocketAddr, String> {
    let raw = value.map(String::as_str).unwrap_or("127.0.0.1:8080");
    raw.parse::<SocketAddr>()
        .map_err(|_| format!("invalid addr: {raw}"))
}

fn default_sqlite_path() -> String {
    std::env::var("PROCESS_SQLITE_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "process_runs.sqlite".to_string())
}

fn run_simulation(args: &[String]) -> Result<(), String> {
    let run_id = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing run_id".to_string())?;
    let seed = parse_u64(args.get(3), "seed")?;
    let target_tick = args
        .get(4)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| format!("invalid ticks: {value}"))
        })
        .transpose()?
        .unwrap_or(120);
    let sqlite_path = args
        .get(5)
        .cloned()
        .filter(|path| !path.trim().is_empty())
        .unwrap_or_else(default_sqlite_path);

    let config = RunConfig {
        run_id: run_id.clone(),
        seed,
        max_ticks: target_tick.max(1),
        ..RunConfig::default()
    };

    let mut api =
        EngineApi::from_config(config).map_err(|err| format!("failed to build run: {err}"))?;
    api.attach_sqlite_store(&sqlite_path)
        .map_err(|err| format!("failed to attach sqlite store: {err}"))?;
    api.initialize_run_storage(true)
        .map_err(|err| format!("failed to initialize run storage: {err}"))?;

    api.start();
    let (status, committed) = api
        .run_to_tick(target_tick)
        .map_err(|err| format!("simulation failed: {err}"))?;
    api.pause();

    if let Some(error) = api.last_persistence_error() {
        return Err(format!("persistence error after simulation: {error}"));
    }

    let snapshot = api
        .snapshot()
        .map_err(|err| format!("snapshot failed: {err}"))?;
    println!(
        "simulated run_id={} seed={} committed={} tick={}/{} receiving={} investigations={} outlay={} sqlite={}",
        run_id,
        seed,
        committed,
        status.current_tick,
        status.max_ticks,
        snapshot.tallies.receiving,
        snapshot.tallies.investigations_total,
        snapshot.tallies.benefits_outlay,
        sqlite_path
    );
    Ok(())
}

fn check_topology(args: &[String]) -> Result<(), String> {
    let path = args
        .get(2)
        .cloned()
        .ok_or_else(|| "missing topology path".to_string())?;
    let input =
        std::fs::read_to_string(&path).map_err(|err| format!("cannot read {path}: {err}"))?;

    let parsed = parse_topology(&input).map_err(|err| err.to_string())?;
    for warning in &parsed.warnings {
        println!("warning: {warning}");
    }
    let graph = StageGraph::from_parsed(&parsed).map_err(|err| err.to_string())?;
    println!(
        "ok: {} nodes, {} edges, {} warnings",
        graph.len(),
        parsed.edges.len(),
        parsed.warnings.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("status") => match EngineApi::from_config(RunConfig::default()) {
            Ok(api) => println!("{}", api.status()),
            Err(err) => {
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        },
        Some("simulate") => {
            if let Err(err) = run_simulation(&args) {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        }
        Some("serve") => match parse_socket_addr(args.get(2)) {
            Ok(addr) => {
                println!("serving api on http://{addr}");
                if let Err(err) = serve(addr).await {
                    eprintln!("server error: {err}");
                    std::process::exit(1);
                }
            }
            Err(err) => {
                eprintln!("error: {err}");
                print_usage();
                std::process::exit(2);
            }
        },
        Some("check-topology") => {
            if let Err(err) = check_topology(&args) {
                eprintln!("error: {err}");
                std::process::exit(2);
            }
        }
        _ => {
            print_usage();
        }
    }
}
