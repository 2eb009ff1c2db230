//! CLI module: argument parsing (`args`) and dispatch (`run`).
//!
//! Every subcommand is a thin adapter over [`crate::pipeline::analyze`] or
//! [`crate::query::QuerySurface`] (§1, `[AMBIENT-4]`): parse, call, print.
//! No business logic lives here.

pub mod args;

use std::io::Write;

pub use args::{Cli, Commands, QueryAction};

use crate::config::Settings;
use crate::io::envelope::{Envelope, ResultCode};
use crate::io::ExitCode;
use crate::pipeline::{self, AnalyzeOptions, CancellationToken};
use crate::query::{CypherError, ExploreKind, ImpactDirection, QuerySurface, SearchDepth};

/// Parses argv, dispatches, and returns the process exit code (§6: "exit
/// codes 0/1/other").
pub fn run() -> ExitCode {
    let cli = <Cli as clap::Parser>::parse();
    match dispatch(&cli) {
        Ok(code) => code,
        Err(err) => {
            report_error(cli.json, &err);
            ExitCode::GeneralError
        }
    }
}

fn dispatch(cli: &Cli) -> crate::Result<ExitCode> {
    match &cli.command {
        Commands::Init { force } => run_init(cli, *force),
        Commands::Analyze { path, force, skip_embeddings } => {
            run_analyze(cli, path.as_deref(), *force, *skip_embeddings)
        }
        Commands::Serve { bind } => run_serve(cli, bind),
        Commands::Mcp => run_mcp(cli),
        Commands::Query { action } => run_query(cli, action),
        Commands::Config => run_config(cli),
    }
}

fn settings_for(cli: &Cli) -> crate::Result<Settings> {
    Settings::load(&cli.repo)
}

fn run_init(cli: &Cli, force: bool) -> crate::Result<ExitCode> {
    let config_path = cli.repo.join(".gitnexus.toml");
    if config_path.exists() && !force {
        print_message(cli.json, "config already exists; pass --force to overwrite", ResultCode::InvalidQuery);
        return Ok(ExitCode::GeneralError);
    }

    let defaults = Settings::default();
    let toml = toml::to_string_pretty(&defaults)
        .map_err(|e| crate::error::GitNexusError::General(format!("failed to render default config: {e}")))?;
    std::fs::write(&config_path, toml)?;

    print_message(cli.json, &format!("wrote {}", config_path.display()), ResultCode::Ok);
    Ok(ExitCode::Success)
}

fn run_analyze(
    cli: &Cli,
    path: Option<&std::path::Path>,
    force: bool,
    skip_embeddings: bool,
) -> crate::Result<ExitCode> {
    let mut settings = settings_for(cli)?;
    if let Some(path) = path {
        settings.repo_path = settings.repo_path.join(path);
    }
    crate::logging::init_with_config(&settings.logging);

    let options = AnalyzeOptions { force, skip_embeddings };
    let cancel = CancellationToken::new();
    let report = pipeline::analyze(&settings, &options, &cancel)?;

    if cli.json {
        let envelope = Envelope::success(serde_json::json!({
            "upToDate": report.up_to_date,
            "files": report.files,
            "nodes": report.nodes,
            "edges": report.edges,
            "communities": report.communities,
            "processes": report.processes,
            "warnings": report.warnings,
        }));
        print_envelope(&envelope);
    } else if report.up_to_date {
        println!("already up to date ({} files, {} nodes, {} edges)", report.files, report.nodes, report.edges);
    } else {
        println!(
            "analyzed {} files: {} nodes, {} edges, {} communities, {} processes",
            report.files, report.nodes, report.edges, report.communities, report.processes
        );
        for warning in &report.warnings {
            eprintln!("warning: {warning}");
        }
    }

    Ok(ExitCode::Success)
}

fn run_serve(cli: &Cli, bind: &str) -> crate::Result<ExitCode> {
    #[cfg(feature = "http-server")]
    {
        let settings = settings_for(cli)?;
        crate::logging::init_with_config(&settings.logging);
        let surface = QuerySurface::load(&settings)?;
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| crate::error::GitNexusError::General(format!("failed to start async runtime: {e}")))?;
        runtime.block_on(crate::http::serve(surface, bind))?;
        Ok(ExitCode::Success)
    }
    #[cfg(not(feature = "http-server"))]
    {
        let _ = (cli, bind);
        print_message(cli.json, "this binary was built without the http-server feature", ResultCode::InternalError);
        Ok(ExitCode::UnsupportedOperation)
    }
}

fn run_mcp(cli: &Cli) -> crate::Result<ExitCode> {
    #[cfg(feature = "mcp-server")]
    {
        let settings = settings_for(cli)?;
        crate::logging::init_with_config(&settings.logging);
        let surface = QuerySurface::load(&settings)?;
        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| crate::error::GitNexusError::General(format!("failed to start async runtime: {e}")))?;
        runtime.block_on(crate::mcp::serve_stdio(surface, &settings))?;
        Ok(ExitCode::Success)
    }
    #[cfg(not(feature = "mcp-server"))]
    {
        let _ = cli;
        print_message(cli.json, "this binary was built without the mcp-server feature", ResultCode::InternalError);
        Ok(ExitCode::UnsupportedOperation)
    }
}

fn run_config(cli: &Cli) -> crate::Result<ExitCode> {
    let settings = settings_for(cli)?;
    if cli.json {
        let envelope = Envelope::success(serde_json::to_value(&settings).unwrap_or(serde_json::Value::Null));
        print_envelope(&envelope);
    } else {
        let toml = toml::to_string_pretty(&settings)
            .map_err(|e| crate::error::GitNexusError::General(format!("failed to render config: {e}")))?;
        println!("{toml}");
    }
    Ok(ExitCode::Success)
}

fn run_query(cli: &Cli, action: &QueryAction) -> crate::Result<ExitCode> {
    let settings = settings_for(cli)?;
    crate::logging::init_with_config(&settings.logging);
    let surface = QuerySurface::load(&settings)?;

    match action {
        QueryAction::Search { query, limit, full } => {
            let depth = if *full { SearchDepth::Full } else { SearchDepth::Shallow };
            let hits = surface.search(query, *limit, depth);
            if cli.json {
                print_envelope(&Envelope::success(serde_json::to_value(&hits).unwrap()).with_count(hits.len()));
            } else if hits.is_empty() {
                println!("no matches for '{query}'");
            } else {
                for hit in &hits {
                    println!("{:.3}  {}", hit.score, hit.file_path);
                    for id in &hit.expanded {
                        println!("      {id}");
                    }
                }
            }
        }
        QueryAction::Impact { target, direction, max_depth, min_confidence } => {
            let direction = match direction.as_str() {
                "upstream" => ImpactDirection::Upstream,
                _ => ImpactDirection::Downstream,
            };
            let report = surface.impact(target, direction, *max_depth, &[], *min_confidence)?;
            if cli.json {
                print_envelope(&Envelope::success(serde_json::to_value(&report).unwrap()));
            } else {
                println!("impact of '{}' ({}):", report.target, report.direction);
                for level in &report.levels {
                    println!("  depth {} [{}]: {}", level.depth, level.classification, level.node_ids.join(", "));
                }
            }
        }
        QueryAction::Explore { name, kind } => {
            let kind = match kind.as_str() {
                "cluster" => ExploreKind::Cluster,
                "process" => ExploreKind::Process,
                _ => ExploreKind::Symbol,
            };
            let report = surface.explore(name, kind)?;
            if cli.json {
                print_envelope(&Envelope::success(serde_json::to_value(&report).unwrap()));
            } else {
                println!("{} '{}':", report.kind, report.name);
                if !report.callers.is_empty() {
                    println!("  called by: {}", report.callers.join(", "));
                }
                if !report.callees.is_empty() {
                    println!("  calls: {}", report.callees.join(", "));
                }
                if let Some(community) = &report.community {
                    println!("  cluster: {community}");
                }
                if !report.members.is_empty() {
                    println!("  members: {}", report.members.join(", "));
                }
                if !report.steps.is_empty() {
                    println!("  steps: {}", report.steps.join(" -> "));
                }
            }
        }
        QueryAction::Overview => {
            let report = surface.overview();
            if cli.json {
                print_envelope(&Envelope::success(serde_json::to_value(&report).unwrap()));
            } else {
                println!("clusters:");
                for cluster in &report.clusters {
                    println!(
                        "  {} ({} symbols, cohesion {:.2})",
                        cluster.label, cluster.symbol_count, cluster.cohesion
                    );
                }
                println!("processes:");
                for process in &report.processes {
                    println!("  {} [{}] ({} steps)", process.label, process.process_type, process.step_count);
                }
            }
        }
        QueryAction::Cypher { query } => match surface.cypher(query) {
            Ok(rows) => {
                if cli.json {
                    print_envelope(&Envelope::success(serde_json::to_value(&rows).unwrap()).with_count(rows.len()));
                } else {
                    for row in &rows {
                        let rendered: Vec<String> =
                            row.columns.iter().map(|(var, node)| format!("{var}={}", node.name)).collect();
                        println!("{}", rendered.join("  "));
                    }
                }
            }
            Err(CypherError::Unsupported(q)) => {
                print_message(cli.json, &format!("unsupported cypher query: {q}"), ResultCode::InvalidQuery);
                return Ok(ExitCode::GeneralError);
            }
            Err(CypherError::UnknownVariable(v)) => {
                print_message(cli.json, &format!("query returns undeclared variable '{v}'"), ResultCode::InvalidQuery);
                return Ok(ExitCode::GeneralError);
            }
        },
    }

    Ok(ExitCode::Success)
}

fn report_error(json: bool, err: &crate::error::GitNexusError) {
    print_message(json, &err.to_string(), ResultCode::InternalError);
}

fn print_message(json: bool, message: &str, code: ResultCode) {
    if json {
        let envelope: Envelope<()> = Envelope::error(code, message);
        print_envelope(&envelope);
    } else {
        eprintln!("{message}");
    }
}

fn print_envelope<T: serde::Serialize>(envelope: &Envelope<T>) {
    match envelope.to_json() {
        Ok(json) => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            let _ = writeln!(handle, "{json}");
        }
        Err(_) => eprintln!("{}", envelope.message),
    }
}
