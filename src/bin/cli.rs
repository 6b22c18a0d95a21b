use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kubetaint::analysis::identifier::Verdict;
use kubetaint::config::Config;
use kubetaint::error::TaintError;
use kubetaint::graph::export;
use kubetaint::output::OutputFormat;
use kubetaint::rules::Confidence;
use kubetaint::{ScanOptions, CONFIG_FILE};

#[derive(Parser)]
#[command(
    name = "kubetaint",
    about = "Static secret-leak detector for Kubernetes manifests",
    version,
    author
)]
struct Cli {
    /// Debug logging (overridden by KUBETAINT_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan manifests for secrets that reach logs, stdout or the network
    Scan {
        /// Manifest file or directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output format (console, json, sarif)
        #[arg(long, short = 'f', default_value = "console")]
        format: String,

        /// Minimum confidence to fail (low, medium, high)
        #[arg(long)]
        fail_on: Option<String>,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Print the taint graph of every manifest unit
    Graph {
        /// Manifest file or directory
        path: PathBuf,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Graph format (dot, mermaid)
        #[arg(long, short = 'f', default_value = "dot")]
        format: String,
    },

    /// Check user names against the identifier heuristics
    CheckIdentifier {
        /// Values to check
        #[arg(required = true)]
        values: Vec<String>,

        /// Config file path (for [identifiers] bounds)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// List the sink patterns in effect
    ListSinks {
        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,
    },

    /// Generate a starter .kubetaint.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Scan {
            path,
            config,
            format,
            fail_on,
            output,
        } => cmd_scan(path, config, format, fail_on, output),
        Commands::Graph {
            path,
            config,
            format,
        } => cmd_graph(path, config, format),
        Commands::CheckIdentifier { values, config } => cmd_check_identifier(values, config),
        Commands::ListSinks { config, format } => cmd_list_sinks(config, format),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("KUBETAINT_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_config(path: &Path, config: Option<PathBuf>) -> Result<Config, TaintError> {
    kubetaint::load_config(path, config.as_deref())
}

fn cmd_scan(
    path: PathBuf,
    config: Option<PathBuf>,
    format_str: String,
    fail_on_str: Option<String>,
    output_path: Option<PathBuf>,
) -> Result<i32, TaintError> {
    let format = OutputFormat::from_str_lenient(&format_str).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", format_str);
        OutputFormat::Console
    });

    let fail_on = fail_on_str.and_then(|s| {
        let confidence = Confidence::from_str_lenient(&s);
        if confidence.is_none() {
            eprintln!("Warning: unknown confidence '{}', using config default", s);
        }
        confidence
    });

    let options = ScanOptions {
        config_path: config,
        format,
        fail_on_override: fail_on,
        cancel: None,
    };

    let report = kubetaint::scan(&path, &options)?;
    let rendered = kubetaint::render_report(&report, format)?;

    match output_path {
        Some(out) => std::fs::write(&out, &rendered)?,
        None => print!("{}", rendered),
    }

    // Exit code: 0 = pass, 1 = findings at or above threshold
    Ok(if report.verdict.pass { 0 } else { 1 })
}

fn cmd_graph(path: PathBuf, config: Option<PathBuf>, format: String) -> Result<i32, TaintError> {
    let render: fn(&kubetaint::TaintGraph) -> String = match format.as_str() {
        "dot" => export::to_dot,
        "mermaid" => export::to_mermaid,
        other => {
            return Err(TaintError::Output(format!(
                "unknown graph format '{other}' (expected dot or mermaid)"
            )))
        }
    };
    let config = load_config(&path, config)?;
    for graph in kubetaint::build_graphs(&path, &config)? {
        println!("// {}", graph.unit());
        println!("{}", render(&graph));
    }
    Ok(0)
}

fn cmd_check_identifier(values: Vec<String>, config: Option<PathBuf>) -> Result<i32, TaintError> {
    let config = load_config(Path::new("."), config)?;
    let mut failed = false;
    for value in &values {
        let verdict = config.identifiers.check(value);
        failed |= verdict != Verdict::Ok;
        println!("{:<12} {:?}", verdict.to_string(), value);
    }
    Ok(if failed { 1 } else { 0 })
}

fn cmd_list_sinks(config: Option<PathBuf>, format_str: String) -> Result<i32, TaintError> {
    let config = load_config(Path::new("."), config)?;
    let matcher = config.sinks.matcher()?;
    let patterns: Vec<_> = matcher.patterns().collect();

    match format_str.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&patterns)?;
            println!("{}", json);
        }
        _ => {
            println!("{:<20} {:<8} REGEX", "NAME", "KIND");
            println!("{}", "-".repeat(72));
            for p in &patterns {
                println!("{:<20} {:<8} {}", p.name, p.kind.to_string(), p.regex);
            }
        }
    }

    Ok(0)
}

fn cmd_init(force: bool) -> Result<i32, TaintError> {
    let path = PathBuf::from(CONFIG_FILE);

    if path.exists() && !force {
        eprintln!("{CONFIG_FILE} already exists. Use --force to overwrite.");
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created {CONFIG_FILE}");

    Ok(0)
}
