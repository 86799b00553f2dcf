mod config;
mod logging;

use std::path::{Path, PathBuf};
use std::process;

use causal_codegen::{BackendReport, CodegenError, PythonConfig};
use causal_core::CompileError;
use clap::{Parser, Subcommand, ValueEnum};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Causal-mapping rule compiler.
#[derive(Parser)]
#[command(name = "causalc", version, about = "Causal-mapping rule compiler")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log compiler stages at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Path to a causalc.toml configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write the stage log to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile rules into the recognizer and decomposer Python modules
    Compile {
        /// Path to the rule source file (or the source itself with --text)
        source: String,
        /// Output directory for the generated modules
        #[arg(long)]
        out: Option<PathBuf>,
        /// Treat SOURCE as literal rule text instead of a path
        #[arg(long)]
        text: bool,
    },

    /// Run both backends without writing any file
    Check {
        /// Path to the rule source file (or the source itself with --text)
        source: String,
        /// Treat SOURCE as literal rule text instead of a path
        #[arg(long)]
        text: bool,
    },

    /// Print the token stream of a rule source
    Tokens {
        /// Path to the rule source file (or the source itself with --text)
        source: String,
        /// Treat SOURCE as literal rule text instead of a path
        #[arg(long)]
        text: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(msg) => {
            report_error(&msg, cli.output, cli.quiet);
            process::exit(1);
        }
    };

    let log_file = cli.log_file.as_deref().or(config.log.file.as_deref());
    let level = config.log.level.as_deref().unwrap_or("info");
    if let Err(msg) = logging::init(level, cli.verbose, cli.quiet, log_file) {
        report_error(&msg, cli.output, cli.quiet);
        process::exit(1);
    }

    match cli.command {
        Commands::Compile { source, out, text } => {
            let src = read_source(&source, text, cli.output, cli.quiet);
            let python = match config.python_config(out.as_deref()) {
                Ok(p) => p,
                Err(msg) => {
                    report_error(&msg, cli.output, cli.quiet);
                    process::exit(1);
                }
            };
            cmd_compile(&src, &python, cli.output, cli.quiet);
        }
        Commands::Check { source, text } => {
            let src = read_source(&source, text, cli.output, cli.quiet);
            cmd_check(&src, cli.output, cli.quiet);
        }
        Commands::Tokens { source, text } => {
            let src = read_source(&source, text, cli.output, cli.quiet);
            cmd_tokens(&src, cli.output, cli.quiet);
        }
    }
}

fn read_source(source: &str, text: bool, output: OutputFormat, quiet: bool) -> String {
    if text {
        return source.to_owned();
    }
    let path = Path::new(source);
    match std::fs::read_to_string(path) {
        Ok(s) => {
            tracing::info!(path = %path.display(), bytes = s.len(), "source loaded");
            s
        }
        Err(e) => {
            let msg = format!("error reading '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_compile(src: &str, python: &PythonConfig, output: OutputFormat, quiet: bool) {
    let reports = causal_codegen::generate_python(src, python);
    let failed = reports.iter().any(|r| r.result.is_err());

    match output {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = reports.iter().map(report_json).collect();
            let json = serde_json::to_string_pretty(&serde_json::json!({ "backends": entries }))
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            if failed {
                eprintln!("{}", json);
            } else if !quiet {
                println!("{}", json);
            }
        }
        OutputFormat::Text => {
            for report in &reports {
                match &report.result {
                    Ok(path) => {
                        if !quiet {
                            println!("wrote {} {}", report.backend, path.display());
                        }
                    }
                    Err(e) => eprintln!("{} failed: {}", report.backend, e),
                }
            }
        }
    }

    if failed {
        process::exit(1);
    }
}

fn report_json(report: &BackendReport) -> serde_json::Value {
    match &report.result {
        Ok(path) => serde_json::json!({
            "backend": report.backend.to_string(),
            "ok": true,
            "path": path.display().to_string(),
        }),
        Err(e) => serde_json::json!({
            "backend": report.backend.to_string(),
            "ok": false,
            "error": e.to_json_value(),
        }),
    }
}

fn cmd_check(src: &str, output: OutputFormat, quiet: bool) {
    // Each backend parses on its own, as it would when compiling.
    let recognizer = causal_core::parse_source(src)
        .and_then(|p| causal_codegen::compile_recognizer(&p).map(|out| (p.rules.len(), out.m)));
    let decomposer =
        causal_core::parse_source(src).and_then(|p| causal_codegen::compile_decomposer(&p));

    let failed = recognizer.is_err() || decomposer.is_err();

    match output {
        OutputFormat::Json => {
            let rec = match &recognizer {
                Ok((rules, m)) => serde_json::json!({ "ok": true, "rules": rules, "m": m }),
                Err(e) => serde_json::json!({ "ok": false, "error": e.to_json_value() }),
            };
            let dec = match &decomposer {
                Ok(table) => serde_json::json!({
                    "ok": true,
                    "methods": table
                        .methods
                        .iter()
                        .map(|m| serde_json::json!({
                            "intention": m.name,
                            "procedure": m.ident,
                            "reductions": m.reductions.len(),
                        }))
                        .collect::<Vec<_>>(),
                }),
                Err(e) => serde_json::json!({ "ok": false, "error": e.to_json_value() }),
            };
            let json = serde_json::to_string_pretty(&serde_json::json!({
                "recognizer": rec,
                "decomposer": dec,
            }))
            .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            if failed {
                eprintln!("{}", json);
            } else if !quiet {
                println!("{}", json);
            }
        }
        OutputFormat::Text => {
            match &recognizer {
                Ok((rules, m)) => {
                    if !quiet {
                        println!("recognizer: ok ({} rules, M = {})", rules, m);
                    }
                }
                Err(e) => eprintln!("recognizer failed: {}", describe(e)),
            }
            match &decomposer {
                Ok(table) => {
                    if !quiet {
                        let reductions: usize =
                            table.methods.iter().map(|m| m.reductions.len()).sum();
                        println!(
                            "decomposer: ok ({} methods, {} reductions)",
                            table.methods.len(),
                            reductions
                        );
                    }
                }
                Err(e) => eprintln!("decomposer failed: {}", describe(e)),
            }
        }
    }

    if failed {
        process::exit(1);
    }
}

fn describe(e: &CompileError) -> String {
    CodegenError::Compile(e.clone()).to_string()
}

fn cmd_tokens(src: &str, output: OutputFormat, quiet: bool) {
    let tokens = match causal_core::lexer::lex(src) {
        Ok(t) => t,
        Err(e) => {
            match output {
                OutputFormat::Json => {
                    let err_json = serde_json::to_string_pretty(&e.to_json_value())
                        .unwrap_or_else(|_| format!("{{\"error\": \"{:?}\"}}", e));
                    eprintln!("{}", err_json);
                }
                OutputFormat::Text => {
                    if !quiet {
                        eprintln!("{}: {}", e.kind(), e);
                    }
                }
            }
            process::exit(1);
        }
    };

    if quiet {
        return;
    }
    match output {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = tokens
                .iter()
                .map(|t| serde_json::json!({ "line": t.line, "token": t.token.to_string() }))
                .collect();
            let json = serde_json::to_string_pretty(&entries)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
            println!("{}", json);
        }
        OutputFormat::Text => {
            for t in &tokens {
                println!("{:>4}  {}", t.line, t.token);
            }
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{{\"error\": \"{}\"}}", msg.replace('"', "\\\""));
        }
    }
}
