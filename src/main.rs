//! mmlengine - run macro invocations against a track controller.
//!
//! Each positional argument is one macro invocation (`NAME arg arg ...`),
//! executed in order against a single track. Output goes either to the
//! textual event form on stdout or to a live MIDI sink.
//!
//! # Usage
//!
//! ```bash
//! mmlengine "o 5" "l 8" c d e "B_ 0,-200,0,4"   # text output
//! mmlengine --sink live c d e                     # dry run, raw bytes as hex
//! mmlengine --list-macros                          # JSON macro table
//! ```
//!
//! Set `RUST_LOG=mmlengine=debug` for per-command logging.

use anyhow::{Context, Result};
use mmlengine::macros::parse_invocation;
use mmlengine::{EngineConfig, LiveSink, MacroTable, Sink, TextSink, TrackController};
use std::io::{self, Write};
use std::path::PathBuf;

/// Which sink receives the primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SinkKind {
    Text,
    Live,
}

/// Command-line options for the application.
struct CliOptions {
    /// JSON configuration file.
    config: Option<PathBuf>,
    sink: SinkKind,
    /// Output port index for the live sink.
    port: Option<usize>,
    list_macros: bool,
    list_ports: bool,
    /// Macro invocations, in order.
    commands: Vec<String>,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `--config <path>` or `-c <path>`: load channel defaults from JSON
    /// - `--sink text|live` or `-s`: choose the output sink
    /// - `--port <index>` or `-p`: MIDI output port for the live sink
    /// - `--list-macros`: print the macro table as JSON and exit
    /// - `--list-ports`: print available MIDI output ports and exit
    /// - `--help` or `-h`: print help and exit
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut options = CliOptions {
            config: None,
            sink: SinkKind::Text,
            port: None,
            list_macros: false,
            list_ports: false,
            commands: Vec::new(),
        };
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--config" | "-c" => {
                    i += 1;
                    let path = args
                        .get(i)
                        .context("--config requires a path argument")?;
                    options.config = Some(PathBuf::from(path));
                }
                "--sink" | "-s" => {
                    i += 1;
                    options.sink = match args.get(i).map(String::as_str) {
                        Some("text") => SinkKind::Text,
                        Some("live") => SinkKind::Live,
                        Some(other) => anyhow::bail!("unknown sink: {}", other),
                        None => anyhow::bail!("--sink requires text or live"),
                    };
                }
                "--port" | "-p" => {
                    i += 1;
                    let index = args.get(i).context("--port requires an index")?;
                    options.port = Some(
                        index
                            .parse()
                            .with_context(|| format!("invalid port index: {}", index))?,
                    );
                }
                "--list-macros" => options.list_macros = true,
                "--list-ports" => options.list_ports = true,
                "--help" | "-h" => {
                    eprintln!("mmlengine - Music Macro Language runtime");
                    eprintln!();
                    eprintln!(
                        "Usage: {} [OPTIONS] [MACRO...]",
                        args.first().map(String::as_str).unwrap_or("mmlengine")
                    );
                    eprintln!();
                    eprintln!("Options:");
                    eprintln!("  -c, --config PATH   Load engine configuration from JSON");
                    eprintln!("  -s, --sink KIND     Output sink: text (default) or live");
                    eprintln!("  -p, --port INDEX    MIDI output port for the live sink");
                    eprintln!("      --list-macros   Print the macro table as JSON");
                    eprintln!("      --list-ports    Print available MIDI output ports");
                    eprintln!("  -h, --help          Print this help message");
                    eprintln!();
                    eprintln!("Each MACRO is a name followed by its arguments, e.g. \"n 64 48\".");
                    std::process::exit(0);
                }
                other => options.commands.push(other.to_string()),
            }
            i += 1;
        }

        Ok(options)
    }
}

/// Runs every invocation in order, stopping at the first failure.
fn run_commands<S: Sink>(tc: &mut TrackController<S>, commands: &[String]) -> Result<()> {
    let table = MacroTable::global();
    for command in commands {
        let Some((name, args)) = parse_invocation(command) else {
            continue;
        };
        table
            .invoke(tc, &name, &args)
            .with_context(|| format!("failed to run `{}`", command))?;
        tracing::debug!(command = command.as_str(), position = tc.position(), "ran macro");
    }
    tracing::info!(position = tc.position(), "finished");
    Ok(())
}

#[cfg(feature = "midir")]
fn list_ports() -> Result<()> {
    for (index, name) in mmlengine::sink::live::MidirPort::enumerate()?.iter().enumerate() {
        println!("{}: {}", index, name);
    }
    Ok(())
}

#[cfg(not(feature = "midir"))]
fn list_ports() -> Result<()> {
    anyhow::bail!("built without MIDI port support; rebuild with `--features midir`")
}

#[cfg(feature = "midir")]
fn run_on_port(index: usize, config: &EngineConfig, commands: &[String]) -> Result<()> {
    let port = mmlengine::sink::live::MidirPort::open(index)?;
    tracing::info!("opened MIDI output {}", port.name());
    let mut tc = TrackController::with_config(LiveSink::new(port), config);
    run_commands(&mut tc, commands)
}

#[cfg(not(feature = "midir"))]
fn run_on_port(_index: usize, _config: &EngineConfig, _commands: &[String]) -> Result<()> {
    anyhow::bail!("built without MIDI port support; rebuild with `--features midir`")
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if cli.list_macros {
        println!("{}", MacroTable::global().to_json()?);
        return Ok(());
    }
    if cli.list_ports {
        return list_ports();
    }

    let config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match (cli.sink, cli.port) {
        (SinkKind::Text, _) => {
            let sink = TextSink::new(io::stdout().lock());
            let mut tc = TrackController::with_config(sink, &config);
            run_commands(&mut tc, &cli.commands)?;
            let (mut out, _) = tc.into_sink().into_inner();
            writeln!(out)?;
            out.flush()?;
        }
        (SinkKind::Live, Some(index)) => run_on_port(index, &config, &cli.commands)?,
        (SinkKind::Live, None) => {
            // dry run: capture and print the raw bytes
            let mut tc = TrackController::with_config(LiveSink::new(Vec::<Vec<u8>>::new()), &config);
            run_commands(&mut tc, &cli.commands)?;
            for message in tc.into_sink().into_port() {
                let hex: Vec<String> = message.iter().map(|b| format!("{:02X}", b)).collect();
                println!("{}", hex.join(" "));
            }
        }
    }

    Ok(())
}
