//! procscope - interactive process inspector
//!
//! The entry point for the `pscope` binary:
//! - No subcommand: the interactive navigation engine
//! - `list`, `show`, `sections`: one-shot reports on stdout
//! - `monitor`: a live output session on the current terminal

use clap::{Args, Parser, Subcommand, ValueEnum};
use pscope_common::{Error, ProcessRef};
use pscope_core::collect::{search, ProcessSnapshot, SectionCategory};
use pscope_core::config::{InspectorArgs, InspectorConfig};
use pscope_core::exit_codes::ExitCode;
use pscope_core::logging::{event_names, init_logging, LogConfig, Stage};
use pscope_core::monitor::{MonitorSession, MonitorState};
use pscope_core::tui::screens::detail::snapshot_report;
use pscope_core::tui::{run_tui, CrosstermSurface, SurfaceConsole};
use tracing::{error, info, info_span};

/// procscope - inspect, drill into and watch live processes
#[derive(Parser)]
#[command(name = "pscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    global: InspectorArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// List running processes
    List(ListArgs),

    /// Show the collected facts for one process
    Show(ShowArgs),

    /// Print advanced sections (maps, fd, cwd, exe, limits) for one process
    Sections(SectionsArgs),

    /// Stream what a process writes, and forward typed lines to its stdin
    Monitor(MonitorArgs),
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Keep processes whose pid or command contains this text (case-insensitive)
    #[arg(long, short = 's')]
    search: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShowFormat {
    Human,
    Json,
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Process id
    pid: String,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = ShowFormat::Human)]
    format: ShowFormat,
}

#[derive(Args, Debug)]
struct SectionsArgs {
    /// Process id
    pid: String,

    /// Only this category
    #[arg(long, short = 'c')]
    category: Option<SectionCategory>,
}

#[derive(Args, Debug)]
struct MonitorArgs {
    /// Process id
    pid: String,
}

fn main() {
    let cli = Cli::parse();
    let config = InspectorConfig::from(&cli.global);

    // The terminal belongs to the UI or the monitor; keep records off it.
    let log_config = match cli.command {
        None | Some(Commands::Monitor(_)) => config.interactive_log_config(),
        Some(_) => config.log_config(),
    };
    if let Err(e) = start_logging(&log_config) {
        eprintln!("pscope: cannot open log file: {e}");
        std::process::exit(ExitCode::ArgsError.as_i32());
    }

    let exit_code = match &cli.command {
        None => run_interactive(&config),
        Some(Commands::List(args)) => run_list(&config, args),
        Some(Commands::Show(args)) => run_show(&config, args),
        Some(Commands::Sections(args)) => run_sections(&config, args),
        Some(Commands::Monitor(args)) => run_monitor(&config, args),
    };

    info!(
        event = event_names::RUN_FINISHED,
        exit_code = exit_code.as_i32(),
        "pscope finished"
    );
    std::process::exit(exit_code.as_i32());
}

fn start_logging(config: &LogConfig) -> std::io::Result<()> {
    init_logging(config)?;
    info!(
        event = event_names::RUN_STARTED,
        stage = %Stage::Init,
        version = env!("CARGO_PKG_VERSION"),
        "pscope starting"
    );
    Ok(())
}

/// Print an error for a one-shot command and pick its exit code.
fn fail(err: &Error) -> ExitCode {
    eprintln!("{}", err.to_human());
    ExitCode::for_error(err)
}

// ============================================================================
// Commands
// ============================================================================

fn run_interactive(config: &InspectorConfig) -> ExitCode {
    let ctx = config.nav_context();
    let result = match CrosstermSurface::new() {
        Ok(mut surface) => {
            let result = run_tui(&mut surface, &ctx);
            // Leave the alternate screen before anything is printed.
            let restored = surface.restore();
            result.and(restored)
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::Clean,
        Err(e) => {
            error!(event = event_names::INTERNAL_ERROR, error = %e, "interactive session failed");
            fail(&e.into())
        }
    }
}

fn run_list(config: &InspectorConfig, args: &ListArgs) -> ExitCode {
    let listing = config.directory().list_processes();
    if let Some(diagnostic) = &listing.diagnostic {
        eprintln!("{diagnostic}");
    }

    let processes = match &args.search {
        Some(term) => search(&listing.processes, term),
        None => listing.processes,
    };

    println!("{:>7}  COMMAND", "PID");
    for process in &processes {
        println!("{:>7}  {}", process.pid, process.command);
    }
    ExitCode::Clean
}

fn run_show(config: &InspectorConfig, args: &ShowArgs) -> ExitCode {
    let snapshot = match config.collector().collect(&args.pid) {
        Ok(snapshot) => snapshot,
        Err(e) => return fail(&e),
    };

    match args.format {
        ShowFormat::Human => {
            let process = ProcessRef::new(args.pid.clone(), command_of(&snapshot));
            print!("{}", snapshot_report(&process, &snapshot));
            ExitCode::Clean
        }
        ShowFormat::Json => match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => {
                println!("{json}");
                ExitCode::Clean
            }
            Err(e) => fail(&Error::Collection(format!("cannot serialize snapshot: {e}"))),
        },
    }
}

/// The command line of a snapshot, falling back to the status name.
fn command_of(snapshot: &ProcessSnapshot) -> String {
    ["cmdline", "Name"]
        .iter()
        .filter_map(|key| snapshot.get(key).and_then(|v| v.as_text()))
        .find(|text| !text.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn run_sections(config: &InspectorConfig, args: &SectionsArgs) -> ExitCode {
    let procfs = config.procfs();
    if !procfs.exists(&args.pid) {
        return fail(&Error::not_found(args.pid.clone()));
    }

    let categories: Vec<SectionCategory> = match args.category {
        Some(category) => vec![category],
        None => SectionCategory::ALL.to_vec(),
    };
    for (i, category) in categories.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("=== {} ===", category.title());
        for line in pscope_core::collect::resolve(&procfs, &args.pid, *category) {
            println!("{line}");
        }
    }
    ExitCode::Clean
}

fn run_monitor(config: &InspectorConfig, args: &MonitorArgs) -> ExitCode {
    let span = info_span!("monitor_command", stage = %Stage::Monitor, pid = %args.pid);
    let _guard = span.enter();

    let procfs = config.procfs();
    let mut surface = match CrosstermSurface::inline() {
        Ok(surface) => surface,
        Err(e) => return fail(&e.into()),
    };
    let report = {
        let mut console = SurfaceConsole::new(&mut surface);
        MonitorSession::new(&procfs, args.pid.clone(), config.monitor()).run(&mut console)
    };
    if let Err(e) = surface.restore() {
        eprintln!("pscope: {e}");
    }

    match report.failure {
        Some(failure) => ExitCode::for_error(&failure.into()),
        None if matches!(report.final_state, MonitorState::Failed(_)) => ExitCode::InternalError,
        None => ExitCode::Clean,
    }
}
