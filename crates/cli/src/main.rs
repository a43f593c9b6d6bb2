use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use fdrill_core::PipeOps;
#[cfg(unix)]
use fdrill_core::SystemPipeOps;
use fdrill_harness::{Drill, DrillReport, FaultKind, Harness, Journal, SimPipeOps};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "fdrill")]
#[command(about = "Drills a move-only descriptor handle through failure scenarios", long_about = None)]
#[command(version)]
struct Cli {
    /// Drill to run
    #[arg(value_enum, default_value = "fault")]
    drill: DrillArg,

    /// Backend the drill runs against
    #[arg(long, value_enum, default_value = "sim")]
    backend: BackendArg,

    /// Flavour of the injected fault
    #[arg(long, value_enum, default_value = "direct")]
    fault: FaultArg,

    /// Script the simulated backend to fail every close
    #[arg(long)]
    fail_close: bool,

    /// Print the drill report as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum DrillArg {
    Fault,
    Descent,
    Smoke,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Sim,
    System,
}

#[derive(Clone, Copy, ValueEnum)]
enum FaultArg {
    Direct,
    External,
}

impl From<DrillArg> for Drill {
    fn from(drill: DrillArg) -> Self {
        match drill {
            DrillArg::Fault => Drill::Fault,
            DrillArg::Descent => Drill::Descent,
            DrillArg::Smoke => Drill::Smoke,
        }
    }
}

impl From<FaultArg> for FaultKind {
    fn from(fault: FaultArg) -> Self {
        match fault {
            FaultArg::Direct => FaultKind::Direct,
            FaultArg::External => FaultKind::External,
        }
    }
}

fn main() -> eyre::Result<ExitCode> {
    init_tracing()?;

    // Parse command-line arguments
    let cli = Cli::parse();

    let journal = Journal::new();
    let ops: Arc<dyn PipeOps> = match cli.backend {
        BackendArg::Sim => {
            let sim = Arc::new(SimPipeOps::new(journal.clone()));
            if cli.fail_close {
                sim.fail_all_closes();
            }
            sim
        }
        BackendArg::System => {
            if cli.fail_close {
                eyre::bail!("--fail-close only applies to the sim backend");
            }
            system_ops()?
        }
    };

    let drill = Drill::from(cli.drill);
    let harness = Harness::new(ops, journal);
    let outcome = harness.run(drill, cli.fault.into());

    if cli.json {
        let report = DrillReport::new(drill, &outcome, harness.journal());
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let code = match &outcome {
        Ok(()) => {
            tracing::info!(%drill, "drill completed");
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!(%drill, %error, "drill failed");
            ExitCode::from(1)
        }
    };
    tracing::info!("exit");
    Ok(code)
}

#[cfg(unix)]
fn system_ops() -> eyre::Result<Arc<dyn PipeOps>> {
    Ok(Arc::new(SystemPipeOps::new()))
}

#[cfg(not(unix))]
fn system_ops() -> eyre::Result<Arc<dyn PipeOps>> {
    eyre::bail!("the system backend is only available on unix")
}

/// Initialize the tracing system
///
/// Drills run non-interactively, so a compact formatter on stderr is all
/// the observability surface there is; `RUST_LOG` narrows it.
fn init_tracing() -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .compact()
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
