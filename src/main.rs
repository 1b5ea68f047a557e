use clap::{Parser, Subcommand};
use colored::*;
use stress_test::{stress_test_kv, stress_test_scaling, stress_test_text, HarnessError};
use tracing::error;

// ─── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "lapis")]
#[command(about = "Concurrent submission stress harness for the Lapis OT core")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Plain-text document edited by stale concurrent clients
    Text {
        #[arg(short, long, default_value_t = 4)]
        clients: usize,
        #[arg(short, long, default_value_t = 100)]
        edits: usize,
        /// Ops a submission may lag behind the head
        #[arg(short, long, default_value_t = 8)]
        max_lag: u64,
    },
    /// Key-value document edited by stale concurrent clients
    Kv {
        #[arg(short, long, default_value_t = 4)]
        clients: usize,
        #[arg(short, long, default_value_t = 100)]
        edits: usize,
        #[arg(short, long, default_value_t = 8)]
        max_lag: u64,
    },
    /// Text runs at a growing number of clients
    Scaling {
        #[arg(long, default_value_t = 16)]
        max_clients: usize,
        #[arg(long, default_value_t = 4)]
        step: usize,
    },
    /// Every suite at its default size (the default)
    All,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            error!("Runtime failed to start: {}", err);
            std::process::exit(1);
        }
    };

    match rt.block_on(run(cli.command.unwrap_or(Commands::All))) {
        Ok(()) => println!(
            "\n{} {}",
            "✓".bright_green().bold(),
            "All stress runs replayed to the committed snapshot!"
                .bright_green()
                .bold()
        ),
        Err(err) => {
            println!("\n{} {}", "✗".bright_red().bold(), err.to_string().bright_red().bold());
            error!("Stress test failed: {}", err);
            std::process::exit(1);
        }
    }
}

async fn run(command: Commands) -> Result<(), HarnessError> {
    match command {
        Commands::Text {
            clients,
            edits,
            max_lag,
        } => stress_test_text(clients, edits, max_lag).await?.print(),
        Commands::Kv {
            clients,
            edits,
            max_lag,
        } => stress_test_kv(clients, edits, max_lag).await?.print(),
        Commands::Scaling { max_clients, step } => stress_test_scaling(max_clients, step).await?,
        Commands::All => {
            println!("\n\n╔════════════════════════════════════════════════════════════╗");
            println!("║            CONCURRENT SUBMISSION STRESS TESTS              ║");
            println!("╚════════════════════════════════════════════════════════════╝");

            // Test 1: text with small scale
            stress_test_text(4, 100, 8).await?.print();

            // Test 2: key-value with small scale
            stress_test_kv(4, 100, 8).await?.print();

            // Test 3: text with medium scale and very stale clients
            stress_test_text(10, 300, 40).await?.print();

            // Test 4: scaling analysis
            stress_test_scaling(16, 4).await?;
        }
    }
    Ok(())
}
