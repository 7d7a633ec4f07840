use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use stock_allocator::allocation::config::{AllocationConfig, PolicyKind};
use stock_allocator::error::Result;
use stock_allocator::io::sample::{generate_sample, SampleParams};
use stock_allocator::io::summary::InputOverview;
use stock_allocator::io::workbook::{read_tables, write_tables};
use stock_allocator::{allocate_tables, init_tracing};

#[derive(Debug, Parser)]
#[command(
    name = "stock-allocator",
    version,
    about = "Allocates monthly stock to clients by priority and minimum demand"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the allocation over a workbook directory and export the results
    Run {
        /// Directory holding the three input tables
        #[arg(short, long)]
        input: PathBuf,
        /// Directory for the result tables
        #[arg(short, long)]
        output: PathBuf,
        /// Overrides the policy from the config file
        #[arg(long, value_enum)]
        policy: Option<PolicyKind>,
        /// TOML config file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print an overview of a workbook without allocating
    Summary {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write a reproducible sample workbook
    Sample {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 5)]
        products: usize,
        #[arg(long, default_value_t = 4)]
        clients: usize,
        #[arg(long, default_value_t = 6)]
        months: u32,
    },
}

fn load_config(path: Option<&Path>) -> Result<AllocationConfig> {
    match path {
        Some(path) => AllocationConfig::load(path),
        None => Ok(AllocationConfig::default()),
    }
}

fn execute(command: Command) -> Result<()> {
    match command {
        Command::Run {
            input,
            output,
            policy,
            config,
        } => {
            // 1. SETUP CONFIGURATION
            let mut config = load_config(config.as_deref())?;
            if let Some(policy) = policy {
                config.policy = policy;
            }

            println!("=== {} ===", config.policy.sheet_title());
            let tables = read_tables(&input, &config.tables)?;
            println!("{}", InputOverview::from_tables(&tables));

            // 2. RUN AND EXPORT
            let summary = allocate_tables(&tables, &output, &config)?;

            // 3. PRINT TOTALS
            println!("\n{}", summary);
            println!("Asignación completada. Resultados en {}", output.display());
        }
        Command::Summary { input, config } => {
            let config = load_config(config.as_deref())?;
            let tables = read_tables(&input, &config.tables)?;
            println!("Resumen del archivo cargado");
            println!("{}", InputOverview::from_tables(&tables));
        }
        Command::Sample {
            output,
            seed,
            products,
            clients,
            months,
        } => {
            let params = SampleParams {
                products,
                clients,
                months,
                seed,
                ..SampleParams::default()
            };
            let tables = generate_sample(&params)?;
            write_tables(&output, &AllocationConfig::default().tables, &tables)?;
            println!(
                "Archivo de prueba escrito en {} ({} filas de stock, {} mínimos)",
                output.display(),
                tables.stock.len(),
                tables.minimums.len()
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error al procesar el archivo: {}", e);
            ExitCode::FAILURE
        }
    }
}
