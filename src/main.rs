use clap::{CommandFactory, Parser, Subcommand, builder::styling, error::ErrorKind};
use eyre::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use tabload::{cli, elastic::IndexSelector};

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// tabload: extract tabular files, normalize them and bulk-load them into Elasticsearch
#[derive(Parser)]
#[command(
    name = "tabload",
    version,
    styles = STYLES,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// The dotenv file to source credentials from
    #[arg(short, long, global = true, default_value = ".env")]
    env: PathBuf,

    /// More verbose logging
    #[arg(long, global = true)]
    debug: bool,

    /// Configuration file describing the processes and the Elasticsearch connection
    #[arg(short, long, global = true, default_value = "./conf/config.json")]
    config: PathBuf,

    /// File or directory to load; a directory has all of its files loaded
    #[arg(short = 'f', long)]
    source_path: Option<PathBuf>,

    /// Name of the process to run, or "all"
    #[arg(short, long, default_value = "all")]
    process: String,

    /// Destination index, replacing the one configured for the process
    #[arg(short, long)]
    indice: Option<String>,

    /// Index maintenance command
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the indices of a mappings file that do not exist yet
    InitIndex {
        /// JSON or YAML document mapping index names to their definition
        #[arg(default_value = "./conf/mappings.json")]
        mappings: PathBuf,

        /// Index to create: a name, "all" or "none"
        #[arg(short, long, default_value = "all")]
        indice: IndexSelector,
    },

    /// Delete the indices of a mappings file that exist
    CleanIndex {
        /// JSON or YAML document mapping index names to their definition
        #[arg(default_value = "./conf/mappings.json")]
        mappings: PathBuf,

        /// Index to delete: a name, "all" or "none"
        #[arg(short, long, default_value = "all")]
        indice: IndexSelector,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let dotenv = dotenvy::from_path(&cli.env);

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    if let Err(e) = dotenv {
        log::debug!("No credentials sourced from {}: {}", cli.env.display(), e);
    }

    match cli.command {
        Some(Commands::InitIndex { mappings, indice }) => {
            log::info!(
                "Creating {} indices from {}",
                indice.cyan(),
                mappings.display().bright_black()
            );
            let created = cli::init_index(&cli.config, &mappings, &indice).await?;
            log::info!("{} index(es) created", created.len().green());
        }
        Some(Commands::CleanIndex { mappings, indice }) => {
            log::info!(
                "Deleting {} indices from {}",
                indice.cyan(),
                mappings.display().bright_black()
            );
            let deleted = cli::clean_index(&cli.config, &mappings, &indice).await?;
            log::info!("{} index(es) deleted", deleted.len().green());
        }
        None => {
            let Some(source) = cli.source_path else {
                Cli::command()
                    .error(
                        ErrorKind::MissingRequiredArgument,
                        "the following required arguments were not provided: --source-path <SOURCE_PATH>",
                    )
                    .exit();
            };
            log::info!(
                "Running {} process(es) from {} on {}",
                cli.process.cyan(),
                cli.config.display().bright_black(),
                source.display().bright_black()
            );

            let reports =
                cli::run_processes(&cli.config, &source, &cli.process, cli.indice.as_deref())
                    .await?;

            let success: usize = reports.iter().map(|r| r.success).sum();
            let failed: usize = reports.iter().map(|r| r.failed).sum();
            log::info!(
                "{} file(s) processed: {} documents loaded, {} failed",
                reports.len(),
                success.green(),
                match failed {
                    0 => failed.to_string().green().to_string(),
                    _ => failed.to_string().red().to_string(),
                }
            );
        }
    }

    Ok(())
}
