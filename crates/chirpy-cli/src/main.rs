//! Chirpy CLI
//!
//! Command-line interface for Chirpy - users, sessions and posts against a
//! local data directory.

use std::fs::File;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use chirpy_core::{
    Config, Error, Gate, PostId, SessionManager, SortOrder, StorageError, Store, UserId,
};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "chirpy")]
#[command(about = "Chirpy - short posts with session authentication")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log debug output to stderr (or the configured log file)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Log in and print an access and a refresh token
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Get a new access token for a refresh token
    Refresh {
        /// Refresh token
        token: String,
    },
    /// Revoke a refresh token
    Revoke {
        /// Refresh token
        token: String,
    },
    /// Show the user an access token belongs to
    Whoami {
        /// Access token
        token: String,
    },
    /// Manage posts
    Post {
        #[command(subcommand)]
        command: PostCommands,
    },
    /// Show store location and record counts
    #[command(alias = "status")]
    Stats,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Register a new user
    #[command(alias = "add")]
    Create {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Show a user
    Get { id: UserId },
    /// List all users
    #[command(alias = "ls")]
    List {
        /// Sort order by ID (asc or desc)
        #[arg(short, long, default_value = "asc")]
        order: SortOrder,
    },
    /// Change email and/or password
    Update {
        id: UserId,
        #[arg(short, long)]
        email: Option<String>,
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Mark a user as promoted
    Promote { id: UserId },
    /// Delete a user
    #[command(alias = "rm")]
    Delete { id: UserId },
}

#[derive(Subcommand)]
enum PostCommands {
    /// Create a post
    #[command(alias = "add")]
    Create {
        /// Access token of the author
        #[arg(short, long)]
        token: String,
        /// Post text
        body: String,
    },
    /// Show a post
    Get { id: PostId },
    /// List posts
    #[command(alias = "ls")]
    List {
        /// Only posts by this user
        #[arg(short, long)]
        author: Option<UserId>,
        /// Sort order by ID (asc or desc)
        #[arg(short, long, default_value = "asc")]
        order: SortOrder,
    },
    /// Replace the text of a post
    Update {
        /// Access token of the author
        #[arg(short, long)]
        token: String,
        id: PostId,
        body: String,
    },
    /// Delete a post
    #[command(alias = "rm")]
    Delete {
        /// Access token of the author
        #[arg(short, long)]
        token: String,
        id: PostId,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, jwt_secret, token_issuer, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let result = run(cli, &output);
    if let Some(hint) = result.as_ref().err().and_then(recovery_hint) {
        eprintln!("Hint: {}", hint);
    }
    result
}

fn run(cli: Cli, output: &Output) -> Result<()> {
    // Config commands work before the configuration is complete
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), output);
    }

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);

    let store = Store::open(&config).context("Failed to open store")?;
    debug!("Using store at {:?}", store.path());
    let sessions = SessionManager::new(store.clone(), &config);
    let gate = Gate::new(sessions.clone());

    match cli.command {
        Commands::User { command } => handle_user_command(command, &sessions, output),
        Commands::Login { email, password } => {
            commands::session::login(&sessions, email, password, output)
        }
        Commands::Refresh { token } => commands::session::refresh(&sessions, token, output),
        Commands::Revoke { token } => commands::session::revoke(&sessions, token, output),
        Commands::Whoami { token } => commands::session::whoami(&gate, token, output),
        Commands::Post { command } => handle_post_command(command, &store, &gate, output),
        Commands::Stats => commands::status::show(&store, output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_user_command(
    command: UserCommands,
    sessions: &SessionManager,
    output: &Output,
) -> Result<()> {
    match command {
        UserCommands::Create { email, password } => {
            commands::user::create(sessions, email, password, output)
        }
        UserCommands::Get { id } => commands::user::get(sessions, id, output),
        UserCommands::List { order } => commands::user::list(sessions, order, output),
        UserCommands::Update {
            id,
            email,
            password,
        } => commands::user::update(sessions, id, email, password, output),
        UserCommands::Promote { id } => commands::user::promote(sessions, id, output),
        UserCommands::Delete { id } => commands::user::delete(sessions, id, output),
    }
}

fn handle_post_command(
    command: PostCommands,
    store: &Store,
    gate: &Gate,
    output: &Output,
) -> Result<()> {
    match command {
        PostCommands::Create { token, body } => {
            commands::post::create(store, gate, token, body, output)
        }
        PostCommands::Get { id } => commands::post::get(store, id, output),
        PostCommands::List { author, order } => commands::post::list(store, author, order, output),
        PostCommands::Update { token, id, body } => {
            commands::post::update(store, gate, token, id, body, output)
        }
        PostCommands::Delete { token, id } => {
            commands::post::delete(store, gate, token, id, output)
        }
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

/// Find an operator hint for a storage failure anywhere in the error chain
fn recovery_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain().find_map(|cause| {
        cause
            .downcast_ref::<Error>()
            .and_then(Error::recovery_suggestion)
            .or_else(|| {
                cause
                    .downcast_ref::<StorageError>()
                    .and_then(StorageError::recovery_suggestion)
            })
    })
}

/// Initialize logging
///
/// RUST_LOG wins when set; otherwise only warnings, or debug with
/// `--verbose`. Logs go to the configured log file, else stderr.
fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chirpy_core={},chirpy_cli={}", level, level)));

    let log_file = config.log_file.as_ref().and_then(|path| {
        match File::options().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                None
            }
        }
    });

    // Ignore the error if a subscriber is already installed
    let _ = match log_file {
        Some(file) => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init(),
    };
}
