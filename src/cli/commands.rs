use crate::config::{ServerConfig, UserConfig};
use crate::echo::echo_group;
use crate::router::{CollisionPolicy, RouteRegistry};
use crate::runtime_config::RuntimeConfig;
use crate::security::{AuthScheme, InMemoryCredentialStore};
use crate::server::Server;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Command-line interface for ctlrouter
#[derive(Parser)]
#[command(name = "ctlrouter")]
#[command(about = "ctlrouter controller server", long_about = None, version)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Serve the built-in echo group until SIGINT or SIGTERM
    Serve {
        /// Configuration file (.yaml, .yml or .toml)
        #[arg(short, long, env = "CTLR_CONFIG")]
        config: Option<PathBuf>,

        /// Listening address; repeat to listen on several. Replaces `bind` from the file
        #[arg(short, long)]
        addr: Vec<String>,

        /// Authentication scheme, replaces `auth` from the file
        #[arg(long, value_enum)]
        auth: Option<AuthArg>,

        /// User for the built-in credential store, NAME:PASSWORD[:ROLE,...]; repeatable,
        /// added to `users` from the file
        #[arg(short, long)]
        user: Vec<UserConfig>,
    },
    /// Print the route table of the built-in echo group
    Routes,
}

/// Authentication scheme selectable on the command line, with default parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthArg {
    None,
    Cookie,
    Basic,
    Key,
}

impl From<AuthArg> for AuthScheme {
    fn from(arg: AuthArg) -> Self {
        match arg {
            AuthArg::None => AuthScheme::None,
            AuthArg::Cookie => AuthScheme::cookie(),
            AuthArg::Basic => AuthScheme::basic(),
            AuthArg::Key => AuthScheme::key(),
        }
    }
}

/// Assemble the effective configuration: file (or defaults), environment, then flags
pub fn load_config(
    config: Option<&Path>,
    addrs: &[String],
    auth: Option<AuthArg>,
    users: &[UserConfig],
    runtime: RuntimeConfig,
) -> Result<ServerConfig> {
    let mut server_config = match config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    runtime.apply(&mut server_config.workers);
    if !addrs.is_empty() {
        server_config.bind = addrs.to_vec();
    }
    if let Some(auth) = auth {
        server_config.auth = auth.into();
    }
    server_config.users.extend_from_slice(users);
    server_config.validate()?;
    Ok(server_config)
}

/// Route table lines, one per reachable route
pub fn route_listing(registry: &RouteRegistry) -> Vec<String> {
    registry
        .route_table()
        .into_iter()
        .map(|(group, meta)| {
            format!(
                "{:<7} {:<16} {:<12} {:<10} {}",
                meta.method.as_str(),
                meta.path,
                meta.handler_name,
                meta.required_role,
                group
            )
        })
        .collect()
}

pub fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Serve {
            config,
            addr,
            auth,
            user,
        } => {
            let server_config = load_config(
                config.as_deref(),
                &addr,
                auth,
                &user,
                RuntimeConfig::from_env(),
            )?;
            serve(server_config)
        }
        Commands::Routes => {
            let registry =
                RouteRegistry::build([Arc::new(echo_group())], CollisionPolicy::FirstWins)?;
            println!(
                "{:<7} {:<16} {:<12} {:<10} GROUP",
                "VERB", "PATH", "HANDLER", "ROLE"
            );
            for line in route_listing(&registry) {
                println!("{line}");
            }
            Ok(())
        }
    }
}

fn serve(config: ServerConfig) -> Result<()> {
    let store = InMemoryCredentialStore::from_users(&config.users);
    if config.users.is_empty() && config.auth != AuthScheme::None {
        warn!(auth = %config.auth, "No users configured, every request runs as anonymous");
    }
    let mut server = Server::new(config, Arc::new(store));
    server.add_group(echo_group());
    server.start().context("failed to start server")?;

    wait_for_shutdown()?;
    info!("Shutdown signal received");
    server.stop();
    Ok(())
}

#[cfg(unix)]
fn wait_for_shutdown() -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Received signal");
    }
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown() -> Result<()> {
    loop {
        std::thread::park();
    }
}
