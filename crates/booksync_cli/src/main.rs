//! BookSync CLI
//!
//! Command-line launcher for the BookSync delta endpoint.
//!
//! # Commands
//!
//! - `serve` - Run the `getBooksAfterDate` HTTP endpoint
//! - `issue-token` - Mint an identity token for an authenticated deployment
//! - `version` - Show version information

mod commands;

use booksync_core::DEFAULT_COLLECTION;
use booksync_server::DEFAULT_ROUTE;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// BookSync delta-sync server tools.
#[derive(Parser)]
#[command(name = "booksync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the delta endpoint over HTTP
    Serve {
        /// Address to listen on
        #[arg(long, env = "BOOKSYNC_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,

        /// Path of the delta endpoint
        #[arg(long, env = "BOOKSYNC_ROUTE", default_value = DEFAULT_ROUTE)]
        route: String,

        /// Collection holding the records
        #[arg(long, env = "BOOKSYNC_COLLECTION", default_value = DEFAULT_COLLECTION)]
        collection: String,

        /// Shared secret for identity tokens; enables authentication when set
        #[arg(long, env = "BOOKSYNC_AUTH_SECRET", hide_env_values = true)]
        auth_secret: Option<String>,

        /// Token lifetime in seconds
        #[arg(long, env = "BOOKSYNC_TOKEN_EXPIRY_SECS", default_value = "3600")]
        token_expiry_secs: u64,

        /// Upper bound on store work per request, in milliseconds
        #[arg(long, env = "BOOKSYNC_REQUEST_TIMEOUT_MS")]
        request_timeout_ms: Option<u64>,

        /// JSON file with an array of documents to load at startup
        #[arg(long)]
        seed: Option<PathBuf>,
    },

    /// Mint an identity token
    IssueToken {
        /// Token subject (user id)
        #[arg(short, long)]
        subject: String,

        /// Email reported back as `userEmail`
        #[arg(short, long)]
        email: Option<String>,

        /// Shared secret the server was started with
        #[arg(long, env = "BOOKSYNC_AUTH_SECRET", hide_env_values = true)]
        auth_secret: String,
    },

    /// Show version information
    Version,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Serve {
            bind,
            route,
            collection,
            auth_secret,
            token_expiry_secs,
            request_timeout_ms,
            seed,
        } => {
            let options = commands::serve::ServeOptions {
                bind,
                route,
                collection,
                auth_secret,
                token_expiry_secs,
                request_timeout_ms,
                seed,
            };
            commands::serve::run(options)?;
        }
        Commands::IssueToken {
            subject,
            email,
            auth_secret,
        } => {
            commands::issue_token::run(&subject, email.as_deref(), &auth_secret)?;
        }
        Commands::Version => {
            println!("BookSync CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("BookSync Core v{}", booksync_core::VERSION);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_defaults_follow_library_constants() {
        let cli = Cli::try_parse_from(["booksync", "serve"]).unwrap();
        let Commands::Serve {
            route, collection, ..
        } = cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(route, DEFAULT_ROUTE);
        assert_eq!(collection, DEFAULT_COLLECTION);
    }
}
