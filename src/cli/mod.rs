//! CLI module - Command-line interface for tradeauth
//!
//! This module provides a structured CLI using clap for argument parsing.

pub mod commands;

use clap::{Parser, Subcommand};

/// tradeauth - Authentication service for the trading platform
#[derive(Parser)]
#[command(name = "tradeauth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API (default when no command is given)
    #[command(alias = "server", alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Create the default admin and test accounts if they are missing
    Seed {
        /// Password for admin@tradeauth.local
        #[arg(long, default_value = commands::seed::DEFAULT_ADMIN_PASSWORD)]
        admin_password: String,

        /// Password for user@tradeauth.local
        #[arg(long, default_value = commands::seed::DEFAULT_USER_PASSWORD)]
        user_password: String,
    },

    /// Drop every table and re-run migrations (refused in production)
    #[command(name = "reset-db")]
    ResetDb {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },

    /// Validate the configuration and print it with secrets masked
    #[command(name = "check-config")]
    CheckConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["tradeauth"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_seed_passwords() {
        let cli = Cli::try_parse_from(["tradeauth", "seed", "--admin-password", "root12345"])
            .unwrap();
        match cli.command {
            Some(Commands::Seed {
                admin_password,
                user_password,
            }) => {
                assert_eq!(admin_password, "root12345");
                assert_eq!(user_password, commands::seed::DEFAULT_USER_PASSWORD);
            }
            _ => panic!("expected seed command"),
        }
    }

    #[test]
    fn parses_reset_db_flag() {
        let cli = Cli::try_parse_from(["tradeauth", "reset-db", "--yes"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::ResetDb { yes: true })));
    }
}
