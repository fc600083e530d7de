use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "aspkg",
    version,
    about = "Command-line client for the aspkg package registry"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq)]
pub enum Command {
    /// Publish the package
    Publish {
        /// Version to publish instead of prompting for one
        #[arg(long, value_name = "VERSION")]
        new_version: Option<String>,

        /// Package directory containing package.json
        #[arg(long, value_name = "PATH")]
        dir: Option<PathBuf>,
    },

    /// Log in to the registry
    Login,

    /// Log out of the registry
    Logout,

    /// Print the authenticated user's GitHub username
    Whoami,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_publish() {
        let cli = Cli::try_parse_from(["aspkg", "publish", "--new-version", "1.2.3", "--dir", "pkg"])
            .unwrap();
        assert_eq!(
            cli.command,
            Command::Publish {
                new_version: Some("1.2.3".to_string()),
                dir: Some(PathBuf::from("pkg")),
            }
        );
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Cli::try_parse_from(["aspkg", "login"]).unwrap().command, Command::Login);
        assert_eq!(Cli::try_parse_from(["aspkg", "logout"]).unwrap().command, Command::Logout);
        assert_eq!(Cli::try_parse_from(["aspkg", "whoami"]).unwrap().command, Command::Whoami);
        assert!(Cli::try_parse_from(["aspkg"]).is_err());
    }
}
