use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "drivelink")]
#[command(author, version, about = "Telegram bot that mirrors HTTP, Dropbox and Mega links into Google Drive", long_about = None)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot (default)
    Run,

    /// Download a link with the bot's resolver, without uploading it
    Fetch {
        /// Link to download
        url: String,

        /// Directory to move the downloaded file into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_is_default() {
        let cli = Cli::try_parse_from(["drivelink"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_fetch_args() {
        let cli = Cli::try_parse_from([
            "drivelink",
            "fetch",
            "https://www.dropbox.com/s/a/b.zip?dl=0",
            "--output",
            "/tmp/out",
            "--config",
            "bot.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("bot.toml")));
        match cli.command {
            Some(Commands::Fetch { url, output }) => {
                assert_eq!(url, "https://www.dropbox.com/s/a/b.zip?dl=0");
                assert_eq!(output, PathBuf::from("/tmp/out"));
            }
            _ => panic!("expected fetch"),
        }
    }
}
