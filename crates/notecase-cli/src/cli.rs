use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use notecase_config::{BackendKind, ConfigLoader, NotecaseConfig};

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "notecase")]
#[command(about = "notecase - inspect and edit a note store from the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (defaults to ~/.config/notecase/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage backend (sqlite, filesystem); overrides the config file
    #[arg(short, long, global = true)]
    pub backend: Option<String>,

    /// SQLite database file
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Root directory of the filesystem store
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Set log level; if not specified the config value is used
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the folder hierarchy with paths
    Tree,

    /// List the notes in a folder (root when omitted)
    Ls {
        #[arg(value_name = "FOLDER_ID")]
        folder: Option<String>,
    },

    /// Print one note with its header fields
    Show {
        #[arg(value_name = "NOTE_ID")]
        id: String,
    },

    /// Create a folder
    NewFolder {
        title: String,

        /// Parent folder id (root when omitted)
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Create a note
    NewNote {
        title: String,

        /// Containing folder id (root when omitted)
        #[arg(short, long)]
        folder: Option<String>,

        /// Note body
        #[arg(short, long, default_value = "")]
        content: String,

        /// Tag to attach (repeatable)
        #[arg(short, long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },

    /// Move a note to the trash, or delete it for good
    Rm {
        #[arg(value_name = "NOTE_ID")]
        id: String,

        /// Skip the trash
        #[arg(long)]
        permanent: bool,
    },

    /// List trashed folders and notes
    Trash,

    /// Restore a trashed note or folder
    Restore {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// List every tag with its note count
    Tags,
}

impl Cli {
    /// Load the config file and apply the command-line overrides on top
    pub fn resolve_config(&self) -> Result<NotecaseConfig> {
        let mut config = ConfigLoader::load(self.config.as_deref()).context("Failed to load configuration")?;

        if let Some(selector) = &self.backend {
            config.storage.backend = selector
                .parse::<BackendKind>()
                .with_context(|| format!("Invalid --backend '{selector}'"))?;
        }
        if let Some(db) = &self.db {
            config.storage.sqlite.path = db.clone();
        }
        if let Some(root) = &self.root {
            config.storage.filesystem.root = root.clone();
        }
        if let Some(level) = self.log_level {
            config.logging.level = level.as_str().to_string();
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_new_note_with_tags() {
        let cli = Cli::try_parse_from([
            "notecase", "new-note", "Todo", "--folder", "Work", "-t", "a", "--tag", "b",
        ])
        .unwrap();
        match cli.command {
            Commands::NewNote { title, folder, tags, content } => {
                assert_eq!(title, "Todo");
                assert_eq!(folder.as_deref(), Some("Work"));
                assert_eq!(tags, ["a", "b"]);
                assert!(content.is_empty());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["notecase", "tree", "--backend", "fs", "--root", "/tmp/n", "-l", "debug"])
            .unwrap();
        assert_eq!(cli.backend.as_deref(), Some("fs"));
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/n")));
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn test_overrides_win_over_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[storage]\nbackend = \"sqlite\"\n").unwrap();
        let config_arg = path.to_string_lossy().into_owned();

        let cli = Cli::try_parse_from([
            "notecase", "--config", config_arg.as_str(), "--backend", "filesystem", "--root", "/tmp/notes", "tree",
        ])
        .unwrap();
        let config = cli.resolve_config().unwrap();

        assert_eq!(config.storage.backend, BackendKind::FileSystem);
        assert_eq!(config.storage.filesystem.root, PathBuf::from("/tmp/notes"));
    }

    #[test]
    fn test_bad_backend_is_rejected() {
        let cli = Cli::try_parse_from(["notecase", "--backend", "mongo", "tree"]).unwrap();
        let err = cli.resolve_config().unwrap_err();
        assert!(format!("{err:#}").contains("mongo"));
    }
}
