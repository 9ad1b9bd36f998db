//! CLI argument definitions using clap
//!
//! Commands:
//! - docstore upload <name> <file>
//! - docstore download <name> <out>
//! - docstore delete <name>
//! - docstore list
//! - docstore reorder <name=order>...

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docstore - documents over pluggable blob backends
#[derive(Parser, Debug)]
#[command(name = "docstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "./docstore.json")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a file as a document, replacing any document with that name
    Upload {
        /// Document name
        name: String,
        /// File to read the content from
        file: PathBuf,
    },

    /// Write a document's content to a file
    Download {
        /// Document name
        name: String,
        /// Destination file
        out: PathBuf,
    },

    /// Delete a document
    Delete {
        /// Document name
        name: String,
    },

    /// List all documents in order
    List,

    /// Set document positions, all or nothing
    Reorder {
        /// `name=order` pairs; `name=` clears the position
        #[arg(required = true, value_parser = parse_placement)]
        placements: Vec<Placement>,
    },
}

/// A requested position for one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub name: String,
    pub order: Option<i64>,
}

fn parse_placement(raw: &str) -> Result<Placement, String> {
    let (name, order) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected name=order, got '{}'", raw))?;
    let order = match order.trim() {
        "" => None,
        value => Some(
            value
                .parse()
                .map_err(|e| format!("invalid order '{}': {}", value, e))?,
        ),
    };
    Ok(Placement {
        name: name.to_string(),
        order,
    })
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_placement() {
        assert_eq!(
            parse_placement("a.pdf=3").unwrap(),
            Placement {
                name: "a.pdf".into(),
                order: Some(3)
            }
        );
        assert_eq!(parse_placement("a=b.pdf=-1").unwrap().name, "a=b.pdf");
        assert_eq!(parse_placement("a.pdf=").unwrap().order, None);
        assert!(parse_placement("a.pdf").is_err());
        assert!(parse_placement("a.pdf=first").is_err());
    }

    #[test]
    fn test_parse_reorder_command() {
        let cli = Cli::try_parse_from([
            "docstore",
            "--config",
            "/etc/docstore.json",
            "reorder",
            "a.pdf=1",
            "b.pdf=2",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/docstore.json"));
        match cli.command {
            Command::Reorder { placements } => assert_eq!(placements.len(), 2),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_reorder_requires_placements() {
        assert!(Cli::try_parse_from(["docstore", "reorder"]).is_err());
    }
}
