//! CLI definitions for autoform.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "autoform",
    version,
    about = "Inspect schema-driven forms and record grids",
    after_help = "Examples:\n  autoform fields schema.json\n  autoform validate schema.json value.json\n  autoform grid schema.json --data rows.json --transpose"
)]
pub struct Cli {
    /// Show debug logging on stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    /// UI configuration file (autoform.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the normalized fields of the root record or collection.
    Fields {
        /// Schema document (JSON).
        schema: PathBuf,
    },
    /// Print the default form value.
    Defaults {
        /// Schema document (JSON).
        schema: PathBuf,
    },
    /// Check a value against the schema and print its canonical form.
    Validate {
        /// Schema document (JSON).
        schema: PathBuf,
        /// Value to check (JSON).
        value: PathBuf,
    },
    /// Render a collection as a text table.
    Grid {
        /// Schema document (JSON).
        schema: PathBuf,
        /// Dotted path of the collection field; the schema root when omitted.
        #[arg(long)]
        field: Option<String>,
        /// Records (a JSON list) or a table ({"columns": [...], "rows": [...]}).
        #[arg(long)]
        data: Option<PathBuf>,
        /// Lay records out as columns.
        #[arg(long)]
        transpose: bool,
        /// Visible columns, in order.
        #[arg(long, value_delimiter = ',')]
        order: Vec<String>,
    },
}
