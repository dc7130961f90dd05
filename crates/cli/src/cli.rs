/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mailprobe::Class;

#[derive(Parser)]
#[clap(version, about = "Bayesian email classifier", long_about = None)]
#[clap(name = "mailprobe")]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
    /// Store directory
    #[clap(short = 'd', long = "database", env = "MAILPROBE_DB")]
    pub database: Option<PathBuf>,
    /// Configuration file (TOML)
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Configuration preset: graham, conservative or aggressive
    #[clap(long)]
    pub preset: Option<String>,
    /// Override one configuration option (repeatable)
    #[clap(long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,
    /// Verbose output
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize an empty store
    CreateDb,

    /// Train one or more message files or mailboxes as good mail
    Good {
        /// Message files, mbox files or maildir directories
        files: Vec<PathBuf>,
        /// Train only messages the current store mislabels
        #[clap(long)]
        train_on_error: bool,
    },

    /// Train one or more message files or mailboxes as spam
    Spam {
        /// Message files, mbox files or maildir directories
        files: Vec<PathBuf>,
        /// Train only messages the current store mislabels
        #[clap(long)]
        train_on_error: bool,
    },

    /// Read one message from standard input and classify it
    Receive {
        /// Also train with the predicted class
        #[clap(long)]
        train: bool,
        /// True label; with --train, only train when the prediction
        /// disagrees
        #[clap(long, value_parser = parse_class)]
        actual: Option<Class>,
    },

    /// Classify without training; exit code 1 marks spam
    Score {
        /// Message files, mbox files or maildir directories
        files: Vec<PathBuf>,
        /// Show the discriminating terms behind each score
        #[clap(short = 'T', long)]
        show_terms: bool,
    },

    /// Expire stale single-sighting terms and compact the store
    Cleanup,

    /// Drop every term seen fewer than min_token_count times
    Purge,

    /// Write the portable text dump
    Export {
        /// Output file, `-` for standard output
        file: PathBuf,
    },

    /// Load a portable text dump
    Import {
        /// Input file, `-` for standard input
        file: PathBuf,
    },

    /// Copy the database file to a backup
    Backup { file: PathBuf },

    /// Replace the database file with a backup
    Restore { file: PathBuf },

    /// Print corpus counters and store statistics
    Info,

    /// Remove previously trained messages from the store
    Remove {
        /// Message files, mbox files or maildir directories
        files: Vec<PathBuf>,
    },
}

fn parse_class(value: &str) -> Result<Class, String> {
    match value {
        "good" | "ham" => Ok(Class::Good),
        "spam" => Ok(Class::Spam),
        _ => Err(format!("'{value}' is neither 'good' nor 'spam'")),
    }
}
