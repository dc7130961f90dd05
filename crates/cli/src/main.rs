/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use console::style;
use mailprobe::{Error, FilterConfig};

use crate::cli::Cli;

pub mod cli;
pub mod commands;

fn main() -> ExitCode {
    let args = Cli::parse();
    init_tracing(args.verbose);

    match build_config(&args).and_then(|config| {
        let database = args
            .database
            .clone()
            .unwrap_or_else(default_database);
        commands::run(args.command, &database, config)
    }) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err}", style("error").red().bold());
            ExitCode::from(2)
        }
    }
}

// precedence: preset, then config file, then --set overrides
fn build_config(args: &Cli) -> Result<FilterConfig, Error> {
    let mut config = match &args.preset {
        Some(name) => FilterConfig::preset(name.parse()?),
        None => FilterConfig::default(),
    };
    if let Some(path) = &args.config {
        config.merge_file(path)?;
    }
    for pair in &args.overrides {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            Error::ConfigInvalid(format!("expected KEY=VALUE, got '{pair}'"))
        })?;
        config.set(key.trim(), value.trim())?;
    }
    config.validate()?;
    Ok(config)
}

fn default_database() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mailprobe")
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "mailprobe=debug,store=debug,nlp=debug"
    } else {
        "warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}
