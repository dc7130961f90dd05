/*
 * SPDX-FileCopyrightText: 2024 MailProbe Contributors
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::atomic::AtomicBool,
};

use console::style;
use mailprobe::{source, Class, Classifier, Error, FilterConfig, Result, Verdict};

use crate::cli::Commands;

pub fn run(command: Commands, database: &Path, config: FilterConfig) -> Result<ExitCode> {
    match command {
        Commands::CreateDb => {
            let classifier = Classifier::open(database, config, false)?;
            println!(
                "{} database created at {}",
                style("ok").green().bold(),
                classifier.store().path().display()
            );
            Ok(ExitCode::SUCCESS)
        }

        Commands::Good {
            files,
            train_on_error,
        } => train(database, config, &files, Class::Good, train_on_error),

        Commands::Spam {
            files,
            train_on_error,
        } => train(database, config, &files, Class::Spam, train_on_error),

        Commands::Receive { train, actual } => {
            let classifier = Classifier::open(database, config, false)?;
            let mut raw = Vec::new();
            std::io::stdin().read_to_end(&mut raw)?;
            let message = mailprobe::Message::parse(&raw)?;
            let verdict = classifier.classify(&message)?;
            print_verdict(&verdict, "<stdin>", false);

            if train {
                match actual {
                    // selective training against the supplied true label
                    Some(actual) => {
                        classifier.train_if_misclassified(&message, actual)?;
                    }
                    None => {
                        let predicted = if verdict.is_spam {
                            Class::Spam
                        } else {
                            Class::Good
                        };
                        classifier.train(&message, predicted)?;
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Score { files, show_terms } => {
            let classifier = Classifier::open(database, config, false)?;
            let mut messages = Vec::new();
            let mut labels = Vec::new();
            for file in &files {
                for raw in source::read_path(file)? {
                    messages.push(raw);
                    labels.push(file.display().to_string());
                }
            }
            let workers = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            let mut any_spam = false;
            let mut any_error = false;
            for (verdict, label) in classifier.classify_all(&messages, workers).iter().zip(&labels)
            {
                match verdict {
                    Ok(verdict) => {
                        any_spam |= verdict.is_spam;
                        print_verdict(verdict, label, show_terms);
                    }
                    Err(err) => {
                        any_error = true;
                        eprintln!("{} {label}: {err}", style("error").red().bold());
                    }
                }
            }
            Ok(if any_error {
                ExitCode::from(2)
            } else if any_spam {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            })
        }

        Commands::Cleanup => {
            let classifier = Classifier::open(database, config, false)?;
            let report = classifier.maintain(Classifier::today())?;
            println!(
                "Removed {} words, reclaimed {} bytes",
                report.terms_removed, report.bytes_reclaimed
            );
            Ok(ExitCode::SUCCESS)
        }

        Commands::Purge => {
            let classifier = Classifier::open(database, config, false)?;
            let removed = classifier.purge()?;
            println!("Purged {removed} words");
            Ok(ExitCode::SUCCESS)
        }

        Commands::Export { file } => {
            let classifier = Classifier::open(database, config, false)?;
            if file == Path::new("-") {
                let stdout = std::io::stdout();
                classifier.export(&mut stdout.lock())?;
            } else {
                let mut out = BufWriter::new(File::create(&file)?);
                classifier.export(&mut out)?;
                out.flush()?;
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Import { file } => {
            let classifier = Classifier::open(database, config, false)?;
            let report = if file == Path::new("-") {
                let stdin = std::io::stdin();
                classifier.import(stdin.lock())?
            } else {
                classifier.import(BufReader::new(File::open(&file)?))?
            };
            println!(
                "Imported {} words and {} digests",
                report.terms, report.digests
            );
            Ok(ExitCode::SUCCESS)
        }

        Commands::Backup { file } => {
            let classifier = Classifier::open(database, config, false)?;
            let bytes = classifier.backup(&file)?;
            println!("Backed up {bytes} bytes to {}", file.display());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Restore { file } => {
            let bytes = Classifier::restore(&file, database)?;
            println!("Restored {bytes} bytes from {}", file.display());
            Ok(ExitCode::SUCCESS)
        }

        Commands::Info => {
            let classifier = Classifier::open(database, config, false)?;
            let stats = classifier.info()?;
            println!("Database Information:");
            println!("  Path:          {}", stats.path.display());
            println!("  Words:         {}", stats.terms);
            println!("  Good messages: {}", stats.corpus.good);
            println!("  Spam messages: {}", stats.corpus.spam);
            println!("  Digests:       {}", stats.digests);
            println!("  File size:     {} bytes", stats.file_size);
            println!("  Cache size:    {}", stats.cache_capacity);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Remove { files } => {
            let classifier = Classifier::open(database, config, false)?;
            let mut removed = 0u64;
            let mut errors = 0u64;
            for file in &files {
                for raw in source::read_path(file)? {
                    match mailprobe::Message::parse(&raw)
                        .and_then(|message| classifier.remove(&message))
                    {
                        Ok(()) => removed += 1,
                        Err(err @ (Error::MalformedMessage(_) | Error::UnknownMessage(_))) => {
                            errors += 1;
                            eprintln!("{} {err}", style("warning").yellow().bold());
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
            println!("Removed {removed} messages ({errors} skipped)");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn train(
    database: &Path,
    config: FilterConfig,
    files: &[PathBuf],
    class: Class,
    train_on_error: bool,
) -> Result<ExitCode> {
    let classifier = Classifier::open(database, config, false)?;
    let cancel = AtomicBool::new(false);
    let mut totals = mailprobe::BatchSummary::default();

    for file in files {
        let messages = source::read_path(file)?;
        let summary = if train_on_error {
            classifier.train_all_on_error(messages, class, &cancel)?
        } else {
            classifier.train_all(messages, class, &cancel)?
        };
        totals.processed += summary.processed;
        totals.trained += summary.trained;
        totals.errors += summary.errors;
    }

    println!(
        "Processed {} messages as {} ({} trained, {} errors)",
        totals.processed,
        class.as_str(),
        totals.trained,
        totals.errors
    );
    Ok(ExitCode::SUCCESS)
}

fn print_verdict(verdict: &Verdict, label: &str, show_terms: bool) {
    let tag = if verdict.is_spam {
        style("SPAM").red().bold()
    } else {
        style("GOOD").green().bold()
    };
    println!("{tag} {:.6} {label}", verdict.score);
    if show_terms {
        for term in &verdict.terms {
            println!(
                "  {:.4} {} ({} good, {} spam)",
                term.prob, term.term, term.counts.good, term.counts.spam
            );
        }
    }
}
