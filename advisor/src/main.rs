//! CLI entry point for the macrofolio advisor.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

use macrofolio::{MacroHistory, Method};
use macrofolio_advisor::config::Config;
use macrofolio_advisor::data;
use macrofolio_advisor::error::{Error, Result};
use macrofolio_advisor::journal::{self, Journal};
use macrofolio_advisor::pipeline::{self, SuggestInputs};
use macrofolio_advisor::report;

#[derive(Parser)]
#[command(name = "advisor")]
#[command(about = "Macro-aware contribution advisor for Brazilian equities")]
#[command(version)]
struct Cli {
    /// Path to advisor.toml (defaults apply when the file is missing)
    #[arg(long, default_value = "advisor.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify the macro scenario
    Scenario {
        /// Macro snapshot JSON
        #[arg(long = "macro")]
        macro_file: PathBuf,
    },

    /// Screen quotes and split a contribution across the best candidates
    Suggest {
        /// Quotes CSV (ticker,price,target_price)
        quotes: PathBuf,

        /// Wide price history CSV
        #[arg(long)]
        prices: PathBuf,

        /// Macro snapshot JSON
        #[arg(long = "macro")]
        macro_file: PathBuf,

        /// Current holdings CSV (ticker,value)
        #[arg(long)]
        holdings: Option<PathBuf>,

        /// sharpe, min-variance or hrp
        #[arg(long)]
        method: Option<Method>,

        /// Amount to invest (defaults to [backtest] contribution)
        #[arg(long)]
        contribution: Option<f64>,

        /// Write the full report as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Replay monthly contributions over the price history
    Backtest {
        /// Wide price history CSV
        #[arg(long)]
        prices: PathBuf,

        /// Fixed macro snapshot used for every month
        #[arg(long = "macro", conflicts_with = "macro_history")]
        macro_file: Option<PathBuf>,

        /// Dated macro CSV (date,selic,ipca,usd_brl,oil)
        #[arg(long)]
        macro_history: Option<PathBuf>,

        /// Comma-separated tickers (defaults to the whole sector map)
        #[arg(long)]
        tickers: Option<String>,

        #[arg(long, conflicts_with = "compare")]
        method: Option<Method>,

        /// Run every method side by side
        #[arg(long)]
        compare: bool,

        /// Write the full result as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show the sector table in effect
    Sectors,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run(&config, cli.command) {
        match &e {
            Error::NoCandidates(msg) => {
                eprintln!("Nothing to allocate: {msg}");
                process::exit(2);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}

fn run(config: &Config, command: Command) -> Result<()> {
    let mut journal = Journal::open(&config.journal_path())?;
    let sectors = config.sector_map()?;

    match command {
        Command::Scenario { macro_file } => {
            journal::log_command(&mut journal, "scenario", &[("macro", show(&macro_file))])?;
            let snapshot = data::load_macro(&macro_file)?;
            let r = pipeline::assess(config, &snapshot)?;
            journal::log_scenario(&mut journal, &r.snapshot, r.scenario, r.score)?;
            print!("{}", report::scenario(&r));
        }

        Command::Suggest {
            quotes,
            prices,
            macro_file,
            holdings,
            method,
            contribution,
            output,
        } => {
            journal::log_command(
                &mut journal,
                "suggest",
                &[
                    ("quotes", show(&quotes)),
                    ("prices", show(&prices)),
                    ("macro", show(&macro_file)),
                ],
            )?;
            let quotes = data::load_quotes(&quotes)?;
            let prices = data::load_prices(&prices)?;
            let snapshot = data::load_macro(&macro_file)?;
            let holdings = match &holdings {
                Some(path) => data::load_holdings(path)?,
                None => Vec::new(),
            };
            let contribution = contribution.unwrap_or(config.backtest.contribution);
            info!(
                "{} quotes, {} price rows, {} holdings",
                quotes.len(),
                prices.len(),
                holdings.len()
            );

            let inputs = SuggestInputs {
                quotes: &quotes,
                prices: &prices,
                snapshot: &snapshot,
                holdings: &holdings,
                contribution,
                method,
            };
            let s = pipeline::suggest(config, &sectors, &inputs)?;
            journal::log_scenario(&mut journal, &s.scenario.snapshot, s.scenario.scenario, s.scenario.score)?;
            journal::log_candidates(&mut journal, &s.candidates)?;
            journal::log_allocation(&mut journal, &s.blend, contribution)?;

            print!("{}", report::suggestion(&s));
            if let Some(path) = output {
                write_json(&path, &s)?;
            }
        }

        Command::Backtest {
            prices,
            macro_file,
            macro_history,
            tickers,
            method,
            compare,
            output,
        } => {
            journal::log_command(&mut journal, "backtest", &[("prices", show(&prices))])?;
            let prices = data::load_prices(&prices)?;
            let history = match (macro_file, macro_history) {
                (Some(path), _) => MacroHistory::constant(data::load_macro(&path)?),
                (None, Some(path)) => data::load_macro_history(&path)?,
                (None, None) => {
                    return Err(Error::Config(
                        "backtest needs --macro or --macro-history".into(),
                    ));
                }
            };
            let tickers = match &tickers {
                Some(list) => data::parse_ticker_list(list)?,
                None => Vec::new(),
            };

            if compare {
                let rows = pipeline::compare_methods(config, &sectors, &prices, &history, tickers);
                for (_, res) in &rows {
                    if let Ok(r) = res {
                        journal::log_backtest(&mut journal, r)?;
                    }
                }
                print!("{}", report::comparison(&rows));
                if let Some(path) = output {
                    let ok: Vec<_> = rows
                        .iter()
                        .filter_map(|(m, r)| r.as_ref().ok().map(|r| (m.to_string(), r)))
                        .collect();
                    write_json(&path, &ok)?;
                }
            } else {
                let result =
                    pipeline::backtest(config, &sectors, &prices, &history, tickers, method)?;
                journal::log_backtest(&mut journal, &result)?;
                print!("{}", report::backtest(&result));
                if let Some(path) = output {
                    write_json(&path, &result)?;
                }
            }
        }

        Command::Sectors => {
            print!("{}", report::sectors(&sectors));
        }
    }
    Ok(())
}

fn show(path: &Path) -> String {
    path.display().to_string()
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), value)?;
    println!("\nReport written to {}", path.display());
    Ok(())
}
