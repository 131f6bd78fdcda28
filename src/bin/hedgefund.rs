//! hedgefund CLI: load a pre-fetched snapshot, run the decision pipeline and
//! print the resulting order.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use chrono::NaiveDate;
use colored::Colorize;
use std::{fs, path::PathBuf, sync::Arc};

use hedgefund::config::Config;
use hedgefund::data::{load_prices_csv, DataProvider, FileProvider, MarketSnapshot, DEFAULT_TRADE_LIMIT};
use hedgefund::pipeline::{DecisionContext, MemoryReporter, Pipeline, Reporter};
use hedgefund::utils::init_logging;
use hedgefund::OrderAction;

#[derive(Debug, Parser)]
#[command(name = "hedgefund", author, version, about = "Fundamentals/sentiment/risk decision pipeline", long_about = None)]
struct Args {
    /// Path to the configuration file (TOML)
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit
    #[arg(long)]
    print_default_config: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Evaluate one ticker and print the order
    Run {
        /// Ticker to evaluate (defaults to pipeline.ticker)
        #[arg(short, long)]
        ticker: Option<String>,
        /// Directory of `<TICKER>.json` snapshots (defaults to data.data_dir)
        #[arg(long, value_name = "DIR")]
        data_dir: Option<PathBuf>,
        /// Explicit snapshot file; overrides the data directory lookup
        #[arg(long, value_name = "JSON")]
        snapshot: Option<PathBuf>,
        /// OHLCV CSV replacing the snapshot's prices
        #[arg(long, value_name = "CSV")]
        prices_csv: Option<PathBuf>,
        /// First price bar to consider (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        start_date: Option<NaiveDate>,
        /// Evaluate as of this date (YYYY-MM-DD); later bars and trades are ignored
        #[arg(long, value_name = "DATE")]
        end_date: Option<NaiveDate>,
        /// Most recent insider trades to consider
        #[arg(long, default_value_t = DEFAULT_TRADE_LIMIT)]
        trade_limit: usize,
        /// Print each stage's reasoning
        #[arg(long)]
        show_reasoning: bool,
        /// Print the decision and stage traces as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a default configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

fn load_config(path: &PathBuf) -> Result<Config> {
    let cfg = if path.exists() {
        Config::from_file(path).with_context(|| format!("loading {}", path.display()))?
    } else {
        Config::load().context("loading default configuration")?
    };
    cfg.validate().context("invalid configuration")?;
    Ok(cfg)
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        println!("{}", Config::default_toml());
        return Ok(());
    }

    match args.command {
        | Some(Command::Init { config, force }) => {
            if config.exists() && !force {
                bail!("Config file {} exists. Use --force to overwrite.", config.display());
            }
            if let Some(parent) = config.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&config, Config::default_toml())?;
            println!("✅ Wrote default configuration to {}", config.display());
            Ok(())
        }
        | Some(Command::Run {
            ticker,
            data_dir,
            snapshot,
            prices_csv,
            start_date,
            end_date,
            trade_limit,
            show_reasoning,
            json,
        }) => {
            if let (Some(start), Some(end)) = (start_date, end_date) {
                if start > end {
                    bail!("--start-date {} is after --end-date {}", start, end);
                }
            }
            let mut cfg = load_config(&args.config)?;
            init_logging(&cfg.logging.level);
            if show_reasoning {
                cfg.pipeline.show_reasoning = true;
            }
            let ticker = ticker.unwrap_or_else(|| cfg.pipeline.ticker.clone());

            let mut snap = match snapshot {
                | Some(path) => MarketSnapshot::from_file(&path)
                    .with_context(|| format!("reading snapshot {}", path.display()))?,
                | None => {
                    let dir = data_dir.unwrap_or_else(|| PathBuf::from(&cfg.data.data_dir));
                    FileProvider::new(dir).snapshot(&ticker)?
                }
            };
            if snap.ticker.is_empty() {
                snap.ticker = ticker.to_uppercase();
            }
            if let Some(csv) = prices_csv.or_else(|| cfg.data.prices_csv.as_ref().map(PathBuf::from)) {
                snap.prices =
                    load_prices_csv(&csv).with_context(|| format!("reading prices {}", csv.display()))?;
            }
            let mut snap = snap.window(start_date, end_date, trade_limit);
            if snap.portfolio.is_none() {
                match cfg.fallback_portfolio() {
                    | Some(portfolio) => {
                        log::warn!("snapshot has no portfolio, using the configured [portfolio] holdings");
                        snap.portfolio = Some(portfolio.into());
                    }
                    | None => log::warn!("snapshot has no portfolio and no [portfolio] table is configured"),
                }
            }

            let memory = Arc::new(MemoryReporter::new());
            let reporter: Arc<dyn Reporter> = if json {
                memory.clone()
            } else {
                Arc::from(cfg.pipeline.reporter_kind().build())
            };

            let mut ctx = DecisionContext::from_snapshot(snap)?;
            let decision = Pipeline::standard(reporter).run(&mut ctx)?;

            if json {
                let out = serde_json::json!({
                    "ticker": ctx.ticker(),
                    "decision": decision,
                    "trace": memory.entries(),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                let action = decision.order.action.to_string().to_uppercase();
                let action = match decision.order.action {
                    | OrderAction::Buy => action.green().bold(),
                    | OrderAction::Sell => action.red().bold(),
                    | OrderAction::Hold => action.yellow().bold(),
                };
                println!(
                    "{} {} {} shares (target {} @ {:.2}, position {:.1}%)",
                    ctx.ticker(),
                    action,
                    decision.order.quantity,
                    decision.reasoning.target_shares,
                    decision.reasoning.current_price,
                    decision.reasoning.position_size * 100.0
                );
            }
            Ok(())
        }
        | None => {
            let cfg = load_config(&args.config)?;
            println!("Loaded configuration for {} (data dir: {})", cfg.pipeline.ticker, cfg.data.data_dir);
            println!("Use `hedgefund run` to evaluate a ticker.");
            Ok(())
        }
    }
}
