//! rustpaca - command-line access to an Alpaca brokerage account.
//!
//! # Usage
//! ```sh
//! ALPACA_API_KEY=... ALPACA_SECRET_KEY=... cargo run -- quote AAPL
//! RUST_LOG=rustpaca=debug cargo run -- pnl 61e69015-8549-4bfd-b9c3-01e75843f47d
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rustpaca::config::AlpacaConfig;
use rustpaca::domain::market::{EquityFeed, OptionFeed, Timeframe};
use rustpaca::domain::trading::OrderQueryStatus;
use rustpaca::infrastructure::alpaca::{AccountMode, HistoryQuery, NewsQuery, OrdersQuery};
use tracing::{Level, info};
use tracing_subscriber::prelude::*;
use uuid::Uuid;

/// Closed orders fetched per symbol when replaying fills.
const PNL_HISTORY_LIMIT: u32 = 500;

#[derive(Parser)]
#[command(author, version, about = "Alpaca brokerage client", long_about = None)]
struct Cli {
    /// Use the live account regardless of ALPACA_PAPER
    #[arg(long, global = true)]
    live: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show account balances
    Account,
    /// List orders
    Orders {
        /// open, closed or all
        #[arg(short, long, default_value = "open")]
        status: String,

        #[arg(short, long, default_value = "50")]
        limit: u32,

        #[arg(long, value_delimiter = ',')]
        symbols: Vec<String>,
    },
    /// Latest quote for a symbol
    Quote {
        symbol: String,

        /// sip, iex or otc (default: last feed that worked)
        #[arg(long)]
        feed: Option<EquityFeed>,
    },
    /// Historical bars for one or more symbols
    Bars {
        #[arg(value_delimiter = ',', required = true)]
        symbols: Vec<String>,

        #[arg(short, long, default_value = "1D")]
        timeframe: Timeframe,

        #[arg(short, long, default_value = "10")]
        limit: u32,

        #[arg(long)]
        feed: Option<EquityFeed>,
    },
    /// Daily snapshot for a symbol
    Snapshot {
        symbol: String,

        #[arg(long)]
        feed: Option<EquityFeed>,
    },
    /// Option contract snapshots for an underlying
    OptionChain {
        underlying: String,

        /// opra or indicative
        #[arg(long)]
        feed: Option<OptionFeed>,
    },
    /// Recent news
    News {
        #[arg(value_delimiter = ',')]
        symbols: Vec<String>,

        #[arg(short, long, default_value = "10")]
        limit: u32,
    },
    /// Realized P&L of a filled order (FIFO against the symbol's history)
    Pnl { order_id: Uuid },
}

fn parse_status(status: &str) -> Result<OrderQueryStatus> {
    match status.to_lowercase().as_str() {
        "open" => Ok(OrderQueryStatus::Open),
        "closed" => Ok(OrderQueryStatus::Closed),
        "all" => Ok(OrderQueryStatus::All),
        _ => anyhow::bail!("Invalid status: {}. Must be 'open', 'closed' or 'all'", status),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let cli = Cli::parse();

    let mut config = AlpacaConfig::from_env();
    if cli.live {
        config.paper = false;
    }
    let client = config
        .build_client()
        .context("Failed to build Alpaca client")?;

    if client.mode() == AccountMode::Live {
        info!("rustpaca {}: LIVE account", env!("CARGO_PKG_VERSION"));
    }

    match cli.command {
        Commands::Account => {
            let account = client.account().await?;
            println!("Account {} ({})", account.account_number, account.status);
            println!("  cash:          {}", account.cash);
            println!("  buying power:  {}", account.buying_power);
            if let Some(equity) = account.equity {
                println!("  equity:        {}", equity);
            }
            if let Some(change) = account.day_change() {
                println!("  day change:    {}", change.round_dp(2));
            }
            println!("  day trades:    {}", account.daytrade_count);
        }
        Commands::Orders {
            status,
            limit,
            symbols,
        } => {
            let query = OrdersQuery {
                status: Some(parse_status(&status)?),
                limit: Some(limit),
                symbols,
                ..Default::default()
            };
            for order in client.orders(&query).await? {
                println!(
                    "{}  {:<6} {:<4} {:>10} filled {:>10} @ {:<10} {}",
                    order.id,
                    order.symbol,
                    order.side,
                    order.qty.map(|q| q.to_string()).unwrap_or_default(),
                    order.filled_qty,
                    order
                        .filled_avg_price
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    order.status.display()
                );
            }
        }
        Commands::Quote { symbol, feed } => {
            let quote = client.data().quote(&symbol, None, feed).await?;
            println!(
                "{} bid {} x {} / ask {} x {} (mid {:.4}) at {}",
                symbol,
                quote.bid_price,
                quote.bid_size,
                quote.ask_price,
                quote.ask_size,
                quote.mid_price(),
                quote.timestamp
            );
        }
        Commands::Bars {
            symbols,
            timeframe,
            limit,
            feed,
        } => {
            let symbols: Vec<&str> = symbols.iter().map(String::as_str).collect();
            let query = HistoryQuery {
                limit: Some(limit),
                ..Default::default()
            };
            let bars = client.data().bars(timeframe, &symbols, &query, feed).await;
            if bars.is_empty() {
                println!("No bars available on any feed");
            }
            for (symbol, bars) in bars {
                println!("{}", symbol);
                for bar in bars {
                    println!(
                        "  {}  o {:>10} h {:>10} l {:>10} c {:>10} v {}",
                        bar.timestamp, bar.open, bar.high, bar.low, bar.close, bar.volume
                    );
                }
            }
        }
        Commands::Snapshot { symbol, feed } => {
            let snapshot = client.data().snapshot(&symbol, None, feed).await?;
            println!(
                "{} last {} prev close {} change {}",
                symbol,
                snapshot.daily_bar.close,
                snapshot.prev_daily_bar.close,
                snapshot
                    .change_pct()
                    .map(|pct| format!("{:+.2}%", pct))
                    .unwrap_or_else(|| "n/a".to_string())
            );
        }
        Commands::OptionChain { underlying, feed } => {
            let chain = client.data().option_chain(&underlying, feed).await;
            let mut contracts: Vec<_> = chain.into_iter().collect();
            contracts.sort_by(|a, b| a.0.cmp(&b.0));
            for (contract, snapshot) in contracts {
                let quote = &snapshot.latest_quote;
                println!(
                    "{:<22} bid {:>8} ask {:>8} last {}",
                    contract,
                    quote.bid_price,
                    quote.ask_price,
                    snapshot
                        .latest_trade
                        .map(|trade| trade.price.to_string())
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
        Commands::News { symbols, limit } => {
            let query = NewsQuery {
                symbols,
                limit: Some(limit),
                ..Default::default()
            };
            for item in client.data().news(&query).await? {
                println!("{}  [{}] {}", item.created_at, item.source, item.headline);
            }
        }
        Commands::Pnl { order_id } => {
            let order = client.order(order_id, Some(true)).await?;
            let history = client
                .order_history(&order.symbol, PNL_HISTORY_LIMIT)
                .await?;

            match order.realized_pnl(&history) {
                Some(pnl) => println!("{} {} realized P&L: {:.2}", order.symbol, order.id, pnl),
                None => println!(
                    "{} {} realized no P&L (opening fill or unfilled)",
                    order.symbol, order.id
                ),
            }
        }
    }

    Ok(())
}
