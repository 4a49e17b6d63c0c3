//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_ledger_store::JsonLedgerStore;
use crate::domain::error::StocksimError;
use crate::domain::ledger::Ledger;
use crate::domain::price_process::{DEFAULT_MU, DEFAULT_SIGMA};
use crate::domain::settings::Settings;
use crate::domain::simulator::{Order, Simulator};
use crate::domain::trade::Side;
use crate::ports::ledger_store::LedgerStore;

#[derive(Parser, Debug)]
#[command(name = "stocksim", about = "Toy stock market simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the interactive trading shell
    Shell {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Start the HTTP API server
    Serve {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the listen address from the config
        #[arg(long)]
        listen: Option<String>,
    },
    /// Archive the portfolio record and start over with the starting cash
    Reset {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the trade log
    History {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write the log as CSV to this path instead of printing it
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Shell { config } => run_shell(config.as_ref()),
        Command::Serve { config, listen } => run_serve(config.as_ref(), listen),
        Command::Reset { config } => run_reset(config.as_ref()),
        Command::History { config, csv } => run_history(config.as_ref(), csv.as_ref()),
    }
}

/// Settings from the INI file at `path`, or defaults when no path is given.
pub fn load_settings(path: Option<&PathBuf>) -> Result<Settings, ExitCode> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    FileConfigAdapter::from_file(path)
        .and_then(|adapter| Settings::from_config(&adapter))
        .map_err(|e| fail(&e))
}

pub fn open_simulator(settings: Settings) -> Result<Simulator, StocksimError> {
    let store = JsonLedgerStore::new(settings.portfolio_path.clone());
    Simulator::bootstrap(settings, Box::new(store))
}

fn fail(err: &StocksimError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn run_shell(config_path: Option<&PathBuf>) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let mut sim = match open_simulator(settings) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    match Shell::new(&mut sim).run(stdin.lock(), &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&StocksimError::Io(e)),
    }
}

fn run_reset(config_path: Option<&PathBuf>) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    match reset_record(&settings.portfolio_path, settings.starting_cash) {
        Ok(Some(backup)) => {
            eprintln!("Previous portfolio archived to {}", backup.display());
            eprintln!("Reset complete: cash {:.2}", settings.starting_cash);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("Reset complete: cash {:.2}", settings.starting_cash);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

/// Archive the record at `path` (a malformed record is archived too) and
/// replace it with a fresh ledger.
pub fn reset_record(path: &Path, starting_cash: f64) -> Result<Option<PathBuf>, StocksimError> {
    let store = JsonLedgerStore::new(path);
    let backup = store.archive()?;
    store.save(&Ledger::new(starting_cash))?;
    tracing::info!(backup = ?backup, path = %store.location(), "portfolio reset");
    Ok(backup)
}

fn run_history(config_path: Option<&PathBuf>, csv_path: Option<&PathBuf>) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let store = JsonLedgerStore::new(settings.portfolio_path.clone());
    let ledger = match store.load(settings.starting_cash) {
        Ok(l) => l,
        Err(e) => return fail(&e),
    };

    match csv_path {
        Some(path) => match csv_adapter::export_trades(path, ledger.trades()) {
            Ok(()) => {
                eprintln!("{} trades written to {}", ledger.trades().len(), path.display());
                ExitCode::SUCCESS
            }
            Err(e) => fail(&e),
        },
        None => {
            if ledger.trades().is_empty() {
                eprintln!("No trades yet.");
            }
            for trade in ledger.trades() {
                println!("{trade}");
            }
            ExitCode::SUCCESS
        }
    }
}

fn run_serve(config_path: Option<&PathBuf>, listen: Option<String>) -> ExitCode {
    #[cfg(feature = "web")]
    {
        use crate::adapters::web::{AppState, serve};
        use std::net::SocketAddr;

        let mut settings = match load_settings(config_path) {
            Ok(s) => s,
            Err(code) => return code,
        };
        if let Some(listen) = listen {
            settings.listen = listen;
        }

        let addr: SocketAddr = match settings.listen.parse() {
            Ok(a) => a,
            Err(_) => {
                return fail(&StocksimError::ConfigInvalid {
                    section: "web".into(),
                    key: "listen".into(),
                    reason: format!("not a socket address: {}", settings.listen),
                });
            }
        };

        let sim = match open_simulator(settings) {
            Ok(s) => s,
            Err(e) => return fail(&e),
        };

        eprintln!("Starting API server on http://{addr}");
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => return fail(&StocksimError::Io(e)),
        };
        match runtime.block_on(serve(AppState::new(sim), addr)) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(&StocksimError::Io(e)),
        }
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = (config_path, listen);
        eprintln!("error: web feature is required for serve");
        ExitCode::from(1)
    }
}

const HELP: &str = "
Available commands:
  prices                      - show current market prices
  list                        - alias for prices
  next [N]                    - simulate next N days (N defaults to 1)
  buy SYMBOL QTY [PRICE]      - buy QTY shares of SYMBOL at current price (or PRICE)
  sell SYMBOL QTY [PRICE]     - sell QTY shares of SYMBOL at current price (or PRICE)
  portfolio                   - show portfolio summary
  history                     - show trade history
  stats                       - show trade statistics
  pricehist SYMBOL [CSV]      - show price history for SYMBOL, or write it to CSV
  addstock SYMBOL PRICE [MU] [SIGMA] - list a new stock
  config                      - show simulated date and available stocks
  help                        - show this help
  quit / exit                 - exit the simulator
";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Line-oriented interactive shell over a [`Simulator`].
pub struct Shell<'a> {
    sim: &'a mut Simulator,
}

impl<'a> Shell<'a> {
    pub fn new(sim: &'a mut Simulator) -> Self {
        Shell { sim }
    }

    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> io::Result<()> {
        writeln!(out, "Simple stock market simulator")?;
        writeln!(out, "Type 'help' to see commands.\n")?;

        let mut lines = input.lines();
        loop {
            write!(out, "[{}] > ", self.sim.date())?;
            out.flush()?;
            let line = match lines.next() {
                Some(line) => line?,
                None => {
                    writeln!(out, "\nExiting simulator.")?;
                    return Ok(());
                }
            };
            if self.execute(&line, out)? == Flow::Quit {
                return Ok(());
            }
        }
    }

    /// Run one command line. Domain failures are reported to `out`; only
    /// output errors are returned.
    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<Flow> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(action) = parts.first() else {
            return Ok(Flow::Continue);
        };

        match action.to_lowercase().as_str() {
            "quit" | "exit" => {
                writeln!(out, "Goodbye!")?;
                return Ok(Flow::Quit);
            }
            "help" | "h" | "?" => writeln!(out, "{HELP}")?,
            "prices" | "list" => {
                for (symbol, price) in self.sim.list_prices() {
                    writeln!(out, "{symbol}: {price:.2}")?;
                }
            }
            "config" => self.show_config(out)?,
            "addstock" => self.add_stock(&parts, out)?,
            "next" => self.next(&parts, out)?,
            "buy" => self.trade(Side::Buy, &parts, out)?,
            "sell" => self.trade(Side::Sell, &parts, out)?,
            "portfolio" => self.show_portfolio(out)?,
            "history" => {
                let trades = self.sim.ledger().trades();
                if trades.is_empty() {
                    writeln!(out, "No trades yet.")?;
                }
                for trade in trades {
                    writeln!(out, "{trade}")?;
                }
            }
            "stats" => {
                let stats = self.sim.stats();
                writeln!(out, "Trades:        {}", stats.num_trades)?;
                writeln!(out, "Total bought:  {:.2}", stats.total_buys)?;
                writeln!(out, "Total sold:    {:.2}", stats.total_sells)?;
                writeln!(out, "Net invested:  {:.2}", stats.net_invested)?;
                writeln!(out, "Total profit:  {:.2}", stats.total_profit)?;
            }
            "pricehist" => self.price_history(&parts, out)?,
            _ => writeln!(out, "Unknown command. Type 'help' to see available commands.")?,
        }
        Ok(Flow::Continue)
    }

    fn show_config<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "Simulated date: {}", self.sim.date())?;
        writeln!(out, "Stocks:")?;
        for inst in self.sim.market().instruments() {
            writeln!(
                out,
                "  {} start price ~ {:.2} current {:.2} mu={} sigma={}",
                inst.symbol(),
                inst.start_price(),
                inst.price(),
                inst.process().mu(),
                inst.process().sigma()
            )?;
        }
        Ok(())
    }

    fn add_stock<W: Write>(&mut self, parts: &[&str], out: &mut W) -> io::Result<()> {
        if parts.len() < 3 {
            return writeln!(out, "Usage: addstock SYMBOL PRICE [mu] [sigma]");
        }
        let Ok(price) = parts[2].parse::<f64>() else {
            return writeln!(out, "PRICE must be a number, e.g. 12.5");
        };
        let mu = match parts.get(3).map(|s| s.parse::<f64>()) {
            None => DEFAULT_MU,
            Some(Ok(v)) => v,
            Some(Err(_)) => return writeln!(out, "mu must be a number"),
        };
        let sigma = match parts.get(4).map(|s| s.parse::<f64>()) {
            None => DEFAULT_SIGMA,
            Some(Ok(v)) => v,
            Some(Err(_)) => return writeln!(out, "sigma must be a number"),
        };
        match self.sim.add_instrument(parts[1], price, mu, sigma) {
            Ok(inst) => writeln!(
                out,
                "Added stock {} @ {:.2} mu={} sigma={}",
                inst.symbol(),
                price,
                mu,
                sigma
            ),
            Err(e) => writeln!(out, "Error: {e}"),
        }
    }

    fn next<W: Write>(&mut self, parts: &[&str], out: &mut W) -> io::Result<()> {
        let days = match parts.get(1).map(|s| s.parse::<i64>()) {
            None => 1,
            Some(Ok(n)) => n,
            Some(Err(_)) => return writeln!(out, "Usage: next N  (N must be a positive integer)"),
        };
        if days < 1 {
            return writeln!(out, "Number of days must be >= 1");
        }
        match self.sim.advance(days) {
            Ok(date) => writeln!(out, "Advanced {days} day(s). New date: {date}"),
            Err(e) => writeln!(out, "Error: {e}"),
        }
    }

    fn trade<W: Write>(&mut self, side: Side, parts: &[&str], out: &mut W) -> io::Result<()> {
        let verb = match side {
            Side::Buy => "buy",
            Side::Sell => "sell",
        };
        if parts.len() < 3 {
            return writeln!(out, "Usage: {verb} SYMBOL QTY [PRICE]");
        }
        let Ok(qty) = parts[2].parse::<i64>() else {
            return writeln!(out, "Usage: {verb} SYMBOL QTY [PRICE]  (QTY must be an integer)");
        };
        if qty <= 0 {
            return writeln!(out, "Quantity must be a positive integer");
        }
        let price = match parts.get(3).map(|s| s.parse::<f64>()) {
            None => None,
            Some(Ok(p)) => Some(p),
            Some(Err(_)) => return writeln!(out, "PRICE must be a number, e.g. 12.5"),
        };

        let order = Order {
            side,
            symbol: parts[1].to_string(),
            qty,
            price,
        };
        match self.sim.execute(order) {
            Ok(trade) => {
                let past = match side {
                    Side::Buy => "Bought",
                    Side::Sell => "Sold",
                };
                writeln!(
                    out,
                    "{past} {} of {} @ {:.2} -> cash {:.2}",
                    trade.qty,
                    trade.symbol,
                    trade.price,
                    self.sim.ledger().cash()
                )
            }
            Err(StocksimError::UnknownSymbol { .. }) => writeln!(out, "Unknown symbol"),
            Err(e) => {
                let label = match side {
                    Side::Buy => "Buy",
                    Side::Sell => "Sell",
                };
                writeln!(out, "{label} failed: {e}")
            }
        }
    }

    fn show_portfolio<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let summary = self.sim.summary();
        writeln!(out, "Cash: {:.2}", summary.cash)?;
        writeln!(out, "Net worth: {:.2}", summary.net_worth)?;
        writeln!(out, "Holdings:")?;
        for h in &summary.holdings {
            match (h.price, h.value) {
                (Some(price), Some(value)) => writeln!(
                    out,
                    "  {}: {} shares @ {:.2} -> {:.2}",
                    h.symbol, h.qty, price, value
                )?,
                _ => writeln!(out, "  {}: {} shares (not listed)", h.symbol, h.qty)?,
            }
        }
        Ok(())
    }

    fn price_history<W: Write>(&self, parts: &[&str], out: &mut W) -> io::Result<()> {
        let Some(symbol) = parts.get(1) else {
            return writeln!(out, "Usage: pricehist SYMBOL [CSV_PATH]");
        };
        let points = match self.sim.price_history(symbol) {
            Ok(p) => p,
            Err(_) => return writeln!(out, "Unknown symbol"),
        };
        let symbol = symbol.to_uppercase();

        match parts.get(2) {
            Some(path) => {
                match csv_adapter::export_price_history(Path::new(path), &symbol, &points) {
                    Ok(()) => writeln!(out, "Wrote {} points for {symbol} to {path}", points.len()),
                    Err(e) => writeln!(out, "Export failed: {e}"),
                }
            }
            None => {
                for point in &points {
                    writeln!(out, "{}  {:.2}", point.date, point.price)?;
                }
                Ok(())
            }
        }
    }
}
