use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use walletctl::alias::AliasError;
use walletctl::config::{default_data_dir, Config};
use walletctl::etherscan::EtherscanClient;
use walletctl::keystore::DirKeystore;
use walletctl::notify::{LogNotifier, SystemClipboard};
use walletctl::store::SqliteStore;
use walletctl::{Account, Address, Collaborators, Controller, Network};

fn default_data_dir_string() -> String {
    default_data_dir().to_string_lossy().to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Parser, Debug)]
#[command(name = "walletctl", about = "Wallet session and sync controller", version)]
struct Args {
    /// Path to the data directory
    #[arg(long, default_value_t = default_data_dir_string())]
    datadir: String,

    /// Keystore directory, defaults to <datadir>/keystore
    #[arg(long)]
    keystore_dir: Option<PathBuf>,

    /// Network name or chain id, overrides the stored setting for this run
    #[arg(long)]
    network: Option<Network>,

    /// Etherscan API key
    #[arg(long)]
    api_key: Option<String>,

    /// Etherscan-compatible API URL, replaces the per-network default
    #[arg(long)]
    api_url: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value_t = default_log_level())]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Balance and recent history of an account
    Overview {
        /// Account to show, the keystore's primary account when omitted
        #[arg(long)]
        account: Option<Address>,
    },
    /// Full transaction history of an account
    History {
        #[arg(long)]
        account: Option<Address>,
    },
    /// Accounts of the keystore
    Accounts,
    /// Address aliases
    Alias {
        #[command(subcommand)]
        action: AliasAction,
    },
    /// Stored network setting
    Network {
        /// New network, prints the current one when omitted
        network: Option<Network>,
    },
}

#[derive(Subcommand, Debug)]
enum AliasAction {
    Get { address: Address },
    /// An empty alias removes it
    Set { address: Address, alias: String },
    Delete { address: Address },
}

fn log_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

fn init_logging(datadir: &std::path::Path, level: &str) -> Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(datadir.join("walletctl.log"))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                log_timestamp(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let datadir = PathBuf::from(&args.datadir);
    fs::create_dir_all(&datadir)?;
    init_logging(&datadir, &args.log_level)?;
    log::info!("Starting walletctl with data directory: {:?}", datadir);

    let mut config = Config::new(&datadir);
    if let Some(dir) = args.keystore_dir {
        config.keystore_dir = dir;
    }
    config.network = args.network;
    config.etherscan_api_key = args.api_key;
    config.etherscan_api_url = args.api_url;
    config.request_timeout = Duration::from_secs(args.timeout);
    config.screen_switch_delay = Duration::ZERO;

    let mut ledger = EtherscanClient::new(config.etherscan_api_key.clone(), config.request_timeout)?;
    if let Some(url) = &config.etherscan_api_url {
        ledger = ledger.with_base_url(url.clone());
    }
    let collaborators = Collaborators {
        accounts: Arc::new(DirKeystore::new(&config.keystore_dir)),
        ledger: Arc::new(ledger),
        store: Arc::new(SqliteStore::new(&datadir)?),
        notifier: Box::new(LogNotifier),
        clipboard: Box::new(SystemClipboard),
    };
    let mut controller = Controller::new(config, collaborators)?;

    match args.command {
        Command::Overview { account } => {
            load_account(&mut controller, account).await?;
            if let Some(alias) = controller.current_alias()? {
                println!("Alias:   {alias}");
            }
            println!(
                "Balance: {}",
                controller.balance_title().unwrap_or_default()
            );
            for item in controller.history_items().iter().take(10) {
                println!("{} {}  {}", item.label, item.amount, item.counterparty);
            }
        }
        Command::History { account } => {
            load_account(&mut controller, account).await?;
            let items = controller.history_items();
            if items.is_empty() {
                println!("No transactions");
            }
            for item in items {
                println!("{} {}  {}", item.label, item.amount, item.counterparty);
            }
        }
        Command::Accounts => {
            let accounts = controller.list_accounts().await?;
            if accounts.is_empty() {
                println!("Keystore is empty");
            }
            for account in accounts {
                match controller.aliases().get_for(&account) {
                    Ok(alias) => println!("{}  {alias}", account.address()),
                    Err(AliasError::NotFound(_)) => println!("{}", account.address()),
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Command::Alias { action } => match action {
            AliasAction::Get { address } => match controller.aliases().get(&address) {
                Ok(alias) => println!("{alias}"),
                Err(AliasError::NotFound(_)) => println!("No alias for {address}"),
                Err(e) => return Err(e.into()),
            },
            AliasAction::Set { address, alias } => controller.aliases().set(&address, &alias)?,
            AliasAction::Delete { address } => controller.aliases().delete(&address)?,
        },
        Command::Network { network } => match network {
            Some(network) => {
                let handles = controller.set_network(network)?;
                controller.settle(handles).await?;
                println!("Network set to {network}");
            }
            None => println!("{}", controller.network()),
        },
    }

    Ok(())
}

/// Selects `account` (or the primary one) and waits for its data.
async fn load_account(controller: &mut Controller, account: Option<Address>) -> Result<()> {
    let handles = match account {
        Some(address) => controller.select_account(Some(Account::new(address))),
        None => match controller.primary_account().await? {
            Some(primary) => controller.select_account(Some(primary)),
            None => return Err(anyhow!("Keystore is empty, create an account first")),
        },
    };
    if let Err(e) = controller.settle(handles).await {
        log::error!("Refresh failed: {e}");
        eprintln!("Refresh failed: {e}");
    }
    Ok(())
}
