//! ArtVault CLI - Main entry point

use artvault_auth::ProfileUpdate;
use artvault_cli::{commands, AppContext};
use artvault_config::ConfigLoader;
use artvault_core::{Amount, Currency};
use artvault_market::{AdminListing, MintRequest};
use artvault_store::DataKind;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "artvault")]
#[command(about = "ArtVault - NFT marketplace balances and approvals", long_about = None)]
struct Cli {
    /// Configuration file (optional; defaults apply when missing)
    #[arg(short, long, default_value = "artvault.toml")]
    config: PathBuf,

    /// Database file, overriding `[storage] path`
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        email: String,
        /// Required for users
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: String,
        /// Recovery phrase kept with the account
        #[arg(long)]
        wallet_phrase: Option<String>,
        /// Create an admin account
        #[arg(long)]
        admin: bool,
    },

    /// Log in with email or username
    Login {
        login: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        admin: bool,
    },

    /// End the current session
    Logout {
        #[arg(long)]
        admin: bool,
    },

    /// Show active sessions
    Whoami,

    /// Change settings of the logged-in account
    Profile {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        wallet_phrase: Option<String>,
        #[arg(long)]
        admin: bool,
    },

    /// List user accounts (admin)
    Users,

    /// Request a deposit
    Deposit {
        /// Amount in USD
        amount: Decimal,
        /// USDT, ETH, BTC, SOL or TRX (USDT_TRC20 is USDT)
        currency: Currency,
    },

    /// Request a withdrawal
    Withdraw {
        /// Amount in USD
        amount: Decimal,
        currency: Currency,
        /// Destination address
        address: String,
    },

    /// Approve a pending deposit or withdrawal (admin)
    Approve { id: String },

    /// Decline a pending deposit or withdrawal (admin)
    Decline { id: String },

    /// Show transactions
    Transactions {
        /// Every transaction (admin)
        #[arg(long)]
        all: bool,
        /// Only those awaiting a decision (admin)
        #[arg(long)]
        pending: bool,
    },

    /// Delete every transaction (admin)
    ClearTransactions,

    /// Show balances
    Balance {
        /// Ledger owner to inspect (admin)
        #[arg(long)]
        owner: Option<String>,
    },

    /// Show current USD rates
    Rates,

    /// Mint an artwork, paying the gas fee
    Mint {
        title: String,
        /// Price in USD
        price: Decimal,
        /// Currency the artwork is listed and paid in
        currency: Currency,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "Art")]
        category: String,
        /// Image as a data URL
        #[arg(long)]
        image: Option<String>,
    },

    /// Put an artwork straight on the marketplace (admin)
    ListAdmin {
        title: String,
        #[arg(long)]
        artist: String,
        /// Price as "<amount> <SYMBOL>", e.g. "2 SOL"
        #[arg(long)]
        reserve: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "Art")]
        category: String,
        #[arg(long)]
        image: Option<String>,
    },

    /// Upload an artwork to the marketplace
    Upload { id: String },

    /// Mark an artwork sold and credit its owner (admin)
    Sold { id: String },

    /// Delete an artwork (admin)
    DeleteArtwork { id: String },

    /// Show artworks
    Artworks {
        /// Only the logged-in user's
        #[arg(long)]
        mine: bool,
        /// The marketplace instead
        #[arg(long)]
        listings: bool,
    },

    /// Set the deposit address of a currency (admin)
    WalletSet {
        currency: Currency,
        address: String,
        /// QR code image as a data URL
        #[arg(long)]
        qr: Option<String>,
    },

    /// Show deposit addresses
    Wallets,

    /// Show committed balance events
    Events {
        /// Only events after this sequence
        #[arg(long, default_value = "0")]
        after: u64,
        #[arg(long)]
        owner: Option<String>,
    },

    /// Wipe stored data: transactions, artworks, wallets, balances or all (admin)
    Clear { kind: DataKind },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::load_or_default(&cli.config)?;
    if let Some(db) = cli.db {
        config.storage.path = db;
    }
    init_logging(&config.log.level);

    let mut ctx = AppContext::new(config)?;
    ctx.start_event_log();

    let result = run(&ctx, cli.command).await;
    ctx.shutdown().await;
    result
}

async fn run(ctx: &AppContext, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Signup {
            email,
            username,
            password,
            wallet_phrase,
            admin,
        } => commands::signup(ctx, &email, username, &password, wallet_phrase, admin)?,

        Commands::Login {
            login,
            password,
            admin,
        } => {
            commands::login(ctx, &login, &password, admin)?;
        }

        Commands::Logout { admin } => commands::logout(ctx, admin)?,

        Commands::Whoami => commands::whoami(ctx)?,

        Commands::Profile {
            email,
            username,
            password,
            wallet_phrase,
            admin,
        } => commands::profile(
            ctx,
            admin,
            ProfileUpdate {
                email,
                username,
                password,
                wallet_phrase,
            },
        )?,

        Commands::Users => commands::users(ctx)?,

        Commands::Deposit { amount, currency } => {
            commands::deposit(ctx, amount, currency)?;
        }

        Commands::Withdraw {
            amount,
            currency,
            address,
        } => {
            commands::withdraw(ctx, amount, currency, &address).await?;
        }

        Commands::Approve { id } => {
            commands::approve(ctx, &id).await?;
        }

        Commands::Decline { id } => {
            commands::decline(ctx, &id)?;
        }

        Commands::Transactions { all, pending } => commands::transactions(ctx, all, pending)?,

        Commands::ClearTransactions => {
            commands::clear_transactions(ctx)?;
        }

        Commands::Balance { owner } => {
            commands::balance(ctx, owner.as_deref()).await?;
        }

        Commands::Rates => commands::rates(ctx).await?,

        Commands::Mint {
            title,
            price,
            currency,
            description,
            category,
            image,
        } => {
            let request = MintRequest {
                title,
                description,
                category,
                image,
                price_usd: Amount::new(price)?,
                currency,
            };
            commands::mint(ctx, request).await?;
        }

        Commands::ListAdmin {
            title,
            artist,
            reserve,
            description,
            category,
            image,
        } => {
            let listing = AdminListing {
                title,
                artist,
                image,
                reserve,
                category,
                description,
            };
            commands::list_admin(ctx, listing)?;
        }

        Commands::Upload { id } => {
            commands::upload(ctx, &id)?;
        }

        Commands::Sold { id } => {
            commands::sold(ctx, &id)?;
        }

        Commands::DeleteArtwork { id } => commands::delete_artwork(ctx, &id)?,

        Commands::Artworks { mine, listings } => commands::artworks(ctx, mine, listings)?,

        Commands::WalletSet {
            currency,
            address,
            qr,
        } => {
            commands::wallet_set(ctx, currency, &address, qr)?;
        }

        Commands::Wallets => commands::wallets(ctx)?,

        Commands::Events { after, owner } => {
            commands::events(ctx, after, owner.as_deref())?;
        }

        Commands::Clear { kind } => commands::clear(ctx, kind)?,
    }

    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
