//! CLI commands
//!
//! User commands act on the active user session; admin commands require an
//! active admin session.

use artvault_approval::Approval;
use artvault_auth::{ProfileUpdate, RegisterRequest};
use artvault_bus::{BalanceEvent, Outbox};
use artvault_core::{Amount, Currency, Role};
use artvault_ledger::{Balances, Ledger};
use artvault_market::{AdminListing, MintRequest, Sale};
use artvault_store::{
    ArtworkRecord, DataKind, DepositWallet, DepositWalletRepo, SessionRecord, TransactionRecord,
};
use chrono::Utc;
use rust_decimal::Decimal;

use crate::context::AppContext;

fn role(admin: bool) -> Role {
    if admin {
        Role::Admin
    } else {
        Role::User
    }
}

fn print_transaction(tx: &TransactionRecord) {
    println!(
        "  {:<32} {:<10} {:<10} {:>14} {:<5} {} {}",
        tx.id,
        tx.tx_type,
        tx.status,
        tx.amount,
        tx.currency,
        tx.username.as_deref().unwrap_or(&tx.owner),
        tx.created_at.format("%Y-%m-%d %H:%M"),
    );
}

fn print_artwork(artwork: &ArtworkRecord) {
    let mut flags = Vec::new();
    if artwork.uploaded_to_marketplace {
        flags.push("listed");
    }
    if artwork.sold {
        flags.push("sold");
    }
    println!(
        "  {:<28} {:<24} {:>18} {:<16} {}",
        artwork.id,
        artwork.title,
        artwork.price,
        artwork.owner,
        flags.join(",")
    );
}

// === Accounts ===

/// Create an account
pub fn signup(
    ctx: &AppContext,
    email: &str,
    username: Option<String>,
    password: &str,
    wallet_phrase: Option<String>,
    admin: bool,
) -> Result<(), anyhow::Error> {
    let record = ctx.identities.register(RegisterRequest {
        role: role(admin),
        email: email.to_string(),
        username,
        password: password.to_string(),
        wallet_phrase,
    })?;

    println!("✅ Registered {} account {}", record.role, record.display_name());
    Ok(())
}

/// Log in with email or username; replaces the role's session
pub fn login(
    ctx: &AppContext,
    login: &str,
    password: &str,
    admin: bool,
) -> Result<SessionRecord, anyhow::Error> {
    let session = ctx.identities.login(role(admin), login, password)?;

    println!(
        "✅ Logged in as {} ({})",
        session.username.as_deref().unwrap_or(&session.email),
        session.role
    );
    Ok(session)
}

pub fn logout(ctx: &AppContext, admin: bool) -> Result<(), anyhow::Error> {
    if ctx.identities.end_session(role(admin))? {
        println!("✅ Logged out");
    } else {
        println!("No active {} session", role(admin));
    }
    Ok(())
}

/// Show both sessions
pub fn whoami(ctx: &AppContext) -> Result<(), anyhow::Error> {
    for role in [Role::Admin, Role::User] {
        match ctx.identities.current_session(role)? {
            Some(session) => println!(
                "{role:<6} {} since {}",
                session.username.as_deref().unwrap_or(&session.email),
                session.login_time.format("%Y-%m-%d %H:%M:%S")
            ),
            None => println!("{role:<6} -"),
        }
    }
    Ok(())
}

/// Change the logged-in account's settings
pub fn profile(
    ctx: &AppContext,
    admin: bool,
    update: ProfileUpdate,
) -> Result<(), anyhow::Error> {
    let session = ctx.require_session(role(admin))?;
    let record = ctx
        .identities
        .update_profile(session.role, &session.email, update)?;

    println!("✅ Updated profile of {}", record.display_name());
    Ok(())
}

/// List user accounts (admin)
pub fn users(ctx: &AppContext) -> Result<(), anyhow::Error> {
    ctx.require_session(Role::Admin)?;
    let users = ctx.identities.list(Role::User)?;

    println!("Users ({}):", users.len());
    for user in &users {
        let last_login = user
            .last_login
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  {:<20} {:<32} joined {} last login {}",
            user.username.as_deref().unwrap_or("-"),
            user.email,
            user.created_at.format("%Y-%m-%d"),
            last_login
        );
    }
    Ok(())
}

// === Deposits and withdrawals ===

/// Request a deposit of `usd` dollars in `currency`
pub fn deposit(
    ctx: &AppContext,
    usd: Decimal,
    currency: Currency,
) -> Result<TransactionRecord, anyhow::Error> {
    let session = ctx.require_session(Role::User)?;
    let record = ctx
        .approvals
        .submit_deposit(&session.email, Amount::new(usd)?, currency)?;

    println!("✅ Deposit {} submitted for ${} in {}", record.id, record.amount, currency);
    match &record.wallet_address {
        Some(address) => println!("   Send funds to {address}"),
        None => println!("   No {currency} deposit address configured yet"),
    }
    Ok(record)
}

/// Request a withdrawal of `usd` dollars in `currency` to `address`
pub async fn withdraw(
    ctx: &AppContext,
    usd: Decimal,
    currency: Currency,
    address: &str,
) -> Result<TransactionRecord, anyhow::Error> {
    let session = ctx.require_session(Role::User)?;
    let record = ctx
        .approvals
        .submit_withdrawal(&session.email, Amount::new(usd)?, currency, address)
        .await?;

    println!(
        "✅ Withdrawal {} submitted for ${} in {} to {}",
        record.id, record.amount, currency, address
    );
    Ok(record)
}

/// Approve a pending deposit or withdrawal (admin)
pub async fn approve(ctx: &AppContext, id: &str) -> Result<Approval, anyhow::Error> {
    ctx.require_session(Role::Admin)?;
    let approval = ctx.approvals.approve(id).await?;

    println!(
        "✅ Approved {} {}: {} {} at ${} (event #{})",
        approval.record.tx_type,
        approval.record.id,
        approval.quantity.value().round_dp(8).normalize(),
        approval.record.currency,
        approval.rate,
        approval.event.sequence
    );
    Ok(approval)
}

/// Decline a pending deposit or withdrawal (admin)
pub fn decline(ctx: &AppContext, id: &str) -> Result<TransactionRecord, anyhow::Error> {
    ctx.require_session(Role::Admin)?;
    let record = ctx.approvals.decline(id)?;

    println!("✅ Declined {} {}", record.tx_type, record.id);
    Ok(record)
}

/// Show transactions: the user's own, or every / pending one for the admin
pub fn transactions(ctx: &AppContext, all: bool, pending: bool) -> Result<(), anyhow::Error> {
    let records = if all || pending {
        ctx.require_session(Role::Admin)?;
        if pending {
            ctx.approvals.pending()?
        } else {
            ctx.approvals.list()?
        }
    } else {
        let session = ctx.require_session(Role::User)?;
        ctx.approvals.history(&session.email)?
    };

    println!("Transactions ({}):", records.len());
    for record in &records {
        print_transaction(record);
        if pending {
            for problem in artvault_approval::ApprovalWorkflow::validate(record) {
                println!("    ⚠️  {problem}");
            }
        }
    }
    Ok(())
}

/// Delete every transaction and outstanding hold (admin)
pub fn clear_transactions(ctx: &AppContext) -> Result<usize, anyhow::Error> {
    ctx.require_session(Role::Admin)?;
    let removed = ctx.approvals.clear_transactions()?;

    println!("✅ Removed {removed} transactions");
    Ok(removed)
}

// === Balances and rates ===

/// Balances of the logged-in user, or of `owner` for the admin
pub async fn balance(ctx: &AppContext, owner: Option<&str>) -> Result<Balances, anyhow::Error> {
    let owner = match owner {
        Some(owner) => {
            ctx.require_session(Role::Admin)?;
            owner.to_string()
        }
        None => ctx.require_session(Role::User)?.email,
    };

    let rates = ctx.rates.rates().await;
    let (balances, available) = ctx.store.with_conn(|conn| {
        let balances = Ledger::balances(conn, &owner)?;
        let mut available = Balances::new();
        for currency in balances.keys() {
            available.insert(*currency, Ledger::available(conn, &owner, *currency)?);
        }
        Ok::<_, artvault_ledger::LedgerError>((balances, available))
    })?;

    println!("Balances for {owner}:");
    let mut total = Decimal::ZERO;
    for (currency, amount) in &balances {
        let usd = rates.crypto_to_usd(*amount, *currency)?.value();
        total += usd;

        let free = available.get(currency).copied().unwrap_or(Amount::ZERO);
        let held = if free != *amount {
            format!(" ({} available)", free.value().round_dp(8).normalize())
        } else {
            String::new()
        };
        println!(
            "  {:<5} {:>20} ≈ ${:.2}{held}",
            currency,
            amount.value().round_dp(8).normalize(),
            usd
        );
    }
    println!("  Total ≈ ${total:.2} ({} rates)", rates.source);
    Ok(balances)
}

/// Show the current rate table
pub async fn rates(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let table = ctx.rates.rates().await;

    println!(
        "Rates ({}, {}):",
        table.source,
        table.fetched_at.format("%Y-%m-%d %H:%M:%S")
    );
    for (currency, usd) in &table.prices {
        println!("  {currency:<5} ${usd}");
    }
    Ok(())
}

// === Artworks ===

/// Mint an artwork for the logged-in user, paying the gas fee
pub async fn mint(ctx: &AppContext, request: MintRequest) -> Result<ArtworkRecord, anyhow::Error> {
    let session = ctx.require_session(Role::User)?;
    let artwork = ctx.gallery.mint(&session.email, request).await?;

    if let Some(fee) = &artwork.gas_fee {
        println!(
            "✅ Minted {} at {} (gas fee {} {} ≈ ${})",
            artwork.id,
            artwork.price,
            fee.amount.value().round_dp(8).normalize(),
            fee.currency,
            fee.usd
        );
    }
    Ok(artwork)
}

/// Put an admin artwork straight on the marketplace (admin)
pub fn list_admin(ctx: &AppContext, listing: AdminListing) -> Result<ArtworkRecord, anyhow::Error> {
    ctx.require_session(Role::Admin)?;
    let artwork = ctx.gallery.create_admin_listing(listing)?;

    println!("✅ Listed {} at {}", artwork.id, artwork.price);
    Ok(artwork)
}

/// Upload an artwork to the marketplace
pub fn upload(ctx: &AppContext, id: &str) -> Result<bool, anyhow::Error> {
    if ctx.identities.current_session(Role::Admin)?.is_none() {
        ctx.require_session(Role::User)?;
    }

    let uploaded = ctx.gallery.upload_to_marketplace(id)?;
    if uploaded {
        println!("✅ {id} is now on the marketplace");
    } else {
        println!("{id} was already on the marketplace");
    }
    Ok(uploaded)
}

/// Mark an artwork sold and credit its owner (admin)
pub fn sold(ctx: &AppContext, id: &str) -> Result<Sale, anyhow::Error> {
    ctx.require_session(Role::Admin)?;
    let sale = ctx.gallery.mark_sold(id)?;

    println!(
        "✅ Sold {} for {}; credited {} ({})",
        sale.artwork.id, sale.price, sale.seller, sale.record.id
    );
    Ok(sale)
}

/// Delete an artwork and its listing (admin)
pub fn delete_artwork(ctx: &AppContext, id: &str) -> Result<(), anyhow::Error> {
    ctx.require_session(Role::Admin)?;
    ctx.gallery.delete(id)?;

    println!("✅ Deleted {id}");
    Ok(())
}

/// Show artworks: the user's own with `mine`, the marketplace with
/// `listings`, everything otherwise
pub fn artworks(ctx: &AppContext, mine: bool, listings: bool) -> Result<(), anyhow::Error> {
    if listings {
        let listings = ctx.gallery.listings()?;
        println!("Marketplace ({}):", listings.len());
        for listing in &listings {
            println!(
                "  {:<28} {:<24} {:>18} {:<16} {}",
                listing.id,
                listing.title,
                listing.reserve,
                listing.artist,
                if listing.sold { "sold" } else { "" }
            );
        }
        return Ok(());
    }

    let artworks = if mine {
        let session = ctx.require_session(Role::User)?;
        ctx.gallery.artworks_of(&session.email)?
    } else {
        ctx.gallery.artworks()?
    };

    println!("Artworks ({}):", artworks.len());
    for artwork in &artworks {
        print_artwork(artwork);
    }
    Ok(())
}

// === Deposit wallets ===

/// Set the admin deposit address of a currency (admin)
pub fn wallet_set(
    ctx: &AppContext,
    currency: Currency,
    address: &str,
    qr_image: Option<String>,
) -> Result<DepositWallet, anyhow::Error> {
    ctx.require_session(Role::Admin)?;
    let address = address.trim();
    if address.is_empty() {
        anyhow::bail!("Wallet address is required");
    }

    let wallet = DepositWallet {
        currency,
        address: address.to_string(),
        qr_image,
        updated_at: Utc::now(),
    };
    ctx.store
        .with_conn(|conn| DepositWalletRepo::upsert(conn, &wallet))?;

    println!("✅ {currency} deposits now go to {address}");
    Ok(wallet)
}

pub fn wallets(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let wallets = ctx.store.with_conn(|conn| DepositWalletRepo::list(conn))?;

    println!("Deposit wallets ({}):", wallets.len());
    for wallet in &wallets {
        println!(
            "  {:<5} {}{}",
            wallet.currency,
            wallet.address,
            if wallet.qr_image.is_some() { " [qr]" } else { "" }
        );
    }
    Ok(())
}

// === Events and maintenance ===

/// Show committed balance events after `after`, optionally for one owner
pub fn events(
    ctx: &AppContext,
    after: u64,
    owner: Option<&str>,
) -> Result<Vec<BalanceEvent>, anyhow::Error> {
    let events: Vec<BalanceEvent> = match owner {
        Some(owner) => ctx
            .store
            .with_conn(|conn| Outbox::for_owner(conn, owner))?
            .into_iter()
            .filter(|e| e.sequence > after)
            .collect(),
        None => ctx.bus.replay(after)?,
    };

    println!("Balance events ({}):", events.len());
    for event in &events {
        println!(
            "  #{:<6} {:<10} {:<24} {:>22} {:<5} {}",
            event.sequence,
            event.kind,
            event.owner,
            event.delta.round_dp(8).normalize(),
            event.currency,
            event.transaction_id.as_deref().unwrap_or("-")
        );
    }
    Ok(events)
}

/// Wipe one kind of stored data (admin)
///
/// `all` removes credentials and sessions too.
pub fn clear(ctx: &AppContext, kind: DataKind) -> Result<(), anyhow::Error> {
    ctx.require_session(Role::Admin)?;
    ctx.store.clear(kind)?;

    println!("✅ Cleared {kind}");
    for (table, count) in ctx.store.table_counts()? {
        println!("  {table:<22} {count}");
    }
    Ok(())
}
