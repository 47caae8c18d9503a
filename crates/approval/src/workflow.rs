//! Approval workflow logic

use artvault_bus::{BalanceEvent, BalanceEventKind, EventBus, Outbox};
use artvault_core::{Amount, Currency, Role, TransactionStatus, TransactionType};
use artvault_ledger::Ledger;
use artvault_oracle::RateService;
use artvault_store::{
    Connection, CredentialRepo, DepositWalletRepo, Store, TransactionRecord, TransactionRepo,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

use crate::error::{ApprovalError, ApprovalResult};

/// Outcome of approving a deposit or withdrawal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    /// The record after the transition
    pub record: TransactionRecord,
    /// Crypto quantity credited or debited
    pub quantity: Amount,
    /// USD price of one unit used for the conversion
    pub rate: Decimal,
    /// The committed balance event
    pub event: BalanceEvent,
}

/// Deposit/withdrawal workflow
pub struct ApprovalWorkflow {
    store: Arc<Store>,
    rates: Arc<RateService>,
    bus: Arc<EventBus>,
}

fn check_submission(owner: &str, usd: Amount) -> ApprovalResult<&str> {
    let owner = owner.trim();
    if owner.is_empty() {
        return Err(ApprovalError::Validation("Owner is required".to_string()));
    }
    if !usd.is_positive() {
        return Err(ApprovalError::Validation("Amount must be positive".to_string()));
    }
    Ok(owner)
}

fn username_of(conn: &Connection, owner: &str) -> ApprovalResult<Option<String>> {
    Ok(CredentialRepo::get(conn, Role::User, owner)?.and_then(|c| c.username))
}

/// Fails unless `quantity` is worth at least `usd` at `rate`
fn ensure_covered(usd: Amount, quantity: Amount, rate: Decimal, currency: Currency) -> ApprovalResult<()> {
    let capacity = quantity.value().checked_mul(rate).unwrap_or(Decimal::MAX);
    if usd.value() > capacity {
        return Err(ApprovalError::InsufficientBalance {
            currency,
            requested_usd: usd.value(),
            available_usd: capacity.round_dp(2),
        });
    }
    Ok(())
}

/// Load a record that is about to be decided
fn load_pending(
    conn: &Connection,
    id: &str,
    expected: Option<TransactionType>,
) -> ApprovalResult<TransactionRecord> {
    let record = TransactionRepo::get(conn, id)?
        .ok_or_else(|| ApprovalError::invalid(id, "transaction not found"))?;

    if let Some(expected) = expected {
        if record.tx_type != expected {
            return Err(ApprovalError::invalid(
                id,
                format!("is a {}, not a {expected}", record.tx_type),
            ));
        }
    }

    let problems = ApprovalWorkflow::validate(&record);
    if !problems.is_empty() {
        return Err(ApprovalError::invalid(id, problems.join("; ")));
    }
    Ok(record)
}

/// Flip to `Approved` and append the balance event
fn settle(
    conn: &Connection,
    mut record: TransactionRecord,
    quantity: Amount,
    rate: Decimal,
    event: BalanceEvent,
) -> ApprovalResult<Approval> {
    let now = Utc::now();
    TransactionRepo::update_status(
        conn,
        &record.id,
        TransactionStatus::Approved,
        Some(quantity),
        Some(rate),
        now,
    )?;

    record.status = TransactionStatus::Approved;
    record.settled_amount = Some(quantity);
    record.rate = Some(rate);
    record.updated_at = now;

    let event = Outbox::append(conn, event)?;
    Ok(Approval {
        record,
        quantity,
        rate,
        event,
    })
}

impl ApprovalWorkflow {
    pub fn new(store: Arc<Store>, rates: Arc<RateService>, bus: Arc<EventBus>) -> Self {
        Self { store, rates, bus }
    }

    /// Pre-approval checklist; empty when the record can be decided
    pub fn validate(record: &TransactionRecord) -> Vec<String> {
        let mut problems = Vec::new();

        if !matches!(
            record.tx_type,
            TransactionType::Deposit | TransactionType::Withdrawal
        ) {
            problems.push(format!(
                "{} transactions are not subject to approval",
                record.tx_type
            ));
        }
        if !record.status.can_transition_to(TransactionStatus::Approved) {
            problems.push(format!("Transaction is already {}", record.status));
        }
        if !record.amount.is_positive() {
            problems.push("Amount must be positive".to_string());
        }
        if record.owner.trim().is_empty() {
            problems.push("Transaction has no owner".to_string());
        }
        if record.tx_type == TransactionType::Withdrawal
            && record
                .wallet_address
                .as_deref()
                .map_or(true, |a| a.trim().is_empty())
        {
            problems.push("Withdrawal has no destination address".to_string());
        }

        problems
    }

    /// Record a deposit request; the ledger is untouched until approval
    pub fn submit_deposit(
        &self,
        owner: &str,
        usd: Amount,
        currency: Currency,
    ) -> ApprovalResult<TransactionRecord> {
        let owner = check_submission(owner, usd)?;

        let record = self.store.transaction(|tx| {
            let mut record = TransactionRecord::new(TransactionType::Deposit, owner, usd, currency);
            record.username = username_of(tx, owner)?;
            record.wallet_address = DepositWalletRepo::get(tx, currency)?.map(|w| w.address);
            TransactionRepo::insert(tx, &record)?;
            Ok::<_, ApprovalError>(record)
        })?;

        info!(id = %record.id, owner, %currency, usd = %usd, "Deposit submitted");
        Ok(record)
    }

    /// Credit the owner with `usd / price` and mark the deposit approved
    pub async fn approve_deposit(&self, id: &str) -> ApprovalResult<Approval> {
        let rates = self.rates.rates().await;

        let approval = self.store.transaction(|tx| {
            let record = load_pending(tx, id, Some(TransactionType::Deposit))?;
            let conversion = rates.usd_to_crypto(record.amount, record.currency)?;

            Ledger::credit(tx, &record.owner, record.currency, conversion.quantity)?;
            let event = BalanceEvent::credit(
                &record.owner,
                record.currency,
                conversion.quantity,
                BalanceEventKind::Deposit,
            )
            .with_transaction(&record.id)
            .with_usd(record.amount.value());

            settle(tx, record, conversion.quantity, conversion.rate, event)
        })?;

        self.bus.publish(std::slice::from_ref(&approval.event));
        info!(
            id,
            owner = %approval.record.owner,
            currency = %approval.record.currency,
            quantity = %approval.quantity,
            rate = %approval.rate,
            source = %rates.source,
            "Deposit approved"
        );
        Ok(approval)
    }

    /// Record a withdrawal request and hold its quantity
    ///
    /// Fails with `InsufficientBalance` when the available balance is worth
    /// less than `usd` at the current price.
    pub async fn submit_withdrawal(
        &self,
        owner: &str,
        usd: Amount,
        currency: Currency,
        wallet_address: &str,
    ) -> ApprovalResult<TransactionRecord> {
        let owner = check_submission(owner, usd)?;
        let address = wallet_address.trim();
        if address.is_empty() {
            return Err(ApprovalError::Validation(
                "Wallet address is required".to_string(),
            ));
        }

        let rates = self.rates.rates().await;

        let record = self.store.transaction(|tx| {
            let rate = rates.rate(currency)?;
            let available = Ledger::available(tx, owner, currency)?;
            ensure_covered(usd, available, rate, currency)?;

            // Rounding can put the quantity a hair above what is free
            let hold = rates.usd_to_crypto(usd, currency)?.quantity.min(available);

            let mut record = TransactionRecord::new(TransactionType::Withdrawal, owner, usd, currency);
            record.username = username_of(tx, owner)?;
            record.wallet_address = Some(address.to_string());
            TransactionRepo::insert(tx, &record)?;
            Ledger::place_hold(tx, &record.id, owner, currency, hold)?;

            Ok::<_, ApprovalError>(record)
        })?;

        info!(id = %record.id, owner, %currency, usd = %usd, "Withdrawal submitted");
        Ok(record)
    }

    /// Debit `usd / current price` and mark the withdrawal approved
    ///
    /// Re-checks coverage at the current price against the available balance
    /// plus this withdrawal's own hold. On `InsufficientBalance` nothing
    /// changes and the request stays pending.
    pub async fn approve_withdrawal(&self, id: &str) -> ApprovalResult<Approval> {
        let rates = self.rates.rates().await;

        let approval = self.store.transaction(|tx| {
            let record = load_pending(tx, id, Some(TransactionType::Withdrawal))?;
            let rate = rates.rate(record.currency)?;

            let own_hold = Ledger::hold(tx, &record.id)?
                .map(|h| h.amount)
                .unwrap_or(Amount::ZERO);
            let available = Ledger::available(tx, &record.owner, record.currency)?;
            let spendable = available.checked_add(&own_hold).unwrap_or(available);
            ensure_covered(record.amount, spendable, rate, record.currency)?;

            let quantity = rates.usd_to_crypto(record.amount, record.currency)?.quantity;
            let debit = Ledger::debit(tx, &record.owner, record.currency, quantity)?;
            Ledger::release_hold(tx, &record.id)?;

            let event = BalanceEvent::debit(
                &record.owner,
                record.currency,
                debit.debited,
                BalanceEventKind::Withdrawal,
            )
            .with_transaction(&record.id)
            .with_usd(record.amount.value());

            settle(tx, record, debit.debited, rate, event)
        })?;

        self.bus.publish(std::slice::from_ref(&approval.event));
        info!(
            id,
            owner = %approval.record.owner,
            currency = %approval.record.currency,
            quantity = %approval.quantity,
            rate = %approval.rate,
            source = %rates.source,
            "Withdrawal approved"
        );
        Ok(approval)
    }

    /// Approve whatever kind of request `id` is
    pub async fn approve(&self, id: &str) -> ApprovalResult<Approval> {
        let record = self
            .transaction(id)?
            .ok_or_else(|| ApprovalError::invalid(id, "transaction not found"))?;

        match record.tx_type {
            TransactionType::Deposit => self.approve_deposit(id).await,
            TransactionType::Withdrawal => self.approve_withdrawal(id).await,
            other => Err(ApprovalError::invalid(
                id,
                format!("{other} transactions are not subject to approval"),
            )),
        }
    }

    pub fn decline_deposit(&self, id: &str) -> ApprovalResult<TransactionRecord> {
        self.decline_as(id, Some(TransactionType::Deposit))
    }

    /// Mark a withdrawal failed and release its hold; the balance is untouched
    pub fn decline_withdrawal(&self, id: &str) -> ApprovalResult<TransactionRecord> {
        self.decline_as(id, Some(TransactionType::Withdrawal))
    }

    /// Decline whatever kind of request `id` is
    pub fn decline(&self, id: &str) -> ApprovalResult<TransactionRecord> {
        self.decline_as(id, None)
    }

    fn decline_as(
        &self,
        id: &str,
        expected: Option<TransactionType>,
    ) -> ApprovalResult<TransactionRecord> {
        let record = self.store.transaction(|tx| {
            let mut record = load_pending(tx, id, expected)?;
            let now = Utc::now();

            if record.tx_type == TransactionType::Withdrawal {
                Ledger::release_hold(tx, &record.id)?;
            }
            TransactionRepo::update_status(tx, &record.id, TransactionStatus::Failed, None, None, now)?;

            record.status = TransactionStatus::Failed;
            record.updated_at = now;
            Ok::<_, ApprovalError>(record)
        })?;

        info!(
            id,
            tx_type = %record.tx_type,
            owner = %record.owner,
            "Transaction declined"
        );
        Ok(record)
    }

    pub fn transaction(&self, id: &str) -> ApprovalResult<Option<TransactionRecord>> {
        Ok(self.store.with_conn(|conn| TransactionRepo::get(conn, id))?)
    }

    /// Transactions of one owner, newest first
    pub fn history(&self, owner: &str) -> ApprovalResult<Vec<TransactionRecord>> {
        Ok(self
            .store
            .with_conn(|conn| TransactionRepo::list_by_owner(conn, owner.trim()))?)
    }

    /// Every transaction, newest first
    pub fn list(&self) -> ApprovalResult<Vec<TransactionRecord>> {
        Ok(self.store.with_conn(|conn| TransactionRepo::list(conn))?)
    }

    /// Requests awaiting a decision
    pub fn pending(&self) -> ApprovalResult<Vec<TransactionRecord>> {
        Ok(self
            .store
            .with_conn(|conn| TransactionRepo::list_by_status(conn, TransactionStatus::Processing))?)
    }

    /// Delete every transaction and every outstanding hold
    pub fn clear_transactions(&self) -> ApprovalResult<usize> {
        let (removed, holds) = self.store.transaction(|tx| {
            let holds = Ledger::clear_holds(tx)?;
            let removed = TransactionRepo::delete_all(tx)?;
            Ok::<_, ApprovalError>((removed, holds))
        })?;

        info!(removed, holds, "Transactions cleared");
        Ok(removed)
    }
}
