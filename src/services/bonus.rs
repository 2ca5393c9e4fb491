//! Referral bonus ledger
//!
//! Append-only transaction writer with the two bonus policies: a
//! registration credit to the new user, and a two-level sponsor credit
//! triggered by the sponsee's first confirmed deposit. Sponsors beyond
//! level 2 receive nothing.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::config::settings::Settings;
use crate::database::DatabaseService;
use crate::models::transaction::{
    CreateTransactionRequest, Recipient, Transaction, TransactionKind, TransactionState,
};
use crate::models::user::User;
use crate::utils::errors::{FixlineError, Result};
use crate::utils::logging::log_ledger_write;

/// Bonus ledger service
#[derive(Clone)]
pub struct BonusService {
    pool: PgPool,
    db: DatabaseService,
    settings: Settings,
}

impl BonusService {
    /// Create a new BonusService instance
    pub fn new(pool: PgPool, db: DatabaseService, settings: Settings) -> Self {
        Self { pool, db, settings }
    }

    /// Credit the registration bonus to a freshly created user, inside the
    /// caller's registration transaction.
    ///
    /// Sponsors receive nothing at registration; their credit comes from
    /// the first-deposit trigger.
    pub async fn grant_registration_bonus(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user: &User,
    ) -> Result<Transaction> {
        let recipient = self.db.resolve_recipient_in(tx, user).await?;
        let amount = Decimal::from(self.settings.bonus.self_amount);

        let row = self
            .write_confirmed(tx, recipient, amount, TransactionKind::Bonus, "Registration bonus", None)
            .await?;

        info!(user_id = user.id, "Registration bonus granted");
        Ok(row)
    }

    /// Record a deposit for a user; on their first confirmed deposit,
    /// credit the two-level sponsors.
    ///
    /// The first-deposit check and the sponsor writes run under a row
    /// lock on the depositor, so concurrent deliveries cannot
    /// double-credit the sponsors.
    pub async fn record_deposit(
        &self,
        user: &User,
        amount: Decimal,
        request_id: Option<i64>,
    ) -> Result<Transaction> {
        if amount <= Decimal::ZERO {
            return Err(FixlineError::validation("amount", "deposit must be positive"));
        }

        let recipient = self.db.resolve_recipient(user).await?;

        let mut tx = self.pool.begin().await?;

        // Serialize concurrent deposits of the same user
        self.db.users.find_by_id_for_update(&mut tx, user.id).await?;

        let prior_deposits = self
            .db
            .transactions
            .count_confirmed_in(&mut tx, recipient, TransactionKind::Deposit)
            .await?;

        let deposit = self
            .write_confirmed(&mut tx, recipient, amount, TransactionKind::Deposit, "Deposit", request_id)
            .await?;

        if prior_deposits == 0 {
            self.credit_sponsors(&mut tx, user).await?;
        } else {
            debug!(user_id = user.id, prior_deposits = prior_deposits, "Repeat deposit, no sponsor credit");
        }

        tx.commit().await?;
        Ok(deposit)
    }

    /// Credit sponsor1 and sponsor2 of a first-time depositor
    async fn credit_sponsors(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        sponsee: &User,
    ) -> Result<()> {
        let sponsor1 = match sponsee.referrer_id {
            Some(id) => self.db.users.find_by_id(id).await?,
            None => None,
        };

        let sponsor1 = match sponsor1 {
            Some(user) => user,
            None => return Ok(()),
        };

        let recipient1 = self.db.resolve_recipient(&sponsor1).await?;
        self.write_confirmed(
            tx,
            recipient1,
            Decimal::from(self.settings.bonus.level1_amount),
            TransactionKind::Bonus,
            &format!("Referral bonus (1st line) for user {}", sponsee.id),
            None,
        )
        .await?;
        info!(sponsor_id = sponsor1.id, sponsee_id = sponsee.id, "First-line referral bonus credited");

        let sponsor2 = match sponsor1.referrer_id {
            Some(id) => self.db.users.find_by_id(id).await?,
            None => None,
        };

        if let Some(sponsor2) = sponsor2 {
            let recipient2 = self.db.resolve_recipient(&sponsor2).await?;
            self.write_confirmed(
                tx,
                recipient2,
                Decimal::from(self.settings.bonus.level2_amount),
                TransactionKind::Bonus,
                &format!("Referral bonus (2nd line) for user {}", sponsee.id),
                None,
            )
            .await?;
            info!(sponsor_id = sponsor2.id, sponsee_id = sponsee.id, "Second-line referral bonus credited");
        }

        Ok(())
    }

    /// Append one confirmed ledger row, mirroring master balances
    async fn write_confirmed(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        recipient: Recipient,
        amount: Decimal,
        kind: TransactionKind,
        reason: &str,
        request_id: Option<i64>,
    ) -> Result<Transaction> {
        let row = self
            .db
            .transactions
            .create_in(
                tx,
                CreateTransactionRequest {
                    recipient,
                    amount,
                    kind,
                    state: TransactionState::Confirmed,
                    reason: reason.to_string(),
                    request_id,
                },
            )
            .await?;

        // Master balances mirror their confirmed ledger
        if let Recipient::Master(master_id) = recipient {
            self.db.masters.add_to_balance_in(tx, master_id, amount).await?;
        }

        log_ledger_write(&recipient.describe(), kind.as_str(), &amount.to_string(), reason);
        Ok(row)
    }
}
