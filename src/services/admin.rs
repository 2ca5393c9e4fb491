//! Administrative operations
//!
//! Cascade deletes, legacy balance imports, referrer repair and the
//! blanket data-fix actions. Every mutating entry point logs an audit
//! line with the acting operation name.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::settings::Settings;
use crate::database::DatabaseService;
use crate::models::transaction::{
    CreateTransactionRequest, Recipient, TransactionKind, TransactionState,
};
use crate::models::user::{User, UserPatch, UserRole};
use crate::services::registration::referrer_role_for;
use crate::utils::errors::{FixlineError, Result};
use crate::utils::helpers::parse_referral_payload;
use crate::utils::logging::log_admin_action;

/// Per-table counters for one cascade delete
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteReport {
    pub users: u64,
    pub masters: u64,
    pub requests: u64,
    pub transactions: u64,
    pub referral_links: u64,
    pub dry_run: bool,
}

/// Counters for one balance import run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BalanceImportReport {
    pub credited: u64,
    pub skipped_duplicates: u64,
    pub skipped_unknown: u64,
    pub errors: Vec<String>,
}

/// Counters for one referrer repair run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferrerRepairReport {
    pub linked: u64,
    pub skipped_no_referrer: u64,
    pub skipped_cycle: u64,
}

/// Admin service
#[derive(Clone)]
pub struct AdminService {
    pool: PgPool,
    db: DatabaseService,
    settings: Settings,
}

impl AdminService {
    /// Create a new AdminService instance
    pub fn new(pool: PgPool, db: DatabaseService, settings: Settings) -> Self {
        Self { pool, db, settings }
    }

    /// Delete every account behind a telegram id with all dependent rows.
    ///
    /// With `dry_run` the counters are computed but nothing is written.
    pub async fn delete_user(&self, telegram_id: &str, dry_run: bool) -> Result<DeleteReport> {
        let users = self.db.users.find_all_by_telegram_id(telegram_id).await?;
        if users.is_empty() {
            return Err(FixlineError::UserNotFound {
                telegram_id: telegram_id.to_string(),
            });
        }

        let mut report = DeleteReport {
            dry_run,
            ..Default::default()
        };

        let mut tx = self.pool.begin().await?;

        for user in &users {
            let master = self.db.masters.find_by_user_id(user.id).await?;

            // Child tables first; the user row last
            report.referral_links += self.db.referrals.delete_by_user_in(&mut tx, user.id).await?;
            report.transactions += self.db.transactions.delete_by_user_in(&mut tx, user.id).await?;
            report.requests += self.db.requests.delete_by_client_in(&mut tx, user.id).await?;

            if let Some(master) = &master {
                report.transactions += self
                    .db
                    .transactions
                    .delete_by_master_in(&mut tx, master.id)
                    .await?;
                report.requests += self.db.requests.delete_by_master_in(&mut tx, master.id).await?;
                self.db.masters.delete_in(&mut tx, master.id).await?;
                report.masters += 1;
            }

            self.db.users.delete_in(&mut tx, user.id).await?;
            report.users += 1;
        }

        if dry_run {
            tx.rollback().await?;
        } else {
            tx.commit().await?;
        }

        log_admin_action("delete_user", report.users, dry_run);
        Ok(report)
    }

    /// Import legacy master balances from `telegram_id, amount` lines.
    ///
    /// Positive amounts become confirmed deposits, negative ones
    /// penalties. A line whose master already holds a confirmed row of
    /// the same kind and magnitude is treated as already imported.
    pub async fn import_balances(&self, body: &str) -> Result<BalanceImportReport> {
        let mut report = BalanceImportReport::default();

        for (line_no, line) in body.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let parsed = parse_balance_line(line);
            let (telegram_id, amount) = match parsed {
                Some(pair) => pair,
                None => {
                    report.errors.push(format!("line {}: unparseable", line_no + 1));
                    continue;
                }
            };

            match self.import_one_balance(&telegram_id, amount).await {
                Ok(BalanceLineOutcome::Credited) => report.credited += 1,
                Ok(BalanceLineOutcome::Duplicate) => report.skipped_duplicates += 1,
                Ok(BalanceLineOutcome::UnknownMaster) => report.skipped_unknown += 1,
                Err(e) => {
                    warn!(line = line_no + 1, error = %e, "Balance import line failed");
                    report.errors.push(format!("line {}: {}", line_no + 1, e));
                }
            }
        }

        log_admin_action("import_balances", report.credited, false);
        Ok(report)
    }

    async fn import_one_balance(
        &self,
        telegram_id: &str,
        amount: Decimal,
    ) -> Result<BalanceLineOutcome> {
        let user = self
            .db
            .users
            .find_by_telegram_id_and_role(telegram_id, UserRole::Master)
            .await?;
        let user = match user {
            Some(user) => user,
            None => return Ok(BalanceLineOutcome::UnknownMaster),
        };
        let master = match self.db.masters.find_by_user_id(user.id).await? {
            Some(master) => master,
            None => return Ok(BalanceLineOutcome::UnknownMaster),
        };

        let kind = if amount >= Decimal::ZERO {
            TransactionKind::Deposit
        } else {
            TransactionKind::Penalty
        };

        let mut tx = self.pool.begin().await?;

        // Concurrent imports of the same line serialize on the master row,
        // so the duplicate check and the insert are one atomic step
        self.db.masters.find_by_id_for_update(&mut tx, master.id).await?;

        if self
            .db
            .transactions
            .exists_confirmed_for_master_in(&mut tx, master.id, kind, amount.abs())
            .await?
        {
            return Ok(BalanceLineOutcome::Duplicate);
        }

        self.db
            .transactions
            .create_in(
                &mut tx,
                CreateTransactionRequest {
                    recipient: Recipient::Master(master.id),
                    amount,
                    kind,
                    state: TransactionState::Confirmed,
                    reason: "Imported legacy balance".to_string(),
                    request_id: None,
                },
            )
            .await?;
        self.db.masters.add_to_balance_in(&mut tx, master.id, amount).await?;
        tx.commit().await?;

        info!(master_id = master.id, amount = %amount, "Legacy balance imported");
        Ok(BalanceLineOutcome::Credited)
    }

    /// Re-resolve referrers for users whose stored referral payload is a
    /// bare telegram id and whose referrer is still unset.
    pub async fn repair_referrers(&self) -> Result<ReferrerRepairReport> {
        let mut report = ReferrerRepairReport::default();

        for user in self.db.users.list_with_unresolved_referral().await? {
            match self.repair_one_referrer(&user).await? {
                ReferrerRepairOutcome::Linked => report.linked += 1,
                ReferrerRepairOutcome::NoReferrer => report.skipped_no_referrer += 1,
                ReferrerRepairOutcome::Cycle => report.skipped_cycle += 1,
            }
        }

        log_admin_action("repair_referrers", report.linked, false);
        Ok(report)
    }

    async fn repair_one_referrer(&self, user: &User) -> Result<ReferrerRepairOutcome> {
        let payload = user
            .referral_link
            .as_deref()
            .and_then(parse_referral_payload);
        let payload = match payload {
            Some(payload) => payload,
            None => return Ok(ReferrerRepairOutcome::NoReferrer),
        };

        let referrer = self
            .db
            .users
            .find_by_telegram_id_and_role(&payload, referrer_role_for(user.role))
            .await?;
        let referrer = match referrer {
            Some(referrer) => referrer,
            None => return Ok(ReferrerRepairOutcome::NoReferrer),
        };

        if !self.db.referral_edge_is_acyclic(user.id, referrer.id).await? {
            warn!(user_id = user.id, referrer_id = referrer.id, "Referral edge refused, would close a cycle");
            return Ok(ReferrerRepairOutcome::Cycle);
        }

        self.db
            .users
            .apply_patch(
                user.id,
                UserPatch {
                    referrer_id: Some(referrer.id),
                    ..Default::default()
                },
            )
            .await?;

        if self.db.referrals.find_by_referred(user.id).await?.is_none() {
            self.db
                .referrals
                .create(
                    user.id,
                    referrer.id,
                    Decimal::from(self.settings.bonus.level1_amount),
                )
                .await?;
        }

        info!(user_id = user.id, referrer_id = referrer.id, "Referrer repaired");
        Ok(ReferrerRepairOutcome::Linked)
    }

    /// Blanket action: stamp maximum ratings on all completed requests
    pub async fn set_all_ratings(&self) -> Result<u64> {
        let updated = self.db.requests.set_ratings_on_completed(5).await?;
        log_admin_action("set_all_ratings", updated, false);
        Ok(updated)
    }

    /// Blanket action: attach a default work outcome where none is set
    pub async fn set_default_outcome(&self, name: &str) -> Result<u64> {
        let outcome = self.db.catalog.get_or_create_outcome(name).await?;
        let updated = self.db.requests.set_default_outcome(outcome.id).await?;
        log_admin_action("set_default_outcome", updated, false);
        Ok(updated)
    }
}

enum BalanceLineOutcome {
    Credited,
    Duplicate,
    UnknownMaster,
}

enum ReferrerRepairOutcome {
    Linked,
    NoReferrer,
    Cycle,
}

/// Parse one `telegram_id, amount` import line
fn parse_balance_line(line: &str) -> Option<(String, Decimal)> {
    let (telegram_id, amount) = line.split_once(',')?;
    let telegram_id = telegram_id.trim();
    if telegram_id.is_empty() || !telegram_id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let amount: Decimal = amount.trim().parse().ok()?;
    Some((telegram_id.to_string(), amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_balance_line() {
        assert_eq!(
            parse_balance_line("123456, 1500.50"),
            Some(("123456".to_string(), Decimal::new(150050, 2)))
        );
        assert_eq!(
            parse_balance_line("777,-300"),
            Some(("777".to_string(), Decimal::from(-300)))
        );
    }

    #[test]
    fn test_parse_balance_line_rejects_garbage() {
        assert!(parse_balance_line("no comma here").is_none());
        assert!(parse_balance_line("abc, 100").is_none());
        assert!(parse_balance_line("123, abc").is_none());
        assert!(parse_balance_line(", 100").is_none());
    }
}
