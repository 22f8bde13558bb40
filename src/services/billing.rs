use async_trait::async_trait;
use redis::AsyncCommands;

/// Result of one debit attempt. Debits are never retried by this service;
/// a failed debit after a completed job is surfaced to the caller as a
/// payment error and the work is not compensated.
#[derive(Debug, Clone)]
pub struct BillingOutcome {
    pub success: bool,
    pub reason: Option<String>,
}

impl BillingOutcome {
    pub fn charged() -> Self {
        Self {
            success: true,
            reason: None,
        }
    }

    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
        }
    }
}

/// Debit side of the credit system.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    async fn debit(&self, team_id: &str, credits: i64) -> BillingOutcome;
}

/// Redis-backed per-team credit balances, keyed `credits:{team_id}`.
/// Accounts are provisioned out of band; a missing key is treated as no
/// subscription, not as a zero balance.
pub struct RedisCreditLedger {
    client: redis::Client,
}

fn balance_key(team_id: &str) -> String {
    format!("credits:{team_id}")
}

impl RedisCreditLedger {
    pub fn new(redis_url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Add credits to a team's balance, creating the account if needed.
    /// Used by provisioning and by the live-infrastructure tests.
    pub async fn grant(&self, team_id: &str, credits: i64) -> Result<i64, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let balance: i64 = conn.incr(balance_key(team_id), credits).await?;
        Ok(balance)
    }

    pub async fn balance(&self, team_id: &str) -> Result<Option<i64>, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let balance: Option<i64> = conn.get(balance_key(team_id)).await?;
        Ok(balance)
    }
}

#[async_trait]
impl CreditLedger for RedisCreditLedger {
    async fn debit(&self, team_id: &str, credits: i64) -> BillingOutcome {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => conn,
            Err(e) => return BillingOutcome::refused(format!("ledger unavailable: {e}")),
        };

        let key = balance_key(team_id);
        let exists: bool = match conn.exists(&key).await {
            Ok(exists) => exists,
            Err(e) => return BillingOutcome::refused(format!("ledger unavailable: {e}")),
        };
        if !exists {
            return BillingOutcome::refused("subscription not found");
        }

        let remaining: i64 = match conn.decr(&key, credits).await {
            Ok(remaining) => remaining,
            Err(e) => return BillingOutcome::refused(format!("ledger unavailable: {e}")),
        };

        if remaining < 0 {
            // Roll the balance back; the debit never took effect.
            if let Err(e) = conn.incr::<_, _, i64>(&key, credits).await {
                tracing::error!(team_id, error = %e, "failed to restore balance after refused debit");
            }
            return BillingOutcome::refused("insufficient credits");
        }

        BillingOutcome::charged()
    }
}
