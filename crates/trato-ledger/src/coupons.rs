//! Coupon record store
//!
//! A coupon is acquired `active` and either gets redeemed at the merchant
//! or expires past its validity window.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use trato_types::{CouponId, CouponRecord, CouponStatus, Result, SourceKind, TratoError};

/// Store of coupon redemption records
#[derive(Clone, Default)]
pub struct CouponLedger {
    records: Arc<RwLock<Vec<CouponRecord>>>,
}

impl CouponLedger {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an acquired coupon
    pub async fn add(&self, record: CouponRecord) {
        self.records.write().await.push(record);
    }

    /// Defensive copies of all records
    pub async fn list(&self) -> Vec<CouponRecord> {
        self.records.read().await.clone()
    }

    /// Redeem an active coupon
    pub async fn redeem(&self, id: &CouponId) -> Result<CouponRecord> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| TratoError::RecordNotFound {
                kind: SourceKind::Coupon,
                id: id.to_string(),
            })?;
        if record.status != CouponStatus::Active {
            return Err(TratoError::InvalidStatusChange {
                kind: SourceKind::Coupon,
                id: id.to_string(),
                from: record.status.to_string(),
            });
        }
        record.status = CouponStatus::Redeemed;
        Ok(record.clone())
    }

    /// Expire every active coupon whose validity window has passed at `now`
    ///
    /// Returns the number of coupons expired.
    pub async fn expire_due(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.write().await;
        let mut expired = 0;
        for record in records.iter_mut() {
            if record.status == CouponStatus::Active && record.expires_at <= now {
                record.status = CouponStatus::Expired;
                expired += 1;
            }
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn active(title: &str, expires_in: Duration) -> CouponRecord {
        let now = Utc::now();
        CouponRecord {
            id: CouponId::new(),
            title: title.to_string(),
            merchant: "Café La Esquina".to_string(),
            value: dec!(50.00),
            status: CouponStatus::Active,
            date: now,
            expires_at: now + expires_in,
        }
    }

    #[tokio::test]
    async fn test_redeem_once() {
        let ledger = CouponLedger::new();
        let coupon = active("2x1 en bebidas", Duration::days(7));
        ledger.add(coupon.clone()).await;

        let redeemed = ledger.redeem(&coupon.id).await.unwrap();
        assert_eq!(redeemed.status, CouponStatus::Redeemed);

        let err = ledger.redeem(&coupon.id).await.unwrap_err();
        assert!(matches!(err, TratoError::InvalidStatusChange { .. }));
    }

    #[tokio::test]
    async fn test_expire_due() {
        let ledger = CouponLedger::new();
        let stale = active("Descuento de enero", Duration::days(-1));
        let fresh = active("Descuento vigente", Duration::days(7));
        ledger.add(stale.clone()).await;
        ledger.add(fresh.clone()).await;

        assert_eq!(ledger.expire_due(Utc::now()).await, 1);

        let records = ledger.list().await;
        let stale_now = records.iter().find(|r| r.id == stale.id).unwrap();
        let fresh_now = records.iter().find(|r| r.id == fresh.id).unwrap();
        assert_eq!(stale_now.status, CouponStatus::Expired);
        assert_eq!(fresh_now.status, CouponStatus::Active);
    }
}
