//! Unified query layer
//!
//! Projects the four record sources into [`UnifiedTransaction`]s and
//! evaluates filter/sort criteria over the combined stream. Aggregation is
//! always computed fresh from the sources at query time — there is no
//! caching layer to fall out of sync.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use trato_escrow::{EscrowStore, ListFilter};
use trato_types::{
    CouponRecord, CouponStatus, EscrowStatus, EscrowTransaction, PaymentRecord, PaymentStatus,
    SourceKind, TicketRecord, TicketStatus, UnifiedTransaction,
};

use crate::{CouponLedger, PaymentLedger, TicketLedger};

/// Field the unified stream is sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Record date
    Date,
    /// Amount; records without one sort as zero
    Amount,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Filter and sort criteria for a unified query
///
/// Defaults: all sources, no date range, no text filter, newest first.
#[derive(Debug, Clone)]
pub struct LedgerQuery {
    /// Free-text match against each record's haystack
    pub text: Option<String>,
    /// Source kinds to include; empty means all
    pub sources: Vec<SourceKind>,
    /// Inclusive start of the date range
    pub from: Option<DateTime<Utc>>,
    /// Inclusive end of the date range
    pub to: Option<DateTime<Utc>>,
    /// Per-source status sub-filters; empty means all
    pub payment_statuses: Vec<PaymentStatus>,
    pub escrow_statuses: Vec<EscrowStatus>,
    pub coupon_statuses: Vec<CouponStatus>,
    pub ticket_statuses: Vec<TicketStatus>,
    /// Amount range, applied only to records that carry an amount
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    /// Sort field
    pub sort_key: SortKey,
    /// Sort direction
    pub direction: SortDirection,
}

impl Default for LedgerQuery {
    fn default() -> Self {
        Self {
            text: None,
            sources: Vec::new(),
            from: None,
            to: None,
            payment_statuses: Vec::new(),
            escrow_statuses: Vec::new(),
            coupon_statuses: Vec::new(),
            ticket_statuses: Vec::new(),
            min_amount: None,
            max_amount: None,
            sort_key: SortKey::Date,
            direction: SortDirection::Desc,
        }
    }
}

impl LedgerQuery {
    /// Create a query with the defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-text filter
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Restrict to the given source kinds
    pub fn with_sources(mut self, sources: impl Into<Vec<SourceKind>>) -> Self {
        self.sources = sources.into();
        self
    }

    /// Set the inclusive date range
    pub fn with_date_range(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    /// Restrict payment records to the given statuses
    pub fn with_payment_statuses(mut self, statuses: impl Into<Vec<PaymentStatus>>) -> Self {
        self.payment_statuses = statuses.into();
        self
    }

    /// Restrict escrow records to the given statuses
    pub fn with_escrow_statuses(mut self, statuses: impl Into<Vec<EscrowStatus>>) -> Self {
        self.escrow_statuses = statuses.into();
        self
    }

    /// Restrict coupon records to the given statuses
    pub fn with_coupon_statuses(mut self, statuses: impl Into<Vec<CouponStatus>>) -> Self {
        self.coupon_statuses = statuses.into();
        self
    }

    /// Restrict ticket records to the given statuses
    pub fn with_ticket_statuses(mut self, statuses: impl Into<Vec<TicketStatus>>) -> Self {
        self.ticket_statuses = statuses.into();
        self
    }

    /// Set the amount range (only records carrying an amount are affected)
    pub fn with_amount_range(mut self, min: Decimal, max: Decimal) -> Self {
        self.min_amount = Some(min);
        self.max_amount = Some(max);
        self
    }

    /// Set the sort field and direction
    pub fn sorted_by(mut self, key: SortKey, direction: SortDirection) -> Self {
        self.sort_key = key;
        self.direction = direction;
        self
    }

    fn includes(&self, kind: SourceKind) -> bool {
        self.sources.is_empty() || self.sources.contains(&kind)
    }

    fn matches(&self, row: &UnifiedTransaction) -> bool {
        if let Some(from) = self.from {
            if row.date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if row.date > to {
                return false;
            }
        }
        if let (Some(min), Some(amount)) = (self.min_amount, row.amount) {
            if amount < min {
                return false;
            }
        }
        if let (Some(max), Some(amount)) = (self.max_amount, row.amount) {
            if amount > max {
                return false;
            }
        }
        if let Some(ref text) = self.text {
            if !row.haystack().contains(&text.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

// ── Projections ──────────────────────────────────────────────────────────────

fn project_payment(record: &PaymentRecord) -> UnifiedTransaction {
    UnifiedTransaction {
        source: SourceKind::Payment,
        id: record.id.to_prefixed_string(),
        title: record.concept.clone(),
        date: record.date,
        amount: Some(record.amount),
        status: record.status.to_string(),
        meta: json!({
            "merchant": record.merchant,
            "method": record.method,
        }),
    }
}

fn project_escrow(record: &EscrowTransaction) -> UnifiedTransaction {
    UnifiedTransaction {
        source: SourceKind::Escrow,
        id: record.id.to_prefixed_string(),
        title: record.title.clone(),
        date: record.created_at,
        amount: None,
        status: record.status.to_string(),
        meta: json!({
            "product": record.product.to_prefixed_string(),
            "tracking": record.tracking,
            "messages": record.messages.len(),
        }),
    }
}

fn project_coupon(record: &CouponRecord) -> UnifiedTransaction {
    UnifiedTransaction {
        source: SourceKind::Coupon,
        id: record.id.to_prefixed_string(),
        title: record.title.clone(),
        date: record.date,
        amount: Some(record.value),
        status: record.status.to_string(),
        meta: json!({
            "merchant": record.merchant,
            "expires_at": record.expires_at.to_rfc3339(),
        }),
    }
}

fn project_ticket(record: &TicketRecord) -> UnifiedTransaction {
    UnifiedTransaction {
        source: SourceKind::Ticket,
        id: record.id.to_prefixed_string(),
        title: record.event_name.clone(),
        date: record.date,
        amount: Some(record.price),
        status: record.status.to_string(),
        meta: json!({
            "venue": record.venue,
        }),
    }
}

// ── The ledger ───────────────────────────────────────────────────────────────

/// The unified transaction ledger
#[derive(Clone)]
pub struct UnifiedLedger {
    escrows: EscrowStore,
    payments: PaymentLedger,
    coupons: CouponLedger,
    tickets: TicketLedger,
}

impl UnifiedLedger {
    /// Aggregate over the four sources
    pub fn new(
        escrows: EscrowStore,
        payments: PaymentLedger,
        coupons: CouponLedger,
        tickets: TicketLedger,
    ) -> Self {
        Self {
            escrows,
            payments,
            coupons,
            tickets,
        }
    }

    /// Evaluate a query against fresh snapshots of the sources
    pub async fn query(&self, query: &LedgerQuery) -> Vec<UnifiedTransaction> {
        let mut rows = Vec::new();

        if query.includes(SourceKind::Payment) {
            for record in self.payments.list().await {
                if !query.payment_statuses.is_empty()
                    && !query.payment_statuses.contains(&record.status)
                {
                    continue;
                }
                rows.push(project_payment(&record));
            }
        }
        if query.includes(SourceKind::Escrow) {
            for record in self.escrows.list(&ListFilter::default()).await {
                if !query.escrow_statuses.is_empty()
                    && !query.escrow_statuses.contains(&record.status)
                {
                    continue;
                }
                rows.push(project_escrow(&record));
            }
        }
        if query.includes(SourceKind::Coupon) {
            for record in self.coupons.list().await {
                if !query.coupon_statuses.is_empty()
                    && !query.coupon_statuses.contains(&record.status)
                {
                    continue;
                }
                rows.push(project_coupon(&record));
            }
        }
        if query.includes(SourceKind::Ticket) {
            for record in self.tickets.list().await {
                if !query.ticket_statuses.is_empty()
                    && !query.ticket_statuses.contains(&record.status)
                {
                    continue;
                }
                rows.push(project_ticket(&record));
            }
        }

        rows.retain(|row| query.matches(row));
        sort_rows(&mut rows, query.sort_key, query.direction);
        tracing::debug!(rows = rows.len(), "unified query evaluated");
        rows
    }
}

fn amount_or_zero(row: &UnifiedTransaction) -> Decimal {
    row.amount.unwrap_or(Decimal::ZERO)
}

// Stable sorts; reversing the comparator (not the result) keeps equal
// elements in source order for either direction.
fn sort_rows(rows: &mut [UnifiedTransaction], key: SortKey, direction: SortDirection) {
    match (key, direction) {
        (SortKey::Date, SortDirection::Asc) => rows.sort_by(|a, b| a.date.cmp(&b.date)),
        (SortKey::Date, SortDirection::Desc) => rows.sort_by(|a, b| b.date.cmp(&a.date)),
        (SortKey::Amount, SortDirection::Asc) => {
            rows.sort_by(|a, b| amount_or_zero(a).cmp(&amount_or_zero(b)))
        }
        (SortKey::Amount, SortDirection::Desc) => {
            rows.sort_by(|a, b| amount_or_zero(b).cmp(&amount_or_zero(a)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use trato_escrow::{ManualClock, MemoryRepository};
    use trato_types::{CouponId, PaymentId, PaymentMethod, TicketId};

    async fn ledger() -> UnifiedLedger {
        let repo = Arc::new(MemoryRepository::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let escrows = EscrowStore::open(repo, clock).await.unwrap();
        UnifiedLedger::new(
            escrows,
            PaymentLedger::new(),
            CouponLedger::new(),
            TicketLedger::new(),
        )
    }

    fn payment_on(concept: &str, amount: Decimal, date: DateTime<Utc>) -> PaymentRecord {
        PaymentRecord {
            id: PaymentId::new(),
            concept: concept.to_string(),
            merchant: "MercadoSur".to_string(),
            amount,
            method: PaymentMethod::Card,
            status: PaymentStatus::Completed,
            date,
        }
    }

    #[tokio::test]
    async fn test_sources_filter_is_exclusive() {
        let ledger = ledger().await;
        ledger
            .payments
            .add(payment_on("Café", dec!(45.00), Utc::now()))
            .await;

        let escrows_only = ledger
            .query(&LedgerQuery::new().with_sources([SourceKind::Escrow]))
            .await;
        assert!(!escrows_only.is_empty());
        assert!(escrows_only.iter().all(|r| r.source == SourceKind::Escrow));

        let payments_only = ledger
            .query(&LedgerQuery::new().with_sources([SourceKind::Payment]))
            .await;
        assert_eq!(payments_only.len(), 1);
        assert_eq!(payments_only[0].source, SourceKind::Payment);
    }

    #[tokio::test]
    async fn test_date_range_is_inclusive() {
        let ledger = ledger().await;
        let base = Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap();
        for (concept, offset) in [("Antes", -2), ("Inicio", 0), ("Dentro", 1), ("Fin", 3), ("Después", 5)] {
            ledger
                .payments
                .add(payment_on(concept, dec!(10.00), base + Duration::days(offset)))
                .await;
        }

        let rows = ledger
            .query(
                &LedgerQuery::new()
                    .with_sources([SourceKind::Payment])
                    .with_date_range(base, base + Duration::days(3)),
            )
            .await;
        let titles: Vec<_> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(rows.len(), 3);
        assert!(titles.contains(&"Inicio"));
        assert!(titles.contains(&"Dentro"));
        assert!(titles.contains(&"Fin"));
        assert!(rows
            .iter()
            .all(|r| r.date >= base && r.date <= base + Duration::days(3)));
    }

    #[tokio::test]
    async fn test_free_text_matches_merchant() {
        let ledger = ledger().await;
        ledger
            .payments
            .add(payment_on("Suscripción", dec!(99.00), Utc::now()))
            .await;

        let hit = ledger
            .query(&LedgerQuery::new().with_sources([SourceKind::Payment]).with_text("mercadosur"))
            .await;
        assert_eq!(hit.len(), 1);

        let miss = ledger
            .query(&LedgerQuery::new().with_sources([SourceKind::Payment]).with_text("inexistente"))
            .await;
        assert!(miss.is_empty());
    }

    #[tokio::test]
    async fn test_amount_sort_treats_missing_as_zero() {
        let ledger = ledger().await;
        ledger
            .payments
            .add(payment_on("Grande", dec!(500.00), Utc::now()))
            .await;
        ledger
            .payments
            .add(payment_on("Chico", dec!(20.00), Utc::now()))
            .await;

        // Escrow projections carry no amount and must sort first ascending
        let rows = ledger
            .query(&LedgerQuery::new().sorted_by(SortKey::Amount, SortDirection::Asc))
            .await;
        assert_eq!(rows.first().unwrap().source, SourceKind::Escrow);
        assert_eq!(rows.last().unwrap().title, "Grande");

        let desc = ledger
            .query(&LedgerQuery::new().sorted_by(SortKey::Amount, SortDirection::Desc))
            .await;
        assert_eq!(desc.first().unwrap().title, "Grande");
        assert_eq!(desc.last().unwrap().source, SourceKind::Escrow);
    }

    #[tokio::test]
    async fn test_amount_range_skips_amountless_records() {
        let ledger = ledger().await;
        ledger
            .payments
            .add(payment_on("Caro", dec!(900.00), Utc::now()))
            .await;
        ledger
            .payments
            .add(payment_on("Barato", dec!(15.00), Utc::now()))
            .await;

        let rows = ledger
            .query(&LedgerQuery::new().with_amount_range(dec!(100.00), dec!(1000.00)))
            .await;
        // Amountless escrow records pass through untouched
        assert!(rows.iter().any(|r| r.source == SourceKind::Escrow));
        assert!(rows.iter().any(|r| r.title == "Caro"));
        assert!(!rows.iter().any(|r| r.title == "Barato"));
    }

    #[tokio::test]
    async fn test_escrow_status_subfilter() {
        let ledger = ledger().await;
        let rows = ledger
            .query(&LedgerQuery::new().with_escrow_statuses([EscrowStatus::Shipped]))
            .await;
        assert!(rows
            .iter()
            .filter(|r| r.source == SourceKind::Escrow)
            .all(|r| r.status == "shipped"));
    }

    #[tokio::test]
    async fn test_coupon_and_ticket_projection() {
        let ledger = ledger().await;
        let now = Utc::now();
        ledger
            .coupons
            .add(CouponRecord {
                id: CouponId::new(),
                title: "2x1 en bebidas".to_string(),
                merchant: "Café La Esquina".to_string(),
                value: dec!(50.00),
                status: CouponStatus::Active,
                date: now,
                expires_at: now + Duration::days(7),
            })
            .await;
        ledger
            .tickets
            .add(TicketRecord {
                id: TicketId::new(),
                event_name: "Feria del libro".to_string(),
                venue: "Centro de convenciones".to_string(),
                price: dec!(180.00),
                status: TicketStatus::Upcoming,
                date: now + Duration::days(3),
            })
            .await;

        let rows = ledger
            .query(&LedgerQuery::new().with_sources([SourceKind::Coupon, SourceKind::Ticket]))
            .await;
        assert_eq!(rows.len(), 2);

        let coupon = rows.iter().find(|r| r.source == SourceKind::Coupon).unwrap();
        assert_eq!(coupon.status, "active");
        assert_eq!(coupon.meta["merchant"], "Café La Esquina");

        let ticket = rows.iter().find(|r| r.source == SourceKind::Ticket).unwrap();
        assert_eq!(ticket.amount, Some(dec!(180.00)));
        assert_eq!(ticket.meta["venue"], "Centro de convenciones");
    }

    #[tokio::test]
    async fn test_default_sort_is_newest_first() {
        let ledger = ledger().await;
        let rows = ledger.query(&LedgerQuery::new()).await;
        assert!(rows.windows(2).all(|w| w[0].date >= w[1].date));
    }
}
