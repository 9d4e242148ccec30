//! First-run seed data
//!
//! When the repository is empty the store writes this fixed set once, so a
//! fresh install has something to show. IDs are deterministic so a re-seed
//! after a wiped database produces the same codes.

use chrono::{DateTime, Duration, Utc};
use trato_types::{
    EscrowId, EscrowMessage, EscrowStatus, EscrowTransaction, ProductId, UserId,
    DEFAULT_WINDOW_HOURS,
};
use uuid::Uuid;

fn escrow_id(n: u128) -> EscrowId {
    EscrowId::from_uuid(Uuid::from_u128(0x7261_7400_0000_0000_0000_0000_0000_0000 | n))
}

fn user_id(n: u128) -> UserId {
    UserId::from_uuid(Uuid::from_u128(0x7261_7401_0000_0000_0000_0000_0000_0000 | n))
}

fn product_id(n: u128) -> ProductId {
    ProductId::from_uuid(Uuid::from_u128(0x7261_7402_0000_0000_0000_0000_0000_0000 | n))
}

pub(crate) fn seed_transactions(now: DateTime<Utc>) -> Vec<EscrowTransaction> {
    let buyer = user_id(1);
    let seller = user_id(2);

    let held_at = now - Duration::hours(6);
    let held = EscrowTransaction {
        id: escrow_id(1),
        product: product_id(1),
        title: "Cámara digital Canon EOS".to_string(),
        buyer: Some(buyer.clone()),
        seller: Some(seller.clone()),
        status: EscrowStatus::Held,
        tracking: None,
        created_at: held_at,
        dispute_deadline: held_at + Duration::hours(DEFAULT_WINDOW_HOURS),
        messages: Vec::new(),
    };

    let shipped_at = now - Duration::days(2);
    let shipped = EscrowTransaction {
        id: escrow_id(2),
        product: product_id(2),
        title: "Bicicleta de montaña rodada 26".to_string(),
        buyer: Some(buyer.clone()),
        seller: Some(seller.clone()),
        status: EscrowStatus::Shipped,
        tracking: Some("MX-48213-557".to_string()),
        created_at: shipped_at,
        dispute_deadline: shipped_at + Duration::hours(DEFAULT_WINDOW_HOURS),
        messages: vec![EscrowMessage::system(
            "Envío confirmado. Guía de rastreo: MX-48213-557",
            shipped_at + Duration::hours(5),
        )],
    };

    let released_at = now - Duration::days(9);
    let released = EscrowTransaction {
        id: escrow_id(3),
        product: product_id(3),
        title: "Consola retro con dos controles".to_string(),
        buyer: Some(buyer),
        seller: Some(seller),
        status: EscrowStatus::Released,
        tracking: Some("MX-11807-020".to_string()),
        created_at: released_at,
        dispute_deadline: released_at + Duration::hours(DEFAULT_WINDOW_HOURS),
        messages: vec![
            EscrowMessage::system(
                "Envío confirmado. Guía de rastreo: MX-11807-020",
                released_at + Duration::hours(8),
            ),
            EscrowMessage::system(
                "Entrega confirmada por el comprador.",
                released_at + Duration::days(2),
            ),
            EscrowMessage::system(
                "Fondos liberados al vendedor.",
                released_at + Duration::days(2) + Duration::minutes(1),
            ),
        ],
    };

    vec![held, shipped, released]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_shape() {
        let seeds = seed_transactions(Utc::now());
        assert_eq!(seeds.len(), 3);
        // Deterministic ids, distinct records
        let again = seed_transactions(Utc::now());
        assert_eq!(seeds[0].id, again[0].id);
        assert_ne!(seeds[0].id, seeds[1].id);
        // Tracking present iff shipped or later
        for tx in &seeds {
            match tx.status {
                EscrowStatus::Held => assert!(tx.tracking.is_none()),
                _ => assert!(tx.tracking.is_some()),
            }
        }
    }
}
