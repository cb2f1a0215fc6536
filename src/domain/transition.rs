//! Order status state machine.
//!
//! Statuses may move freely between each other; the only behavior gated on a
//! specific transition is what happens to the stock reserved by the order's
//! items. Adding a status means adding rows to [`TRANSITIONS`].

use super::errors::DomainError;
use super::order::OrderStatus;
use super::order::OrderStatus::{Cancelled, Open, Paid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    /// Stock stays as it is.
    Keep,
    /// Put every item's quantity back on its product.
    Release,
    /// Take every item's quantity off its product again.
    Reserve,
}

pub const TRANSITIONS: &[(OrderStatus, OrderStatus, StockEffect)] = &[
    (Open, Paid, StockEffect::Keep),
    (Paid, Open, StockEffect::Keep),
    (Open, Cancelled, StockEffect::Release),
    (Paid, Cancelled, StockEffect::Release),
    (Cancelled, Open, StockEffect::Reserve),
    (Cancelled, Paid, StockEffect::Reserve),
];

impl StockEffect {
    pub fn between(from: OrderStatus, to: OrderStatus) -> Result<StockEffect, DomainError> {
        if from == to {
            return Ok(StockEffect::Keep);
        }
        TRANSITIONS
            .iter()
            .find(|(f, t, _)| *f == from && *t == to)
            .map(|(_, _, effect)| *effect)
            .ok_or_else(|| {
                DomainError::InvalidRequest(format!("cannot move order from {} to {}", from, to))
            })
    }
}

/// Whether an order in this status holds a stock reservation.
pub fn holds_stock(status: OrderStatus) -> bool {
    status != Cancelled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelling_releases_stock() {
        assert_eq!(StockEffect::between(Open, Cancelled).unwrap(), StockEffect::Release);
        assert_eq!(StockEffect::between(Paid, Cancelled).unwrap(), StockEffect::Release);
    }

    #[test]
    fn reopening_reserves_stock() {
        assert_eq!(StockEffect::between(Cancelled, Open).unwrap(), StockEffect::Reserve);
        assert_eq!(StockEffect::between(Cancelled, Paid).unwrap(), StockEffect::Reserve);
    }

    #[test]
    fn open_and_paid_do_not_touch_stock() {
        assert_eq!(StockEffect::between(Open, Paid).unwrap(), StockEffect::Keep);
        assert_eq!(StockEffect::between(Paid, Open).unwrap(), StockEffect::Keep);
        assert_eq!(StockEffect::between(Cancelled, Cancelled).unwrap(), StockEffect::Keep);
    }

    #[test]
    fn every_distinct_pair_is_listed() {
        let all = [Open, Paid, Cancelled];
        for from in all {
            for to in all {
                assert!(StockEffect::between(from, to).is_ok(), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn table_agrees_with_reservation_holding() {
        for (from, to, effect) in TRANSITIONS {
            let expected = match (holds_stock(*from), holds_stock(*to)) {
                (true, false) => StockEffect::Release,
                (false, true) => StockEffect::Reserve,
                _ => StockEffect::Keep,
            };
            assert_eq!(*effect, expected, "{} -> {}", from, to);
        }
    }
}
