//! Resting order value and side-specific price–time priority (spec §3, §4.5).
//!
//! Buy-side and sell-side orders each need their own priority relation
//! (highest price first vs. lowest price first). Rather than a base type
//! with per-side virtual comparisons, the two relations are expressed here
//! as newtype wrappers implementing `Ord`, so each side's `BTreeSet` just
//! uses the wrapper's natural ordering.

/// Which side of the book an order rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

/// An order at rest (or in flight through the matching loop).
///
/// `quantity` is the only field ever mutated in place — on a partial fill of
/// the resting side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub id: u64,
    pub price: u32,
    pub quantity: u32,
}

impl Order {
    pub fn new(id: u64, price: u32, quantity: u32) -> Self {
        Order { id, price, quantity }
    }
}

/// Newtype giving `Order` the buy-side priority relation: higher price
/// first, ties broken by lower id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyPriority(pub Order);

impl PartialOrd for BuyPriority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BuyPriority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse price so the "best" buy (highest price) sorts first in a
        // BTreeSet, whose iteration order is ascending.
        other
            .0
            .price
            .cmp(&self.0.price)
            .then_with(|| self.0.id.cmp(&other.0.id))
    }
}

/// Newtype giving `Order` the sell-side priority relation: lower price
/// first, ties broken by lower id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SellPriority(pub Order);

impl PartialOrd for SellPriority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SellPriority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .price
            .cmp(&other.0.price)
            .then_with(|| self.0.id.cmp(&other.0.id))
    }
}

/// A buy order `b` crosses a sell order `s` iff `b.price >= s.price`.
pub fn is_compatible(buy_price: u32, sell_price: u32) -> bool {
    buy_price >= sell_price
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_priority_orders_by_price_desc_then_id_asc() {
        let high = BuyPriority(Order::new(1, 200, 1));
        let low = BuyPriority(Order::new(2, 100, 1));
        assert!(high < low);

        let earlier = BuyPriority(Order::new(1, 100, 1));
        let later = BuyPriority(Order::new(2, 100, 1));
        assert!(earlier < later);
    }

    #[test]
    fn sell_priority_orders_by_price_asc_then_id_asc() {
        let cheap = SellPriority(Order::new(1, 100, 1));
        let expensive = SellPriority(Order::new(2, 200, 1));
        assert!(cheap < expensive);

        let earlier = SellPriority(Order::new(1, 100, 1));
        let later = SellPriority(Order::new(2, 100, 1));
        assert!(earlier < later);
    }

    #[test]
    fn compatibility_requires_buy_at_least_sell() {
        assert!(is_compatible(100, 100));
        assert!(is_compatible(150, 100));
        assert!(!is_compatible(99, 100));
    }
}
