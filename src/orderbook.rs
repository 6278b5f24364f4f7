//! Two-index, price–time-ordered order book for one side of the market
//! (spec §4.5, §4.6).
//!
//! A `BTreeSet<BuyPriority>` / `BTreeSet<SellPriority>` gives O(log n)
//! insert, O(log n) pop-best, and (with the `id -> Order` side table below)
//! O(log n) cancel-by-id — the three operations the matching engine needs.
//! This mirrors the indexed-heap idea used for the order book's auxiliary
//! id lookup, generalized from a heap-with-position-map to an ordered-set
//! with a duplicate-keyed side table, since Rust's `BTreeSet` has no
//! in-place decrease-key/remove-by-payload operation of its own.

use ahash::AHashMap;
use std::collections::BTreeSet;

use crate::order::{BuyPriority, Order, SellPriority};

/// One side of the book: buy orders ordered best-price-first.
#[derive(Debug, Default)]
pub struct BuyBook {
    by_priority: BTreeSet<BuyPriority>,
    by_id: AHashMap<u64, Order>,
}

impl BuyBook {
    pub fn new() -> Self {
        BuyBook::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        BuyBook {
            by_priority: BTreeSet::new(),
            by_id: AHashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn insert(&mut self, order: Order) {
        self.by_id.insert(order.id, order);
        self.by_priority.insert(BuyPriority(order));
    }

    /// Remove the order with `id`, if resting. Returns it.
    pub fn cancel(&mut self, id: u64) -> Option<Order> {
        let order = self.by_id.remove(&id)?;
        self.by_priority.remove(&BuyPriority(order));
        Some(order)
    }

    /// The best (highest-price, earliest) resting order, if any.
    pub fn best(&self) -> Option<Order> {
        self.by_priority.first().map(|p| p.0)
    }

    pub fn best_price(&self) -> Option<u32> {
        self.best().map(|o| o.price)
    }

    /// Replace the resting quantity of the best order after a partial fill.
    /// Panics if the book is empty — callers must check `best()` first.
    pub fn reduce_best(&mut self, filled: u32) {
        let best = self.best().expect("reduce_best called on an empty book");
        self.by_priority.remove(&BuyPriority(best));
        let remaining = Order::new(best.id, best.price, best.quantity - filled);
        self.by_id.insert(remaining.id, remaining);
        self.by_priority.insert(BuyPriority(remaining));
    }

    /// Remove and return the best order entirely (fully filled).
    pub fn pop_best(&mut self) -> Option<Order> {
        let best = self.by_priority.pop_first()?.0;
        self.by_id.remove(&best.id);
        Some(best)
    }
}

/// One side of the book: sell orders ordered best-price-first.
#[derive(Debug, Default)]
pub struct SellBook {
    by_priority: BTreeSet<SellPriority>,
    by_id: AHashMap<u64, Order>,
}

impl SellBook {
    pub fn new() -> Self {
        SellBook::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        SellBook {
            by_priority: BTreeSet::new(),
            by_id: AHashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn insert(&mut self, order: Order) {
        self.by_id.insert(order.id, order);
        self.by_priority.insert(SellPriority(order));
    }

    pub fn cancel(&mut self, id: u64) -> Option<Order> {
        let order = self.by_id.remove(&id)?;
        self.by_priority.remove(&SellPriority(order));
        Some(order)
    }

    pub fn best(&self) -> Option<Order> {
        self.by_priority.first().map(|p| p.0)
    }

    pub fn best_price(&self) -> Option<u32> {
        self.best().map(|o| o.price)
    }

    pub fn reduce_best(&mut self, filled: u32) {
        let best = self.best().expect("reduce_best called on an empty book");
        self.by_priority.remove(&SellPriority(best));
        let remaining = Order::new(best.id, best.price, best.quantity - filled);
        self.by_id.insert(remaining.id, remaining);
        self.by_priority.insert(SellPriority(remaining));
    }

    pub fn pop_best(&mut self) -> Option<Order> {
        let best = self.by_priority.pop_first()?.0;
        self.by_id.remove(&best.id);
        Some(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_buy_is_highest_price_then_earliest_id() {
        let mut book = BuyBook::new();
        book.insert(Order::new(1, 100, 5));
        book.insert(Order::new(2, 105, 5));
        book.insert(Order::new(3, 105, 5));
        let best = book.best().unwrap();
        assert_eq!(best.id, 2);
        assert_eq!(best.price, 105);
    }

    #[test]
    fn best_sell_is_lowest_price_then_earliest_id() {
        let mut book = SellBook::new();
        book.insert(Order::new(1, 100, 5));
        book.insert(Order::new(2, 95, 5));
        book.insert(Order::new(3, 95, 5));
        let best = book.best().unwrap();
        assert_eq!(best.id, 2);
        assert_eq!(best.price, 95);
    }

    #[test]
    fn cancel_removes_from_both_indexes() {
        let mut book = BuyBook::new();
        book.insert(Order::new(1, 100, 5));
        book.insert(Order::new(2, 110, 5));
        let cancelled = book.cancel(2).unwrap();
        assert_eq!(cancelled.id, 2);
        assert_eq!(book.len(), 1);
        assert_eq!(book.best().unwrap().id, 1);
        assert!(book.cancel(2).is_none());
    }

    #[test]
    fn reduce_best_keeps_remaining_quantity_resting() {
        let mut book = SellBook::new();
        book.insert(Order::new(1, 100, 10));
        book.reduce_best(4);
        let best = book.best().unwrap();
        assert_eq!(best.id, 1);
        assert_eq!(best.quantity, 6);
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn pop_best_removes_order_entirely() {
        let mut book = BuyBook::new();
        book.insert(Order::new(1, 100, 5));
        book.insert(Order::new(2, 90, 5));
        let popped = book.pop_best().unwrap();
        assert_eq!(popped.id, 1);
        assert_eq!(book.len(), 1);
        assert_eq!(book.best().unwrap().id, 2);
    }

    use proptest::prelude::*;
    use std::collections::HashSet;

    #[derive(Debug, Clone)]
    enum Op {
        Insert { id: u64, price: u32, quantity: u32 },
        Cancel { id: u64 },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u64..20, 100u32..200, 1u32..50)
                .prop_map(|(id, price, quantity)| Op::Insert { id, price, quantity }),
            (0u64..20).prop_map(|id| Op::Cancel { id }),
        ]
    }

    proptest! {
        /// Spec.md §8 invariant 1: `by_id` and the priority set agree in
        /// cardinality and membership at every point, for any interleaving
        /// of insert/cancel on a single book.
        #[test]
        fn by_id_and_priority_set_stay_in_lockstep(ops in proptest::collection::vec(op_strategy(), 0..200)) {
            let mut book = BuyBook::new();
            let mut live: HashSet<u64> = HashSet::new();
            for op in ops {
                match op {
                    Op::Insert { id, price, quantity } => {
                        book.insert(Order::new(id, price, quantity));
                        live.insert(id);
                    }
                    Op::Cancel { id } => {
                        let removed = book.cancel(id);
                        prop_assert_eq!(removed.is_some(), live.remove(&id));
                    }
                }
                prop_assert_eq!(book.len(), live.len());
                prop_assert_eq!(book.is_empty(), live.is_empty());
                if let Some(best) = book.best() {
                    prop_assert!(live.contains(&best.id));
                }
            }
        }
    }
}
