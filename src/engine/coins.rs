use std::rc::Rc;

use crate::store::kv::KeyValueStore;
use crate::store::schema::COINS_KEY;

pub type SubscriptionId = usize;

type Listener = Box<dyn FnMut(u64)>;

/// Persistent coin balance. One coin per solved prompt; games cost coins.
///
/// Every change is written to storage before listeners hear about it, so a
/// listener reading the store sees the new value.
pub struct CoinLedger {
    store: Rc<dyn KeyValueStore>,
    balance: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: SubscriptionId,
}

impl CoinLedger {
    pub fn open(store: Rc<dyn KeyValueStore>) -> Self {
        let balance = store
            .get(COINS_KEY)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|n| n.max(0) as u64)
            .unwrap_or(0);
        Self {
            store,
            balance,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    /// Add `n` coins (negative takes them away, never below zero).
    pub fn add(&mut self, n: i64) -> u64 {
        let next = (self.balance as i64).saturating_add(n).max(0) as u64;
        self.set(next);
        self.balance
    }

    /// Deduct `amount` if the balance covers it.
    pub fn spend(&mut self, amount: u64) -> bool {
        if self.balance < amount {
            return false;
        }
        self.set(self.balance - amount);
        true
    }

    pub fn reset(&mut self) {
        self.set(0);
    }

    pub fn subscribe(&mut self, listener: impl FnMut(u64) + 'static) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(i, _)| *i != id);
        self.listeners.len() != before
    }

    fn set(&mut self, balance: u64) {
        self.balance = balance;
        if let Err(e) = self.store.set(COINS_KEY, &balance.to_string()) {
            tracing::warn!(balance, error = %e, "could not persist coin balance");
        }
        for (_, listener) in &mut self.listeners {
            listener(balance);
        }
    }
}
