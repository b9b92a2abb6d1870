//! Request sequencing.
//!
//! Each request takes a [`Ticket`] for the resource it touches. When the
//! response arrives, the ticket is checked against the newest ticket issued
//! for that resource; older responses are stale and must not touch the store.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use marketplace_core::ProductId;

/// Logical resource a request reads or writes.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum Scope {
    /// Whole-cart operations: load and clear.
    Cart,
    /// One cart line.
    CartLine(ProductId),
    /// A named list or record, e.g. `orders:all`.
    Named(String),
}

/// Proof that a request was issued, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    scope: Scope,
    number: u64,
}

impl Ticket {
    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub const fn number(&self) -> u64 {
        self.number
    }
}

/// Issues monotonically increasing tickets.
#[derive(Debug, Default)]
pub struct Sequencer {
    state: Mutex<SequencerState>,
}

#[derive(Debug, Default)]
struct SequencerState {
    next: u64,
    latest: HashMap<Scope, u64>,
    /// Newest ticket issued for any cart line.
    latest_line: u64,
}

impl Sequencer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for `scope`.
    ///
    /// A cart-wide ticket supersedes every outstanding line ticket, and a
    /// line ticket supersedes every outstanding cart-wide ticket.
    pub fn issue(&self, scope: Scope) -> Ticket {
        let mut state = self.lock();
        state.next += 1;
        let number = state.next;
        if scope == Scope::Cart {
            state
                .latest
                .retain(|existing, _| !matches!(existing, Scope::CartLine(_)));
        }
        if matches!(scope, Scope::CartLine(_)) {
            state.latest_line = number;
        }
        state.latest.insert(scope.clone(), number);
        Ticket { scope, number }
    }

    /// Whether no newer request has been issued for the ticket's resource.
    #[must_use]
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        let state = self.lock();
        let own = state.latest.get(&ticket.scope).copied().unwrap_or(0);
        let superseded = match ticket.scope {
            Scope::CartLine(_) => {
                state.latest.get(&Scope::Cart).copied().unwrap_or(0) > ticket.number
            }
            Scope::Cart => state.latest_line > ticket.number,
            Scope::Named(_) => false,
        };
        own <= ticket.number && !superseded
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SequencerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
