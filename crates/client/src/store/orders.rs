//! Orders slice.
//!
//! Each operation owns its own [`OpState`], so a failed delete never hides
//! the outcome of the last fetch and vice versa.

use std::collections::HashMap;

use marketplace_core::models::Order;
use marketplace_core::{OrderId, OrderStatus};

/// Progress of one kind of request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OpState {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed(String),
}

impl OpState {
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Error message of a failed request.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Order operations with their own progress slot.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum OrderOp {
    FetchMine,
    FetchAll,
    FetchDeleted,
    FetchSeller,
    FetchOne,
    Create,
    Delete,
    Restore,
    UpdateStatus,
}

/// Orders slice of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrdersState {
    /// The logged-in user's orders.
    pub mine: Vec<Order>,
    /// Every live order (admin).
    pub all: Vec<Order>,
    /// Soft-deleted orders (admin).
    pub deleted: Vec<Order>,
    /// Orders containing the seller's products.
    pub seller: Vec<Order>,
    /// Last order fetched by id.
    pub current: Option<Order>,
    /// Last order created by checkout.
    pub last_created: Option<Order>,
    ops: HashMap<OrderOp, OpState>,
}

impl OrdersState {
    /// Progress of an operation; `Idle` if never run.
    #[must_use]
    pub fn op(&self, op: OrderOp) -> &OpState {
        static IDLE: OpState = OpState::Idle;
        self.ops.get(&op).unwrap_or(&IDLE)
    }

    fn set(&mut self, op: OrderOp, state: OpState) {
        self.ops.insert(op, state);
    }

    fn lists_mut(&mut self) -> impl Iterator<Item = &mut Order> {
        self.mine
            .iter_mut()
            .chain(self.all.iter_mut())
            .chain(self.deleted.iter_mut())
            .chain(self.seller.iter_mut())
            .chain(self.current.iter_mut())
    }
}

/// Orders slice actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrdersAction {
    Started(OrderOp),
    Failed(OrderOp, String),
    MineLoaded(Vec<Order>),
    AllLoaded(Vec<Order>),
    DeletedLoaded(Vec<Order>),
    SellerLoaded(Vec<Order>),
    DetailLoaded(Box<Order>),
    Created(Box<Order>),
    Deleted(OrderId),
    Restored(OrderId),
    StatusUpdated { id: OrderId, status: OrderStatus },
    Reset,
}

/// Apply an action to the orders slice.
#[must_use]
pub fn reduce(mut state: OrdersState, action: OrdersAction) -> OrdersState {
    match action {
        OrdersAction::Started(op) => state.set(op, OpState::Loading),
        OrdersAction::Failed(op, message) => state.set(op, OpState::Failed(message)),
        OrdersAction::MineLoaded(orders) => {
            state.mine = orders;
            state.set(OrderOp::FetchMine, OpState::Succeeded);
        }
        OrdersAction::AllLoaded(orders) => {
            state.all = orders;
            state.set(OrderOp::FetchAll, OpState::Succeeded);
        }
        OrdersAction::DeletedLoaded(orders) => {
            state.deleted = orders;
            state.set(OrderOp::FetchDeleted, OpState::Succeeded);
        }
        OrdersAction::SellerLoaded(orders) => {
            state.seller = orders;
            state.set(OrderOp::FetchSeller, OpState::Succeeded);
        }
        OrdersAction::DetailLoaded(order) => {
            state.current = Some(*order);
            state.set(OrderOp::FetchOne, OpState::Succeeded);
        }
        OrdersAction::Created(order) => {
            state.mine.insert(0, (*order).clone());
            state.last_created = Some(*order);
            state.set(OrderOp::Create, OpState::Succeeded);
        }
        OrdersAction::Deleted(id) => {
            let mut moved = None;
            for list in [&mut state.mine, &mut state.all, &mut state.seller] {
                if let Some(pos) = list.iter().position(|o| o.id == id) {
                    let order = list.remove(pos);
                    moved.get_or_insert(order);
                }
            }
            if let Some(mut order) = moved
                && !state.deleted.iter().any(|o| o.id == id)
            {
                order.is_deleted = true;
                state.deleted.insert(0, order);
            }
            if let Some(current) = state.current.as_mut()
                && current.id == id
            {
                current.is_deleted = true;
            }
            state.set(OrderOp::Delete, OpState::Succeeded);
        }
        OrdersAction::Restored(id) => {
            if let Some(pos) = state.deleted.iter().position(|o| o.id == id) {
                let mut order = state.deleted.remove(pos);
                order.is_deleted = false;
                state.all.insert(0, order);
            }
            if let Some(current) = state.current.as_mut()
                && current.id == id
            {
                current.is_deleted = false;
            }
            state.set(OrderOp::Restore, OpState::Succeeded);
        }
        OrdersAction::StatusUpdated { id, status } => {
            for order in state.lists_mut().filter(|o| o.id == id) {
                order.status = status.clone();
            }
            state.set(OrderOp::UpdateStatus, OpState::Succeeded);
        }
        OrdersAction::Reset => return OrdersState::default(),
    }
    state
}
