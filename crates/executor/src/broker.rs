use crate::error::ExecutorError;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{Action, Decision};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The market side an action trades on; `None` for a hold.
    pub fn for_action(action: Action) -> Option<Self> {
        match action {
            Action::Buy | Action::Cover => Some(OrderSide::Buy),
            Action::Sell | Action::Short => Some(OrderSide::Sell),
            Action::Hold => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Cancelled,
}

/// A market order recorded by a paper broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTicket {
    pub order_id: Uuid,
    pub as_of: NaiveDate,
    pub instrument: String,
    pub side: OrderSide,
    pub action: Action,
    pub quantity: u64,
    pub status: OrderStatus,
}

/// Where a live cycle hands its decisions.
///
/// A live run never mutates a portfolio itself; the sink decides what "executing"
/// means, whether that is printing, paper trading or a real broker.
#[async_trait]
pub trait DecisionSink: Send + Sync {
    async fn submit(
        &self,
        as_of: NaiveDate,
        decisions: &BTreeMap<String, Decision>,
    ) -> Result<Vec<OrderTicket>, ExecutorError>;
}

/// Records every actionable decision as an open market order without routing it anywhere.
#[derive(Debug, Default)]
pub struct PaperBroker {
    orders: Mutex<Vec<OrderTicket>>,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// All orders placed so far, in submission order.
    pub async fn orders(&self) -> Vec<OrderTicket> {
        self.orders.lock().await.clone()
    }

    pub async fn open_orders(&self) -> Vec<OrderTicket> {
        self.orders
            .lock()
            .await
            .iter()
            .filter(|o| o.status == OrderStatus::Open)
            .cloned()
            .collect()
    }

    pub async fn cancel(&self, order_id: Uuid) -> Result<OrderTicket, ExecutorError> {
        let mut orders = self.orders.lock().await;
        let ticket = orders
            .iter_mut()
            .find(|o| o.order_id == order_id && o.status == OrderStatus::Open)
            .ok_or_else(|| ExecutorError::OrderNotFound(order_id.to_string()))?;
        ticket.status = OrderStatus::Cancelled;
        tracing::info!(%order_id, instrument = %ticket.instrument, "paper order cancelled");
        Ok(ticket.clone())
    }
}

#[async_trait]
impl DecisionSink for PaperBroker {
    async fn submit(
        &self,
        as_of: NaiveDate,
        decisions: &BTreeMap<String, Decision>,
    ) -> Result<Vec<OrderTicket>, ExecutorError> {
        let mut placed = Vec::new();
        for decision in decisions.values().filter(|d| !d.is_noop()) {
            let Some(side) = OrderSide::for_action(decision.action) else {
                continue;
            };
            let ticket = OrderTicket {
                order_id: Uuid::new_v4(),
                as_of,
                instrument: decision.instrument.clone(),
                side,
                action: decision.action,
                quantity: decision.quantity,
                status: OrderStatus::Open,
            };
            tracing::info!(
                order_id = %ticket.order_id,
                instrument = %ticket.instrument,
                action = %ticket.action,
                quantity = ticket.quantity,
                "paper order placed"
            );
            placed.push(ticket);
        }

        self.orders.lock().await.extend(placed.iter().cloned());
        Ok(placed)
    }
}
