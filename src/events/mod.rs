use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event after the owning transaction committed. A closed
    /// channel is logged and otherwise ignored.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("{}", e);
        }
    }
}

/// Workflow events emitted by the service layer once a transaction commits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    // Identity
    EmployeeCreated(Uuid),
    EmployeeDeleted(Uuid),
    VendorRegistered(Uuid),
    VendorApproved { vendor_id: Uuid, vendor_code: String },
    VendorRejected(Uuid),
    VendorAccountCreated { vendor_id: Uuid, user_id: Uuid },

    // Catalog
    ProductCreated(Uuid),
    StockIncremented { product_id: Uuid, quantity: i32 },

    // Requisition
    PurchaseRequestCreated(Uuid),
    PurchaseRequestApproved(Uuid),
    PurchaseRequestRejected(Uuid),

    // Sourcing
    RfqSent { rfq_id: Uuid, vendor_id: Uuid },
    QuotationSubmitted(Uuid),
    QuotationAccepted { quotation_id: Uuid, purchase_order_id: Uuid },
    QuotationRejected(Uuid),

    // Ordering and fulfillment
    PurchaseOrderCreated(Uuid),
    PurchaseOrderStatusChanged {
        purchase_order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    DeliveryStatusUpdated {
        purchase_order_id: Uuid,
        delivery_status: String,
    },
    GoodsReceived {
        receipt_id: Uuid,
        purchase_order_id: Uuid,
        condition: String,
    },

    // Billing
    InvoiceCreated(Uuid),
    InvoiceUploaded(Uuid),
    PaymentRecorded {
        payment_id: Uuid,
        invoice_id: Uuid,
        amount: Decimal,
    },
    InvoicePaid(Uuid),
}

impl Event {
    /// Stable name used as the log field for the event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Event::EmployeeCreated(_) => "employee.created",
            Event::EmployeeDeleted(_) => "employee.deleted",
            Event::VendorRegistered(_) => "vendor.registered",
            Event::VendorApproved { .. } => "vendor.approved",
            Event::VendorRejected(_) => "vendor.rejected",
            Event::VendorAccountCreated { .. } => "vendor.account_created",
            Event::ProductCreated(_) => "product.created",
            Event::StockIncremented { .. } => "product.stock_incremented",
            Event::PurchaseRequestCreated(_) => "purchase_request.created",
            Event::PurchaseRequestApproved(_) => "purchase_request.approved",
            Event::PurchaseRequestRejected(_) => "purchase_request.rejected",
            Event::RfqSent { .. } => "rfq.sent",
            Event::QuotationSubmitted(_) => "quotation.submitted",
            Event::QuotationAccepted { .. } => "quotation.accepted",
            Event::QuotationRejected(_) => "quotation.rejected",
            Event::PurchaseOrderCreated(_) => "purchase_order.created",
            Event::PurchaseOrderStatusChanged { .. } => "purchase_order.status_changed",
            Event::DeliveryStatusUpdated { .. } => "purchase_order.delivery_status_updated",
            Event::GoodsReceived { .. } => "goods_receipt.created",
            Event::InvoiceCreated(_) => "invoice.created",
            Event::InvoiceUploaded(_) => "invoice.uploaded",
            Event::PaymentRecorded { .. } => "payment.recorded",
            Event::InvoicePaid(_) => "invoice.paid",
        }
    }
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &Event) -> Result<(), String>;
}

/// Drains the event channel, fanning each event out to the registered handlers.
/// Handler failures are logged and never stop the loop.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, handlers: Vec<Arc<dyn EventHandler>>) {
    info!(handlers = handlers.len(), "Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::PurchaseOrderStatusChanged {
                purchase_order_id,
                old_status,
                new_status,
            } => info!(
                event = event.name(),
                %purchase_order_id,
                %old_status,
                %new_status,
                "purchase order status changed"
            ),
            Event::PaymentRecorded {
                payment_id,
                invoice_id,
                amount,
            } => info!(
                event = event.name(),
                %payment_id,
                %invoice_id,
                %amount,
                "payment recorded"
            ),
            _ => debug!(event = event.name(), payload = ?event, "event received"),
        }

        for handler in &handlers {
            if let Err(e) = handler.handle_event(&event).await {
                error!(event = event.name(), "Event handler failed: {}", e);
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Event>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle_event(&self, event: &Event) -> Result<(), String> {
            self.seen.lock().await.push(event.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EventHandler for Failing {
        async fn handle_event(&self, _event: &Event) -> Result<(), String> {
            Err("boom".into())
        }
    }

    #[tokio::test]
    async fn handlers_receive_events_even_when_one_fails() {
        let (tx, rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        let recorder = Arc::new(Recorder::default());

        let handlers: Vec<Arc<dyn EventHandler>> = vec![Arc::new(Failing), recorder.clone()];
        let task = tokio::spawn(process_events(rx, handlers));

        let po = Uuid::new_v4();
        sender.publish(Event::PurchaseOrderCreated(po)).await;
        sender.publish(Event::InvoicePaid(po)).await;
        drop(sender);
        task.await.unwrap();

        let seen = recorder.seen.lock().await;
        assert_eq!(
            *seen,
            vec![Event::PurchaseOrderCreated(po), Event::InvoicePaid(po)]
        );
    }

    #[tokio::test]
    async fn publish_on_closed_channel_is_silent() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        EventSender::new(tx)
            .publish(Event::InvoicePaid(Uuid::new_v4()))
            .await;
    }
}
