use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        product, purchase_request, rfq, user, vendor, NotificationType, PurchaseRequestStatus,
        RfqStatus, UrgencyLevel,
    },
    services::{
        notifications::{NewNotification, NotificationService},
        numbering,
        vendors::vendor_user_ids,
    },
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PurchaseRequestFilter {
    pub status: Option<PurchaseRequestStatus>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseRequest {
    /// Requesting employee; defaults to the caller.
    pub employee_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    #[validate(length(max = 200))]
    #[serde(default)]
    pub item_name: String,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub quantity: i32,
    #[serde(default)]
    pub department: String,
    pub urgency_level: Option<UrgencyLevel>,
    #[serde(default)]
    pub justification: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePurchaseRequest {
    pub product_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub item_name: Option<String>,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    pub quantity: Option<i32>,
    pub department: Option<String>,
    pub urgency_level: Option<UrgencyLevel>,
    pub justification: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RejectPurchaseRequest {
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SendRfqRequest {
    #[serde(default)]
    pub vendor_ids: Vec<Uuid>,
    /// `YYYY-MM-DD`
    pub response_deadline: Option<String>,
    #[serde(default)]
    pub admin_notes: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseRequestDecision {
    pub message: String,
    pub data: purchase_request::Model,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RfqDispatch {
    pub message: String,
    pub rfqs: Vec<rfq::Model>,
}

fn parse_deadline(raw: Option<&str>) -> Result<Option<NaiveDate>, ServiceError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                ServiceError::ValidationError("Invalid date format. Use YYYY-MM-DD".to_string())
            }),
    }
}

#[derive(Clone)]
pub struct RequisitionService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    notifications: NotificationService,
}

impl RequisitionService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        let notifications = NotificationService::new(db.clone());
        Self {
            db,
            event_sender,
            notifications,
        }
    }

    /// Loads a request, hiding other employees' requests from non-admins.
    async fn visible(&self, caller: &AuthUser, id: Uuid) -> Result<purchase_request::Model, ServiceError> {
        let found = purchase_request::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .filter(|r| caller.is_admin() || r.employee_id == Some(caller.user_id));
        found.ok_or_else(|| ServiceError::NotFound("Purchase request not found".to_string()))
    }

    #[instrument(skip(self, caller, input), fields(user_id = %caller.user_id))]
    pub async fn create(
        &self,
        caller: &AuthUser,
        input: CreatePurchaseRequest,
    ) -> Result<purchase_request::Model, ServiceError> {
        input.validate()?;

        // Only admins may raise a request on someone else's behalf; unknown
        // employees fall back to the caller.
        let mut employee_id = caller.user_id;
        if let Some(requested) = input.employee_id.filter(|_| caller.is_admin()) {
            if user::Entity::find_by_id(requested)
                .one(&*self.db)
                .await?
                .is_some()
            {
                employee_id = requested;
            }
        }

        let mut item_name = input.item_name.trim().to_string();
        if let Some(product_id) = input.product_id {
            let linked = product::Entity::find_by_id(product_id)
                .one(&*self.db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;
            if item_name.is_empty() {
                item_name = linked.name;
            }
        }
        if item_name.is_empty() {
            return Err(ServiceError::bad_request_with(
                "item_name is required",
                serde_json::json!({ "item_name": ["This field is required."] }),
            ));
        }

        let created = purchase_request::ActiveModel {
            employee_id: Set(Some(employee_id)),
            product_id: Set(input.product_id),
            item_name: Set(item_name),
            quantity: Set(input.quantity),
            department: Set(input.department),
            urgency_level: Set(input.urgency_level.unwrap_or(UrgencyLevel::Medium)),
            justification: Set(input.justification),
            status: Set(PurchaseRequestStatus::Pending),
            reviewed_by: Set(None),
            reviewed_date: Set(None),
            rejection_reason: Set(String::new()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(request_id = %created.id, %employee_id, "purchase request created");
        self.event_sender
            .publish(Event::PurchaseRequestCreated(created.id))
            .await;
        Ok(created)
    }

    #[instrument(skip(self, caller))]
    pub async fn list(
        &self,
        caller: &AuthUser,
        filter: PurchaseRequestFilter,
    ) -> Result<Vec<purchase_request::Model>, ServiceError> {
        let mut query = purchase_request::Entity::find();
        if !caller.is_admin() {
            query = query.filter(purchase_request::Column::EmployeeId.eq(caller.user_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(purchase_request::Column::Status.eq(status));
        }
        Ok(query
            .order_by_desc(purchase_request::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn my_requests(
        &self,
        caller: &AuthUser,
    ) -> Result<Vec<purchase_request::Model>, ServiceError> {
        Ok(purchase_request::Entity::find()
            .filter(purchase_request::Column::EmployeeId.eq(caller.user_id))
            .order_by_desc(purchase_request::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn get(
        &self,
        caller: &AuthUser,
        id: Uuid,
    ) -> Result<purchase_request::Model, ServiceError> {
        self.visible(caller, id).await
    }

    #[instrument(skip(self, caller, input))]
    pub async fn update(
        &self,
        caller: &AuthUser,
        id: Uuid,
        input: UpdatePurchaseRequest,
    ) -> Result<purchase_request::Model, ServiceError> {
        input.validate()?;
        let existing = self.visible(caller, id).await?;
        let mut active: purchase_request::ActiveModel = existing.into();
        if input.product_id.is_some() {
            active.product_id = Set(input.product_id);
        }
        if let Some(v) = input.item_name {
            active.item_name = Set(v);
        }
        if let Some(v) = input.quantity {
            active.quantity = Set(v);
        }
        if let Some(v) = input.department {
            active.department = Set(v);
        }
        if let Some(v) = input.urgency_level {
            active.urgency_level = Set(v);
        }
        if let Some(v) = input.justification {
            active.justification = Set(v);
        }
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self, caller))]
    pub async fn delete(&self, caller: &AuthUser, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.visible(caller, id).await?;
        purchase_request::Entity::delete_by_id(existing.id)
            .exec(&*self.db)
            .await?;
        info!(request_id = %id, "purchase request deleted");
        Ok(())
    }

    /// Moves a pending request to approved. A request leaves `pending` once.
    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        id: Uuid,
        reviewer_id: Uuid,
    ) -> Result<PurchaseRequestDecision, ServiceError> {
        let txn = self.db.begin().await?;
        let existing = purchase_request::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Purchase request not found".to_string()))?;
        if !existing.is_pending() {
            return Err(ServiceError::InvalidOperation(
                "Only pending requests can be approved".to_string(),
            ));
        }

        let mut active: purchase_request::ActiveModel = existing.into();
        active.status = Set(PurchaseRequestStatus::Approved);
        active.reviewed_by = Set(Some(reviewer_id));
        active.reviewed_date = Set(Some(Utc::now()));
        let approved = active.update(&txn).await?;
        txn.commit().await?;

        info!(request_id = %id, %reviewer_id, "purchase request approved");
        self.event_sender
            .publish(Event::PurchaseRequestApproved(id))
            .await;
        if let Some(employee_id) = approved.employee_id {
            self.notifications
                .dispatch(vec![NewNotification::new(
                    employee_id,
                    NotificationType::Approval,
                    format!(
                        "Your purchase request for \"{}\" has been approved!",
                        approved.item_name
                    ),
                )
                .request(id)])
                .await;
        }

        Ok(PurchaseRequestDecision {
            message: "Purchase request approved successfully".to_string(),
            data: approved,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn reject(
        &self,
        id: Uuid,
        reviewer_id: Uuid,
        input: RejectPurchaseRequest,
    ) -> Result<PurchaseRequestDecision, ServiceError> {
        let reason = input
            .rejection_reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "No reason provided".to_string());

        let txn = self.db.begin().await?;
        let existing = purchase_request::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Purchase request not found".to_string()))?;
        if !existing.is_pending() {
            return Err(ServiceError::InvalidOperation(
                "Only pending requests can be rejected".to_string(),
            ));
        }

        let mut active: purchase_request::ActiveModel = existing.into();
        active.status = Set(PurchaseRequestStatus::Rejected);
        active.reviewed_by = Set(Some(reviewer_id));
        active.reviewed_date = Set(Some(Utc::now()));
        active.rejection_reason = Set(reason.clone());
        let rejected = active.update(&txn).await?;
        txn.commit().await?;

        info!(request_id = %id, %reviewer_id, "purchase request rejected");
        self.event_sender
            .publish(Event::PurchaseRequestRejected(id))
            .await;
        if let Some(employee_id) = rejected.employee_id {
            self.notifications
                .dispatch(vec![NewNotification::new(
                    employee_id,
                    NotificationType::Rejection,
                    format!(
                        "Your purchase request for \"{}\" has been rejected. Reason: {}",
                        rejected.item_name, reason
                    ),
                )
                .request(id)])
                .await;
        }

        Ok(PurchaseRequestDecision {
            message: "Purchase request rejected".to_string(),
            data: rejected,
        })
    }

    /// Sends one RFQ per selected vendor. Unknown vendor ids are skipped.
    #[instrument(skip(self, input), fields(vendors = input.vendor_ids.len()))]
    pub async fn send_rfq(
        &self,
        id: Uuid,
        sender_id: Uuid,
        input: SendRfqRequest,
    ) -> Result<RfqDispatch, ServiceError> {
        let txn = self.db.begin().await?;
        let request = purchase_request::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Purchase request not found".to_string()))?;
        if request.status != PurchaseRequestStatus::Approved {
            return Err(ServiceError::InvalidOperation(
                "Only approved requests can be sent for quotation".to_string(),
            ));
        }
        if input.vendor_ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one vendor must be selected".to_string(),
            ));
        }
        let deadline = parse_deadline(input.response_deadline.as_deref())?;

        let now = Utc::now();
        let mut rfqs = Vec::new();
        let mut pending = Vec::new();
        for vendor_id in input.vendor_ids {
            if rfqs.iter().any(|r: &rfq::Model| r.vendor_id == vendor_id) {
                continue;
            }
            if vendor::Entity::find_by_id(vendor_id).one(&txn).await?.is_none() {
                continue;
            }
            let sent = rfq::ActiveModel {
                rfq_number: Set(numbering::rfq_number(now)),
                purchase_request_id: Set(request.id),
                vendor_id: Set(vendor_id),
                sent_by: Set(Some(sender_id)),
                sent_date: Set(now),
                response_deadline: Set(deadline),
                status: Set(RfqStatus::Sent),
                admin_notes: Set(input.admin_notes.clone()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            for user_id in vendor_user_ids(&txn, vendor_id).await? {
                pending.push(
                    NewNotification::new(
                        user_id,
                        NotificationType::Rfq,
                        format!("New RFQ received for \"{}\"", request.item_name),
                    )
                    .request(request.id)
                    .rfq(sent.id),
                );
            }
            rfqs.push(sent);
        }

        let mut active: purchase_request::ActiveModel = request.into();
        active.status = Set(PurchaseRequestStatus::RfqSent);
        active.update(&txn).await?;
        txn.commit().await?;

        info!(request_id = %id, sent = rfqs.len(), "RFQs sent");
        for sent in &rfqs {
            self.event_sender
                .publish(Event::RfqSent {
                    rfq_id: sent.id,
                    vendor_id: sent.vendor_id,
                })
                .await;
        }
        self.notifications.dispatch(pending).await;

        Ok(RfqDispatch {
            message: format!("RFQ sent to {} vendor(s) successfully", rfqs.len()),
            rfqs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_accepts_iso_dates_only() {
        assert_eq!(parse_deadline(None).unwrap(), None);
        assert_eq!(parse_deadline(Some("")).unwrap(), None);
        assert_eq!(
            parse_deadline(Some("2025-04-30")).unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 30)
        );
        let err = parse_deadline(Some("30/04/2025")).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Invalid date format. Use YYYY-MM-DD");
    }
}
