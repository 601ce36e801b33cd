use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    models::{notification, NotificationType},
};

/// A notification queued by a workflow step. Records are written after the
/// step's transaction commits.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationType,
    pub message: String,
    pub related_request_id: Option<Uuid>,
    pub related_order_id: Option<Uuid>,
    pub related_rfq_id: Option<Uuid>,
}

impl NewNotification {
    pub fn new(user_id: Uuid, kind: NotificationType, message: impl Into<String>) -> Self {
        Self {
            user_id,
            kind,
            message: message.into(),
            related_request_id: None,
            related_order_id: None,
            related_rfq_id: None,
        }
    }

    pub fn request(mut self, id: Uuid) -> Self {
        self.related_request_id = Some(id);
        self
    }

    pub fn order(mut self, id: Uuid) -> Self {
        self.related_order_id = Some(id);
        self
    }

    pub fn rfq(mut self, id: Uuid) -> Self {
        self.related_rfq_id = Some(id);
        self
    }
}

#[derive(Clone)]
pub struct NotificationService {
    db: Arc<DatabaseConnection>,
}

impl NotificationService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Writes each notification independently. Failures are logged and skipped.
    pub async fn dispatch(&self, notifications: Vec<NewNotification>) -> usize {
        let mut written = 0;
        for n in notifications {
            let user_id = n.user_id;
            let record = notification::ActiveModel {
                user_id: Set(n.user_id),
                notification_type: Set(n.kind),
                message: Set(n.message),
                read: Set(false),
                related_request_id: Set(n.related_request_id),
                related_order_id: Set(n.related_order_id),
                related_rfq_id: Set(n.related_rfq_id),
                ..Default::default()
            };
            match record.insert(&*self.db).await {
                Ok(_) => written += 1,
                Err(e) => warn!(%user_id, error = %e, "failed to store notification"),
            }
        }
        written
    }

    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<notification::Model>, ServiceError> {
        let rows = notification::Entity::find()
            .filter(notification::Column::UserId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn mark_read(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<notification::Model, ServiceError> {
        let existing = notification::Entity::find_by_id(id)
            .filter(notification::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Notification not found".to_string()))?;

        if existing.read {
            return Ok(existing);
        }
        let mut active: notification::ActiveModel = existing.into();
        active.read = Set(true);
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::Read, Expr::value(true))
            .filter(notification::Column::UserId.eq(user_id))
            .filter(notification::Column::Read.eq(false))
            .exec(&*self.db)
            .await?;
        info!(%user_id, updated = result.rows_affected, "notifications marked read");
        Ok(result.rows_affected)
    }
}
