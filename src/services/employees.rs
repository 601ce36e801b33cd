use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{generate_temporary_password, hash_password},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        employee_profile, goods_receipt, notification, purchase_order, purchase_request, user,
        user_profile, UserRole,
    },
    services::{
        accounts::find_profile,
        icontains,
        mailer::{deliver, templates, Mailer},
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct EmployeeView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub department: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub has_usable_password: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl EmployeeView {
    fn from_parts(account: user::Model, profile: Option<employee_profile::Model>) -> Self {
        let (department, position, phone) = match profile {
            Some(p) => (p.department, p.position, p.phone),
            None => (None, None, None),
        };
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            is_active: account.is_active,
            department,
            position,
            phone,
            has_usable_password: !account.password_hash.is_empty(),
            date_joined: account.created_at,
            last_login: account.last_login,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct EmployeeFilter {
    pub is_active: Option<bool>,
    pub department: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateEmployee {
    #[validate(length(min = 1, max = 150, message = "This field is required."))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateEmployee {
    #[validate(length(min = 1, max = 150))]
    pub username: Option<String>,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedEmployee {
    #[serde(flatten)]
    pub employee: EmployeeView,
    pub temporary_password: String,
    pub email_status: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PasswordReset {
    pub message: String,
    pub username: String,
    pub temporary_password: String,
}

fn field_error(field: &str, message: &str) -> ServiceError {
    let mut details = serde_json::Map::new();
    details.insert(field.to_string(), json!([message]));
    ServiceError::bad_request_with(message, details.into())
}

/// Admin management of employee accounts. Staff, superuser and vendor
/// accounts are out of reach of these operations.
#[derive(Clone)]
pub struct EmployeeService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    mailer: Arc<dyn Mailer>,
    hr_email: Option<String>,
}

impl EmployeeService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        mailer: Arc<dyn Mailer>,
        hr_email: Option<String>,
    ) -> Self {
        Self {
            db,
            event_sender,
            mailer,
            hr_email,
        }
    }

    async fn view(&self, account: user::Model) -> Result<EmployeeView, ServiceError> {
        let profile = employee_profile::Entity::find()
            .filter(employee_profile::Column::UserId.eq(account.id))
            .one(&*self.db)
            .await?;
        Ok(EmployeeView::from_parts(account, profile))
    }

    /// Loads an employee account; vendor accounts are refused.
    async fn load(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        let account = user::Entity::find_by_id(id)
            .filter(user::Column::IsStaff.eq(false))
            .filter(user::Column::IsSuperuser.eq(false))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Employee not found".to_string()))?;
        Ok(account)
    }

    async fn load_non_vendor(&self, id: Uuid, action: &str) -> Result<user::Model, ServiceError> {
        let account = self.load(id).await?;
        let profile = find_profile(&*self.db, id).await?;
        if matches!(profile, Some(ref p) if p.role == UserRole::Vendor) {
            return Err(ServiceError::Forbidden(format!(
                "Cannot {} vendor accounts in employee management. Use vendor management instead.",
                action
            )));
        }
        Ok(account)
    }

    async fn ensure_unique(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let scoped = |cond: Condition| match exclude {
            Some(id) => cond.add(user::Column::Id.ne(id)),
            None => cond,
        };
        if let Some(username) = username {
            let taken = user::Entity::find()
                .filter(scoped(Condition::all().add(user::Column::Username.eq(username))))
                .count(&*self.db)
                .await?;
            if taken > 0 {
                return Err(field_error("username", "A user with that username already exists."));
            }
        }
        if let Some(email) = email {
            let taken = user::Entity::find()
                .filter(scoped(Condition::all().add(user::Column::Email.eq(email))))
                .count(&*self.db)
                .await?;
            if taken > 0 {
                return Err(field_error("email", "A user with that email already exists."));
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: EmployeeFilter) -> Result<Vec<EmployeeView>, ServiceError> {
        let vendor_users = Query::select()
            .column(user_profile::Column::UserId)
            .from(user_profile::Entity)
            .and_where(Expr::col(user_profile::Column::Role).eq(UserRole::Vendor.to_string()))
            .to_owned();

        let mut query = user::Entity::find()
            .filter(user::Column::IsStaff.eq(false))
            .filter(user::Column::IsSuperuser.eq(false))
            .filter(user::Column::Id.not_in_subquery(vendor_users));

        if let Some(active) = filter.is_active {
            query = query.filter(user::Column::IsActive.eq(active));
        }
        if let Some(department) = filter.department.filter(|d| !d.is_empty()) {
            query = query.filter(
                user::Column::Id.in_subquery(
                    Query::select()
                        .column(employee_profile::Column::UserId)
                        .from(employee_profile::Entity)
                        .and_where(Expr::col(employee_profile::Column::Department).eq(department))
                        .to_owned(),
                ),
            );
        }
        if let Some(search) = filter.search.filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(icontains(user::Column::Username, &search))
                    .add(icontains(user::Column::FirstName, &search))
                    .add(icontains(user::Column::LastName, &search))
                    .add(icontains(user::Column::Email, &search)),
            );
        }

        let accounts = query
            .order_by_desc(user::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let ids: Vec<Uuid> = accounts.iter().map(|a| a.id).collect();
        let profiles = employee_profile::Entity::find()
            .filter(employee_profile::Column::UserId.is_in(ids))
            .all(&*self.db)
            .await?;

        Ok(accounts
            .into_iter()
            .map(|account| {
                let profile = profiles.iter().find(|p| p.user_id == account.id).cloned();
                EmployeeView::from_parts(account, profile)
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<EmployeeView, ServiceError> {
        let account = self.load_non_vendor(id, "view").await?;
        self.view(account).await
    }

    /// Creates the account with a generated password and mails the
    /// credentials to HR. Mail failures only change `email_status`.
    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create(&self, input: CreateEmployee) -> Result<CreatedEmployee, ServiceError> {
        input.validate()?;
        self.ensure_unique(Some(&input.username), Some(&input.email), None)
            .await?;

        let temporary_password = generate_temporary_password();
        let password_hash = hash_password(&temporary_password)?;
        let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());

        let txn = self.db.begin().await?;
        let account = user::ActiveModel {
            username: Set(input.username.clone()),
            email: Set(input.email.clone()),
            password_hash: Set(password_hash),
            first_name: Set(input.first_name.clone()),
            last_name: Set(input.last_name.clone()),
            is_active: Set(true),
            is_staff: Set(false),
            is_superuser: Set(false),
            last_login: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        user_profile::ActiveModel {
            user_id: Set(account.id),
            role: Set(UserRole::Employee),
            phone: Set(input.phone.clone()),
            department: Set(input.department.clone()),
            is_active: Set(true),
            vendor_id: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let profile = employee_profile::ActiveModel {
            user_id: Set(account.id),
            department: Set(optional(&input.department)),
            position: Set(optional(&input.position)),
            phone: Set(optional(&input.phone)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(employee_id = %account.id, "employee created");
        self.event_sender
            .publish(Event::EmployeeCreated(account.id))
            .await;

        let full_name = account.full_name();
        let display_name = if full_name.is_empty() {
            account.username.clone()
        } else {
            full_name
        };
        let or_na = |v: &str| if v.is_empty() { "N/A".to_string() } else { v.to_string() };
        let sent = match self.hr_email.as_deref().filter(|e| !e.is_empty()) {
            Some(hr) => {
                deliver(
                    self.mailer.as_ref(),
                    templates::employee_credentials(
                        hr,
                        &display_name,
                        &account.email,
                        &or_na(&input.department),
                        &or_na(&input.position),
                        &account.username,
                        &temporary_password,
                    ),
                )
                .await
            }
            None => false,
        };
        let email_status = if sent { "sent" } else { "failed" }.to_string();

        Ok(CreatedEmployee {
            employee: EmployeeView::from_parts(account, Some(profile)),
            temporary_password,
            message: format!("Employee created. Email {}.", email_status),
            email_status,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateEmployee) -> Result<EmployeeView, ServiceError> {
        input.validate()?;
        let account = self.load_non_vendor(id, "edit").await?;
        self.ensure_unique(input.username.as_deref(), input.email.as_deref(), Some(id))
            .await?;

        let txn = self.db.begin().await?;
        let mut active: user::ActiveModel = account.into();
        if let Some(v) = input.username {
            active.username = Set(v);
        }
        if let Some(v) = input.email {
            active.email = Set(v);
        }
        if let Some(v) = input.first_name {
            active.first_name = Set(v);
        }
        if let Some(v) = input.last_name {
            active.last_name = Set(v);
        }
        if let Some(v) = input.is_active {
            active.is_active = Set(v);
        }
        let account = active.update(&txn).await?;

        if input.department.is_some() || input.position.is_some() || input.phone.is_some() {
            let existing = employee_profile::Entity::find()
                .filter(employee_profile::Column::UserId.eq(id))
                .one(&txn)
                .await?;
            let mut profile: employee_profile::ActiveModel = match existing {
                Some(p) => p.into(),
                None => employee_profile::ActiveModel {
                    user_id: Set(id),
                    department: Set(None),
                    position: Set(None),
                    phone: Set(None),
                    ..Default::default()
                },
            };
            if let Some(v) = input.department.clone() {
                profile.department = Set(Some(v));
            }
            if let Some(v) = input.position {
                profile.position = Set(Some(v));
            }
            if let Some(v) = input.phone.clone() {
                profile.phone = Set(Some(v));
            }
            profile.save(&txn).await?;

            if let Some(p) = find_profile(&txn, id).await? {
                let mut p: user_profile::ActiveModel = p.into();
                if let Some(v) = input.department {
                    p.department = Set(v);
                }
                if let Some(v) = input.phone {
                    p.phone = Set(v);
                }
                p.update(&txn).await?;
            }
        }
        txn.commit().await?;

        info!(employee_id = %id, "employee updated");
        self.view(account).await
    }

    /// Deletes the account after detaching it from workflow records.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<String, ServiceError> {
        let account = self.load_non_vendor(id, "delete").await?;
        let username = account.username.clone();

        let txn = self.db.begin().await?;
        purchase_request::Entity::update_many()
            .col_expr(purchase_request::Column::EmployeeId, Expr::value(Option::<Uuid>::None))
            .filter(purchase_request::Column::EmployeeId.eq(id))
            .exec(&txn)
            .await?;
        goods_receipt::Entity::update_many()
            .col_expr(goods_receipt::Column::ReceivedBy, Expr::value(Option::<Uuid>::None))
            .filter(goods_receipt::Column::ReceivedBy.eq(id))
            .exec(&txn)
            .await?;
        purchase_order::Entity::update_many()
            .col_expr(purchase_order::Column::AssignedTo, Expr::value(Option::<Uuid>::None))
            .filter(purchase_order::Column::AssignedTo.eq(id))
            .exec(&txn)
            .await?;
        notification::Entity::delete_many()
            .filter(notification::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        employee_profile::Entity::delete_many()
            .filter(employee_profile::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        user_profile::Entity::delete_many()
            .filter(user_profile::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        user::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(employee_id = %id, %username, "employee deleted");
        self.event_sender.publish(Event::EmployeeDeleted(id)).await;
        Ok(username)
    }

    #[instrument(skip(self))]
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<EmployeeView, ServiceError> {
        let account = self.load(id).await?;
        let mut active: user::ActiveModel = account.into();
        active.is_active = Set(is_active);
        let account = active.update(&*self.db).await?;
        info!(employee_id = %id, is_active, "employee activation changed");
        self.view(account).await
    }

    #[instrument(skip(self))]
    pub async fn reset_password(&self, id: Uuid) -> Result<PasswordReset, ServiceError> {
        let account = self.load_non_vendor(id, "reset").await?;
        let temporary_password = generate_temporary_password();
        let mut active: user::ActiveModel = account.into();
        active.password_hash = Set(hash_password(&temporary_password)?);
        let account = active.update(&*self.db).await?;
        info!(employee_id = %id, "employee password reset");
        Ok(PasswordReset {
            message: "Password reset successfully".to_string(),
            username: account.username,
            temporary_password,
        })
    }
}
