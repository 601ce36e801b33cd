use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{generate_temporary_password, hash_password},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{invoice, purchase_order, rfq, user, user_profile, vendor, UserRole, VendorStatus},
    services::{
        accounts::{split_contact_name, unique_username},
        amounts,
        icontains,
        mailer::{deliver, templates, Mailer},
        numbering,
    },
};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct VendorFilter {
    pub status: Option<VendorStatus>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateVendor {
    #[validate(length(max = 50))]
    pub vendor_code: Option<String>,
    #[validate(length(min = 1, max = 200, message = "This field is required."))]
    pub company_name: String,
    #[validate(length(min = 1, max = 100, message = "This field is required."))]
    pub contact_person: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, max = 20, message = "This field is required."))]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub tax_id: String,
    pub payment_terms: Option<String>,
    #[validate(custom = "amounts::amount")]
    pub credit_limit: Option<Decimal>,
    pub status: Option<VendorStatus>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub notes: String,
    /// Also create a vendor login in the same transaction.
    #[serde(default)]
    pub create_user_account: bool,
    pub username: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateVendor {
    #[validate(length(min = 1, max = 200))]
    pub company_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub contact_person: Option<String>,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub tax_id: Option<String>,
    pub payment_terms: Option<String>,
    #[validate(custom = "amounts::amount")]
    pub credit_limit: Option<Decimal>,
    pub is_active: Option<bool>,
    pub status: Option<VendorStatus>,
    pub rating: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VendorCredentials {
    pub username: String,
    pub temporary_password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedVendor {
    #[serde(flatten)]
    pub vendor: vendor::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_account: Option<VendorCredentials>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VendorDecision {
    pub message: String,
    pub vendor: vendor::Model,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VendorAccount {
    pub message: String,
    pub username: String,
    pub temporary_password: String,
    pub vendor_id: Uuid,
    pub vendor_name: String,
}

/// Username base for a vendor login derived from the company name.
fn company_username(company_name: &str) -> String {
    company_name
        .to_lowercase()
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect()
}

/// Users who act for the vendor: the linked login plus any vendor profiles.
pub(crate) async fn vendor_user_ids<C: ConnectionTrait>(
    db: &C,
    vendor_id: Uuid,
) -> Result<Vec<Uuid>, DbErr> {
    let mut ids: Vec<Uuid> = user_profile::Entity::find()
        .select_only()
        .column(user_profile::Column::UserId)
        .filter(user_profile::Column::VendorId.eq(vendor_id))
        .filter(user_profile::Column::Role.eq(UserRole::Vendor))
        .into_tuple()
        .all(db)
        .await?;
    if let Some(v) = vendor::Entity::find_by_id(vendor_id).one(db).await? {
        if let Some(user_id) = v.user_id {
            if !ids.contains(&user_id) {
                ids.push(user_id);
            }
        }
    }
    Ok(ids)
}

#[derive(Clone)]
pub struct VendorService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    mailer: Arc<dyn Mailer>,
}

impl VendorService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db,
            event_sender,
            mailer,
        }
    }

    async fn load<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<vendor::Model, ServiceError> {
        vendor::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Vendor not found".to_string()))
    }

    /// Login linked to the vendor, through the vendor record or a vendor profile.
    async fn linked_user<C: ConnectionTrait>(
        db: &C,
        v: &vendor::Model,
    ) -> Result<Option<user::Model>, DbErr> {
        if let Some(user_id) = v.user_id {
            if let Some(account) = user::Entity::find_by_id(user_id).one(db).await? {
                return Ok(Some(account));
            }
        }
        let profile = user_profile::Entity::find()
            .filter(user_profile::Column::VendorId.eq(v.id))
            .filter(user_profile::Column::Role.eq(UserRole::Vendor))
            .one(db)
            .await?;
        match profile {
            Some(p) => user::Entity::find_by_id(p.user_id).one(db).await,
            None => Ok(None),
        }
    }

    async fn create_login<C: ConnectionTrait>(
        db: &C,
        v: &vendor::Model,
        username: Option<String>,
    ) -> Result<(user::Model, String), ServiceError> {
        let base = username
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| company_username(&v.company_name));
        let username = unique_username(db, &base).await?;
        let temporary_password = generate_temporary_password();
        let (first_name, last_name) = split_contact_name(&v.contact_person);

        let account = user::ActiveModel {
            username: Set(username),
            email: Set(v.email.clone()),
            password_hash: Set(hash_password(&temporary_password)?),
            first_name: Set(first_name),
            last_name: Set(last_name),
            is_active: Set(true),
            is_staff: Set(false),
            is_superuser: Set(false),
            last_login: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;

        user_profile::ActiveModel {
            user_id: Set(account.id),
            role: Set(UserRole::Vendor),
            phone: Set(v.phone.clone()),
            department: Set(String::new()),
            is_active: Set(true),
            vendor_id: Set(Some(v.id)),
            ..Default::default()
        }
        .insert(db)
        .await?;

        let mut linked: vendor::ActiveModel = v.clone().into();
        linked.user_id = Set(Some(account.id));
        linked.update(db).await?;

        Ok((account, temporary_password))
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: VendorFilter) -> Result<Vec<vendor::Model>, ServiceError> {
        let mut query = vendor::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(vendor::Column::Status.eq(status));
        }
        if let Some(active) = filter.is_active {
            query = query.filter(vendor::Column::IsActive.eq(active));
        }
        if let Some(search) = filter.search.filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(icontains(vendor::Column::CompanyName, &search))
                    .add(icontains(vendor::Column::VendorCode, &search))
                    .add(icontains(vendor::Column::Email, &search)),
            );
        }
        Ok(query
            .order_by_desc(vendor::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<vendor::Model, ServiceError> {
        Self::load(&*self.db, id).await
    }

    #[instrument(skip(self, input), fields(company = %input.company_name))]
    pub async fn create(&self, input: CreateVendor) -> Result<CreatedVendor, ServiceError> {
        input.validate()?;

        let code = input
            .vendor_code
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| numbering::temporary_vendor_code(Utc::now()));
        let taken = vendor::Entity::find()
            .filter(vendor::Column::VendorCode.eq(code.as_str()))
            .count(&*self.db)
            .await?;
        if taken > 0 {
            return Err(ServiceError::bad_request_with(
                "vendor with this vendor code already exists.",
                json!({ "vendor_code": ["vendor with this vendor code already exists."] }),
            ));
        }

        let txn = self.db.begin().await?;
        let created = vendor::ActiveModel {
            vendor_code: Set(code),
            company_name: Set(input.company_name),
            contact_person: Set(input.contact_person),
            email: Set(input.email),
            phone: Set(input.phone),
            address: Set(input.address),
            city: Set(input.city),
            state: Set(input.state),
            postal_code: Set(input.postal_code),
            country: Set(input.country),
            tax_id: Set(input.tax_id),
            payment_terms: Set(input.payment_terms.unwrap_or_else(|| "Net 30".to_string())),
            credit_limit: Set(input.credit_limit.unwrap_or_default()),
            is_active: Set(input.is_active.unwrap_or(true)),
            status: Set(input.status.unwrap_or(VendorStatus::Pending)),
            rating: Set(Decimal::ZERO),
            notes: Set(input.notes),
            user_id: Set(None),
            rejection_reason: Set(String::new()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let user_account = if input.create_user_account {
            let (account, temporary_password) =
                Self::create_login(&txn, &created, input.username).await?;
            Some(VendorCredentials {
                username: account.username,
                temporary_password,
            })
        } else {
            None
        };
        let created = Self::load(&txn, created.id).await?;
        txn.commit().await?;

        info!(vendor_id = %created.id, "vendor created");
        Ok(CreatedVendor {
            vendor: created,
            user_account,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: UpdateVendor) -> Result<vendor::Model, ServiceError> {
        input.validate()?;
        let existing = Self::load(&*self.db, id).await?;
        let mut active: vendor::ActiveModel = existing.into();
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(v) = input.$field { active.$field = Set(v); })*
            };
        }
        apply!(
            company_name,
            contact_person,
            email,
            phone,
            address,
            city,
            state,
            postal_code,
            country,
            tax_id,
            payment_terms,
            credit_limit,
            is_active,
            status,
            rating,
            notes
        );
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = Self::load(&*self.db, id).await?;
        let rfqs = rfq::Entity::find()
            .filter(rfq::Column::VendorId.eq(id))
            .count(&*self.db)
            .await?;
        let orders = purchase_order::Entity::find()
            .filter(purchase_order::Column::VendorId.eq(id))
            .count(&*self.db)
            .await?;
        let invoices = invoice::Entity::find()
            .filter(invoice::Column::VendorId.eq(id))
            .count(&*self.db)
            .await?;
        if rfqs + orders + invoices > 0 {
            return Err(ServiceError::InvalidOperation(
                "Vendor has RFQs, purchase orders or invoices and cannot be deleted".to_string(),
            ));
        }
        vendor::Entity::delete_by_id(existing.id)
            .exec(&*self.db)
            .await?;
        info!(vendor_id = %id, "vendor deleted");
        Ok(())
    }

    /// Approves the vendor and replaces its reference with the next
    /// permanent `VEND-` code.
    #[instrument(skip(self))]
    pub async fn approve(&self, id: Uuid, admin_id: Uuid) -> Result<VendorDecision, ServiceError> {
        let txn = self.db.begin().await?;
        let existing = Self::load(&txn, id).await?;
        if existing.status == VendorStatus::Approved {
            return Err(ServiceError::InvalidOperation(
                "Vendor is already approved".to_string(),
            ));
        }

        let codes: Vec<String> = vendor::Entity::find()
            .select_only()
            .column(vendor::Column::VendorCode)
            .filter(vendor::Column::VendorCode.starts_with(numbering::VENDOR_CODE_PREFIX))
            .into_tuple()
            .all(&txn)
            .await?;
        let code = numbering::next_vendor_code(codes.iter().map(String::as_str));

        let now = Utc::now();
        let mut active: vendor::ActiveModel = existing.clone().into();
        active.vendor_code = Set(code.clone());
        active.status = Set(VendorStatus::Approved);
        active.is_active = Set(true);
        active.approved_by = Set(Some(admin_id));
        active.approved_at = Set(Some(now));
        active.rejection_reason = Set(String::new());
        active.rejected_by = Set(None);
        active.rejected_at = Set(None);
        let approved = active.update(&txn).await?;

        let login = Self::linked_user(&txn, &approved).await?;
        if let Some(account) = &login {
            let mut a: user::ActiveModel = account.clone().into();
            a.is_active = Set(true);
            a.update(&txn).await?;
        }
        txn.commit().await?;

        info!(vendor_id = %id, vendor_code = %code, "vendor approved");
        self.event_sender
            .publish(Event::VendorApproved {
                vendor_id: id,
                vendor_code: code.clone(),
            })
            .await;
        deliver(
            self.mailer.as_ref(),
            templates::vendor_approved(
                &approved.email,
                &approved.contact_person,
                &approved.company_name,
                &code,
                login.as_ref().map(|a| a.username.as_str()),
            ),
        )
        .await;

        Ok(VendorDecision {
            message: format!(
                "Vendor approved successfully. Vendor code assigned: {}",
                code
            ),
            vendor: approved,
        })
    }

    #[instrument(skip(self))]
    pub async fn reject(
        &self,
        id: Uuid,
        admin_id: Uuid,
        reason: Option<String>,
    ) -> Result<VendorDecision, ServiceError> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .ok_or_else(|| ServiceError::ValidationError("Rejection reason is required".to_string()))?;

        let existing = Self::load(&*self.db, id).await?;
        let mut active: vendor::ActiveModel = existing.into();
        active.status = Set(VendorStatus::Rejected);
        active.is_active = Set(false);
        active.rejection_reason = Set(reason.clone());
        active.rejected_by = Set(Some(admin_id));
        active.rejected_at = Set(Some(Utc::now()));
        active.approved_by = Set(None);
        active.approved_at = Set(None);
        let rejected = active.update(&*self.db).await?;

        warn!(vendor_id = %id, "vendor rejected");
        self.event_sender.publish(Event::VendorRejected(id)).await;
        deliver(
            self.mailer.as_ref(),
            templates::vendor_rejected(
                &rejected.email,
                &rejected.contact_person,
                &rejected.company_name,
                &rejected.vendor_code,
                &reason,
            ),
        )
        .await;

        Ok(VendorDecision {
            message: "Vendor rejected".to_string(),
            vendor: rejected,
        })
    }

    #[instrument(skip(self))]
    pub async fn create_user_account(
        &self,
        id: Uuid,
        username: Option<String>,
    ) -> Result<VendorAccount, ServiceError> {
        let txn = self.db.begin().await?;
        let existing = Self::load(&txn, id).await?;
        if let Some(account) = Self::linked_user(&txn, &existing).await? {
            return Err(ServiceError::bad_request_with(
                "Vendor already has a user account",
                json!({ "username": account.username }),
            ));
        }

        let (account, temporary_password) = Self::create_login(&txn, &existing, username).await?;
        txn.commit().await?;

        info!(vendor_id = %id, user_id = %account.id, "vendor login created");
        self.event_sender
            .publish(Event::VendorAccountCreated {
                vendor_id: id,
                user_id: account.id,
            })
            .await;

        Ok(VendorAccount {
            message: "User account created successfully".to_string(),
            username: account.username,
            temporary_password,
            vendor_id: id,
            vendor_name: existing.company_name,
        })
    }

    #[instrument(skip(self))]
    pub async fn reset_password(&self, id: Uuid) -> Result<VendorAccount, ServiceError> {
        let existing = Self::load(&*self.db, id).await?;
        let account = Self::linked_user(&*self.db, &existing)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("No user account found for this vendor".to_string())
            })?;

        let temporary_password = generate_temporary_password();
        let mut active: user::ActiveModel = account.into();
        active.password_hash = Set(hash_password(&temporary_password)?);
        let account = active.update(&*self.db).await?;

        info!(vendor_id = %id, "vendor password reset");
        Ok(VendorAccount {
            message: "Password reset successfully".to_string(),
            username: account.username,
            temporary_password,
            vendor_id: id,
            vendor_name: existing.company_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_username_strips_separators() {
        assert_eq!(company_username("Acme Steel-Works Ltd"), "acmesteelworksltd");
    }

    #[test]
    fn negative_credit_limit_is_rejected() {
        assert!(amounts::amount(&Decimal::new(-1, 0)).is_err());
        assert!(amounts::amount(&Decimal::ZERO).is_ok());
        assert!(amounts::amount(&Decimal::new(5000, 0)).is_ok());
    }
}
