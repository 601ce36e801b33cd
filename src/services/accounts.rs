use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::{
        hash_password, verify_password, AuthIdentity, AuthService, AuthUser, MIN_PASSWORD_LENGTH,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    models::{user, user_profile, vendor, UserRole, VendorStatus},
    services::{
        mailer::{deliver, templates, Mailer},
        numbering,
    },
};

const MAX_USERNAME_LENGTH: usize = 20;

/// Account summary returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct UserPayload {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub company_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserPayload,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct VendorRegistration {
    pub company_name: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub tax_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisteredVendor {
    pub id: Uuid,
    pub company_name: String,
    pub username: String,
    pub reference_id: String,
    pub status: VendorStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationResponse {
    pub message: String,
    pub vendor: RegisteredVendor,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// First word of a contact name and the remainder.
pub(crate) fn split_contact_name(contact: &str) -> (String, String) {
    let mut parts = contact.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Username derived from `base`, with a numeric suffix when already taken.
pub(crate) async fn unique_username<C: ConnectionTrait>(
    db: &C,
    base: &str,
) -> Result<String, DbErr> {
    let mut root = truncate_chars(base, MAX_USERNAME_LENGTH);
    if root.is_empty() {
        root = "user".to_string();
    }
    let mut candidate = root.clone();
    let mut counter = 1;
    while user::Entity::find()
        .filter(user::Column::Username.eq(candidate.as_str()))
        .count(db)
        .await?
        > 0
    {
        candidate = format!("{}{}", root, counter);
        counter += 1;
    }
    Ok(candidate)
}

pub(crate) async fn find_profile<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> Result<Option<user_profile::Model>, DbErr> {
    user_profile::Entity::find()
        .filter(user_profile::Column::UserId.eq(user_id))
        .one(db)
        .await
}

/// Active superusers, the recipients of admin notifications.
pub(crate) async fn active_admins<C: ConnectionTrait>(db: &C) -> Result<Vec<user::Model>, DbErr> {
    user::Entity::find()
        .filter(user::Column::IsSuperuser.eq(true))
        .filter(user::Column::IsActive.eq(true))
        .all(db)
        .await
}

/// Creates an active superuser with an admin profile. Fails when the
/// username is taken.
pub async fn create_superuser<C: ConnectionTrait>(
    db: &C,
    username: &str,
    email: &str,
    password: &str,
) -> Result<user::Model, ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::ValidationError(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    let taken = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .count(db)
        .await?;
    if taken > 0 {
        return Err(ServiceError::Conflict(
            "A user with that username already exists.".to_string(),
        ));
    }
    let account = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(password)?),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        is_active: Set(true),
        is_staff: Set(true),
        is_superuser: Set(true),
        last_login: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    user_profile::ActiveModel {
        user_id: Set(account.id),
        role: Set(UserRole::Admin),
        phone: Set(String::new()),
        department: Set(String::new()),
        is_active: Set(true),
        vendor_id: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(user_id = %account.id, %username, "superuser created");
    Ok(account)
}

pub(crate) async fn user_payload<C: ConnectionTrait>(
    db: &C,
    account: &user::Model,
) -> Result<UserPayload, DbErr> {
    let profile = find_profile(db, account.id).await?;
    let identity = AuthIdentity::from_records(account, profile.as_ref());
    let company_name = match identity.vendor_id {
        Some(vendor_id) => vendor::Entity::find_by_id(vendor_id)
            .one(db)
            .await?
            .map(|v| v.company_name),
        None => None,
    };
    Ok(UserPayload {
        id: account.id,
        username: account.username.clone(),
        email: account.email.clone(),
        first_name: account.first_name.clone(),
        last_name: account.last_name.clone(),
        role: identity.role,
        company_name,
    })
}

/// Login, registration and self-service account operations.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
    event_sender: Arc<EventSender>,
    mailer: Arc<dyn Mailer>,
}

impl AccountService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        auth: Arc<AuthService>,
        event_sender: Arc<EventSender>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db,
            auth,
            event_sender,
            mailer,
        }
    }

    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ServiceError> {
        let invalid = || ServiceError::Unauthorized("Invalid username or password".to_string());

        let account = user::Entity::find()
            .filter(user::Column::Username.eq(request.username.trim()))
            .one(&*self.db)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(&request.password, &account.password_hash) {
            warn!("login failed");
            return Err(invalid());
        }

        let profile = find_profile(&*self.db, account.id).await?;
        let identity = AuthIdentity::from_records(&account, profile.as_ref());

        if identity.role == UserRole::Vendor {
            if let Some(vendor_id) = identity.vendor_id {
                if let Some(v) = vendor::Entity::find_by_id(vendor_id).one(&*self.db).await? {
                    match v.status {
                        VendorStatus::Pending => {
                            return Err(ServiceError::Forbidden(
                                "Your account is awaiting approval.".to_string(),
                            ))
                        }
                        VendorStatus::Rejected => {
                            return Err(ServiceError::Forbidden(
                                "Your account has been rejected.".to_string(),
                            ))
                        }
                        VendorStatus::Suspended => {
                            return Err(ServiceError::Forbidden(
                                "Your account has been suspended.".to_string(),
                            ))
                        }
                        VendorStatus::Approved => {}
                    }
                }
            }
        }

        if !account.is_active {
            return Err(ServiceError::Unauthorized("Account is inactive".to_string()));
        }

        let tokens = self.auth.generate_token(&identity)?;

        let mut active: user::ActiveModel = account.into();
        active.last_login = Set(Some(Utc::now()));
        let account = active.update(&*self.db).await?;

        let payload = user_payload(&*self.db, &account).await?;
        info!(user_id = %account.id, role = %payload.role, "login successful");

        Ok(LoginResponse {
            message: "Login successful".to_string(),
            token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
            user: payload,
        })
    }

    pub async fn logout(&self, caller: &AuthUser) {
        self.auth.revoke_token(caller).await;
        info!(user_id = %caller.user_id, "logout");
    }

    #[instrument(skip(self))]
    pub async fn current_user(&self, user_id: Uuid) -> Result<UserPayload, ServiceError> {
        let account = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("User not found".to_string()))?;
        Ok(user_payload(&*self.db, &account).await?)
    }

    /// Public vendor sign-up. The account stays inactive until an admin
    /// approves the vendor.
    #[instrument(skip(self, input))]
    pub async fn register_vendor(
        &self,
        input: VendorRegistration,
    ) -> Result<RegistrationResponse, ServiceError> {
        let fields = [
            ("company_name", required(&input.company_name)),
            ("contact_person", required(&input.contact_person)),
            ("email", required(&input.email)),
            ("phone", required(&input.phone)),
            ("password", input.password.as_deref().filter(|p| !p.is_empty())),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let company_name = required(&input.company_name).unwrap_or_default().to_string();
        let contact_person = required(&input.contact_person).unwrap_or_default().to_string();
        let email = required(&input.email).unwrap_or_default().to_string();
        let phone = required(&input.phone).unwrap_or_default().to_string();
        let password = input.password.clone().unwrap_or_default();

        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ServiceError::ValidationError(
                "Password must be at least 8 characters long".to_string(),
            ));
        }

        let duplicate = vendor::Entity::find()
            .filter(vendor::Column::Email.eq(email.as_str()))
            .count(&*self.db)
            .await?;
        if duplicate > 0 {
            return Err(ServiceError::ValidationError(
                "A vendor with this email already exists".to_string(),
            ));
        }

        let password_hash = hash_password(&password)?;
        let reference = numbering::temporary_vendor_code(Utc::now());
        let local_part = email.split('@').next().unwrap_or_default().to_lowercase();
        let (first_name, last_name) = split_contact_name(&contact_person);

        let txn = self.db.begin().await?;

        let username = unique_username(&txn, &local_part).await?;
        let account = user::ActiveModel {
            username: Set(username.clone()),
            email: Set(email.clone()),
            password_hash: Set(password_hash),
            first_name: Set(first_name),
            last_name: Set(last_name),
            is_active: Set(false),
            is_staff: Set(false),
            is_superuser: Set(false),
            last_login: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let optional = |v: &Option<String>| v.clone().unwrap_or_default();
        let registered = vendor::ActiveModel {
            vendor_code: Set(reference.clone()),
            company_name: Set(company_name.clone()),
            contact_person: Set(contact_person.clone()),
            email: Set(email.clone()),
            phone: Set(phone.clone()),
            address: Set(optional(&input.address)),
            city: Set(optional(&input.city)),
            state: Set(optional(&input.state)),
            postal_code: Set(optional(&input.postal_code)),
            country: Set(optional(&input.country)),
            tax_id: Set(optional(&input.tax_id)),
            payment_terms: Set("Net 30".to_string()),
            credit_limit: Set(Default::default()),
            is_active: Set(false),
            status: Set(VendorStatus::Pending),
            rating: Set(Default::default()),
            notes: Set(String::new()),
            user_id: Set(Some(account.id)),
            rejection_reason: Set(String::new()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        user_profile::ActiveModel {
            user_id: Set(account.id),
            role: Set(UserRole::Vendor),
            phone: Set(phone.clone()),
            department: Set(String::new()),
            is_active: Set(true),
            vendor_id: Set(Some(registered.id)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let admins = active_admins(&txn).await?;
        txn.commit().await?;

        info!(vendor_id = %registered.id, %username, "vendor registered");
        self.event_sender
            .publish(Event::VendorRegistered(registered.id))
            .await;

        let admin_emails: Vec<String> = admins
            .into_iter()
            .map(|a| a.email)
            .filter(|e| !e.is_empty())
            .collect();
        deliver(
            self.mailer.as_ref(),
            templates::vendor_registration_to_admins(
                admin_emails,
                &company_name,
                &contact_person,
                &email,
                &phone,
                &username,
                &reference,
            ),
        )
        .await;
        deliver(
            self.mailer.as_ref(),
            templates::vendor_registration_received(
                &email,
                &contact_person,
                &company_name,
                &username,
                &reference,
            ),
        )
        .await;

        Ok(RegistrationResponse {
            message: "Registration successful! Your account is pending approval. You will be notified once approved.".to_string(),
            vendor: RegisteredVendor {
                id: registered.id,
                company_name: registered.company_name,
                username,
                reference_id: registered.vendor_code,
                status: registered.status,
            },
        })
    }

    /// Changes the caller's own password.
    #[instrument(skip(self, caller, request))]
    pub async fn change_password(
        &self,
        caller: &AuthUser,
        user_id: Uuid,
        request: ChangePasswordRequest,
    ) -> Result<(), ServiceError> {
        let account = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        if caller.user_id != account.id {
            return Err(ServiceError::Forbidden(
                "You can only change your own password".to_string(),
            ));
        }

        let (current, new) = match (
            request.current_password.filter(|p| !p.is_empty()),
            request.new_password.filter(|p| !p.is_empty()),
        ) {
            (Some(current), Some(new)) => (current, new),
            _ => {
                return Err(ServiceError::ValidationError(
                    "Both current_password and new_password are required".to_string(),
                ))
            }
        };

        if !verify_password(&current, &account.password_hash) {
            return Err(ServiceError::ValidationError(
                "Current password is incorrect".to_string(),
            ));
        }
        if new.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ServiceError::ValidationError(
                "New password must be at least 8 characters long".to_string(),
            ));
        }

        let mut active: user::ActiveModel = account.into();
        active.password_hash = Set(hash_password(&new)?);
        active.update(&*self.db).await?;
        info!(%user_id, "password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn contact_name_splits_on_first_word() {
        assert_eq!(
            split_contact_name("Ada  King Lovelace"),
            ("Ada".to_string(), "King Lovelace".to_string())
        );
        assert_eq!(split_contact_name("Cher"), ("Cher".to_string(), String::new()));
        assert_eq!(split_contact_name(""), (String::new(), String::new()));
    }

    #[test]
    fn usernames_are_truncated_by_character() {
        assert_eq!(truncate_chars("averyveryverylongusername", 20).len(), 20);
        assert_eq!(truncate_chars("émile", 3), "émi");
    }

    #[tokio::test]
    async fn superuser_seeding_guards_password_and_username() {
        let mut options = sea_orm::ConnectOptions::new("sqlite::memory:");
        options.max_connections(1);
        let db = sea_orm::Database::connect(options).await.unwrap();
        crate::db::run_migrations(&db).await.unwrap();

        assert_matches!(
            create_superuser(&db, "root", "root@example.com", "short").await,
            Err(ServiceError::ValidationError(_))
        );

        let admin = create_superuser(&db, "root", "root@example.com", "long-enough-1")
            .await
            .unwrap();
        assert!(admin.is_superuser && admin.is_staff && admin.is_active);
        assert_ne!(admin.password_hash, "long-enough-1");

        assert_matches!(
            create_superuser(&db, "root", "other@example.com", "long-enough-1").await,
            Err(ServiceError::Conflict(msg)) if msg == "A user with that username already exists."
        );
    }
}
