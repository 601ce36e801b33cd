use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::{category, product},
    services::{amounts, icontains, numbering},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 100, message = "This field is required."))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ProductFilter {
    pub category: Option<Uuid>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProduct {
    #[validate(length(min = 1, max = 200, message = "This field is required."))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 50))]
    pub unit_of_measure: Option<String>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub current_stock: Option<i32>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub reorder_level: Option<i32>,
    #[validate(custom = "amounts::price")]
    pub unit_price: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProduct {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    #[validate(length(min = 1, max = 50))]
    pub unit_of_measure: Option<String>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub current_stock: Option<i32>,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub reorder_level: Option<i32>,
    #[validate(custom = "amounts::price")]
    pub unit_price: Option<Decimal>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedProduct {
    pub message: String,
    pub product: product::Model,
}

/// Categories and products.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CatalogService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn ensure_category_name_free(
        &self,
        name: &str,
        except: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = category::Entity::find().filter(category::Column::Name.eq(name));
        if let Some(id) = except {
            query = query.filter(category::Column::Id.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::bad_request_with(
                "category with this name already exists.",
                json!({ "name": ["category with this name already exists."] }),
            ));
        }
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        Ok(category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_category(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        category::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(
        &self,
        input: CategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;
        self.ensure_category_name_free(&input.name, None).await?;
        let created = category::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;
        info!(category_id = %created.id, "category created");
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update_category(
        &self,
        id: Uuid,
        input: CategoryInput,
    ) -> Result<category::Model, ServiceError> {
        input.validate()?;
        let existing = self.get_category(id).await?;
        self.ensure_category_name_free(&input.name, Some(id)).await?;
        let mut active: category::ActiveModel = existing.into();
        active.name = Set(input.name);
        active.description = Set(input.description);
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = category::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Category not found".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
    ) -> Result<Vec<product::Model>, ServiceError> {
        let mut query = product::Entity::find();
        if let Some(category_id) = filter.category {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(active) = filter.is_active {
            query = query.filter(product::Column::IsActive.eq(active));
        }
        if let Some(search) = filter.search.filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(icontains(product::Column::Name, &search))
                    .add(icontains(product::Column::ProductCode, &search)),
            );
        }
        Ok(query
            .order_by_asc(product::Column::ProductCode)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        product::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))
    }

    /// Creates a product under the next free `PID` code.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: CreateProduct) -> Result<CreatedProduct, ServiceError> {
        input.validate()?;
        if let Some(category_id) = input.category_id {
            self.get_category(category_id).await?;
        }

        let txn = self.db.begin().await?;
        let codes: Vec<String> = product::Entity::find()
            .select_only()
            .column(product::Column::ProductCode)
            .filter(product::Column::ProductCode.starts_with(numbering::PRODUCT_CODE_PREFIX))
            .into_tuple()
            .all(&txn)
            .await?;
        let code = numbering::next_product_code(codes.iter().map(String::as_str));

        let created = product::ActiveModel {
            product_code: Set(code.clone()),
            name: Set(input.name),
            description: Set(input.description),
            category_id: Set(input.category_id),
            unit_of_measure: Set(input
                .unit_of_measure
                .unwrap_or_else(|| "pieces".to_string())),
            current_stock: Set(input.current_stock.unwrap_or(0)),
            reorder_level: Set(input.reorder_level.unwrap_or(10)),
            unit_price: Set(input.unit_price.unwrap_or_default()),
            is_active: Set(input.is_active.unwrap_or(true)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(product_id = %created.id, product_code = %code, "product created");
        self.event_sender
            .publish(Event::ProductCreated(created.id))
            .await;

        Ok(CreatedProduct {
            message: format!("Product created successfully with code {}", code),
            product: created,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProduct,
    ) -> Result<product::Model, ServiceError> {
        input.validate()?;
        if let Some(category_id) = input.category_id {
            self.get_category(category_id).await?;
        }
        let existing = self.get_product(id).await?;
        let mut active: product::ActiveModel = existing.into();
        if let Some(v) = input.name {
            active.name = Set(v);
        }
        if let Some(v) = input.description {
            active.description = Set(v);
        }
        if input.category_id.is_some() {
            active.category_id = Set(input.category_id);
        }
        if let Some(v) = input.unit_of_measure {
            active.unit_of_measure = Set(v);
        }
        if let Some(v) = input.current_stock {
            active.current_stock = Set(v);
        }
        if let Some(v) = input.reorder_level {
            active.reorder_level = Set(v);
        }
        if let Some(v) = input.unit_price {
            active.unit_price = Set(v);
        }
        if let Some(v) = input.is_active {
            active.is_active = Set(v);
        }
        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = product::Entity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }
        info!(product_id = %id, "product deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn set_product_active(
        &self,
        id: Uuid,
        active_flag: bool,
    ) -> Result<product::Model, ServiceError> {
        let existing = self.get_product(id).await?;
        let mut active: product::ActiveModel = existing.into();
        active.is_active = Set(active_flag);
        let updated = active.update(&*self.db).await?;
        info!(product_id = %id, is_active = active_flag, "product activation changed");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventSender;
    use migrations::{Migrator, MigratorTrait};
    use rust_decimal_macros::dec;
    use sea_orm::Database;
    use tokio::sync::mpsc;

    async fn service() -> CatalogService {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let (tx, _rx) = mpsc::channel(16);
        CatalogService::new(Arc::new(db), Arc::new(EventSender::new(tx)))
    }

    fn product_input(name: &str) -> CreateProduct {
        CreateProduct {
            name: name.to_string(),
            description: String::new(),
            category_id: None,
            unit_of_measure: None,
            current_stock: None,
            reorder_level: None,
            unit_price: Some(dec!(12.50)),
            is_active: None,
        }
    }

    #[tokio::test]
    async fn product_codes_increase_from_pid001() {
        let svc = service().await;
        let first = svc.create_product(product_input("Bolt")).await.unwrap();
        let second = svc.create_product(product_input("Nut")).await.unwrap();

        assert_eq!(first.product.product_code, "PID001");
        assert_eq!(first.product.unit_of_measure, "pieces");
        assert_eq!(second.product.product_code, "PID002");
        assert_eq!(second.message, "Product created successfully with code PID002");
    }

    #[tokio::test]
    async fn category_names_are_unique() {
        let svc = service().await;
        let input = || CategoryInput {
            name: "Hardware".into(),
            description: String::new(),
        };
        svc.create_category(input()).await.unwrap();
        let err = svc.create_category(input()).await.unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn negative_price_is_rejected() {
        let svc = service().await;
        let mut input = product_input("Washer");
        input.unit_price = Some(dec!(-1));
        let err = svc.create_product(input).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidFields(_)));
    }
}
