use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::current_value;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QuotationStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "submitted")]
    Submitted,
    #[sea_orm(string_value = "under_review")]
    UnderReview,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// A vendor's priced answer to an RFQ. The derived amounts (`subtotal`,
/// `tax_amount`, `total_amount`) are recomputed from the inputs on every save.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "vendor_quotations")]
#[schema(as = VendorQuotation)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub rfq_id: Uuid,
    #[sea_orm(unique)]
    pub quotation_number: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub shipping_cost: Decimal,
    pub total_amount: Decimal,
    pub estimated_delivery_days: i32,
    pub quotation_valid_until: NaiveDate,
    pub payment_terms: String,
    pub warranty_terms: String,
    pub additional_notes: String,
    pub status: QuotationStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_date: Option<DateTime<Utc>>,
    pub review_notes: String,
    pub submitted_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rfq::Entity",
        from = "Column::RfqId",
        to = "super::rfq::Column::Id",
        on_delete = "Cascade"
    )]
    Rfq,
}

impl Related<super::rfq::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rfq.def()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotationTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

impl QuotationTotals {
    /// subtotal = quantity * unit_price, tax = subtotal * tax_rate / 100
    /// (rounded to cents), total = subtotal + tax + shipping. `None` when an
    /// amount does not fit in a decimal.
    pub fn compute(
        quantity: i32,
        unit_price: Decimal,
        tax_rate: Decimal,
        shipping_cost: Decimal,
    ) -> Option<Self> {
        let subtotal = Decimal::from(quantity).checked_mul(unit_price)?;
        let tax_amount = subtotal
            .checked_mul(tax_rate)?
            .checked_div(Decimal::ONE_HUNDRED)?
            .round_dp(2);
        let total_amount = subtotal
            .checked_add(tax_amount)?
            .checked_add(shipping_cost)?;
        Some(Self {
            subtotal,
            tax_amount,
            total_amount,
        })
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let mut active_model = self;
        let now = Utc::now();
        if insert {
            if active_model.id.is_not_set() {
                active_model.id = Set(Uuid::new_v4());
            }
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(now);

        if let (Some(quantity), Some(unit_price)) = (
            current_value(&active_model.quantity),
            current_value(&active_model.unit_price),
        ) {
            let tax_rate = current_value(&active_model.tax_rate).unwrap_or_default();
            let shipping = current_value(&active_model.shipping_cost).unwrap_or_default();
            let totals = QuotationTotals::compute(quantity, unit_price, tax_rate, shipping)
                .ok_or_else(|| DbErr::Custom("Quotation amounts are too large".to_string()))?;
            active_model.tax_rate = Set(tax_rate);
            active_model.shipping_cost = Set(shipping);
            active_model.subtotal = Set(totals.subtotal);
            active_model.tax_amount = Set(totals.tax_amount);
            active_model.total_amount = Set(totals.total_amount);
        }

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn totals_include_tax_and_shipping() {
        let totals = QuotationTotals::compute(10, dec!(100), dec!(18), dec!(50)).unwrap();
        assert_eq!(totals.subtotal, dec!(1000));
        assert_eq!(totals.tax_amount, dec!(180));
        assert_eq!(totals.total_amount, dec!(1230));
    }

    #[test]
    fn zero_tax_rate_leaves_subtotal_plus_shipping() {
        let totals = QuotationTotals::compute(3, dec!(19.99), Decimal::ZERO, dec!(5)).unwrap();
        assert_eq!(totals.subtotal, dec!(59.97));
        assert_eq!(totals.tax_amount, Decimal::ZERO);
        assert_eq!(totals.total_amount, dec!(64.97));
    }

    #[test]
    fn fractional_tax_is_rounded_to_cents() {
        let totals = QuotationTotals::compute(1, dec!(10.01), dec!(12.5), Decimal::ZERO).unwrap();
        assert_eq!(totals.tax_amount, dec!(1.25));
        assert_eq!(totals.total_amount, dec!(11.26));
    }

    #[test]
    fn oversized_amounts_are_not_computed() {
        assert_eq!(
            QuotationTotals::compute(10, Decimal::MAX, Decimal::ZERO, Decimal::ZERO),
            None
        );
        assert_eq!(
            QuotationTotals::compute(1, Decimal::MAX, Decimal::ZERO, Decimal::ONE),
            None
        );
    }

    #[tokio::test]
    async fn before_save_rejects_oversized_amounts() {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        let active = ActiveModel {
            quantity: Set(10),
            unit_price: Set(Decimal::MAX),
            ..Default::default()
        };
        let err = active.before_save(&db, true).await.unwrap_err();
        assert!(matches!(err, DbErr::Custom(ref m) if m == "Quotation amounts are too large"));
    }

    #[tokio::test]
    async fn before_save_recomputes_after_field_change() {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        let mut active = ActiveModel {
            quantity: Set(10),
            unit_price: Set(dec!(100)),
            tax_rate: Set(dec!(18)),
            shipping_cost: Set(dec!(50)),
            ..Default::default()
        };
        active = active.before_save(&db, true).await.unwrap();
        assert_eq!(current_value(&active.total_amount), Some(dec!(1230)));

        active.quantity = Set(20);
        active = active.before_save(&db, false).await.unwrap();
        assert_eq!(current_value(&active.subtotal), Some(dec!(2000)));
        assert_eq!(current_value(&active.total_amount), Some(dec!(2410)));
    }
}
