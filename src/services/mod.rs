// Identity and accounts
pub mod accounts;
pub mod employees;
pub mod vendors;

// Catalog and requisition
pub mod catalog;
pub mod requisitions;

// Sourcing, ordering and fulfillment
pub mod ordering;
pub mod receiving;
pub mod sourcing;

// Billing
pub mod billing;
pub mod invoice_pdf;
pub mod payment_gateway;

// Portals and reporting
pub mod dashboards;
pub mod vendor_portal;

// Shared infrastructure
pub mod amounts;
pub mod mailer;
pub mod notifications;
pub mod numbering;

use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::ColumnTrait;

/// Case-insensitive substring match on a text column.
pub(crate) fn icontains<C: ColumnTrait>(column: C, term: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(format!("%{}%", term.to_lowercase()))
}
