//! `SeaORM` Entity for escrow_accounts table.
//!
//! A partial unique index allows at most one `held` row per session.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::EscrowStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "escrow_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub session_id: Uuid,
    pub payment_id: Option<Uuid>,
    pub payer_id: Uuid,
    pub payee_id: Uuid,
    /// Amount currently held.
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub amount: Decimal,
    /// Amount held when the escrow was opened.
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub original_amount: Decimal,
    pub currency: String,
    pub status: EscrowStatus,
    pub hold_until: DateTimeWithTimeZone,
    pub released_at: Option<DateTimeWithTimeZone>,
    pub release_reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::payments::Entity",
        from = "Column::PaymentId",
        to = "super::payments::Column::Id"
    )]
    Payments,
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
