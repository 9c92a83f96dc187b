//! `SeaORM` Entity for platform_fees table. Append-only.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::FeeReferenceKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "platform_fees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub reference_id: Uuid,
    pub reference_kind: FeeReferenceKind,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub base_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub fee_percentage: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub fee_amount: Decimal,
    pub currency: String,
    pub collected_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
