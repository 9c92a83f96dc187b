//! `SeaORM` Entity for webhook_events table.
//!
//! UNIQUE (gateway, external_event_id) is the idempotency key.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::PaymentGateway;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "webhook_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub gateway: PaymentGateway,
    pub event_type: String,
    pub external_event_id: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: Json,
    pub signature: Option<String>,
    pub processed: bool,
    pub processed_at: Option<DateTimeWithTimeZone>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub next_attempt_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
