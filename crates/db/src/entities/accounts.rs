//! `SeaORM` Entity for the accounts table.
//!
//! The row is a derived cache over `ledger_entries`; `version` is the
//! optimistic concurrency token every mutating operation checks.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub currency: String,
    pub available: i64,
    pub reserved: i64,
    pub subscription_expires_at: Option<DateTimeWithTimeZone>,
    pub version: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ledger_entries::Entity")]
    LedgerEntries,
    #[sea_orm(has_many = "super::entitlements::Entity")]
    Entitlements,
}

impl Related<super::ledger_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl Related<super::entitlements::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Entitlements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
