//! `SeaORM` Entity for the ledger_entries table.
//!
//! Append-only. Amounts never change after insert; only a pending deposit's
//! status and resolution metadata are updated, and `reversed_by` is set once
//! when a later entry undoes this one.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{BalanceBucket, EntryKind, EntryStatus};

#[allow(missing_docs)]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: EntryKind,
    pub status: EntryStatus,
    pub bucket: BalanceBucket,
    pub amount: i64,
    pub currency: String,
    pub related_entry_id: Option<Uuid>,
    pub reversed_by: Option<Uuid>,
    pub external_ref: Option<String>,
    #[sea_orm(unique)]
    pub idempotency_key: Option<String>,
    pub actor_ref: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub committed_at: Option<DateTimeWithTimeZone>,
}

#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
