//! Initial database migration.
//!
//! Creates the enums, tables, and indexes for accounts, ledger entries, and
//! entitlements.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: TABLES
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;
        db.execute_unprepared(ENTITLEMENTS_SQL).await?;

        // ============================================================
        // PART 3: INDEXES
        // ============================================================
        db.execute_unprepared(INDEXES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
-- Ledger entry kinds
CREATE TYPE entry_kind AS ENUM (
    'deposit',
    'purchase',
    'subscription_charge',
    'admin_adjustment',
    'reversal',
    'hold',
    'hold_release'
);

-- Ledger entry lifecycle
CREATE TYPE entry_status AS ENUM (
    'pending',
    'committed',
    'rejected'
);

-- Which balance a delta applies to
CREATE TYPE balance_bucket AS ENUM (
    'available',
    'reserved'
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    currency TEXT NOT NULL,
    available BIGINT NOT NULL DEFAULT 0 CHECK (available >= 0),
    reserved BIGINT NOT NULL DEFAULT 0 CHECK (reserved >= 0),
    subscription_expires_at TIMESTAMPTZ,
    version BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts(id),
    kind entry_kind NOT NULL,
    status entry_status NOT NULL,
    bucket balance_bucket NOT NULL,
    amount BIGINT NOT NULL,
    currency TEXT NOT NULL,
    related_entry_id UUID REFERENCES ledger_entries(id),
    reversed_by UUID REFERENCES ledger_entries(id),
    external_ref TEXT,
    idempotency_key TEXT,
    actor_ref TEXT,
    reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    committed_at TIMESTAMPTZ,

    CONSTRAINT ledger_entries_idempotency_key_unique UNIQUE (idempotency_key)
);
";

const ENTITLEMENTS_SQL: &str = r"
CREATE TABLE entitlements (
    id UUID PRIMARY KEY,
    account_id UUID NOT NULL REFERENCES accounts(id),
    content_id TEXT NOT NULL,
    source_entry_id UUID NOT NULL REFERENCES ledger_entries(id),
    granted_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    revoked_at TIMESTAMPTZ,
    revoked_by_entry_id UUID REFERENCES ledger_entries(id)
);
";

const INDEXES_SQL: &str = r"
-- Audit-trail scans per account
CREATE INDEX idx_ledger_entries_account ON ledger_entries(account_id, created_at);

-- Pending-queue scans for the moderation surfaces
CREATE INDEX idx_ledger_entries_pending ON ledger_entries(status)
    WHERE status = 'pending';

-- At most one live grant per (account, content)
CREATE UNIQUE INDEX idx_entitlements_live ON entitlements(account_id, content_id)
    WHERE revoked_at IS NULL;

CREATE INDEX idx_entitlements_source ON entitlements(source_entry_id);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS entitlements;
DROP TABLE IF EXISTS ledger_entries;
DROP TABLE IF EXISTS accounts;
DROP TYPE IF EXISTS balance_bucket;
DROP TYPE IF EXISTS entry_status;
DROP TYPE IF EXISTS entry_kind;
";
