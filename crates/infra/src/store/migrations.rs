//! Schema for the Postgres store.
//!
//! Every statement is idempotent so the whole list runs on each startup.

/// Core inventory, purchasing and ledger tables.
pub const CORE_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS suppliers (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        contact_name TEXT,
        contact_email TEXT,
        contact_phone TEXT,
        default_lead_time_days INTEGER NOT NULL DEFAULT 0 CHECK (default_lead_time_days >= 0),
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS inventory_items (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        part_number TEXT NOT NULL,
        finish TEXT,
        sku TEXT NOT NULL,
        location TEXT NOT NULL DEFAULT '',
        stock BIGINT NOT NULL DEFAULT 0 CHECK (stock >= 0),
        committed_qty BIGINT NOT NULL DEFAULT 0,
        discontinued BOOLEAN NOT NULL DEFAULT FALSE,
        supplier_id UUID REFERENCES suppliers(id),
        supplier_name TEXT NOT NULL DEFAULT '',
        supplier_contact TEXT,
        reorder_point BIGINT NOT NULL DEFAULT 0,
        lead_time_days INTEGER NOT NULL DEFAULT 0,
        average_daily_use NUMERIC(12, 4),
        safety_stock NUMERIC(12, 3) NOT NULL DEFAULT 0,
        min_order_qty NUMERIC(12, 3) NOT NULL DEFAULT 0,
        order_multiple NUMERIC(12, 3) NOT NULL DEFAULT 0,
        pack_size NUMERIC(12, 3) NOT NULL DEFAULT 0,
        purchase_uom TEXT NOT NULL DEFAULT 'each',
        on_order_qty NUMERIC(14, 3) NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS inventory_items_sku_idx ON inventory_items (upper(sku))",
    r#"
    CREATE TABLE IF NOT EXISTS inventory_transactions (
        id UUID PRIMARY KEY,
        reference TEXT NOT NULL,
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS inventory_transaction_lines (
        id BIGSERIAL PRIMARY KEY,
        transaction_id UUID NOT NULL REFERENCES inventory_transactions(id),
        item_id UUID NOT NULL REFERENCES inventory_items(id),
        quantity_change BIGINT NOT NULL,
        stock_before BIGINT NOT NULL,
        stock_after BIGINT NOT NULL CHECK (stock_after >= 0),
        note TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS inventory_transaction_lines_item_idx ON inventory_transaction_lines (item_id)",
    r#"
    CREATE TABLE IF NOT EXISTS inventory_daily_usage (
        item_id UUID NOT NULL REFERENCES inventory_items(id),
        usage_date DATE NOT NULL,
        quantity_used BIGINT NOT NULL DEFAULT 0,
        PRIMARY KEY (item_id, usage_date)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS purchase_orders (
        id UUID PRIMARY KEY,
        order_number TEXT,
        supplier_id UUID REFERENCES suppliers(id),
        status TEXT NOT NULL DEFAULT 'draft',
        order_date DATE,
        expected_date DATE,
        total_cost NUMERIC(14, 4) NOT NULL DEFAULT 0,
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS purchase_order_lines (
        id UUID PRIMARY KEY,
        order_id UUID NOT NULL REFERENCES purchase_orders(id) ON DELETE CASCADE,
        item_id UUID REFERENCES inventory_items(id),
        supplier_sku TEXT,
        description TEXT,
        quantity_ordered NUMERIC(14, 3) NOT NULL CHECK (quantity_ordered > 0),
        quantity_received NUMERIC(14, 3) NOT NULL DEFAULT 0 CHECK (quantity_received >= 0),
        unit_cost NUMERIC(14, 4) NOT NULL DEFAULT 0,
        expected_date DATE,
        CHECK (quantity_received <= quantity_ordered)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS purchase_order_lines_item_idx ON purchase_order_lines (item_id)",
    r#"
    CREATE TABLE IF NOT EXISTS purchase_order_receipts (
        id UUID PRIMARY KEY,
        order_id UUID NOT NULL REFERENCES purchase_orders(id),
        transaction_id UUID REFERENCES inventory_transactions(id),
        reference TEXT NOT NULL,
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS purchase_order_receipt_lines (
        receipt_id UUID NOT NULL REFERENCES purchase_order_receipts(id),
        line_id UUID NOT NULL,
        quantity_received NUMERIC(14, 3) NOT NULL,
        PRIMARY KEY (receipt_id, line_id)
    )
    "#,
];

/// Job reservation tables.
pub const RESERVATION_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS job_reservations (
        id UUID PRIMARY KEY,
        job_number TEXT NOT NULL UNIQUE,
        job_name TEXT NOT NULL,
        requested_by TEXT NOT NULL,
        needed_by DATE,
        notes TEXT,
        status TEXT NOT NULL DEFAULT 'committed',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS job_reservation_items (
        reservation_id UUID NOT NULL REFERENCES job_reservations(id),
        item_id UUID NOT NULL REFERENCES inventory_items(id),
        requested_qty BIGINT NOT NULL DEFAULT 0,
        committed_qty BIGINT NOT NULL DEFAULT 0 CHECK (committed_qty >= 0),
        consumed_qty BIGINT NOT NULL DEFAULT 0 CHECK (consumed_qty >= 0),
        PRIMARY KEY (reservation_id, item_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS job_reservation_items_item_idx ON job_reservation_items (item_id)",
];

/// Tables whose presence turns on the reservation subsystem.
pub const RESERVATION_TABLES: &[&str] = &["job_reservations", "job_reservation_items"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_statement_is_idempotent() {
        for sql in CORE_SCHEMA.iter().chain(RESERVATION_SCHEMA) {
            assert!(sql.contains("IF NOT EXISTS"), "not idempotent: {sql}");
        }
    }

    #[test]
    fn reservation_tables_are_created_by_the_reservation_schema() {
        for table in RESERVATION_TABLES {
            let create = format!("CREATE TABLE IF NOT EXISTS {table} (");
            assert!(RESERVATION_SCHEMA.iter().any(|sql| sql.contains(&create)), "{table}");
        }
    }
}
