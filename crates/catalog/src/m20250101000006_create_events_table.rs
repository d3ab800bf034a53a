//! Outbound event queue with retry bookkeeping. Pure DDL, so it is
//! authored as a raw SQL unit.

use tideway_migrate::SqlUnit;

pub fn unit() -> SqlUnit {
    SqlUnit::new(
        "20250101000006",
        "create events table",
        "CREATE TABLE IF NOT EXISTS tw_events (
            id BIGINT NOT NULL PRIMARY KEY,
            tenant_id VARCHAR(32) NOT NULL DEFAULT 'default',
            event_id VARCHAR(100) NOT NULL,
            event_type VARCHAR(100) NOT NULL,
            aggregate_type VARCHAR(50),
            aggregate_id BIGINT,
            payload TEXT,
            status VARCHAR(20) DEFAULT 'Pending',
            retry_count INTEGER DEFAULT 0,
            next_retry_at TIMESTAMPTZ,
            create_date TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP,
            modify_date TIMESTAMPTZ DEFAULT CURRENT_TIMESTAMP
         );
         CREATE UNIQUE INDEX IF NOT EXISTS idx_tw_events_event_id ON tw_events(event_id);
         CREATE INDEX IF NOT EXISTS idx_tw_events_status ON tw_events(status);
         CREATE INDEX IF NOT EXISTS idx_tw_events_next_retry_at ON tw_events(next_retry_at)",
        "DROP TABLE IF EXISTS tw_events",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tideway_migrate::MigrationUnit;

    #[test]
    fn version_and_description_are_fixed() {
        let unit = unit();
        assert_eq!(unit.version(), "20250101000006");
        assert_eq!(unit.description(), "create events table");
    }
}
