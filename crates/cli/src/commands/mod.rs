pub mod apply;
pub mod rollback;
pub mod status;

use tideway_migrate::{
    MigrateConfig, MigrationRegistry, MigrationRunner, PostgresStore, VersionLedger,
};

/// Everything a command needs: store session, ledger, catalog, runner.
pub struct Context {
    pub store: PostgresStore,
    pub ledger: VersionLedger,
    pub registry: MigrationRegistry,
    pub runner: MigrationRunner,
}

pub async fn context(database_url: &str) -> anyhow::Result<Context> {
    let config = MigrateConfig::default();
    Ok(Context {
        store: PostgresStore::connect(database_url).await?,
        ledger: VersionLedger::from_config(&config),
        registry: tideway_catalog::registry()?,
        runner: MigrationRunner::with_config(config),
    })
}
