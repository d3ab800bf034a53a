use tideway_migrate::RollbackMigrations;

use super::context;

pub async fn run(database_url: &str, version: &str) -> anyhow::Result<i32> {
    let ctx = context(database_url).await?;
    let report = ctx
        .runner
        .rollback_to(version, &ctx.registry, &ctx.ledger, &ctx.store)
        .await?;

    for reverted in &report.reverted {
        println!("reverted {}", reverted);
    }

    if let Some(failed) = &report.failed {
        eprintln!("rollback of {} failed: {}", failed.version, failed.error);
        return Ok(1);
    }

    if report.reverted.is_empty() {
        println!("nothing to revert above {}", version);
    } else {
        println!(
            "{} migration(s) reverted in {}ms",
            report.reverted.len(),
            report.execution_time_ms
        );
    }
    Ok(0)
}
