use super::context;

pub async fn run(database_url: &str) -> anyhow::Result<i32> {
    let ctx = context(database_url).await?;
    let report = ctx
        .runner
        .apply(&ctx.registry, &ctx.ledger, &ctx.store)
        .await?;

    for version in &report.applied {
        println!("applied {}", version);
    }

    if let Some(failed) = &report.failed {
        eprintln!("migration {} failed: {}", failed.version, failed.error);
        eprintln!(
            "{} migration(s) applied before the failure; re-run apply once the cause is fixed",
            report.applied.len()
        );
        return Ok(1);
    }

    if report.applied.is_empty() {
        println!("nothing to apply ({} already applied)", report.skipped);
    } else {
        println!(
            "{} migration(s) applied in {}ms",
            report.applied.len(),
            report.execution_time_ms
        );
    }
    Ok(0)
}
