use super::context;

pub async fn run(database_url: &str, json: bool) -> anyhow::Result<i32> {
    let ctx = context(database_url).await?;
    let status = ctx
        .runner
        .status(&ctx.registry, &ctx.ledger, &ctx.store)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(0);
    }

    println!("Migration status");
    println!("================");
    for entry in &status.applied {
        println!(
            "  applied  {}  ({})",
            entry.version,
            entry.applied_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    for version in &status.pending {
        println!("  pending  {}", version);
    }
    if status.applied.is_empty() && status.pending.is_empty() {
        println!("  no migrations in the catalog");
    }
    Ok(0)
}
