//! # Access Engine Demo
//!
//! Loads the demo organization, prints the access matrix, two explanations
//! and a few checks, then changes a membership and rebuilds.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG` - Log level (default: info)
//! - `ACCESS_CACHE_ENABLED` - Decision cache on/off (default: true)
//! - `ACCESS_CACHE_SIZE` - Decision cache capacity (default: 10000)
//! - `ACCESS_METRICS_ENABLED` - Metrics on/off (default: true)
//! - `ACCESS_DANGLING_POLICY` - `skip` or `reject` (default: skip)

use anyhow::Context;
use std::sync::Arc;
use tiered_authz::{fixture, AccessEngine, EngineConfig, MembershipRecord, ResourceId, SubjectId};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn banner(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{}", title);
    println!("{}", "=".repeat(60));
}

fn print_check(
    engine: &AccessEngine,
    label: &str,
    subject: SubjectId,
    resource: ResourceId,
) -> anyhow::Result<()> {
    let decision = engine
        .check(subject, resource)
        .with_context(|| format!("check {}", label))?;
    println!(
        "{:<28} {:<8} {}",
        label,
        if decision.allowed() { "GRANTED" } else { "DENIED" },
        decision.summary()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting access demo v{}", tiered_authz::VERSION);

    let config = EngineConfig::from_env();
    let source = Arc::new(fixture::source());
    let engine = AccessEngine::new(config, source.clone())
        .await
        .context("initial snapshot build failed")?;

    banner("ACCESS MATRIX");
    for row in engine.access_matrix()? {
        let names: Vec<&str> = row.accessible.iter().map(|r| r.name.as_str()).collect();
        let doors = if names.is_empty() {
            "None".to_string()
        } else {
            names.join(", ")
        };
        println!("{:<16} {}", row.name, doors);
    }

    banner("EXPLANATION: Max Mustermann (Entwicklung)");
    println!("{}", serde_json::to_string_pretty(&engine.explain(fixture::MAX)?)?);

    banner("EXPLANATION: Tom Hardware (Hardware-Entwicklung)");
    println!("{}", serde_json::to_string_pretty(&engine.explain(fixture::TOM)?)?);

    banner("ACCESS CHECKS");
    print_check(&engine, "Max -> Kaffeeküche", fixture::MAX, fixture::KAFFEEKUECHE)?;
    print_check(&engine, "Max -> Serverraum", fixture::MAX, fixture::SERVERRAUM)?;
    print_check(&engine, "Lisa -> Serverraum", fixture::LISA, fixture::SERVERRAUM)?;
    print_check(&engine, "Tom -> Hardware-Labor", fixture::TOM, fixture::HARDWARE_LABOR)?;
    print_check(&engine, "Tom -> Abstellraum", fixture::TOM, fixture::ABSTELLRAUM)?;

    banner("MUTATION: Max moves to Hardware-Entwicklung");
    source
        .remove_membership(MembershipRecord::new(fixture::MAX, fixture::ENTWICKLUNG))
        .await;
    source
        .assign_membership(MembershipRecord::new(fixture::MAX, fixture::HARDWARE_ENTWICKLUNG))
        .await;
    print_check(&engine, "Max -> Hardware-Labor (old)", fixture::MAX, fixture::HARDWARE_LABOR)?;
    let generation = engine.rebuild().await.context("rebuild failed")?;
    println!("Published generation {}", generation);
    print_check(&engine, "Max -> Hardware-Labor (new)", fixture::MAX, fixture::HARDWARE_LABOR)?;

    banner("STATISTICS");
    println!("{}", serde_json::to_string_pretty(&engine.stats())?);
    if let Some(metrics) = engine.export_prometheus() {
        println!("\n{}", metrics);
    }

    Ok(())
}
