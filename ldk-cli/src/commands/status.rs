use anyhow::Result;
use colored::Colorize;

use super::client::ManagementClient;

/// `ldk status` — `GET /_ldk/status`.
pub async fn run(endpoint: &str) -> Result<()> {
    let client = ManagementClient::new(endpoint);
    let status = client.get("/_ldk/status").await?;

    let running = status.get("running").and_then(|v| v.as_bool()).unwrap_or(false);
    println!("fleet: {}", if running { "running".green() } else { "degraded".red() });

    if let Some(services) = status.get("services").and_then(|v| v.as_object()) {
        for (name, info) in services {
            let port = info.get("port").and_then(|v| v.as_u64()).unwrap_or_default();
            let healthy = info.get("healthy").and_then(|v| v.as_bool()).unwrap_or(false);
            let mark = if healthy { "ok".green() } else { "down".red() };
            println!("  {name:<20} port {port:<6} {mark}");
        }
    }
    Ok(())
}
