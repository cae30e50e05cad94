use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use super::client::ManagementClient;

/// `ldk reset` — `POST /_ldk/reset`. Drops every provider's in-memory data;
/// identities and permissions survive (spec §4.14's carve-out).
pub async fn run(endpoint: &str) -> Result<()> {
    let client = ManagementClient::new(endpoint);
    client.post("/_ldk/reset", &json!({})).await?;
    println!("{}", "fleet state reset".green());
    Ok(())
}
