use anyhow::Result;
use colored::Colorize;
use serde_json::{json, Value};

use super::client::ManagementClient;

/// `ldk iam-auth get` — `GET /_ldk/iam-auth`.
pub async fn get(endpoint: &str) -> Result<()> {
    let client = ManagementClient::new(endpoint);
    let cfg = client.get("/_ldk/iam-auth").await?;
    print_config(&cfg);
    Ok(())
}

/// `ldk iam-auth set` — `POST /_ldk/iam-auth`, a merge-patch.
pub async fn set(
    endpoint: &str,
    mode: Option<String>,
    default_identity: Option<String>,
    enable_service: Option<String>,
    disable_service: Option<String>,
) -> Result<()> {
    let client = ManagementClient::new(endpoint);
    let mut patch = json!({});
    let obj = patch.as_object_mut().unwrap();
    if let Some(v) = mode {
        obj.insert("mode".into(), json!(v));
    }
    if let Some(v) = default_identity {
        obj.insert("default_identity".into(), json!(v));
    }
    if let Some(v) = enable_service {
        obj.insert("enable_service".into(), json!(v));
    }
    if let Some(v) = disable_service {
        obj.insert("disable_service".into(), json!(v));
    }
    let cfg = client.post("/_ldk/iam-auth", &patch).await?;
    println!("{}", "updated".green());
    print_config(&cfg);
    Ok(())
}

fn print_config(cfg: &Value) {
    println!("{}", serde_json::to_string_pretty(cfg).unwrap_or_default());
}
