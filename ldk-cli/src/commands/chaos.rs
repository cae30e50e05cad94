use anyhow::Result;
use colored::Colorize;
use serde_json::{json, Value};

use super::client::ManagementClient;

/// `ldk chaos get` — `GET /_ldk/chaos`, every service's current config.
pub async fn get(endpoint: &str) -> Result<()> {
    let client = ManagementClient::new(endpoint);
    let cfg = client.get("/_ldk/chaos").await?;
    print_configs(&cfg);
    Ok(())
}

/// `ldk chaos set` — `POST /_ldk/chaos`, a merge-patch onto one service.
#[allow(clippy::too_many_arguments)]
pub async fn set(
    endpoint: &str,
    service: &str,
    enabled: Option<bool>,
    error_rate: Option<f64>,
    latency_min_ms: Option<u64>,
    latency_max_ms: Option<u64>,
    timeout_rate: Option<f64>,
    connection_reset_rate: Option<f64>,
) -> Result<()> {
    let client = ManagementClient::new(endpoint);
    let mut patch = json!({ "service": service });
    let obj = patch.as_object_mut().unwrap();
    if let Some(v) = enabled {
        obj.insert("enabled".into(), json!(v));
    }
    if let Some(v) = error_rate {
        obj.insert("error_rate".into(), json!(v));
    }
    if let Some(v) = latency_min_ms {
        obj.insert("latency_min_ms".into(), json!(v));
    }
    if let Some(v) = latency_max_ms {
        obj.insert("latency_max_ms".into(), json!(v));
    }
    if let Some(v) = timeout_rate {
        obj.insert("timeout_rate".into(), json!(v));
    }
    if let Some(v) = connection_reset_rate {
        obj.insert("connection_reset_rate".into(), json!(v));
    }
    client.post("/_ldk/chaos", &patch).await?;
    println!("{} chaos config for {}", "updated".green(), service.bold());
    Ok(())
}

fn print_configs(cfg: &Value) {
    let Some(obj) = cfg.as_object() else { return };
    for (service, settings) in obj {
        println!("{}:", service.bold());
        println!("  {}", serde_json::to_string_pretty(settings).unwrap_or_default().replace('\n', "\n  "));
    }
}
