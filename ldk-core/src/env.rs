//! Environment variable synthesis for compute invocations (spec §4.5, §6),
//! grounded on the original `ldk.runtime.env_builder` / `ecs.discovery`
//! behavior: merge function-level vars, resolve CloudFormation-shaped
//! references, and inject SDK endpoint redirection plus Lambda runtime
//! variables.

use std::collections::BTreeMap;

use crate::registry::ServiceRegistry;

/// AWS region every fleet component pretends to run in.
pub const FLEET_REGION: &str = "us-east-1";

/// Resolve a single environment value against a name→value registry.
///
/// Handles two placeholder shapes, matching the original CloudFormation
/// reference resolver: a direct key match, and a JSON-encoded `{"Ref":
/// "Name"}` intrinsic. Unresolved references pass through unchanged.
pub fn resolve_ref(value: &str, resolved_refs: &BTreeMap<String, String>) -> String {
    if let Some(resolved) = resolved_refs.get(value) {
        return resolved.clone();
    }
    if let Ok(serde_json::Value::Object(obj)) = serde_json::from_str::<serde_json::Value>(value) {
        if let Some(serde_json::Value::String(ref_name)) = obj.get("Ref") {
            if let Some(resolved) = resolved_refs.get(ref_name) {
                return resolved.clone();
            }
        }
    }
    value.to_string()
}

/// Build the full environment for a compute invocation: the function's own
/// vars (with references resolved), SDK endpoint redirection vars for every
/// registered service, and standard Lambda runtime variables (spec §6).
pub fn build_compute_env(
    function_name: &str,
    function_env: &BTreeMap<String, String>,
    registry: &ServiceRegistry,
    fleet_port: u16,
    resolved_refs: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();

    for (key, value) in function_env {
        env.insert(key.clone(), resolve_ref(value, resolved_refs));
    }

    for endpoint in registry.all_endpoints() {
        let key = format!(
            "{}_ENDPOINT_URL",
            endpoint.service_name.to_uppercase().replace('-', "_")
        );
        env.insert(key, endpoint.url());
    }
    env.insert(
        "AWS_ENDPOINT_URL".to_string(),
        format!("http://localhost:{fleet_port}"),
    );

    env.extend(registry.build_ecs_env_vars("LWS_ECS_"));

    env.insert("AWS_LAMBDA_FUNCTION_NAME".to_string(), function_name.to_string());
    env.insert("AWS_LAMBDA_FUNCTION_VERSION".to_string(), "$LATEST".to_string());
    env.insert("AWS_LAMBDA_FUNCTION_MEMORY_SIZE".to_string(), "128".to_string());
    env.insert("AWS_REGION".to_string(), FLEET_REGION.to_string());
    env.insert("AWS_DEFAULT_REGION".to_string(), FLEET_REGION.to_string());

    env
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ServiceEndpoint;

    #[test]
    fn direct_ref_resolves() {
        let mut refs = BTreeMap::new();
        refs.insert("MyTablePlaceholder".to_string(), "orders-table".to_string());
        assert_eq!(resolve_ref("MyTablePlaceholder", &refs), "orders-table");
    }

    #[test]
    fn json_ref_resolves() {
        let mut refs = BTreeMap::new();
        refs.insert("MyTable".to_string(), "orders-table".to_string());
        assert_eq!(
            resolve_ref(r#"{"Ref": "MyTable"}"#, &refs),
            "orders-table"
        );
    }

    #[test]
    fn unresolved_ref_passes_through() {
        let refs = BTreeMap::new();
        assert_eq!(resolve_ref("plain-value", &refs), "plain-value");
    }

    #[test]
    fn compute_env_includes_runtime_and_endpoint_vars() {
        let registry = ServiceRegistry::new();
        registry.register(ServiceEndpoint::new("dynamodb", "localhost", 4001));
        let env = build_compute_env(
            "my-fn",
            &BTreeMap::new(),
            &registry,
            4000,
            &BTreeMap::new(),
        );
        assert_eq!(env.get("AWS_LAMBDA_FUNCTION_NAME").unwrap(), "my-fn");
        assert_eq!(env.get("AWS_REGION").unwrap(), FLEET_REGION);
        assert_eq!(
            env.get("DYNAMODB_ENDPOINT_URL").unwrap(),
            "http://localhost:4001"
        );
        assert_eq!(env.get("AWS_ENDPOINT_URL").unwrap(), "http://localhost:4000");
    }
}
