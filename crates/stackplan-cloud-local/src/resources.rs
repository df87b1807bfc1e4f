//! Synthetic identifiers and computed outputs

use crate::error::{LocalError, Result};
use serde_json::{Map, Value, json};
use stackplan_cloud::ProviderState;
use stackplan_core::{Ipv4Cidr, ResourceKey, ResourceKind};
use std::collections::HashSet;
use std::net::Ipv4Addr;

/// Account used in generated ARNs
pub const ACCOUNT_ID: &str = "000000000000";

/// Attributes assigned by the provider rather than declared
pub const COMPUTED_ATTRIBUTES: [&str; 4] = ["id", "arn", "dns_name", "ip_address"];

/// Addresses reserved at the start of every subnet
const RESERVED_HOSTS: u32 = 4;

fn id_prefix(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Network => "vpc",
        ResourceKind::Subnet => "subnet",
        ResourceKind::AccessGroup => "sg",
        ResourceKind::AccessRule => "sgr",
        ResourceKind::FileSystem => "fs",
        ResourceKind::MountTarget => "fsmt",
        ResourceKind::LoadBalancer => "net",
        ResourceKind::Listener => "listener",
        ResourceKind::Cluster => "cluster",
        ResourceKind::Service => "svc",
    }
}

fn arn_service(kind: ResourceKind) -> Option<&'static str> {
    match kind {
        ResourceKind::Network | ResourceKind::Subnet | ResourceKind::AccessGroup => Some("ec2"),
        ResourceKind::FileSystem => Some("elasticfilesystem"),
        ResourceKind::LoadBalancer | ResourceKind::Listener => Some("elasticloadbalancing"),
        ResourceKind::Cluster | ResourceKind::Service => Some("ecs"),
        ResourceKind::AccessRule | ResourceKind::MountTarget => None,
    }
}

fn random_hex(len: usize) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    hex[..len].to_string()
}

/// New provider id, `<prefix>-<17 hex>`
pub fn new_id(kind: ResourceKind) -> String {
    format!("{}-{}", id_prefix(kind), random_hex(17))
}

/// Attributes a freshly created resource exposes besides its inputs
pub fn computed_outputs(
    key: &ResourceKey,
    region: &str,
    id: &str,
    inputs: &Value,
    current: &ProviderState,
) -> Result<Map<String, Value>> {
    let mut outputs = Map::new();
    outputs.insert("id".to_string(), json!(id));

    if let Some(service) = arn_service(key.kind) {
        outputs.insert(
            "arn".to_string(),
            json!(format!(
                "arn:aws:{}:{}:{}:{}/{}",
                service, region, ACCOUNT_ID, key.kind, id
            )),
        );
    }

    match key.kind {
        ResourceKind::FileSystem => {
            outputs.insert(
                "dns_name".to_string(),
                json!(format!("{}.efs.{}.amazonaws.com", id, region)),
            );
        }
        ResourceKind::LoadBalancer => {
            outputs.insert(
                "dns_name".to_string(),
                json!(format!(
                    "{}-{}.elb.{}.amazonaws.com",
                    key.name,
                    random_hex(8),
                    region
                )),
            );
        }
        ResourceKind::MountTarget => {
            let ip = mount_target_address(key, inputs, current)?;
            outputs.insert("ip_address".to_string(), json!(ip.to_string()));
        }
        _ => {}
    }

    Ok(outputs)
}

/// First free address in the mount target's subnet
fn mount_target_address(
    key: &ResourceKey,
    inputs: &Value,
    current: &ProviderState,
) -> Result<Ipv4Addr> {
    let subnet_id = inputs
        .get("subnet_id")
        .and_then(Value::as_str)
        .ok_or_else(|| LocalError::MissingInput {
            resource: key.to_string(),
            input: "subnet_id".to_string(),
        })?;
    let block = subnet_block(subnet_id, current)?;

    let taken: HashSet<String> = current
        .iter()
        .map(|(_, r)| r)
        .filter(|r| r.resource_type == ResourceKind::MountTarget.as_str())
        .filter_map(|r| r.get_attribute::<String>("ip_address"))
        .collect();

    // the last address is the broadcast address
    let last = block.size().saturating_sub(1).min(u64::from(u32::MAX)) as u32;
    (RESERVED_HOSTS..last)
        .filter_map(|offset| block.host(offset))
        .find(|ip| !taken.contains(&ip.to_string()))
        .ok_or_else(|| LocalError::AddressExhausted(block.to_string()))
}

fn subnet_block(subnet_id: &str, current: &ProviderState) -> Result<Ipv4Cidr> {
    let subnet = current
        .iter()
        .map(|(_, r)| r)
        .find(|r| r.resource_type == ResourceKind::Subnet.as_str() && r.id == subnet_id)
        .ok_or_else(|| LocalError::SubnetNotFound(subnet_id.to_string()))?;

    let block = subnet
        .get_attribute::<String>("cidr_block")
        .ok_or_else(|| LocalError::MissingInput {
            resource: format!("subnet:{}", subnet_id),
            input: "cidr_block".to_string(),
        })?
        .parse()?;
    Ok(block)
}

/// Move mount targets whose address is no longer inside their subnet
///
/// Called after a subnet's block changed. Returns the moved mount targets.
pub fn readdress_mount_targets(
    subnet_id: &str,
    current: &mut ProviderState,
) -> Result<Vec<ResourceKey>> {
    let block = subnet_block(subnet_id, current)?;
    let mut moved = Vec::new();

    for key in current.keys() {
        let Some(target) = current.get(&key) else {
            continue;
        };
        if key.kind != ResourceKind::MountTarget
            || target.get_attribute::<String>("subnet_id").as_deref() != Some(subnet_id)
        {
            continue;
        }
        let inside = target
            .get_attribute::<String>("ip_address")
            .and_then(|ip| ip.parse::<Ipv4Addr>().ok())
            .is_some_and(|ip| block.contains_addr(ip));
        if inside {
            continue;
        }

        // release the stale address before picking a new one
        let mut target = target.clone();
        target.attributes.remove("ip_address");
        current.add(&key, target.clone());

        let ip = mount_target_address(&key, &target.inputs, current)?;
        target
            .attributes
            .insert("ip_address".to_string(), json!(ip.to_string()));
        target.updated_at = chrono::Utc::now();
        current.add(&key, target);
        moved.push(key);
    }

    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackplan_cloud::ResourceState;

    fn subnet_state() -> ProviderState {
        let mut state = ProviderState::new();
        state.add(
            &ResourceKey::new(ResourceKind::Subnet, "vpc-public-1"),
            ResourceState::new("subnet-1", "subnet")
                .with_attribute("cidr_block", json!("10.0.0.0/19")),
        );
        state
    }

    #[test]
    fn test_new_id_format() {
        let id = new_id(ResourceKind::Network);
        assert!(id.starts_with("vpc-"));
        assert_eq!(id.len(), "vpc-".len() + 17);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_id(ResourceKind::Network));
    }

    #[test]
    fn test_arn_and_dns_name() {
        let key = ResourceKey::new(ResourceKind::FileSystem, "mongo-efs");
        let outputs =
            computed_outputs(&key, "us-east-1", "fs-1", &json!({}), &ProviderState::new()).unwrap();

        assert_eq!(outputs["id"], json!("fs-1"));
        assert_eq!(
            outputs["arn"],
            json!("arn:aws:elasticfilesystem:us-east-1:000000000000:file-system/fs-1")
        );
        assert_eq!(outputs["dns_name"], json!("fs-1.efs.us-east-1.amazonaws.com"));
    }

    #[test]
    fn test_load_balancer_dns_name() {
        let key = ResourceKey::new(ResourceKind::LoadBalancer, "mongo-service");
        let state = ProviderState::new();
        let outputs = computed_outputs(&key, "eu-west-1", "net-1", &json!({}), &state).unwrap();

        let dns = outputs["dns_name"].as_str().unwrap();
        assert!(dns.starts_with("mongo-service-"));
        assert!(dns.ends_with(".elb.eu-west-1.amazonaws.com"));
    }

    #[test]
    fn test_access_rule_has_no_arn() {
        let key = ResourceKey::new(ResourceKind::AccessRule, "sg-nfs-access");
        let state = ProviderState::new();
        let outputs = computed_outputs(&key, "us-east-1", "sgr-1", &json!({}), &state).unwrap();
        assert!(!outputs.contains_key("arn"));
    }

    #[test]
    fn test_mount_target_address_inside_subnet() {
        let mut state = subnet_state();
        let key = ResourceKey::new(ResourceKind::MountTarget, "mt-1");
        let inputs = json!({"subnet_id": "subnet-1"});

        let outputs = computed_outputs(&key, "us-east-1", "fsmt-1", &inputs, &state).unwrap();
        assert_eq!(outputs["ip_address"], json!("10.0.0.4"));

        state.add(
            &key,
            ResourceState::new("fsmt-1", "mount-target")
                .with_attribute("ip_address", json!("10.0.0.4")),
        );
        let second = ResourceKey::new(ResourceKind::MountTarget, "mt-2");
        let outputs = computed_outputs(&second, "us-east-1", "fsmt-2", &inputs, &state).unwrap();
        assert_eq!(outputs["ip_address"], json!("10.0.0.5"));
    }

    #[test]
    fn test_mount_target_unknown_subnet() {
        let key = ResourceKey::new(ResourceKind::MountTarget, "mt-1");
        let result = computed_outputs(
            &key,
            "us-east-1",
            "fsmt-1",
            &json!({"subnet_id": "subnet-missing"}),
            &subnet_state(),
        );
        assert!(matches!(result, Err(LocalError::SubnetNotFound(_))));
    }

    #[test]
    fn test_readdress_mount_targets_after_subnet_change() {
        let mut state = subnet_state();
        let key = ResourceKey::new(ResourceKind::MountTarget, "mt-1");
        state.add(
            &key,
            ResourceState::new("fsmt-1", "mount-target")
                .with_inputs(json!({"subnet_id": "subnet-1"}), vec![])
                .with_attribute("subnet_id", json!("subnet-1"))
                .with_attribute("ip_address", json!("10.0.0.4")),
        );

        // unchanged block keeps the address
        assert!(readdress_mount_targets("subnet-1", &mut state).unwrap().is_empty());

        let subnet_key = ResourceKey::new(ResourceKind::Subnet, "vpc-public-1");
        let subnet = state
            .get(&subnet_key)
            .unwrap()
            .clone()
            .with_attribute("cidr_block", json!("172.16.0.0/19"));
        state.add(&subnet_key, subnet);

        let moved = readdress_mount_targets("subnet-1", &mut state).unwrap();
        assert_eq!(moved, vec![key.clone()]);
        assert_eq!(
            state.get(&key).unwrap().attributes["ip_address"],
            json!("172.16.0.4")
        );
    }
}
