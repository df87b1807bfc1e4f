//! stack ノードのパース

use super::{first_integer, first_string, required_string};
use crate::error::Result;
use crate::manifest::StackParams;
use kdl::KdlNode;

/// stack ノードをパースしてパラメータを上書き
pub fn parse_stack(node: &KdlNode, params: &mut StackParams) -> Result<()> {
    if let Some(name) = first_string(node) {
        params.service_name = name;
    }

    let Some(children) = node.children() else {
        return Ok(());
    };

    for child in children.nodes() {
        match child.name().value() {
            "network-cidr" | "network_cidr" | "cidr" => {
                params.network_cidr = required_string(child)?.parse()?;
            }
            "availability-zones" | "availability_zones" | "zones" => {
                params.availability_zones = first_integer(child)?;
            }
            "region" => {
                params.region = required_string(child)?;
            }
            "database-port" | "database_port" => {
                params.database_port = first_integer(child)?;
            }
            "storage-port" | "storage_port" => {
                params.storage_port = first_integer(child)?;
            }
            "image" => {
                params.image = required_string(child)?;
            }
            "memory" => {
                params.memory = first_integer(child)?;
            }
            "desired-count" | "desired_count" | "replicas" => {
                params.desired_count = first_integer(child)?;
            }
            "container-path" | "container_path" => {
                params.container_path = required_string(child)?;
            }
            other => {
                tracing::debug!("Ignoring unknown stack setting: {}", other);
            }
        }
    }

    Ok(())
}
