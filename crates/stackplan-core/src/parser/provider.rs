//! provider ノードのパース

use super::first_string;
use crate::error::{Result, StackError};
use crate::model::ProviderConfig;
use kdl::KdlNode;

/// provider ノードをパース
pub fn parse_provider(node: &KdlNode) -> Result<ProviderConfig> {
    let name = first_string(node)
        .ok_or_else(|| StackError::InvalidConfig("provider requires a name".to_string()))?;

    let mut provider = ProviderConfig {
        name,
        ..Default::default()
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "region" => {
                    provider.region = first_string(child);
                }
                // 追加設定はconfigに保存
                other => {
                    if let Some(value) = first_string(child) {
                        provider.config.insert(other.to_string(), value);
                    }
                }
            }
        }
    }

    Ok(provider)
}
