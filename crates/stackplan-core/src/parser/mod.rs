//! KDLパーサー
//!
//! スタックのパラメータファイル（stack.kdl）をパースします。
//!
//! ```kdl
//! stack "mongo" {
//!     network-cidr "10.0.0.0/16"
//!     desired-count 3
//! }
//!
//! provider "local" {
//!     region "ap-northeast-1"
//! }
//! ```

mod provider;
mod stack;

use provider::parse_provider;
use stack::parse_stack;

use crate::error::{Result, StackError};
use crate::manifest::StackConfig;
use kdl::{KdlDocument, KdlNode};
use std::fs;
use std::path::Path;

/// KDLファイルをパースしてStackConfigを生成
pub fn parse_stack_file<P: AsRef<Path>>(path: P) -> Result<StackConfig> {
    let content = fs::read_to_string(path.as_ref())?;
    tracing::debug!("Parsing stack file: {}", path.as_ref().display());
    parse_stack_string(&content)
}

/// KDL文字列をパース
pub fn parse_stack_string(content: &str) -> Result<StackConfig> {
    let doc: KdlDocument = content.parse()?;
    let mut config = StackConfig::default();

    for node in doc.nodes() {
        match node.name().value() {
            "stack" => parse_stack(node, &mut config.params)?,
            "provider" => config.provider = parse_provider(node)?,
            other => {
                tracing::debug!("Ignoring unknown node: {}", other);
            }
        }
    }

    config.params.validate()?;
    Ok(config)
}

/// 最初の引数を文字列として取得
pub(crate) fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// 最初の引数を整数として取得（範囲外はエラー）
pub(crate) fn first_integer<T: TryFrom<i128>>(node: &KdlNode) -> Result<T> {
    let name = node.name().value();
    let value = node
        .entries()
        .first()
        .and_then(|e| e.value().as_integer())
        .ok_or_else(|| StackError::InvalidConfig(format!("{} には整数が必要です", name)))?;
    T::try_from(value)
        .map_err(|_| StackError::InvalidConfig(format!("{} の値が範囲外です: {}", name, value)))
}

/// 最初の引数を必須の文字列として取得
pub(crate) fn required_string(node: &KdlNode) -> Result<String> {
    first_string(node).ok_or_else(|| {
        StackError::InvalidConfig(format!("{} には文字列が必要です", node.name().value()))
    })
}

#[cfg(test)]
mod tests;
