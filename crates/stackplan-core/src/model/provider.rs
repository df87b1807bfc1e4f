//! プロバイダー設定

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// デフォルトのプロバイダー名
pub const DEFAULT_PROVIDER: &str = "local";

/// クラウドプロバイダー設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// プロバイダー名（local など）
    pub name: String,

    /// リージョン（us-east-1 など）。未指定時はスタックのリージョン
    pub region: Option<String>,

    /// 追加設定（プロバイダー固有）
    pub config: HashMap<String, String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROVIDER.to_string(),
            region: None,
            config: HashMap::new(),
        }
    }
}
