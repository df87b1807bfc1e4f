//! リソースの識別子と出力参照
//!
//! あるリソースの出力（IDやDNS名など）を別のリソースの入力として使うための型。
//! 参照はグラフの依存関係の元になります。

use crate::error::{Result, StackError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// 未確定の値を表示するときの文字列
pub const UNKNOWN_VALUE: &str = "(known after apply)";

/// リソースの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Network,
    Subnet,
    AccessGroup,
    AccessRule,
    FileSystem,
    MountTarget,
    LoadBalancer,
    Listener,
    Cluster,
    Service,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 10] = [
        ResourceKind::Network,
        ResourceKind::Subnet,
        ResourceKind::AccessGroup,
        ResourceKind::AccessRule,
        ResourceKind::FileSystem,
        ResourceKind::MountTarget,
        ResourceKind::LoadBalancer,
        ResourceKind::Listener,
        ResourceKind::Cluster,
        ResourceKind::Service,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Network => "network",
            ResourceKind::Subnet => "subnet",
            ResourceKind::AccessGroup => "access-group",
            ResourceKind::AccessRule => "access-rule",
            ResourceKind::FileSystem => "file-system",
            ResourceKind::MountTarget => "mount-target",
            ResourceKind::LoadBalancer => "load-balancer",
            ResourceKind::Listener => "listener",
            ResourceKind::Cluster => "cluster",
            ResourceKind::Service => "service",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// グラフ内でリソースを一意に識別するキー (kind:name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceKey {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// "kind:name" 形式の文字列をパース
    pub fn parse(s: &str) -> Option<Self> {
        let (kind, name) = s.split_once(':')?;
        if name.is_empty() {
            return None;
        }
        Some(Self::new(ResourceKind::parse(kind)?, name))
    }

    /// 出力属性への参照を作成
    pub fn output(&self, attribute: impl Into<String>) -> Input {
        Input::Ref(OutputRef {
            key: self.clone(),
            attribute: attribute.into(),
            index: None,
        })
    }

    pub fn id(&self) -> Input {
        self.output("id")
    }

    pub fn arn(&self) -> Input {
        self.output("arn")
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// 他リソースの出力属性への参照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRef {
    pub key: ResourceKey,
    pub attribute: String,
    /// リスト出力の要素を選択する場合のインデックス
    pub index: Option<usize>,
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.key, self.attribute)?;
        if let Some(index) = self.index {
            write!(f, "[{}]", index)?;
        }
        Ok(())
    }
}

/// リソースの入力値
///
/// リテラル値、リスト、マップ、他リソースの出力参照の木構造。
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Value(Value),
    List(Vec<Input>),
    Map(BTreeMap<String, Input>),
    Ref(OutputRef),
}

/// 入力値を解決した結果
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub value: Value,
    /// すべての参照が確定値に解決できたか
    pub complete: bool,
}

impl Input {
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Input)>,
    {
        Input::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// 静的なインデックス指定
    ///
    /// リテラルのリストなら該当要素を返し、参照なら要素を選ぶ参照に変換します。
    pub fn at(&self, index: usize) -> Result<Input> {
        match self {
            Input::List(items) => items.get(index).cloned().ok_or(StackError::IndexOutOfRange {
                index,
                len: items.len(),
            }),
            Input::Value(Value::Array(items)) => items
                .get(index)
                .cloned()
                .map(Input::Value)
                .ok_or(StackError::IndexOutOfRange {
                    index,
                    len: items.len(),
                }),
            Input::Ref(r) if r.index.is_none() => Ok(Input::Ref(OutputRef {
                index: Some(index),
                ..r.clone()
            })),
            other => Err(StackError::InvalidConfig(format!(
                "インデックス指定できない値です: {:?}",
                other
            ))),
        }
    }

    /// 入力に含まれる参照をすべて列挙
    pub fn references(&self) -> Vec<&OutputRef> {
        let mut refs = Vec::new();
        self.collect_refs(&mut refs);
        refs
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a OutputRef>) {
        match self {
            Input::Value(_) => {}
            Input::List(items) => items.iter().for_each(|i| i.collect_refs(out)),
            Input::Map(entries) => entries.values().for_each(|i| i.collect_refs(out)),
            Input::Ref(r) => out.push(r),
        }
    }

    /// 参照を `lookup` で解決してJSON値に変換
    ///
    /// 解決できない参照は [`UNKNOWN_VALUE`] として埋め込み、`complete` を false にします。
    pub fn resolve<F>(&self, lookup: &F) -> Resolution
    where
        F: Fn(&OutputRef) -> Option<Value>,
    {
        let mut complete = true;
        let value = self.resolve_inner(lookup, &mut complete);
        Resolution { value, complete }
    }

    fn resolve_inner<F>(&self, lookup: &F, complete: &mut bool) -> Value
    where
        F: Fn(&OutputRef) -> Option<Value>,
    {
        match self {
            Input::Value(v) => v.clone(),
            Input::List(items) => Value::Array(
                items
                    .iter()
                    .map(|i| i.resolve_inner(lookup, complete))
                    .collect(),
            ),
            Input::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, i)| (k.clone(), i.resolve_inner(lookup, complete)))
                    .collect(),
            ),
            Input::Ref(r) => match lookup(r) {
                Some(v) => v,
                None => {
                    *complete = false;
                    Value::String(UNKNOWN_VALUE.to_string())
                }
            },
        }
    }

    /// リテラル値ならその値を返す
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Input::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_output_ref(&self) -> Option<&OutputRef> {
        match self {
            Input::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Input]> {
        match self {
            Input::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Input> {
        match self {
            Input::Map(entries) => entries.get(key),
            _ => None,
        }
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Value(value)
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Input::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Input::Value(Value::String(value))
    }
}

impl From<u16> for Input {
    fn from(value: u16) -> Self {
        Input::Value(Value::from(value))
    }
}

impl From<u32> for Input {
    fn from(value: u32) -> Self {
        Input::Value(Value::from(value))
    }
}

impl From<bool> for Input {
    fn from(value: bool) -> Self {
        Input::Value(Value::Bool(value))
    }
}

impl From<Vec<Input>> for Input {
    fn from(value: Vec<Input>) -> Self {
        Input::List(value)
    }
}

/// 参照先の属性値から、インデックス指定を考慮して値を取り出す
pub fn select_attribute(value: Option<&Value>, index: Option<usize>) -> Option<Value> {
    let value = value?;
    match index {
        None => Some(value.clone()),
        Some(i) => value.as_array().and_then(|items| items.get(i)).cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subnet(name: &str) -> ResourceKey {
        ResourceKey::new(ResourceKind::Subnet, name)
    }

    #[test]
    fn test_key_display_and_parse() {
        let key = ResourceKey::new(ResourceKind::MountTarget, "mongo-publicMountTarget-1");
        assert_eq!(key.to_string(), "mount-target:mongo-publicMountTarget-1");
        assert_eq!(ResourceKey::parse(&key.to_string()), Some(key));
        assert_eq!(ResourceKey::parse("bogus:x"), None);
        assert_eq!(ResourceKey::parse("subnet:"), None);
    }

    #[test]
    fn test_static_index_on_list() {
        let list = Input::List(vec![subnet("a").id(), subnet("b").id()]);
        assert_eq!(list.at(1).unwrap(), subnet("b").id());
        assert!(matches!(
            list.at(2),
            Err(StackError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_static_index_on_ref() {
        let list = ResourceKey::new(ResourceKind::Network, "vpc").output("subnet_ids");
        let first = list.at(0).unwrap();
        let r = first.as_output_ref().unwrap();
        assert_eq!(r.index, Some(0));
        assert_eq!(r.to_string(), "network:vpc.subnet_ids[0]");
        assert!(first.at(0).is_err());
    }

    #[test]
    fn test_resolve_complete_and_unknown() {
        let input = Input::map([
            ("subnet_id", subnet("a").id()),
            ("port", Input::from(2049u16)),
            ("groups", Input::List(vec![subnet("b").id()])),
        ]);
        assert_eq!(input.references().len(), 2);

        let all = input.resolve(&|r: &OutputRef| Some(json!(format!("id-{}", r.key.name))));
        assert!(all.complete);
        assert_eq!(
            all.value,
            json!({"subnet_id": "id-a", "port": 2049, "groups": ["id-b"]})
        );

        let partial = input.resolve(&|r: &OutputRef| {
            (r.key.name == "a").then(|| json!("id-a"))
        });
        assert!(!partial.complete);
        assert_eq!(partial.value["groups"][0], json!(UNKNOWN_VALUE));
    }

    #[test]
    fn test_select_attribute() {
        let list = json!(["x", "y"]);
        assert_eq!(select_attribute(Some(&list), Some(1)), Some(json!("y")));
        assert_eq!(select_attribute(Some(&list), Some(5)), None);
        assert_eq!(select_attribute(Some(&list), None), Some(list.clone()));
        assert_eq!(select_attribute(None, None), None);
    }
}
