//! リソースグラフ
//!
//! 宣言されたリソースと、出力参照から導かれる依存関係を保持します。

use crate::error::{Result, StackError};
use crate::reference::{Input, ResourceKey, ResourceKind};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// 宣言された1つのリソース
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDecl {
    pub key: ResourceKey,
    pub inputs: BTreeMap<String, Input>,
}

impl ResourceDecl {
    pub fn input(&self, name: &str) -> Option<&Input> {
        self.inputs.get(name)
    }

    /// 入力が参照しているリソースのキー（重複なし、出現順）
    pub fn dependencies(&self) -> Vec<ResourceKey> {
        let mut deps: Vec<ResourceKey> = Vec::new();
        for input in self.inputs.values() {
            for r in input.references() {
                if !deps.contains(&r.key) {
                    deps.push(r.key.clone());
                }
            }
        }
        deps
    }
}

/// リソース宣言の集合とスタック出力
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    resources: Vec<ResourceDecl>,
    index: HashMap<ResourceKey, usize>,
    outputs: BTreeMap<String, Input>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// リソースを宣言する（同じ kind:name の二重宣言はエラー）
    pub fn declare<K, I>(
        &mut self,
        kind: ResourceKind,
        name: impl Into<String>,
        inputs: I,
    ) -> Result<ResourceKey>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Input)>,
    {
        let key = ResourceKey::new(kind, name);
        if self.index.contains_key(&key) {
            return Err(StackError::DuplicateResource(key.to_string()));
        }

        let inputs = inputs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.index.insert(key.clone(), self.resources.len());
        self.resources.push(ResourceDecl {
            key: key.clone(),
            inputs,
        });
        tracing::debug!("Declared {}", key);
        Ok(key)
    }

    /// スタック出力を登録
    pub fn export(&mut self, name: impl Into<String>, value: Input) {
        self.outputs.insert(name.into(), value);
    }

    pub fn outputs(&self) -> &BTreeMap<String, Input> {
        &self.outputs
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&ResourceDecl> {
        self.index.get(key).map(|&i| &self.resources[i])
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.index.contains_key(key)
    }

    /// 宣言順にイテレート
    pub fn iter(&self) -> impl Iterator<Item = &ResourceDecl> {
        self.resources.iter()
    }

    pub fn by_kind(&self, kind: ResourceKind) -> Vec<&ResourceDecl> {
        self.resources.iter().filter(|r| r.key.kind == kind).collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// `key` を参照しているリソース
    pub fn dependents(&self, key: &ResourceKey) -> Vec<&ResourceDecl> {
        self.resources
            .iter()
            .filter(|r| r.dependencies().contains(key))
            .collect()
    }

    /// すべての参照が解決でき、循環がないことを検証
    pub fn validate(&self) -> Result<()> {
        for decl in &self.resources {
            for dep in decl.dependencies() {
                if !self.contains(&dep) {
                    return Err(StackError::UnresolvedReference {
                        from: decl.key.to_string(),
                        target: dep.to_string(),
                    });
                }
            }
        }

        for (name, value) in &self.outputs {
            for r in value.references() {
                if !self.contains(&r.key) {
                    return Err(StackError::UnresolvedReference {
                        from: format!("output:{}", name),
                        target: r.key.to_string(),
                    });
                }
            }
        }

        self.topological_order().map(|_| ())
    }

    /// 依存先が先に来る順序（同順位は宣言順）
    pub fn topological_order(&self) -> Result<Vec<&ResourceDecl>> {
        let n = self.resources.len();
        let mut in_degree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (i, decl) in self.resources.iter().enumerate() {
            for dep in decl.dependencies() {
                // 未定義の参照は validate で検出する
                if let Some(&j) = self.index.get(&dep) {
                    in_degree[i] += 1;
                    dependents[j].push(i);
                }
            }
        }

        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(i) = ready.pop_first() {
            order.push(&self.resources[i]);
            for &d in &dependents[i] {
                in_degree[d] -= 1;
                if in_degree[d] == 0 {
                    ready.insert(d);
                }
            }
        }

        if order.len() != n {
            let stuck: Vec<String> = (0..n)
                .filter(|&i| in_degree[i] > 0)
                .map(|i| self.resources[i].key.to_string())
                .collect();
            return Err(StackError::CircularDependency(stuck.join(", ")));
        }

        Ok(order)
    }

    /// 削除用の順序（依存元が先）
    pub fn reverse_order(&self) -> Result<Vec<&ResourceDecl>> {
        let mut order = self.topological_order()?;
        order.reverse();
        Ok(order)
    }
}
