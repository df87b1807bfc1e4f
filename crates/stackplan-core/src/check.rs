//! トポロジーの整合性チェック
//!
//! グラフの参照解決だけでは検出できない、リソース間の組み合わせの問題を報告します。
//! 警告は報告のみで、宣言内容を書き換えることはありません。

use crate::cidr::Ipv4Cidr;
use crate::graph::{ResourceDecl, ResourceGraph};
use crate::reference::{Input, ResourceKey, ResourceKind};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// チェック結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub resource: ResourceKey,
    pub message: String,
}

impl Finding {
    fn error(resource: &ResourceKey, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            resource: resource.clone(),
            message: message.into(),
        }
    }

    fn warning(resource: &ResourceKey, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            resource: resource.clone(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "[{}] {}: {}", label, self.resource, self.message)
    }
}

/// エラーが含まれているか
pub fn has_errors(findings: &[Finding]) -> bool {
    findings.iter().any(|f| f.severity == Severity::Error)
}

/// スタック全体をチェック
pub fn check_stack(graph: &ResourceGraph) -> Vec<Finding> {
    let mut findings = Vec::new();
    check_mount_targets(graph, &mut findings);
    check_port_mappings(graph, &mut findings);
    check_open_ingress(graph, &mut findings);
    findings
}

fn literal_u64(input: Option<&Input>) -> Option<u64> {
    input.and_then(|i| i.as_value()).and_then(|v| v.as_u64())
}

fn literal_bool(input: Option<&Input>) -> Option<bool> {
    input.and_then(|i| i.as_value()).and_then(|v| v.as_bool())
}

fn referenced_key(input: Option<&Input>) -> Option<&ResourceKey> {
    input.and_then(|i| i.as_output_ref()).map(|r| &r.key)
}

/// マウントターゲットはそれぞれ別のパブリックサブネットに置く
fn check_mount_targets(graph: &ResourceGraph, findings: &mut Vec<Finding>) {
    let mut seen: HashSet<ResourceKey> = HashSet::new();

    for mt in graph.by_kind(ResourceKind::MountTarget) {
        let Some(subnet_key) = referenced_key(mt.input("subnet_id")) else {
            findings.push(Finding::error(&mt.key, "subnet_id がサブネットを参照していません"));
            continue;
        };

        if subnet_key.kind != ResourceKind::Subnet {
            findings.push(Finding::error(
                &mt.key,
                format!("subnet_id が {} を参照しています", subnet_key),
            ));
            continue;
        }

        if !seen.insert(subnet_key.clone()) {
            findings.push(Finding::error(
                &mt.key,
                format!("サブネット {} は別のマウントターゲットが使用しています", subnet_key),
            ));
        }

        let is_public = graph
            .get(subnet_key)
            .map(|subnet| literal_bool(subnet.input("map_public_ip_on_launch")) == Some(true))
            .unwrap_or(false);
        if !is_public {
            findings.push(Finding::error(
                &mt.key,
                format!("{} はパブリックサブネットではありません", subnet_key),
            ));
        }
    }
}

/// サービスのコンテナポートはリスナーのポートと一致する必要がある
fn check_port_mappings(graph: &ResourceGraph, findings: &mut Vec<Finding>) {
    for service in graph.by_kind(ResourceKind::Service) {
        let container_ports = declared_container_ports(service);
        let Some(load_balancers) = service.input("load_balancers").and_then(|i| i.as_list())
        else {
            continue;
        };

        for lb in load_balancers {
            let Some(listener_key) = referenced_key(lb.get("listener_arn")) else {
                continue;
            };
            let Some(container_port) = literal_u64(lb.get("container_port")) else {
                continue;
            };
            let listener_port = graph
                .get(listener_key)
                .and_then(|l| literal_u64(l.input("port")));

            match listener_port {
                Some(port) if port == container_port => {}
                Some(port) => findings.push(Finding::error(
                    &service.key,
                    format!(
                        "コンテナポート {} がリスナー {} のポート {} と一致しません",
                        container_port, listener_key, port
                    ),
                )),
                None => findings.push(Finding::error(
                    &service.key,
                    format!("リスナー {} のポートが不明です", listener_key),
                )),
            }

            if !container_ports.contains(&container_port) {
                findings.push(Finding::error(
                    &service.key,
                    format!(
                        "ポート {} はどのコンテナのポートマッピングにもありません",
                        container_port
                    ),
                ));
            }
        }
    }
}

fn declared_container_ports(service: &ResourceDecl) -> Vec<u64> {
    service
        .input("task_definition")
        .and_then(|t| t.get("containers"))
        .and_then(|c| c.as_list())
        .unwrap_or_default()
        .iter()
        .filter_map(|c| c.get("port_mappings").and_then(|p| p.as_list()))
        .flatten()
        .filter_map(|m| literal_u64(m.get("container_port")))
        .collect()
}

/// 全IPv4アドレスからの受信を許可するルール
fn check_open_ingress(graph: &ResourceGraph, findings: &mut Vec<Finding>) {
    let any = Input::from(Ipv4Cidr::ANY.to_string());

    for rule in graph.by_kind(ResourceKind::AccessRule) {
        if rule.input("direction") != Some(&Input::from("ingress")) {
            continue;
        }
        let open = rule
            .input("cidr_blocks")
            .and_then(|c| c.as_list())
            .is_some_and(|blocks| blocks.contains(&any));
        if open {
            let from = literal_u64(rule.input("from_port")).unwrap_or_default();
            let to = literal_u64(rule.input("to_port")).unwrap_or_default();
            let ports = if from == to {
                from.to_string()
            } else {
                format!("{}-{}", from, to)
            };
            findings.push(Finding::warning(
                &rule.key,
                format!("ポート {} が 0.0.0.0/0 に公開されています", ports),
            ));
        }
    }
}
