//! アクセス制御（セキュリティグループとルール）

use super::network::{NetworkHandle, name_tag};
use crate::cidr::Ipv4Cidr;
use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::reference::{Input, ResourceKey, ResourceKind};
use serde::{Deserialize, Serialize};

/// 通信元/通信先
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    /// すべてのIPv4アドレス
    AnyIpv4,
    Cidr(Ipv4Cidr),
}

impl Location {
    pub fn cidr(&self) -> Ipv4Cidr {
        match self {
            Location::AnyIpv4 => Ipv4Cidr::ANY,
            Location::Cidr(cidr) => *cidr,
        }
    }
}

/// 許可するポート範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ports {
    Tcp(u16),
    TcpRange(u16, u16),
    /// TCPの全ポート (0-65535)
    AllTcp,
}

impl Ports {
    pub fn range(&self) -> (u16, u16) {
        match self {
            Ports::Tcp(port) => (*port, *port),
            Ports::TcpRange(from, to) => (*from, *to),
            Ports::AllTcp => (0, u16::MAX),
        }
    }
}

/// ルールの向き
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ingress,
    Egress,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ingress => "ingress",
            Direction::Egress => "egress",
        }
    }
}

/// ルール定義
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub location: Location,
    pub ports: Ports,
    pub description: String,
}

impl RuleSpec {
    pub fn new(location: Location, ports: Ports, description: impl Into<String>) -> Self {
        Self {
            location,
            ports,
            description: description.into(),
        }
    }
}

/// 宣言済みアクセスグループへのハンドル
#[derive(Debug, Clone)]
pub struct AccessGroupHandle {
    pub key: ResourceKey,
}

impl AccessGroupHandle {
    pub fn declare(
        graph: &mut ResourceGraph,
        name: &str,
        network: &NetworkHandle,
    ) -> Result<Self> {
        let key = graph.declare(
            ResourceKind::AccessGroup,
            name,
            [
                ("vpc_id", network.id()),
                ("name", Input::from(name)),
                ("tags", name_tag(name)),
            ],
        )?;
        Ok(Self { key })
    }

    pub fn id(&self) -> Input {
        self.key.id()
    }

    /// 受信ルールを追加（リソース名は `<group>-<name>`）
    pub fn ingress(
        &self,
        graph: &mut ResourceGraph,
        name: &str,
        rule: RuleSpec,
    ) -> Result<ResourceKey> {
        self.rule(graph, name, Direction::Ingress, rule)
    }

    /// 送信ルールを追加
    pub fn egress(
        &self,
        graph: &mut ResourceGraph,
        name: &str,
        rule: RuleSpec,
    ) -> Result<ResourceKey> {
        self.rule(graph, name, Direction::Egress, rule)
    }

    fn rule(
        &self,
        graph: &mut ResourceGraph,
        name: &str,
        direction: Direction,
        rule: RuleSpec,
    ) -> Result<ResourceKey> {
        let (from_port, to_port) = rule.ports.range();
        graph.declare(
            ResourceKind::AccessRule,
            format!("{}-{}", self.key.name, name),
            [
                ("security_group_id", self.id()),
                ("direction", Input::from(direction.as_str())),
                ("protocol", Input::from("tcp")),
                ("from_port", Input::from(from_port)),
                ("to_port", Input::from(to_port)),
                (
                    "cidr_blocks",
                    Input::List(vec![Input::from(rule.location.cidr().to_string())]),
                ),
                ("description", Input::from(rule.description)),
            ],
        )
    }
}
