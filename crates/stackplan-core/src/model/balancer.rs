//! L4ロードバランサーとリスナー

use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::reference::{Input, ResourceKey, ResourceKind};
use serde::{Deserialize, Serialize};

/// プロトコル種別
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
        }
    }

    /// ロードバランサーAPIの表記
    pub fn as_listener_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
        }
    }
}

/// 宣言済みロードバランサーへのハンドル
#[derive(Debug, Clone)]
pub struct LoadBalancerHandle {
    pub key: ResourceKey,
}

impl LoadBalancerHandle {
    /// ネットワーク型（L4）ロードバランサーを宣言
    pub fn declare(graph: &mut ResourceGraph, name: &str, subnets: Input) -> Result<Self> {
        let key = graph.declare(
            ResourceKind::LoadBalancer,
            name,
            [
                ("load_balancer_type", Input::from("network")),
                ("internal", Input::from(false)),
                ("subnets", subnets),
            ],
        )?;
        Ok(Self { key })
    }

    pub fn arn(&self) -> Input {
        self.key.arn()
    }

    /// 公開DNS名（適用後に確定）
    pub fn dns_name(&self) -> Input {
        self.key.output("dns_name")
    }

    /// リスナーを追加
    pub fn listener(
        &self,
        graph: &mut ResourceGraph,
        name: &str,
        port: u16,
        protocol: Protocol,
    ) -> Result<ListenerHandle> {
        let key = graph.declare(
            ResourceKind::Listener,
            name,
            [
                ("load_balancer_arn", self.arn()),
                ("port", Input::from(port)),
                ("protocol", Input::from(protocol.as_listener_str())),
                (
                    "default_action",
                    Input::map([("type", Input::from("forward"))]),
                ),
            ],
        )?;
        Ok(ListenerHandle {
            key,
            port,
            protocol,
        })
    }
}

/// 宣言済みリスナーへのハンドル
///
/// ポートとプロトコルは宣言時に確定しているため静的に保持します。
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    pub key: ResourceKey,
    pub port: u16,
    pub protocol: Protocol,
}

impl ListenerHandle {
    pub fn arn(&self) -> Input {
        self.key.arn()
    }
}
