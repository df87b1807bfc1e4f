//! ネットワークとサブネット
//!
//! ネットワークのアドレス範囲から、アベイラビリティゾーンごとに
//! パブリック/プライベートのサブネットを自動的に割り当てます。

use crate::cidr::Ipv4Cidr;
use crate::error::{Result, StackError};
use crate::graph::ResourceGraph;
use crate::reference::{Input, ResourceKey, ResourceKind};
use serde::{Deserialize, Serialize};

/// サブネット分割で親ブロックに足すプレフィックス長 (/16 -> /19)
const SUBNET_PREFIX_DELTA: u8 = 3;

/// 割り当て可能な最小のサブネット
const MIN_SUBNET_PREFIX: u8 = 28;

/// ネットワーク定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
    pub cidr_block: Ipv4Cidr,
    /// 使用するアベイラビリティゾーン数
    pub availability_zones: u8,
    pub region: String,
}

/// サブネットの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetType {
    Public,
    Private,
}

impl SubnetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubnetType::Public => "public",
            SubnetType::Private => "private",
        }
    }
}

/// 導出されたサブネット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetLayout {
    pub name: String,
    pub subnet_type: SubnetType,
    pub availability_zone: String,
    pub cidr_block: Ipv4Cidr,
}

impl NetworkSpec {
    pub fn new(name: impl Into<String>, cidr_block: Ipv4Cidr) -> Self {
        Self {
            name: name.into(),
            cidr_block,
            availability_zones: 2,
            region: "us-east-1".to_string(),
        }
    }

    /// ゾーンごとにパブリック、プライベートの順でブロックを割り当てる
    ///
    /// パブリックは先頭の `availability_zones` 個、プライベートはその次のブロック。
    pub fn derive_subnets(&self) -> Result<Vec<SubnetLayout>> {
        let zones = u32::from(self.availability_zones);
        if zones == 0 || zones > 4 {
            return Err(StackError::InvalidConfig(format!(
                "availability_zones は1〜4である必要があります: {}",
                zones
            )));
        }

        let new_prefix = self.cidr_block.prefix() + SUBNET_PREFIX_DELTA;
        if new_prefix > MIN_SUBNET_PREFIX {
            return Err(StackError::InvalidCidr(format!(
                "{} はサブネットに分割するには小さすぎます",
                self.cidr_block
            )));
        }

        let mut subnets = Vec::with_capacity(zones as usize * 2);
        for (offset, subnet_type) in [(0, SubnetType::Public), (zones, SubnetType::Private)] {
            for zone in 0..zones {
                subnets.push(SubnetLayout {
                    name: format!("{}-{}-{}", self.name, subnet_type.as_str(), zone + 1),
                    subnet_type,
                    availability_zone: self.zone_name(zone),
                    cidr_block: self.cidr_block.subnet(new_prefix, offset + zone)?,
                });
            }
        }
        Ok(subnets)
    }

    fn zone_name(&self, zone: u32) -> String {
        let letter = (b'a' + zone as u8) as char;
        format!("{}{}", self.region, letter)
    }

    /// ネットワークと導出されたサブネットをグラフに宣言
    pub fn declare(&self, graph: &mut ResourceGraph) -> Result<NetworkHandle> {
        let layouts = self.derive_subnets()?;

        let key = graph.declare(
            ResourceKind::Network,
            &self.name,
            [
                ("cidr_block", Input::from(self.cidr_block.to_string())),
                ("enable_dns_hostnames", Input::from(true)),
                ("tags", name_tag(&self.name)),
            ],
        )?;

        let mut public_subnets = Vec::new();
        let mut private_subnets = Vec::new();
        for layout in layouts {
            let subnet = graph.declare(
                ResourceKind::Subnet,
                &layout.name,
                [
                    ("vpc_id", key.id()),
                    ("cidr_block", Input::from(layout.cidr_block.to_string())),
                    ("availability_zone", Input::from(layout.availability_zone.clone())),
                    (
                        "map_public_ip_on_launch",
                        Input::from(layout.subnet_type == SubnetType::Public),
                    ),
                    (
                        "tags",
                        Input::map([
                            ("Name", Input::from(layout.name.clone())),
                            ("type", Input::from(layout.subnet_type.as_str())),
                        ]),
                    ),
                ],
            )?;
            match layout.subnet_type {
                SubnetType::Public => public_subnets.push(subnet),
                SubnetType::Private => private_subnets.push(subnet),
            }
        }

        Ok(NetworkHandle {
            key,
            public_subnets,
            private_subnets,
        })
    }
}

pub(crate) fn name_tag(name: &str) -> Input {
    Input::map([("Name", Input::from(name))])
}

/// 宣言済みネットワークへのハンドル
#[derive(Debug, Clone)]
pub struct NetworkHandle {
    pub key: ResourceKey,
    pub public_subnets: Vec<ResourceKey>,
    pub private_subnets: Vec<ResourceKey>,
}

impl NetworkHandle {
    pub fn id(&self) -> Input {
        self.key.id()
    }

    pub fn public_subnet_ids(&self) -> Input {
        Input::List(self.public_subnets.iter().map(|k| k.id()).collect())
    }

    pub fn private_subnet_ids(&self) -> Input {
        Input::List(self.private_subnets.iter().map(|k| k.id()).collect())
    }
}
