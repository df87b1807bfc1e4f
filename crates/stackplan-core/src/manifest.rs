//! スタックの宣言
//!
//! ネットワーク、アクセス制御、共有ストレージ、ロードバランサー、
//! コンテナサービスからなるトポロジーをリソースグラフとして宣言します。

use crate::cidr::Ipv4Cidr;
use crate::error::{Result, StackError};
use crate::graph::ResourceGraph;
use crate::model::{
    AccessGroupHandle, ClusterHandle, ContainerDefinition, FileSystemHandle, LoadBalancerHandle,
    Location, MountPoint, MountTargetHandle, NetworkSpec, PortMapping, Ports, Protocol,
    ProviderConfig, RuleSpec, ServiceSpec, VolumeSpec,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// スタック出力名
pub mod outputs {
    pub const VPC_ID: &str = "vpc_id";
    pub const VPC_PRIVATE_SUBNET_IDS: &str = "vpc_private_subnet_ids";
    pub const VPC_PUBLIC_SUBNET_IDS: &str = "vpc_public_subnet_ids";
    pub const PUBLIC_SUBNET_1: &str = "public_subnet_1";
    pub const PUBLIC_SUBNET_2: &str = "public_subnet_2";
    pub const URL: &str = "url";
}

/// スタックのパラメータ
///
/// デフォルト値がそのまま本番の宣言内容です。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackParams {
    /// リソース名のプレフィックス
    pub service_name: String,
    pub database_port: u16,
    pub storage_port: u16,
    pub network_cidr: Ipv4Cidr,
    pub availability_zones: u8,
    pub region: String,
    pub image: String,
    /// コンテナのメモリ上限 (MiB)
    pub memory: u32,
    /// レプリカ数
    pub desired_count: u32,
    /// ファイルシステムをマウントするコンテナ内パス
    pub container_path: String,
}

impl Default for StackParams {
    fn default() -> Self {
        Self {
            service_name: "mongo".to_string(),
            database_port: 27017,
            storage_port: 2049,
            network_cidr: Ipv4Cidr::from_octets(10, 0, 0, 0, 16),
            availability_zones: 2,
            region: "us-east-1".to_string(),
            image: "mongo".to_string(),
            memory: 128,
            desired_count: 2,
            container_path: "/data/db".to_string(),
        }
    }
}

impl StackParams {
    pub fn validate(&self) -> Result<()> {
        if self.service_name.is_empty() {
            return Err(StackError::InvalidConfig(
                "service_name が空です".to_string(),
            ));
        }
        if self.database_port == 0 || self.storage_port == 0 {
            return Err(StackError::InvalidConfig(
                "ポート番号は1以上である必要があります".to_string(),
            ));
        }
        if self.memory == 0 {
            return Err(StackError::InvalidConfig(
                "memory は1以上である必要があります".to_string(),
            ));
        }
        // マウントターゲットを2つのパブリックサブネットに置くため
        if self.availability_zones < 2 {
            return Err(StackError::InvalidConfig(format!(
                "availability_zones は2以上である必要があります: {}",
                self.availability_zones
            )));
        }
        if !self.container_path.starts_with('/') {
            return Err(StackError::InvalidConfig(format!(
                "container_path は絶対パスである必要があります: {}",
                self.container_path
            )));
        }
        Ok(())
    }
}

/// パラメータファイル全体の設定
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackConfig {
    pub params: StackParams,
    pub provider: ProviderConfig,
}

impl StackConfig {
    /// プロバイダーのリージョン（未指定ならスタックのリージョン）
    pub fn region(&self) -> &str {
        self.provider
            .region
            .as_deref()
            .unwrap_or(&self.params.region)
    }
}

/// パラメータからスタック全体のリソースグラフを作成
pub fn declare_stack(params: &StackParams) -> Result<ResourceGraph> {
    params.validate()?;

    let prefix = params.service_name.as_str();
    let mut graph = ResourceGraph::new();

    let network = NetworkSpec {
        name: format!("{}-vpc", prefix),
        cidr_block: params.network_cidr,
        availability_zones: params.availability_zones,
        region: params.region.clone(),
    }
    .declare(&mut graph)?;

    graph.export(outputs::VPC_ID, network.id());
    graph.export(outputs::VPC_PRIVATE_SUBNET_IDS, network.private_subnet_ids());
    graph.export(outputs::VPC_PUBLIC_SUBNET_IDS, network.public_subnet_ids());

    let public_subnet_1 = network.public_subnet_ids().at(0)?;
    let public_subnet_2 = network.public_subnet_ids().at(1)?;
    graph.export(outputs::PUBLIC_SUBNET_1, public_subnet_1.clone());
    graph.export(outputs::PUBLIC_SUBNET_2, public_subnet_2.clone());

    let sg = AccessGroupHandle::declare(&mut graph, &format!("{}-sg", prefix), &network)?;
    sg.ingress(
        &mut graph,
        "nfs-access",
        RuleSpec::new(
            Location::AnyIpv4,
            Ports::Tcp(params.storage_port),
            "allow NFS access for EFS from anywhere",
        ),
    )?;
    sg.ingress(
        &mut graph,
        "mongo-access",
        RuleSpec::new(
            Location::AnyIpv4,
            Ports::Tcp(params.database_port),
            "allow Mongo access from anywhere",
        ),
    )?;
    sg.egress(
        &mut graph,
        "outbound-access",
        RuleSpec::new(
            Location::AnyIpv4,
            Ports::AllTcp,
            "allow outbound access to anywhere",
        ),
    )?;

    let efs = FileSystemHandle::declare(
        &mut graph,
        &format!("{}-efs", prefix),
        BTreeMap::from([("Name".to_string(), format!("{}-data", prefix))]),
    )?;

    let mount_target_1 = MountTargetHandle::declare(
        &mut graph,
        &format!("{}-publicMountTarget-1", prefix),
        &efs,
        public_subnet_1,
        vec![sg.id()],
    )?;
    MountTargetHandle::declare(
        &mut graph,
        &format!("{}-publicMountTarget-2", prefix),
        &efs,
        public_subnet_2,
        vec![sg.id()],
    )?;

    let nlb = LoadBalancerHandle::declare(
        &mut graph,
        &format!("{}-service", prefix),
        network.public_subnet_ids(),
    )?;
    let listener = nlb.listener(
        &mut graph,
        &format!("{}-lb-listener", prefix),
        params.database_port,
        Protocol::Tcp,
    )?;
    graph.export(outputs::URL, nlb.dns_name());

    let cluster = ClusterHandle::declare(&mut graph, &format!("{}-cluster", prefix), &network)?;

    let volume = format!("{}-volume", prefix);
    ServiceSpec {
        name: prefix.to_string(),
        desired_count: params.desired_count,
        security_groups: vec![sg.id()],
        subnets: network.public_subnet_ids(),
        containers: vec![ContainerDefinition {
            name: prefix.to_string(),
            image: params.image.clone(),
            memory: params.memory,
            port_mappings: vec![PortMapping::from_listener(&listener)],
            mount_points: vec![MountPoint {
                container_path: params.container_path.clone(),
                source_volume: volume.clone(),
            }],
        }],
        volumes: vec![VolumeSpec {
            name: volume,
            file_system_id: mount_target_1.file_system_id(),
            transit_encryption: true,
        }],
    }
    .declare(&mut graph, &cluster)?;

    graph.validate()?;
    tracing::debug!("Declared stack '{}' with {} resources", prefix, graph.len());
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{Input, ResourceKey, ResourceKind};
    use serde_json::json;

    fn stack() -> ResourceGraph {
        declare_stack(&StackParams::default()).unwrap()
    }

    fn count(graph: &ResourceGraph, kind: ResourceKind) -> usize {
        graph.by_kind(kind).len()
    }

    fn port(decl: &crate::graph::ResourceDecl, name: &str) -> u64 {
        decl.input(name)
            .and_then(|i| i.as_value())
            .and_then(|v| v.as_u64())
            .unwrap()
    }

    #[test]
    fn test_default_params() {
        let params = StackParams::default();
        assert_eq!(params.service_name, "mongo");
        assert_eq!(params.database_port, 27017);
        assert_eq!(params.storage_port, 2049);
        assert_eq!(params.network_cidr.to_string(), "10.0.0.0/16");
        assert_eq!(params.image, "mongo");
        assert_eq!(params.memory, 128);
        assert_eq!(params.desired_count, 2);
        params.validate().unwrap();
    }

    #[test]
    fn test_resource_counts() {
        let graph = stack();
        assert_eq!(count(&graph, ResourceKind::Network), 1);
        assert_eq!(count(&graph, ResourceKind::Subnet), 4);
        assert_eq!(count(&graph, ResourceKind::AccessGroup), 1);
        assert_eq!(count(&graph, ResourceKind::AccessRule), 3);
        assert_eq!(count(&graph, ResourceKind::FileSystem), 1);
        assert_eq!(count(&graph, ResourceKind::MountTarget), 2);
        assert_eq!(count(&graph, ResourceKind::LoadBalancer), 1);
        assert_eq!(count(&graph, ResourceKind::Listener), 1);
        assert_eq!(count(&graph, ResourceKind::Cluster), 1);
        assert_eq!(count(&graph, ResourceKind::Service), 1);
    }

    #[test]
    fn test_rule_ports() {
        let graph = stack();
        let rules = graph.by_kind(ResourceKind::AccessRule);

        let mut ingress: Vec<(u64, u64)> = rules
            .iter()
            .filter(|r| r.input("direction") == Some(&Input::from("ingress")))
            .map(|r| (port(r, "from_port"), port(r, "to_port")))
            .collect();
        ingress.sort();
        assert_eq!(ingress, vec![(2049, 2049), (27017, 27017)]);

        let egress: Vec<(u64, u64)> = rules
            .iter()
            .filter(|r| r.input("direction") == Some(&Input::from("egress")))
            .map(|r| (port(r, "from_port"), port(r, "to_port")))
            .collect();
        assert_eq!(egress, vec![(0, 65535)]);

        for rule in rules {
            assert_eq!(
                rule.input("cidr_blocks"),
                Some(&Input::List(vec![Input::from("0.0.0.0/0")]))
            );
        }
    }

    #[test]
    fn test_mount_targets_use_distinct_public_subnets() {
        let graph = stack();
        let public = [
            ResourceKey::new(ResourceKind::Subnet, "mongo-vpc-public-1"),
            ResourceKey::new(ResourceKind::Subnet, "mongo-vpc-public-2"),
        ];

        let subnets: Vec<ResourceKey> = graph
            .by_kind(ResourceKind::MountTarget)
            .iter()
            .map(|mt| {
                mt.input("subnet_id")
                    .and_then(|i| i.as_output_ref())
                    .map(|r| r.key.clone())
                    .unwrap()
            })
            .collect();
        assert_eq!(subnets, public.to_vec());
    }

    #[test]
    fn test_service_port_matches_listener() {
        let graph = stack();
        let listener = &graph.by_kind(ResourceKind::Listener)[0];
        let service = &graph.by_kind(ResourceKind::Service)[0];

        let container = &service
            .input("task_definition")
            .and_then(|t| t.get("containers"))
            .and_then(|c| c.as_list())
            .unwrap()[0];
        let mapping = &container.get("port_mappings").and_then(|p| p.as_list()).unwrap()[0];
        assert_eq!(
            mapping.get("container_port").and_then(|p| p.as_value()),
            Some(&json!(port(listener, "port")))
        );
        assert_eq!(port(listener, "port"), 27017);
        assert_eq!(
            service.input("desired_count").and_then(|i| i.as_value()),
            Some(&json!(2))
        );
    }

    #[test]
    fn test_volume_backed_by_file_system() {
        let graph = stack();
        let service = &graph.by_kind(ResourceKind::Service)[0];
        let volume = &service
            .input("task_definition")
            .and_then(|t| t.get("volumes"))
            .and_then(|v| v.as_list())
            .unwrap()[0];

        assert_eq!(volume.get("name"), Some(&Input::from("mongo-volume")));
        let efs = volume.get("efs_volume_configuration").unwrap();
        assert_eq!(
            efs.get("transit_encryption"),
            Some(&Input::from("ENABLED"))
        );
        assert_eq!(
            efs.get("file_system_id")
                .and_then(|i| i.as_output_ref())
                .map(|r| r.to_string()),
            Some("mount-target:mongo-publicMountTarget-1.file_system_id".to_string())
        );
    }

    #[test]
    fn test_outputs() {
        let graph = stack();
        let names: Vec<&str> = graph.outputs().keys().map(|k| k.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "public_subnet_1",
                "public_subnet_2",
                "url",
                "vpc_id",
                "vpc_private_subnet_ids",
                "vpc_public_subnet_ids",
            ]
        );
        assert_eq!(
            graph.outputs()[outputs::URL]
                .as_output_ref()
                .map(|r| r.to_string()),
            Some("load-balancer:mongo-service.dns_name".to_string())
        );
    }

    #[test]
    fn test_declaration_is_deterministic() {
        let a = stack();
        let b = stack();
        let a: Vec<_> = a.iter().cloned().collect();
        let b: Vec<_> = b.iter().cloned().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_custom_prefix() {
        let params = StackParams {
            service_name: "db".to_string(),
            desired_count: 5,
            ..Default::default()
        };
        let graph = declare_stack(&params).unwrap();
        assert!(graph.contains(&ResourceKey::new(ResourceKind::Service, "db")));
        assert!(graph.contains(&ResourceKey::new(ResourceKind::Listener, "db-lb-listener")));
        assert!(graph.contains(&ResourceKey::new(ResourceKind::AccessRule, "db-sg-mongo-access")));
    }

    #[test]
    fn test_invalid_params() {
        let params = StackParams {
            availability_zones: 1,
            ..Default::default()
        };
        assert!(matches!(
            declare_stack(&params),
            Err(StackError::InvalidConfig(_))
        ));

        let params = StackParams {
            memory: 0,
            ..Default::default()
        };
        assert!(declare_stack(&params).is_err());
    }
}
