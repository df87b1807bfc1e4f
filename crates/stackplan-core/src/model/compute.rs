//! コンテナクラスタとサービス

use super::balancer::{ListenerHandle, Protocol};
use super::network::NetworkHandle;
use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::reference::{Input, ResourceKey, ResourceKind};

/// 宣言済みクラスタへのハンドル
#[derive(Debug, Clone)]
pub struct ClusterHandle {
    pub key: ResourceKey,
}

impl ClusterHandle {
    pub fn declare(
        graph: &mut ResourceGraph,
        name: &str,
        network: &NetworkHandle,
    ) -> Result<Self> {
        let key = graph.declare(
            ResourceKind::Cluster,
            name,
            [("name", Input::from(name)), ("vpc_id", network.id())],
        )?;
        Ok(Self { key })
    }

    pub fn arn(&self) -> Input {
        self.key.arn()
    }
}

/// コンテナのポートマッピング
#[derive(Debug, Clone)]
pub struct PortMapping {
    pub container_port: u16,
    pub host_port: u16,
    pub protocol: Protocol,
    /// トラフィックを受けるリスナー
    pub listener: Option<ResourceKey>,
}

impl PortMapping {
    /// リスナーのポートをそのままコンテナに転送する
    pub fn from_listener(listener: &ListenerHandle) -> Self {
        Self {
            container_port: listener.port,
            host_port: listener.port,
            protocol: listener.protocol,
            listener: Some(listener.key.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MountPoint {
    pub container_path: String,
    pub source_volume: String,
}

/// コンテナ定義
#[derive(Debug, Clone)]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    /// メモリ上限 (MiB)
    pub memory: u32,
    pub port_mappings: Vec<PortMapping>,
    pub mount_points: Vec<MountPoint>,
}

/// ファイルシステムを使うボリューム
#[derive(Debug, Clone)]
pub struct VolumeSpec {
    pub name: String,
    pub file_system_id: Input,
    pub transit_encryption: bool,
}

/// サービス定義
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub name: String,
    /// レプリカ数
    pub desired_count: u32,
    pub security_groups: Vec<Input>,
    pub subnets: Input,
    pub containers: Vec<ContainerDefinition>,
    pub volumes: Vec<VolumeSpec>,
}

impl ServiceSpec {
    pub fn declare(
        &self,
        graph: &mut ResourceGraph,
        cluster: &ClusterHandle,
    ) -> Result<ServiceHandle> {
        let mut load_balancers = Vec::new();
        let containers = self
            .containers
            .iter()
            .map(|c| {
                for mapping in &c.port_mappings {
                    if let Some(listener) = &mapping.listener {
                        load_balancers.push(Input::map([
                            ("listener_arn", listener.arn()),
                            ("container_name", Input::from(c.name.clone())),
                            ("container_port", Input::from(mapping.container_port)),
                        ]));
                    }
                }
                container_input(c)
            })
            .collect();

        let volumes = self
            .volumes
            .iter()
            .map(|v| {
                Input::map([
                    ("name", Input::from(v.name.clone())),
                    (
                        "efs_volume_configuration",
                        Input::map([
                            ("file_system_id", v.file_system_id.clone()),
                            (
                                "transit_encryption",
                                Input::from(if v.transit_encryption {
                                    "ENABLED"
                                } else {
                                    "DISABLED"
                                }),
                            ),
                        ]),
                    ),
                ])
            })
            .collect();

        let key = graph.declare(
            ResourceKind::Service,
            &self.name,
            [
                ("cluster", cluster.arn()),
                ("desired_count", Input::from(self.desired_count)),
                ("launch_type", Input::from("FARGATE")),
                ("security_groups", Input::List(self.security_groups.clone())),
                ("subnets", self.subnets.clone()),
                ("load_balancers", Input::List(load_balancers)),
                (
                    "task_definition",
                    Input::map([
                        ("containers", Input::List(containers)),
                        ("volumes", Input::List(volumes)),
                    ]),
                ),
            ],
        )?;
        Ok(ServiceHandle { key })
    }
}

fn container_input(container: &ContainerDefinition) -> Input {
    let port_mappings = container
        .port_mappings
        .iter()
        .map(|m| {
            Input::map([
                ("container_port", Input::from(m.container_port)),
                ("host_port", Input::from(m.host_port)),
                ("protocol", Input::from(m.protocol.as_str())),
            ])
        })
        .collect();
    let mount_points = container
        .mount_points
        .iter()
        .map(|m| {
            Input::map([
                ("container_path", Input::from(m.container_path.clone())),
                ("source_volume", Input::from(m.source_volume.clone())),
            ])
        })
        .collect();

    Input::map([
        ("name", Input::from(container.name.clone())),
        ("image", Input::from(container.image.clone())),
        ("memory", Input::from(container.memory)),
        ("essential", Input::from(true)),
        ("port_mappings", Input::List(port_mappings)),
        ("mount_points", Input::List(mount_points)),
    ])
}

/// 宣言済みサービスへのハンドル
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    pub key: ResourceKey,
}
