//! 共有ファイルシステムとマウントターゲット

use crate::error::Result;
use crate::graph::ResourceGraph;
use crate::reference::{Input, ResourceKey, ResourceKind};
use std::collections::BTreeMap;

/// 宣言済みファイルシステムへのハンドル
#[derive(Debug, Clone)]
pub struct FileSystemHandle {
    pub key: ResourceKey,
}

impl FileSystemHandle {
    pub fn declare(
        graph: &mut ResourceGraph,
        name: &str,
        tags: BTreeMap<String, String>,
    ) -> Result<Self> {
        let tags = Input::map(tags.into_iter().map(|(k, v)| (k, Input::from(v))));
        let key = graph.declare(ResourceKind::FileSystem, name, [("tags", tags)])?;
        Ok(Self { key })
    }

    pub fn id(&self) -> Input {
        self.key.id()
    }
}

/// 宣言済みマウントターゲットへのハンドル
#[derive(Debug, Clone)]
pub struct MountTargetHandle {
    pub key: ResourceKey,
}

impl MountTargetHandle {
    /// サブネットにファイルシステムをマウントする
    pub fn declare(
        graph: &mut ResourceGraph,
        name: &str,
        file_system: &FileSystemHandle,
        subnet_id: Input,
        security_groups: Vec<Input>,
    ) -> Result<Self> {
        let key = graph.declare(
            ResourceKind::MountTarget,
            name,
            [
                ("file_system_id", file_system.id()),
                ("subnet_id", subnet_id),
                ("security_groups", Input::List(security_groups)),
            ],
        )?;
        Ok(Self { key })
    }

    /// マウント先のファイルシステムID（適用後に確定する出力）
    pub fn file_system_id(&self) -> Input {
        self.key.output("file_system_id")
    }
}
