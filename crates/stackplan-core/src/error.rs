use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("無効なCIDR: {0}")]
    InvalidCidr(String),

    #[error("リソースが重複しています: {0}")]
    DuplicateResource(String),

    #[error("未定義のリソースを参照しています: {from} -> {target}")]
    UnresolvedReference { from: String, target: String },

    #[error("循環依存が検出されました: {0}")]
    CircularDependency(String),

    #[error("インデックスが範囲外です: {index} (要素数: {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, StackError>;
