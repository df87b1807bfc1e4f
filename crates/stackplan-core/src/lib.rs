//! stackplan コア
//!
//! クラウドトポロジーを型付きのリソースグラフとして宣言します。
//!
//! - [`cidr`]: IPv4アドレス範囲とサブネット分割
//! - [`reference`]: リソースキーと出力参照
//! - [`graph`]: 依存関係の検証と順序付け
//! - [`model`]: ネットワーク、アクセス制御、ストレージ、ロードバランサー、コンピュート
//! - [`manifest`]: MongoDBサービスのスタック宣言
//! - [`check`]: トポロジーの整合性チェック
//! - [`parser`]: stack.kdl のパース

pub mod check;
pub mod cidr;
pub mod error;
pub mod graph;
pub mod manifest;
pub mod model;
pub mod parser;
pub mod reference;

pub use check::{Finding, Severity, check_stack, has_errors};
pub use cidr::Ipv4Cidr;
pub use error::{Result, StackError};
pub use graph::{ResourceDecl, ResourceGraph};
pub use manifest::{StackConfig, StackParams, declare_stack};
pub use parser::{parse_stack_file, parse_stack_string};
pub use reference::{
    Input, OutputRef, Resolution, ResourceKey, ResourceKind, UNKNOWN_VALUE, select_attribute,
};
