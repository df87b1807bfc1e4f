//! トポロジーモデル
//!
//! 宣言できるリソースの型と、宣言後の参照に使うハンドルを定義します。
//! 各リソースは機能ごとにモジュールに分離されています。

mod balancer;
mod compute;
mod network;
mod provider;
mod security;
mod storage;

// Re-exports
pub use balancer::*;
pub use compute::*;
pub use network::*;
pub use provider::*;
pub use security::*;
pub use storage::*;
