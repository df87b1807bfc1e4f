pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// スタックファイルを直接指定する環境変数
pub const STACK_CONFIG_ENV: &str = "STACK_CONFIG_PATH";

/// プロジェクト内の作業ディレクトリ（state.json もここに置かれる）
pub const PROJECT_DIR: &str = ".stackplan";

const CANDIDATES: [&str; 4] = [
    "stack.local.kdl",
    ".stack.local.kdl",
    "stack.kdl",
    ".stack.kdl",
];

/// stackplanの設定ディレクトリを取得（~/.config/stackplan）
///
/// ディレクトリの存在は確認しません。
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("stackplan");
    Ok(config_dir)
}

/// カレントディレクトリを起点にstack.kdlファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 STACK_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: stack.local.kdl, .stack.local.kdl, stack.kdl, .stack.kdl
/// 3. ./.stackplan/ ディレクトリ内: 同様の順序
/// 4. ~/.config/stackplan/stack.kdl (グローバル設定)
pub fn find_stack_file() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()?;
    find_stack_file_in(&current_dir)
}

/// `dir` を起点にstack.kdlファイルを探す
pub fn find_stack_file_in(dir: &Path) -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(STACK_CONFIG_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "{} が存在しないファイルを指しています: {}",
            STACK_CONFIG_ENV,
            path.display()
        );
    }

    // 2. 指定ディレクトリで検索
    for filename in &CANDIDATES {
        let path = dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. ./.stackplan/ ディレクトリで検索
    let project_dir = dir.join(PROJECT_DIR);
    if project_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 4. グローバル設定ファイル (~/.config/stackplan/stack.kdl)
    match get_config_dir() {
        Ok(config_dir) => {
            let global_config = config_dir.join("stack.kdl");
            if global_config.exists() {
                return Ok(global_config);
            }
        }
        Err(e) => tracing::debug!("グローバル設定をスキップ: {}", e),
    }

    // どの設定ファイルも見つからなかった
    Err(ConfigError::StackFileNotFound)
}

/// スタックファイルからプロジェクトルートを決める
///
/// `.stackplan/` 内のファイルならその親ディレクトリ。
pub fn project_root(stack_file: &Path) -> PathBuf {
    let dir = match stack_file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if dir.file_name().is_some_and(|n| n == PROJECT_DIR) {
        dir.parent().unwrap_or(dir).to_path_buf()
    } else {
        dir.to_path_buf()
    }
}
