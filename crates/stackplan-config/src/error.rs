use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "スタックファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: stack.kdl, stack.local.kdl, .stack.kdl, .stack.local.kdl\n\
        - ./.stackplan/ ディレクトリ\n\
        - ~/.config/stackplan/stack.kdl\n\
        または STACK_CONFIG_PATH 環境変数で直接指定できます"
    )]
    StackFileNotFound,

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
