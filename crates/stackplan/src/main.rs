mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stack")]
#[command(about = "MongoDBサービスのトポロジーを宣言し、計画し、適用する", long_about = None)]
struct Cli {
    /// パラメータファイル（省略時は stack.kdl を探索）
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// パラメータとトポロジーを検証
    Validate,
    /// 適用される変更を表示
    Plan,
    /// 変更を適用
    Up {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// スタック出力を表示
    Outputs {
        /// JSONで出力
        #[arg(long)]
        json: bool,
    },
    /// 管理中のリソースをすべて削除
    Destroy {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrに出力（RUST_LOG で制御）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let file = cli.file.as_deref();

    // コマンドディスパッチ
    match cli.command {
        Commands::Validate => commands::validate::handle(file)?,
        Commands::Plan => commands::plan::handle(file).await?,
        Commands::Up { yes } => commands::up::handle(file, yes).await?,
        Commands::Outputs { json } => commands::outputs::handle(file, json).await?,
        Commands::Destroy { yes } => commands::destroy::handle(file, yes).await?,
        // 設定ファイル不要
        Commands::Version => println!("stackplan {}", env!("CARGO_PKG_VERSION")),
    }

    Ok(())
}
