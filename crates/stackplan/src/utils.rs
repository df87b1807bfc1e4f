use colored::Colorize;
use stackplan_cloud::{ActionType, CloudError, Plan};
use stackplan_cloud_local::LocalProvider;
use stackplan_core::{ResourceGraph, StackConfig, declare_stack};
use std::io::Write;
use std::path::{Path, PathBuf};

/// 読み込んだパラメータと宣言済みのリソースグラフ
pub struct LoadedStack {
    pub config: StackConfig,
    pub graph: ResourceGraph,
    /// state.json を置くディレクトリ
    pub project_root: PathBuf,
    /// 読み込んだパラメータファイル（既定値で動作している場合は None）
    pub source: Option<PathBuf>,
}

/// パラメータファイルを読み込み、スタックを宣言する
///
/// ファイルが見つからない場合は既定値で宣言します。
pub fn load_stack(file: Option<&Path>) -> anyhow::Result<LoadedStack> {
    let source = match file {
        Some(path) => Some(path.to_path_buf()),
        None => match stackplan_config::find_stack_file() {
            Ok(path) => Some(path),
            Err(stackplan_config::ConfigError::StackFileNotFound) => None,
            Err(e) => return Err(e.into()),
        },
    };

    let (config, project_root) = match &source {
        Some(path) => {
            tracing::debug!("Loading stack file: {}", path.display());
            (
                stackplan_core::parse_stack_file(path)?,
                stackplan_config::project_root(path),
            )
        }
        None => {
            tracing::info!("スタックファイルが見つからないため既定値を使用します");
            (StackConfig::default(), PathBuf::from("."))
        }
    };

    // プロバイダーのリージョンでアベイラビリティゾーンを決める
    let mut params = config.params.clone();
    params.region = config.region().to_string();
    let graph = declare_stack(&params)?;

    Ok(LoadedStack {
        config,
        graph,
        project_root,
        source,
    })
}

/// 設定に対応するプロバイダーを作成
pub fn provider(stack: &LoadedStack) -> anyhow::Result<LocalProvider> {
    let name = stack.config.provider.name.as_str();
    if name != stackplan_core::model::DEFAULT_PROVIDER {
        return Err(CloudError::ProviderNotFound(name.to_string()).into());
    }
    Ok(LocalProvider::new(&stack.project_root, stack.config.region()))
}

pub fn print_source(stack: &LoadedStack) {
    match &stack.source {
        Some(path) => println!("パラメータ: {}", path.display().to_string().cyan()),
        None => println!("パラメータ: {}", "(既定値)".dimmed()),
    }
}

/// 計画の内容を表示
pub fn print_plan(plan: &Plan) {
    for action in &plan.actions {
        match action.action_type {
            ActionType::Create => {
                println!("  {} {}", "+".green().bold(), action.key.to_string().green());
            }
            ActionType::Update => {
                println!("  {} {}", "~".yellow().bold(), action.key.to_string().yellow());
                for change in &action.changes {
                    println!(
                        "      {}: {} → {}",
                        change.field,
                        render(change.before.as_ref()).dimmed(),
                        render(change.after.as_ref())
                    );
                }
            }
            ActionType::Delete => {
                println!("  {} {}", "-".red().bold(), action.key.to_string().red());
            }
            ActionType::NoOp => {}
        }
    }

    println!();
    if plan.has_changes {
        println!("{} {}", "Plan:".bold(), plan.summary());
    } else {
        println!("{}", "変更はありません。".green());
    }
}

fn render(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => "(なし)".to_string(),
    }
}

/// [y/N] の確認を求める
pub fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{} [y/N]: ", prompt);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
