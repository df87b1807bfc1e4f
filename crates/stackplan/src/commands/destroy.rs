use crate::commands::up::print_result;
use crate::utils;
use colored::Colorize;
use stackplan_cloud::CloudProvider;
use stackplan_core::ResourceGraph;
use std::path::Path;

pub async fn handle(file: Option<&Path>, yes: bool) -> anyhow::Result<()> {
    let stack = utils::load_stack(file)?;
    utils::print_source(&stack);
    let provider = utils::provider(&stack)?;

    let state = provider.get_state().await?;
    if state.is_empty() {
        println!("{}", "削除するリソースはありません。".green());
        return Ok(());
    }

    // 空のグラフとの差分が削除対象
    let plan = provider.plan(&ResourceGraph::new()).await?;
    println!();
    utils::print_plan(&plan);

    // 確認（--yesが指定されていない場合）
    if !yes {
        println!();
        println!(
            "{}",
            format!("警告: {}個のリソースをすべて削除します。", state.len()).yellow()
        );
        if !utils::confirm("削除しますか？")? {
            println!("{}", "削除をキャンセルしました。".yellow());
            return Ok(());
        }
    }

    println!();
    println!("{}", "リソースを削除中...".yellow());
    let result = provider.destroy_all().await?;
    print_result(&result);

    if !result.is_success() {
        eprintln!();
        eprintln!("{}", "✗ 一部のリソースを削除できませんでした".red().bold());
        std::process::exit(1);
    }

    println!();
    println!("{}", "✓ すべてのリソースを削除しました".green().bold());
    Ok(())
}
