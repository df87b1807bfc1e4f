use crate::commands::outputs;
use crate::utils;
use colored::Colorize;
use stackplan_cloud::{ApplyResult, CloudProvider, resolve_outputs};
use std::path::Path;

pub async fn handle(file: Option<&Path>, yes: bool) -> anyhow::Result<()> {
    let stack = utils::load_stack(file)?;
    utils::print_source(&stack);
    let provider = utils::provider(&stack)?;

    let auth = provider.check_auth().await?;
    if !auth.authenticated {
        anyhow::bail!(
            "{} に接続できません: {}",
            provider.display_name(),
            auth.error.unwrap_or_default()
        );
    }

    println!(
        "{}",
        format!("{} の変更を計算中...", provider.display_name()).blue()
    );
    println!();

    let plan = provider.plan(&stack.graph).await?;
    utils::print_plan(&plan);
    if !plan.has_changes {
        return Ok(());
    }

    // 確認（--yesが指定されていない場合）
    if !yes {
        println!();
        if !utils::confirm("変更を適用しますか？")? {
            println!("{}", "適用をキャンセルしました。".yellow());
            return Ok(());
        }
    }

    println!();
    println!("{}", "変更を適用中...".blue());
    let result = provider.apply(&stack.graph, &plan).await?;
    print_result(&result);

    if !result.is_success() {
        eprintln!();
        eprintln!("{}", "✗ 一部の変更を適用できませんでした".red().bold());
        std::process::exit(1);
    }

    println!();
    println!("{}", "✓ 適用が完了しました！".green().bold());

    let state = provider.get_state().await?;
    println!();
    outputs::print_outputs(&resolve_outputs(&stack.graph, &state));

    Ok(())
}

pub(crate) fn print_result(result: &ApplyResult) {
    for ok in &result.succeeded {
        println!("  {} {}", "✓".green(), ok.message);
    }
    for failed in &result.failed {
        eprintln!(
            "  {} {}: {}",
            "✗".red(),
            failed.action_id,
            failed.error.as_deref().unwrap_or("unknown error")
        );
    }
    for skipped in &result.skipped {
        eprintln!("  {} {} (依存先の失敗によりスキップ)", "-".dimmed(), skipped);
    }
    println!(
        "{}",
        format!(
            "{}件成功, {}件失敗, {}件スキップ ({} ms)",
            result.succeeded.len(),
            result.failed.len(),
            result.skipped.len(),
            result.duration_ms
        )
        .dimmed()
    );
}
