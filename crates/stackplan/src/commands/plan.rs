use crate::utils;
use colored::Colorize;
use stackplan_cloud::CloudProvider;
use std::path::Path;

pub async fn handle(file: Option<&Path>) -> anyhow::Result<()> {
    let stack = utils::load_stack(file)?;
    utils::print_source(&stack);
    let provider = utils::provider(&stack)?;

    println!(
        "{}",
        format!("{} の変更を計算中...", provider.display_name()).blue()
    );
    println!();

    let plan = provider.plan(&stack.graph).await?;
    utils::print_plan(&plan);

    Ok(())
}
