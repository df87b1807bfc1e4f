use crate::utils;
use colored::Colorize;
use stackplan_cloud::{CloudProvider, resolve_outputs};
use stackplan_core::Resolution;
use std::collections::BTreeMap;
use std::path::Path;

pub async fn handle(file: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let stack = utils::load_stack(file)?;
    let provider = utils::provider(&stack)?;
    let state = provider.get_state().await?;
    let outputs = resolve_outputs(&stack.graph, &state);

    if json {
        let values: serde_json::Map<String, serde_json::Value> = outputs
            .into_iter()
            .map(|(name, resolution)| (name, resolution.value))
            .collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    print_outputs(&outputs);
    if state.is_empty() {
        println!();
        println!(
            "{}",
            "まだ適用されていません。stack up で作成してください。".yellow()
        );
    }

    Ok(())
}

pub(crate) fn print_outputs(outputs: &BTreeMap<String, Resolution>) {
    println!("{}", "Outputs:".bold());
    for (name, resolution) in outputs {
        let value = match &resolution.value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if resolution.complete {
            println!("  {} = {}", name.cyan(), value);
        } else {
            println!("  {} = {}", name.cyan(), value.dimmed());
        }
    }
}
