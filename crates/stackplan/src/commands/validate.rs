use crate::utils;
use colored::Colorize;
use stackplan_core::{ResourceKind, Severity, check_stack, has_errors};
use std::path::Path;

pub fn handle(file: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "スタックを検証中...".blue());

    let stack = match utils::load_stack(file) {
        Ok(stack) => stack,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };
    utils::print_source(&stack);

    let findings = check_stack(&stack.graph);
    for finding in &findings {
        match finding.severity {
            Severity::Error => eprintln!("  {} {}", "✗".red(), finding),
            Severity::Warning => eprintln!("  {} {}", "⚠".yellow(), finding),
        }
    }

    if has_errors(&findings) {
        eprintln!();
        eprintln!("{}", "✗ トポロジーにエラーがあります".red().bold());
        std::process::exit(1);
    }

    println!("{}", "✓ スタックは正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!(
        "  スタック: {} ({})",
        stack.config.params.service_name.cyan(),
        stack.config.region()
    );
    println!("  リソース: {}個", stack.graph.len());
    for kind in ResourceKind::ALL {
        let count = stack.graph.by_kind(kind).len();
        if count > 0 {
            println!("    - {} × {}", kind.to_string().cyan(), count);
        }
    }
    println!("  出力: {}個", stack.graph.outputs().len());

    Ok(())
}
