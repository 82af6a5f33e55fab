// Terminal UI utilities

use colored::Colorize;

use crate::commands::ServiceOutcome;
use crate::domain::UpstreamRoute;

pub fn print_header(title: &str) {
    println!();
    println!(
        "{}",
        "╔════════════════════════════════════════════════════════════╗".bright_blue()
    );
    println!("{}", format!("║  {:<58}║", title).bright_blue());
    println!(
        "{}",
        "╚════════════════════════════════════════════════════════════╝".bright_blue()
    );
    println!();
}

pub fn print_success(message: &str) {
    println!("{}", format!("✅ {}", message).bright_green().bold());
}

pub fn print_error(message: &str) {
    eprintln!("{}", format!("❌ {}", message).bright_red().bold());
}

pub fn print_info(message: &str) {
    println!("{}", format!("ℹ️  {}", message).bright_cyan());
}

pub fn print_warning(message: &str) {
    println!("{}", format!("⚠️  {}", message).bright_yellow());
}

/// One row per service; failures are followed by their error text
pub fn print_results(outcomes: &[ServiceOutcome]) {
    println!();
    println!("{}", format!("{:<30} {:<8} {:>8}", "SERVICE", "RESULT", "TIME").bold());

    for outcome in outcomes {
        let result = if outcome.succeeded() {
            "ok".bright_green()
        } else {
            "failed".bright_red()
        };
        println!(
            "{:<30} {:<8} {:>7.1}s",
            outcome.service,
            result,
            outcome.elapsed.as_secs_f64()
        );
    }

    for outcome in outcomes {
        if let Some(ref error) = outcome.error {
            println!();
            print_error(&format!("{}:", outcome.service));
            for line in error.lines() {
                eprintln!("   {}", line.dimmed());
            }
        }
    }
    println!();
}

/// The dev-proxy routing table
pub fn print_routes(routes: &[UpstreamRoute]) {
    if routes.is_empty() {
        print_info("No local services configured");
        return;
    }

    println!(
        "{}",
        format!(
            "{:<24} {:>9} {:>9} {:>10}  {}",
            "SERVICE", "UPSTREAM", "LOCAL", "CLUSTER", "HEALTH"
        )
        .bold()
    );
    for route in routes {
        println!(
            "{:<24} {:>9} {:>9} {:>10}  {}",
            route.service, route.upstream_port, route.local_port, route.kubernetes_port, route.health_check_path
        );
    }
    println!();
}
