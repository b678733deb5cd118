//! Welcome banner shown when the chat starts.

use std::time::Duration;

use console::style;
use uuid::Uuid;

/// Print who is signed in, which assistant answers, and the open session.
pub fn print_welcome_banner(email: &str, endpoint: &str, session_id: Uuid, timeout: Duration) {
    println!();
    println!("  * {}", style("Broker Assistant").cyan().bold());
    println!("  {}", style(email).dim());
    println!();
    println!("  {}  {}", style("Assistant:").bold(), style(display_endpoint(endpoint)).dim());
    println!(
        "  {}    {}",
        style("Timeout:").bold(),
        style(format!("{}s", timeout.as_secs_f32())).dim()
    );
    println!(
        "  {}    {}",
        style("Session:").bold(),
        style(&session_id.to_string()[..8]).dim()
    );
    println!();
    println!("  {}", style("Type /help for commands, Ctrl+D to exit").dim());
    println!("  {}", style("---").dim());
    println!();
}

/// Endpoint without its query string, which may carry credentials.
fn display_endpoint(endpoint: &str) -> &str {
    endpoint.split('?').next().unwrap_or(endpoint)
}
