//! Welcome banner printed once before the first prompt.

use console::style;

pub const WELCOME: &str = "Welcome to the Priceless Chatbot! Type 'exit' to stop.";

pub fn print_welcome_banner(model: &str, indexed_chunks: u64) {
    println!();
    println!("  {}", style(WELCOME).cyan().bold());
    println!(
        "  {}  {}",
        style("Model:").bold(),
        style(model).dim()
    );
    println!(
        "  {}  {}",
        style("Index:").bold(),
        style(format!("{indexed_chunks} chunks")).dim()
    );
    println!();
}
