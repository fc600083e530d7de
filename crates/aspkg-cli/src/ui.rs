//! Console output for the CLI.

use console::style;
use dialoguer::Input;
use tracing::warn;

/// Show the device code and send the user to the verification page.
pub fn present_code(code: &str, url: &str) {
    if let Err(e) = opener::open(url) {
        warn!(error = %e, "Could not open browser");
    }

    println!(
        "Enter the following code in your newly opened browser:\n\n{}\n",
        style(code).bold()
    );
    println!("{}", style("If your browser didn't open: ").red().bold());
    println!("Head over to {}\n", style(url).blue().bright().bold());
    println!("{}", style("Waiting for authorization... (Ctrl-C to cancel)").italic().dim());
}

pub fn success(message: &str) {
    println!("{}", style(message).green().bright());
}

pub fn already_authenticated() {
    success("You're already authenticated!");
    println!(
        "use {} to log out of your current session.",
        style("aspkg logout").blue().bright().bold()
    );
}

pub fn already_logged_out() {
    success("Already logged out.");
    println!(
        "use {} to log in before logging out!",
        style("aspkg login").blue().bright().bold()
    );
}

pub fn not_logged_in() {
    success("Not logged in!");
    println!(
        "This command is {} Use {} to log in!",
        style("logged-in-only.").bold(),
        style("aspkg login").blue().bright().bold()
    );
}

pub fn published(name: &str, version: &str, page: &str) {
    println!(
        "{} {}",
        style("Published").green().bright(),
        style(format!("{}@{}", name, version)).blue().bright().bold()
    );
    println!("{}", style(page).italic().dim());
}

pub fn failure(error: &anyhow::Error) {
    eprintln!("{} {:#}", style("Error:").red().bold(), error);
}

pub fn warning(message: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), message);
}

/// Ask for the version to publish. An empty answer keeps the current one.
pub fn prompt_version() -> anyhow::Result<String> {
    let version: String = Input::new()
        .with_prompt("New version")
        .allow_empty(true)
        .interact_text()?;
    Ok(version.trim().to_string())
}
