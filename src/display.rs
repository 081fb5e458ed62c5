use crate::utils::text::{display_width, wrap_text};
use console::style;
use std::path::PathBuf;
use techne_ai::{
    ActiveConfiguration, AiError, ChatReply, ErrorCategory, ImageData, ImageGeneration,
    SoftFailure, StartupReport,
};
use termimad::MadSkin;

fn box_width() -> usize {
    let terminal_width = console::Term::stdout().size().1 as usize;
    std::cmp::min(terminal_width.saturating_sub(4), 100).max(50)
}

/// Prints `lines` inside a box titled `title`.
fn boxed(title: &str, lines: &[String]) {
    let width = box_width();
    let inner = width.saturating_sub(4);
    let header = format!("┌─ {} ", title);
    let header_fill = width.saturating_sub(display_width(&header) + 1);

    println!("{}{}", style(&header).dim(), style("─".repeat(header_fill) + "┐").dim());
    for line in lines.iter().flat_map(|l| wrap_text(l, inner)) {
        let padding = inner.saturating_sub(display_width(&line));
        println!("│ {}{} │", line, " ".repeat(padding));
    }
    println!("{}", style("└".to_string() + &"─".repeat(width.saturating_sub(2)) + "┘").dim());
}

/// Renders the reply as markdown, with provider, model and token usage around it.
pub fn display_response(reply: &ChatReply) {
    println!(
        "\n{} {}",
        style(format!("🤖 {}", reply.provider)).bold().blue(),
        style(&reply.model).dim()
    );
    let skin = MadSkin::default();
    skin.print_text(&reply.response);

    if let Some(usage) = reply.usage.filter(|u| !u.is_empty()) {
        let part = |n: Option<u32>| n.map(|n| n.to_string()).unwrap_or_else(|| "?".to_string());
        println!(
            "{}",
            style(format!(
                "tokens: {} in / {} out / {} total",
                part(usage.prompt_tokens),
                part(usage.completion_tokens),
                part(usage.total_tokens)
            ))
            .dim()
        );
    }
}

pub fn display_unavailable(failure: &SoftFailure) {
    println!("\n{} {}", style("⚠️").yellow(), style(&failure.error).bold().yellow());
    println!("{}", failure.content);
}

/// Errors are grouped by what the user can do about them.
pub fn display_error(err: &AiError) {
    let (title, hint) = match err.category() {
        ErrorCategory::NotConfigured => ("NOT CONFIGURED", "Add credentials or pick another provider."),
        ErrorCategory::Retryable => ("REQUEST FAILED", "This may be temporary; try again."),
        ErrorCategory::LocalServerUnreachable => (
            "LOCAL SERVER UNREACHABLE",
            "Check the local server and the URL (/local-url).",
        ),
        ErrorCategory::Unsupported => ("NOT SUPPORTED", "Switch to a provider that supports this."),
        ErrorCategory::Invalid => ("INVALID REQUEST", "Adjust the request and try again."),
    };
    println!("\n{}", style(format!("❌ {}", title)).bold().red());
    let lines: Vec<String> = err
        .user_message()
        .lines()
        .map(str::to_string)
        .chain(std::iter::once(String::new()))
        .chain(std::iter::once(hint.to_string()))
        .collect();
    boxed("error", &lines);
}

pub fn display_info(message: &str) {
    println!("{}", message);
}

pub fn display_welcome(config: &ActiveConfiguration) {
    let provider = config.provider.as_deref().unwrap_or("none");
    let model = config.model.as_deref().unwrap_or("-");
    println!(
        "{} {} {}",
        style("techne").bold().magenta(),
        style(format!("{} · {}", provider, model)).cyan(),
        style("(/help for commands)").dim()
    );
}

pub fn display_startup_report(report: &StartupReport, config: &ActiveConfiguration) {
    let lines: Vec<String> = report
        .entries()
        .iter()
        .map(|(kind, status)| format!("{:<11} {}", kind.name(), status))
        .collect();
    boxed("providers", &lines);

    println!(
        "default: {}  model: {}  temperature: {}  max tokens: {}",
        style(config.provider.as_deref().unwrap_or("none")).bold(),
        config.model.as_deref().unwrap_or("-"),
        config.temperature,
        config.max_tokens
    );
}

pub fn display_images(generation: &ImageGeneration, saved: &[PathBuf]) {
    println!(
        "\n{} {}",
        style(format!("🖼  {} image(s) from {}", generation.images.len(), generation.provider))
            .bold()
            .blue(),
        style(&generation.model).dim()
    );
    for path in saved {
        println!("  saved {}", style(path.display()).green());
    }
    for image in &generation.images {
        if let ImageData::Url(url) = &image.data {
            println!("  {}", style(url).underlined());
        }
    }
}
