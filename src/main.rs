//! `command-palette` - drive the palette from a terminal.
//!
//! Loads a catalog, applies a query, lists what matches and optionally runs
//! the active command. A remote command's response is streamed to stdout as
//! it arrives; the finished preview is inserted into an in-memory field (or
//! copied to the system clipboard with `--copy`).

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use command_palette::config::{load_config, load_config_from};
use command_palette::logging;
use command_palette::palette::{Palette, PreviewPhase, StatusVariant};
use command_palette::surface::{MemoryPlainField, SurfaceHandle};

const STREAM_POLL: Duration = Duration::from_millis(20);

#[derive(Parser, Debug)]
#[command(name = "command-palette")]
#[command(about = "Search and run palette commands from the terminal", long_about = None)]
struct Cli {
    /// Catalog file: a JSON array of `{label, items}` groups
    catalog: PathBuf,

    /// Config file (defaults to ~/.command-palette/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Query typed into the palette
    #[arg(short, long, default_value = "")]
    query: String,

    /// Run the active command (or submit the query when nothing matches)
    #[arg(short, long)]
    run: bool,

    /// Make this list position active before running
    #[arg(long)]
    select: Option<usize>,

    /// Initial content of the field the result is inserted into
    #[arg(long, default_value = "")]
    field: String,

    /// Copy the result to the system clipboard instead of inserting it
    #[arg(long)]
    copy: bool,

    /// Print the filtered list as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let _guard = logging::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    };
    let catalog = std::fs::read_to_string(&cli.catalog)
        .with_context(|| format!("Failed to read catalog {}", cli.catalog.display()))?;

    let mut palette = Palette::new(config);
    for skipped in palette.set_catalog_json(&catalog)? {
        eprintln!("warning: {}", skipped);
    }

    let field = SurfaceHandle::plain(MemoryPlainField::new(cli.field.clone()));
    palette.open_with_target(Some(field.clone()));
    palette.set_query(&cli.query);
    if let Some(position) = cli.select {
        palette.hover(position);
    }

    print_list(&palette, cli.json)?;
    if !cli.run {
        return Ok(());
    }

    palette.activate();
    stream_preview(&mut palette)?;

    if palette.state().preview_phase != PreviewPhase::Ready {
        print_status(&palette);
        return Ok(());
    }

    if cli.copy {
        palette.copy_preview();
        print_status(&palette);
        return Ok(());
    }

    if let Some(result) = palette.insert_preview() {
        info!(method = result.method, success = result.success, "CLI insert finished");
        if result.success {
            println!("{}", field.text());
        } else {
            print_status(&palette);
        }
    }
    Ok(())
}

fn print_list(palette: &Palette, as_json: bool) -> Result<()> {
    let view = palette.view();

    if as_json {
        let items: Vec<serde_json::Value> = view
            .items
            .iter()
            .map(|item| {
                serde_json::json!({
                    "title": item.title,
                    "description": item.description,
                    "group": item.group,
                    "tags": item.tags,
                    "active": item.active,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if let Some(message) = &view.empty_message {
        println!("{}", message);
    }
    for item in &view.items {
        let marker = if item.active { ">" } else { " " };
        let tags = if item.tags.is_empty() {
            String::new()
        } else {
            format!("  #{}", item.tags.join(" #"))
        };
        println!("{} [{}] {}{}", marker, item.group, item.title, tags);
    }
    Ok(())
}

/// Echo streamed text to stdout until the preview settles.
fn stream_preview(palette: &mut Palette) -> Result<()> {
    let mut stdout = std::io::stdout();
    let mut shown = String::new();

    while palette.state().is_streaming() {
        palette.pump();
        let text = palette.preview().text();
        if text.len() > shown.len() && text.starts_with(shown.as_str()) {
            write!(stdout, "{}", &text[shown.len()..])?;
            stdout.flush()?;
            shown = text.to_string();
        }
        if palette.state().is_streaming() {
            std::thread::sleep(STREAM_POLL);
        }
    }

    match final_echo(&shown, palette.preview().text()) {
        FinalEcho::Nothing => {}
        FinalEcho::Append(rest) => write!(stdout, "{}", rest)?,
        FinalEcho::Replace(text) => {
            if !shown.is_empty() {
                writeln!(stdout)?;
            }
            write!(stdout, "{}", text)?;
        }
    }
    if !palette.preview().text().is_empty() {
        writeln!(stdout, "\n---")?;
    }
    print_status(palette);
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum FinalEcho<'a> {
    Nothing,
    /// Shown text is a prefix of the final preview
    Append(&'a str),
    /// The final preview replaced what streamed (fallback or buffered body)
    Replace(&'a str),
}

fn final_echo<'a>(shown: &str, final_text: &'a str) -> FinalEcho<'a> {
    if shown == final_text {
        FinalEcho::Nothing
    } else if !shown.is_empty() && final_text.starts_with(shown) {
        FinalEcho::Append(&final_text[shown.len()..])
    } else {
        FinalEcho::Replace(final_text)
    }
}

fn print_status(palette: &Palette) {
    let Some(status) = &palette.state().status else {
        return;
    };
    let label = match status.variant {
        StatusVariant::Info => "info",
        StatusVariant::Success => "ok",
        StatusVariant::Warning => "warning",
        StatusVariant::Danger => "error",
    };
    eprintln!("{}: {}", label, status.message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffered_completion_is_echoed_when_nothing_streamed() {
        assert_eq!(final_echo("", r#"{"status":"ok"}"#), FinalEcho::Replace(r#"{"status":"ok"}"#));
    }

    #[test]
    fn fallback_replaces_streamed_text() {
        assert_eq!(final_echo("garbled", "Thanks!"), FinalEcho::Replace("Thanks!"));
    }

    #[test]
    fn streamed_text_is_not_repeated() {
        assert_eq!(final_echo("Hello", "Hello"), FinalEcho::Nothing);
        assert_eq!(final_echo("Hel", "Hello"), FinalEcho::Append("lo"));
        assert_eq!(final_echo("", ""), FinalEcho::Nothing);
    }

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::parse_from(["command-palette", "catalog.json", "-q", "sum", "-r", "--copy"]);
        assert_eq!(cli.query, "sum");
        assert!(cli.run && cli.copy && !cli.json);
    }
}
