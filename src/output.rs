//! Terminal formatting for search pages and index statistics

use crate::hydrate::SearchHit;
use crate::index::stats::IndexStats;
use crate::page::Page;
use crate::utils::format_size;
use chrono::DateTime;
use std::io::{self, Write};
use std::path::Path;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Characters of the description shown under each hit
const SNIPPET_CHARS: usize = 160;

fn color_choice(color: bool) -> ColorChoice {
    if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

/// Print a page of hits, one block per hit followed by the page footer
pub fn print_page(page: &Page<SearchHit>, color: bool) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(color_choice(color));

    for (rank, hit) in page.items.iter().enumerate() {
        if rank > 0 {
            writeln!(stdout)?;
        }
        print_hit(&mut stdout, hit)?;
    }

    if !page.items.is_empty() {
        writeln!(stdout)?;
    }
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
    writeln!(
        stdout,
        "page {}/{} ({} per page, {} matches)",
        page.page_number, page.total_pages, page.page_size, page.total_items
    )?;
    stdout.reset()?;

    Ok(())
}

fn print_hit(stdout: &mut StandardStream, hit: &SearchHit) -> io::Result<()> {
    // Header: id, title and score
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    write!(stdout, "{}", hit.id)?;
    stdout.reset()?;
    write!(stdout, " ")?;
    stdout.set_color(ColorSpec::new().set_bold(true))?;
    write!(stdout, "{}", hit.title)?;
    stdout.reset()?;
    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
    writeln!(stdout, " [{:.3}]", hit.score)?;
    stdout.reset()?;

    stdout.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
    write!(stdout, "  {}", hit.url)?;
    stdout.reset()?;
    if hit.is_dangling() {
        stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)))?;
        write!(stdout, " (record missing)")?;
        stdout.reset()?;
    }
    writeln!(stdout)?;

    let snippet = snippet(&hit.description);
    if !snippet.is_empty() {
        writeln!(stdout, "  {}", snippet)?;
    }
    Ok(())
}

/// First line of `text`, cut at a char boundary
fn snippet(text: &str) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    match line.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &line[..cut]),
        None => line.to_string(),
    }
}

/// Display index statistics
pub fn print_stats(path: &Path, stats: &IndexStats, color: bool) -> io::Result<()> {
    let mut stdout = StandardStream::stdout(color_choice(color));
    write_stats(&mut stdout, path, stats)
}

fn write_stats(out: &mut impl WriteColor, path: &Path, stats: &IndexStats) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_bold(true))?;
    writeln!(out, "Index Statistics")?;
    writeln!(out, "================")?;
    out.reset()?;
    writeln!(out)?;
    writeln!(out, "Index location:   {}", path.display())?;
    writeln!(out, "Analyzer:         {}", stats.analyzer)?;
    writeln!(out, "Generation:       {}", stats.generation)?;
    writeln!(out, "Segments:         {}", stats.segments)?;
    write!(out, "Live documents:   ")?;
    out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
    writeln!(out, "{}", stats.live_docs)?;
    out.reset()?;
    write!(out, "Deleted (unmerged): ")?;
    if stats.deleted_docs > 0 {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
    }
    writeln!(out, "{}", stats.deleted_docs)?;
    out.reset()?;

    writeln!(out)?;
    writeln!(out, "Terms by field:")?;
    for (field, count) in &stats.terms {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        write!(out, "  {:15}", field.name())?;
        out.reset()?;
        writeln!(out, " {}", count)?;
    }

    writeln!(out)?;
    writeln!(out, "Index size:       {}", format_size(stats.size_bytes))?;
    writeln!(out)?;
    writeln!(out, "Created:          {}", format_timestamp(stats.created_at))?;
    writeln!(out, "Updated:          {}", format_timestamp(stats.updated_at))?;
    Ok(())
}

fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
