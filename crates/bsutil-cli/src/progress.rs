use std::io::{self, Write};

use bsutil_merge::{Progress, SourceProgress};
use colored::Colorize;

const BAR_WIDTH: usize = 40;

/// Prints a status line per source and a byte progress bar on stderr.
pub struct TextProgress {
    quiet: bool,
    total: u64,
    done: u64,
    drawn: Option<u64>,
}

impl TextProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            total: 0,
            done: 0,
            drawn: None,
        }
    }

    fn draw(&mut self) {
        let percent = percent(self.done, self.total);
        if self.drawn == Some(percent) {
            return;
        }
        self.drawn = Some(percent);
        let line = render_bar(self.done, self.total);
        let mut err = io::stderr().lock();
        // Progress output is best effort.
        let _ = write!(err, "\r{line}");
        let _ = err.flush();
    }
}

impl Progress for TextProgress {
    fn source_started(&mut self, source: &SourceProgress) {
        if self.quiet {
            return;
        }
        println!(
            "Merging {}... ({}/{})",
            source.path.display().to_string().bold(),
            source.index,
            source.total_sources
        );
    }

    fn start(&mut self, total_bytes: u64) {
        self.total = total_bytes;
        self.done = 0;
        self.drawn = None;
        if !self.quiet {
            self.draw();
        }
    }

    fn advance(&mut self, bytes: u64) {
        self.done += bytes;
        if !self.quiet {
            self.draw();
        }
    }

    fn finish(&mut self) {
        if self.quiet {
            return;
        }
        self.drawn = None;
        self.draw();
        eprintln!();
    }
}

/// Whole percent of `done` against `total`, capped at 100. The total is an
/// estimate, so `done` may overshoot it.
fn percent(done: u64, total: u64) -> u64 {
    if total == 0 {
        return 100;
    }
    (done.saturating_mul(100) / total).min(100)
}

fn render_bar(done: u64, total: u64) -> String {
    let percent = percent(done, total);
    let filled = (percent as usize * BAR_WIDTH) / 100;
    format!(
        "[{}{}] {:>3}% {} / {}",
        "=".repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        percent,
        format_bytes(done),
        format_bytes(total)
    )
}

/// Human-readable binary size, e.g. `1.5 MiB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
