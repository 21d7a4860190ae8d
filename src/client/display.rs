//! Display surfaces and the screens drawn on them.
//!
//! The client targets a 128x64 monochrome panel that only draws 8x8 text.
//! Every screen is a list of [`TextLine`]s with pixel origins; drawing one
//! always clears the surface first, so nothing from a previous screen
//! survives.

use std::io::{self, Write};
use tracing::info;

use crate::error::ClientError;
use crate::snapshot::AllMetrics;

pub const DISPLAY_WIDTH: i32 = 128;
pub const DISPLAY_HEIGHT: i32 = 64;
pub const GLYPH_SIZE: i32 = 8;

/// Characters that fit on one line.
pub const LINE_CHARS: usize = (DISPLAY_WIDTH / GLYPH_SIZE) as usize;

/// Y origins of the five metric lines.
pub const METRIC_ROWS: [i32; 5] = [0, 12, 26, 38, 50];

/// Driver operations the client needs from a display.
pub trait DisplaySurface {
    fn clear(&mut self);
    fn draw_text(&mut self, text: &str, x: i32, y: i32);
    fn flush(&mut self) -> io::Result<()>;
}

impl<S: DisplaySurface + ?Sized> DisplaySurface for Box<S> {
    fn clear(&mut self) {
        (**self).clear()
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        (**self).draw_text(text, x, y)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// One line of text at a pixel origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLine {
    pub x: i32,
    pub y: i32,
    pub text: String,
}

impl TextLine {
    pub fn new(x: i32, y: i32, text: impl Into<String>) -> Self {
        Self {
            x,
            y,
            text: text.into(),
        }
    }
}

/// A full-screen layout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Screen {
    pub lines: Vec<TextLine>,
}

impl Screen {
    /// Lines stacked from the top at 12 px spacing.
    fn stacked(texts: &[&str]) -> Self {
        Screen {
            lines: texts
                .iter()
                .enumerate()
                .map(|(i, t)| TextLine::new(0, i as i32 * 12, *t))
                .collect(),
        }
    }

    /// Time, address, CPU+temperature, RAM and swap.
    pub fn metrics(data: &AllMetrics) -> Self {
        let texts = [
            data.current_time.clone(),
            data.ip_address.clone(),
            format!("CPU: {} {}", data.cpu_usage, data.soc_temperature),
            format!("RAM: {}/{}", data.used_ram, data.total_ram),
            format!("VM: {}/{}", data.used_swap, data.total_swap),
        ];

        Screen {
            lines: METRIC_ROWS
                .iter()
                .zip(texts)
                .map(|(y, text)| TextLine::new(0, *y, text))
                .collect(),
        }
    }

    /// Single-line indicator shown when a fetch fails.
    pub fn fetch_error(err: &ClientError) -> Self {
        Screen::stacked(&[&err.short_message()])
    }

    pub fn awaiting_network() -> Self {
        Screen::stacked(&["Awaiting network"])
    }

    pub fn connected() -> Self {
        Screen::stacked(&["Connected!"])
    }

    pub fn sending_shutdown() -> Self {
        Screen::stacked(&["Sending shutdown", "request..."])
    }

    pub fn shutdown_accepted() -> Self {
        Screen::stacked(&["Server shutting", "down in 1 min"])
    }

    pub fn sending_update() -> Self {
        Screen {
            lines: vec![
                TextLine::new(0, 0, "Sending update"),
                TextLine::new(0, 12, "request..."),
                TextLine::new(0, 36, "This might take"),
                TextLine::new(0, 48, "a long time..."),
            ],
        }
    }

    pub fn update_accepted() -> Self {
        Screen::stacked(&["Server is", "updating..."])
    }

    /// Outcome of a rejected or failed privileged request.
    pub fn action_failed(err: &ClientError) -> Self {
        match err.status_code() {
            Some(code) => Screen::stacked(&[&format!("FAILED: HTTP {code}"), err.detail()]),
            None => Screen::stacked(&["Error occurred", "when sending req"]),
        }
    }

    /// Clears `display`, draws every line clipped to the panel and flushes.
    pub fn draw(&self, display: &mut dyn DisplaySurface) -> io::Result<()> {
        display.clear();
        for line in &self.lines {
            if line.y < 0 || line.y + GLYPH_SIZE > DISPLAY_HEIGHT {
                continue;
            }
            let visible = ((DISPLAY_WIDTH - line.x).max(0) / GLYPH_SIZE) as usize;
            let text: String = line.text.chars().take(visible).collect();
            display.draw_text(&text, line.x, line.y);
        }
        display.flush()
    }
}

/// In-memory surface; `lines()` returns what the last flush showed.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: Vec<TextLine>,
    shown: Vec<TextLine>,
    flushes: usize,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.shown
    }

    pub fn texts(&self) -> Vec<&str> {
        self.shown.iter().map(|l| l.text.as_str()).collect()
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl DisplaySurface for FrameBuffer {
    fn clear(&mut self) {
        self.pending.clear();
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        self.pending.push(TextLine::new(x, y, text));
    }

    fn flush(&mut self) -> io::Result<()> {
        self.shown = self.pending.clone();
        self.flushes += 1;
        Ok(())
    }
}

/// Redraws the panel as a 16x8 character grid on a terminal.
pub struct TerminalDisplay<W: Write> {
    out: W,
    grid: Vec<Vec<char>>,
}

impl TerminalDisplay<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalDisplay<W> {
    const ROWS: usize = (DISPLAY_HEIGHT / GLYPH_SIZE) as usize;

    pub fn new(out: W) -> Self {
        Self {
            out,
            grid: vec![vec![' '; LINE_CHARS]; Self::ROWS],
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DisplaySurface for TerminalDisplay<W> {
    fn clear(&mut self) {
        for row in &mut self.grid {
            row.fill(' ');
        }
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        // Round the pixel origin to the nearest character cell
        let row = ((y + GLYPH_SIZE / 2) / GLYPH_SIZE).clamp(0, Self::ROWS as i32 - 1) as usize;
        let col = (x / GLYPH_SIZE).max(0) as usize;
        for (i, ch) in text.chars().enumerate() {
            if let Some(cell) = self.grid[row].get_mut(col + i) {
                *cell = ch;
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        // Clear the terminal and home the cursor
        write!(self.out, "\x1b[2J\x1b[H")?;
        writeln!(self.out, "+{}+", "-".repeat(LINE_CHARS))?;
        for row in &self.grid {
            writeln!(self.out, "|{}|", row.iter().collect::<String>())?;
        }
        writeln!(self.out, "+{}+", "-".repeat(LINE_CHARS))?;
        self.out.flush()
    }
}

/// Logs each flushed frame instead of drawing it.
#[derive(Debug, Default)]
pub struct LogDisplay {
    lines: Vec<TextLine>,
}

impl DisplaySurface for LogDisplay {
    fn clear(&mut self) {
        self.lines.clear();
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        self.lines.push(TextLine::new(x, y, text));
    }

    fn flush(&mut self) -> io::Result<()> {
        let frame: Vec<&str> = self.lines.iter().map(|l| l.text.as_str()).collect();
        info!(target: "display", "{}", frame.join(" | "));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AllMetrics {
        AllMetrics {
            current_time: "Oct 17 09:05:31".into(),
            ip_address: "192.168.1.42".into(),
            cpu_usage: "7%".into(),
            soc_temperature: "48.3C".into(),
            total_ram: "3792MiB".into(),
            used_ram: "512".into(),
            total_swap: "100MiB".into(),
            used_swap: "0".into(),
        }
    }

    #[test]
    fn test_metrics_screen_layout() {
        let mut fb = FrameBuffer::new();
        Screen::metrics(&sample()).draw(&mut fb).unwrap();

        let lines = fb.lines();
        assert_eq!(lines.len(), 5);
        assert!(lines.iter().all(|l| !l.text.is_empty() && l.x == 0));
        assert_eq!(
            lines.iter().map(|l| l.y).collect::<Vec<_>>(),
            METRIC_ROWS.to_vec()
        );
        assert_eq!(lines[2].text, "CPU: 7% 48.3C");
        assert_eq!(lines[3].text, "RAM: 512/3792MiB");
        assert_eq!(lines[4].text, "VM: 0/100MiB");
    }

    #[test]
    fn test_error_screen_replaces_metrics() {
        let mut fb = FrameBuffer::new();
        Screen::metrics(&sample()).draw(&mut fb).unwrap();
        Screen::fetch_error(&ClientError::MalformedBody("eof".into()))
            .draw(&mut fb)
            .unwrap();

        assert_eq!(fb.texts(), vec!["Invalid JSON"]);
        assert_eq!(fb.flushes(), 2);
    }

    #[test]
    fn test_lines_are_clipped_to_panel_width() {
        let mut fb = FrameBuffer::new();
        let screen = Screen {
            lines: vec![
                TextLine::new(0, 0, "0123456789abcdefXYZ"),
                TextLine::new(64, 12, "0123456789"),
                TextLine::new(0, 60, "below the panel"),
            ],
        };
        screen.draw(&mut fb).unwrap();

        assert_eq!(fb.texts(), vec!["0123456789abcdef", "01234567"]);
    }

    #[test]
    fn test_action_failed_screens() {
        let screen = Screen::action_failed(&ClientError::Unauthorized);
        assert_eq!(screen.lines[0].text, "FAILED: HTTP 401");
        assert_eq!(screen.lines[1].text, "Unauthorized");

        let screen = Screen::action_failed(&ClientError::HttpStatus {
            code: 500,
            body: "Shutdown failed".into(),
        });
        assert_eq!(screen.lines[0].text, "FAILED: HTTP 500");
        assert_eq!(screen.lines[1].text, "Shutdown failed");
    }

    #[test]
    fn test_terminal_display_grid() {
        let mut term = TerminalDisplay::new(Vec::new());
        Screen::metrics(&sample()).draw(&mut term).unwrap();
        let out = String::from_utf8(term.into_inner()).unwrap();

        assert!(out.contains("|Oct 17 09:05:31 |"));
        assert!(out.contains("|CPU: 7% 48.3C   |"));
        // frame border plus 8 rows
        assert_eq!(out.lines().count(), 10);
    }
}
