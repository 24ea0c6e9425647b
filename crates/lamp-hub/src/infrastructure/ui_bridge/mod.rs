//! Console bridge: a text stand-in for the panel's touchscreen.
//!
//! The hub runs headless.  This module gives it a minimal user interface on
//! the terminal:
//!
//! - **Input** – typing `lamp-nrf` or `lamp-esp` followed by Enter presses
//!   the corresponding panel button.  Anything else is ignored.
//! - **Output** – whenever a widget's view changes, one line such as
//!   `SEEED ESP32S3: yellow (lit)` is logged at info level.
//!
//! ```text
//!   stdin ──line──► parse_line ──UserButton──► event loop ──► GuiShell::press
//!   GuiShell::views ──► ConsoleView::update ──► info! line per changed widget
//! ```

use lamp_core::{
    protocol::messages::{DEVICE_LAMP_ESP, DEVICE_LAMP_NRF},
    UserButton,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::application::widgets::{WidgetColor, WidgetView};

// ── Input ─────────────────────────────────────────────────────────────────────

/// Maps one console line to a panel button.
pub fn parse_line(line: &str) -> Option<UserButton> {
    match line.trim() {
        DEVICE_LAMP_NRF => Some(UserButton::LampNrfOnOff),
        DEVICE_LAMP_ESP => Some(UserButton::LampEspOn),
        _ => None,
    }
}

/// Forwards button presses read from `reader` until EOF or until the
/// receiving side goes away.
pub async fn read_commands<R>(reader: R, tx: mpsc::Sender<UserButton>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_line(&line) {
                Some(button) => {
                    if tx.send(button).await.is_err() {
                        break;
                    }
                }
                None => debug!(line = %line, "console: ignored input"),
            },
            Ok(None) => break,
            Err(e) => {
                debug!("console: stdin closed: {e}");
                break;
            }
        }
    }
}

/// Spawns a task reading button presses from the process's stdin.
pub fn spawn_stdin_reader(tx: mpsc::Sender<UserButton>) -> JoinHandle<()> {
    tokio::spawn(read_commands(BufReader::new(tokio::io::stdin()), tx))
}

// ── Output ────────────────────────────────────────────────────────────────────

/// Remembers what the console last showed so only changes are printed.
#[derive(Debug, Default)]
pub struct ConsoleView {
    last: Vec<WidgetView>,
}

impl ConsoleView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs every view that differs from the previous call and returns the
    /// printed lines.
    pub fn update(&mut self, views: &[WidgetView]) -> Vec<String> {
        let lines: Vec<String> = views
            .iter()
            .enumerate()
            .filter(|(i, view)| self.last.get(*i) != Some(*view))
            .map(|(_, view)| render(view))
            .collect();
        for line in &lines {
            info!("{line}");
        }
        self.last = views.to_vec();
        lines
    }
}

fn render(view: &WidgetView) -> String {
    let bulb = if view.lamp_lit { " (lit)" } else { "" };
    let dim = match view.color {
        WidgetColor::Blue => "",
        WidgetColor::Grey => " [grey]",
    };
    format!("{}: {}{}{}", view.title, view.text, bulb, dim)
}
