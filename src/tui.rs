use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::style::{Color, Modifier, Style};
use ratatui::Frame;

use crate::error::Result;

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const FOOTER_STYLE: Style = Style::new().fg(Color::DarkGray);

pub const TITLE_STYLE: Style = Style::new().add_modifier(Modifier::BOLD);

pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(40, 40, 60))
    .add_modifier(Modifier::BOLD);

pub const BAR_STYLE: Style = Style::new().fg(Color::Rgb(80, 220, 100));

/// Per-year bar colors in the seasonal chart; wraps when there are more years.
pub const SERIES_COLORS: [Color; 6] = [
    Color::Rgb(80, 220, 100),
    Color::Rgb(90, 160, 255),
    Color::Rgb(255, 180, 60),
    Color::Rgb(220, 100, 220),
    Color::Rgb(100, 220, 220),
    Color::Red,
];

/// Compact "12.5k" / "3M" rendering for chart values.
pub fn compact(val: u64) -> String {
    let v = val as f64;
    let (scaled, suffix) = if v >= 1_000_000.0 {
        (v / 1_000_000.0, "M")
    } else if v >= 1000.0 {
        (v / 1000.0, "k")
    } else {
        return val.to_string();
    };
    if scaled == scaled.floor() {
        format!("{}{suffix}", scaled as u64)
    } else {
        format!("{scaled:.1}{suffix}")
    }
}

// ---------------------------------------------------------------------------
// Screen infrastructure
// ---------------------------------------------------------------------------

pub enum ScreenAction {
    Continue,
    Close,
}

pub trait Screen {
    fn draw(&mut self, frame: &mut Frame);
    fn handle_key(&mut self, code: KeyCode) -> ScreenAction;
}

/// Run an interactive screen. Sets up the terminal, event loop and panic
/// hook, then restores the terminal on exit.
pub fn run_screen(screen: &mut dyn Screen) -> Result<()> {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));

    let mut terminal = ratatui::init();

    let result: Result<()> = loop {
        if let Err(e) = terminal.draw(|frame| screen.draw(frame)) {
            break Err(e.into());
        }

        match event::read() {
            Err(e) => break Err(e.into()),
            Ok(Event::Key(key)) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if key.modifiers.contains(KeyModifiers::CONTROL)
                    && key.code == KeyCode::Char('c')
                {
                    break Ok(());
                }
                match screen.handle_key(key.code) {
                    ScreenAction::Close => break Ok(()),
                    ScreenAction::Continue => {}
                }
            }
            _ => {}
        }
    };

    drop(terminal);
    ratatui::restore();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact() {
        assert_eq!(compact(0), "0");
        assert_eq!(compact(999), "999");
        assert_eq!(compact(1000), "1k");
        assert_eq!(compact(12_500), "12.5k");
        assert_eq!(compact(3_000_000), "3M");
    }
}
