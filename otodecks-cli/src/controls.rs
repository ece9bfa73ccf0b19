use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use otodecks_lib::diagnostics::reporter::DeckReport;
use otodecks_lib::tools::format_duration;
use otodecks_lib::{Deck, TransportControl};

/// One-line status for a deck.
pub fn status_text(label: &str, report: Option<&DeckReport>) -> String {
    let Some(report) = report else {
        return format!("{}: --", label);
    };
    if report.relative_position.is_none() {
        return format!("{}: empty", label);
    }

    let state = if report.playing { "▶" } else { "⏸" };
    let percent = report.relative_position.unwrap_or(0.0) * 100.0;
    let looping = if report.looping { " loop" } else { "" };
    format!(
        "{}: {} {} / {} ({:>5.1}%){}",
        label,
        state,
        format_duration(report.position),
        format_duration(report.length),
        percent,
        looping
    )
}

fn toggle_playback(deck: &Deck) {
    if deck.is_playing() {
        deck.stop();
    } else {
        deck.start();
    }
}

/// Poll one key press. Returns false when the user asked to quit.
pub fn handle_key_event(deck_a: &Deck, deck_b: &Deck) -> bool {
    if event::poll(Duration::from_millis(100)).unwrap_or(false) {
        if let Ok(Event::Key(key)) = event::read() {
            if key.kind != KeyEventKind::Press {
                return true;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    deck_a.stop();
                    deck_b.stop();
                    return false;
                }
                KeyCode::Char('1') => toggle_playback(deck_a),
                KeyCode::Char('2') => toggle_playback(deck_b),
                KeyCode::Char('l') => {
                    deck_a.toggle_looping();
                }
                KeyCode::Char('k') => {
                    deck_b.toggle_looping();
                }
                _ => {}
            }
        }
    }

    true
}
