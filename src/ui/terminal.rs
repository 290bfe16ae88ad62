// Terminal Lifecycle
// Raw mode, alternate screen and restoring both on every exit path

use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, stdout, Stdout};
use std::panic;

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Enter raw mode and the alternate screen
///
/// On failure the terminal is restored before the error is returned.
pub fn init() -> io::Result<Tui> {
    enable_raw_mode()?;
    restore_on_err(enter())
}

/// Leave raw mode again when a later setup step failed
fn restore_on_err<T>(result: io::Result<T>) -> io::Result<T> {
    result.map_err(|e| {
        let _ = restore();
        e
    })
}

fn enter() -> io::Result<Tui> {
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    Terminal::new(CrosstermBackend::new(out))
}

/// Leave the alternate screen and raw mode; safe to call more than once
pub fn restore() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
    Ok(())
}

/// Restore the terminal before the previous panic hook prints its message
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::terminal::is_raw_mode_enabled;

    #[test]
    fn test_restore_is_idempotent() {
        restore().unwrap();
        restore().unwrap();
        assert!(!is_raw_mode_enabled().unwrap());
    }

    #[test]
    fn test_failed_setup_leaves_raw_mode_off() {
        let result: io::Result<()> = restore_on_err(Err(io::Error::other("alternate screen refused")));
        assert_eq!(result.unwrap_err().to_string(), "alternate screen refused");
        assert!(!is_raw_mode_enabled().unwrap());
    }
}
