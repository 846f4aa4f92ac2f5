use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};

use crate::app::{App, View};

/// Default export file, written to the working directory.
pub const EXPORT_FILE: &str = "sqlscope_export.json";

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind == KeyEventKind::Release {
        return;
    }
    app.mark_dirty();

    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    // While editing the query, keys go to the input
    if app.query.editing {
        handle_query_input(app, key);
        return;
    }

    match key.code {
        // Quit
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        // View switching
        KeyCode::Tab => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.prev_view();
            } else {
                app.next_view();
            }
        }
        KeyCode::BackTab => app.prev_view(),
        KeyCode::Left | KeyCode::Char('h') => app.prev_view(),
        KeyCode::Right | KeyCode::Char('l') => app.next_view(),

        // Direct view access
        KeyCode::Char('1') => app.set_view(View::Architecture),
        KeyCode::Char('2') => app.set_view(View::QueryFlow),
        KeyCode::Char('3') => app.set_view(View::Performance),
        KeyCode::Char('4') => app.set_view(View::Demo),

        // Refresh over REST
        KeyCode::Char('r') => app.refresh(),

        // Help
        KeyCode::Char('?') => app.toggle_help(),

        // Export
        KeyCode::Char('e') => {
            let export_path = std::path::PathBuf::from(EXPORT_FILE);
            match app.export_state(&export_path) {
                Ok(()) => {
                    app.set_status_message(format!("Exported to {}", export_path.display()));
                }
                Err(e) => {
                    app.set_status_message(format!("Export failed: {}", e));
                }
            }
        }

        _ => match app.current_view {
            View::QueryFlow => handle_query_view_key(app, key),
            View::Demo => handle_demo_view_key(app, key),
            View::Architecture | View::Performance => {}
        },
    }
}

/// Keys specific to the Query Flow view
fn handle_query_view_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('i') => app.start_editing(),
        KeyCode::Enter | KeyCode::Char('x') => app.execute_query(),
        KeyCode::Char('s') => app.next_sample(),
        KeyCode::Char('c') => app.clear_query(),
        _ => {}
    }
}

/// Keys specific to the Demo view
fn handle_demo_view_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('s') | KeyCode::Enter => app.start_demo(),
        KeyCode::Char('x') | KeyCode::Esc => app.stop_demo(),
        _ => {}
    }
}

/// Handle key input while the query input is active
fn handle_query_input(app: &mut App, key: KeyEvent) {
    match key.code {
        // Run the query
        KeyCode::Enter => {
            app.stop_editing();
            app.execute_query();
        }

        // Leave the input, keeping its text
        KeyCode::Esc => app.stop_editing(),

        // Clear and exit
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.clear_query();
            app.stop_editing();
        }

        KeyCode::Backspace => app.input_pop(),

        // Type characters
        KeyCode::Char(c) => app.input_push(c),

        _ => {}
    }
}

/// Which tab a column of the tab bar belongs to.
///
/// Mirrors the layout of [`crate::ui::common::render_tabs`]: each title is
/// padded by one space on both sides and tabs are separated by a one-column
/// divider.
pub fn tab_at_column(column: u16) -> Option<View> {
    let mut start = 0u16;
    for view in View::ALL {
        let width = crate::ui::common::tab_title(view).chars().count() as u16 + 2;
        if column < start + width {
            return Some(view);
        }
        start += width + 1;
    }
    None
}

/// Handle mouse events
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent, tabs_row: u16) {
    if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
        if mouse.row == tabs_row {
            if let Some(view) = tab_at_column(mouse.column) {
                app.set_view(view);
            }
        }
    }
}
