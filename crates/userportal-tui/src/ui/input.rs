use crossterm::event::{KeyCode, KeyEvent};

use userportal_core::router::{RouteOutcome, View};

use crate::app::{Action, App, AppState, FormFocus};

/// Handle keyboard input. Returns true if the app should quit.
/// Network requests are queued on the app, not run here.
pub fn handle_input(app: &mut App, key: KeyEvent) -> bool {
    match app.route {
        RouteOutcome::Render(View::Home) => handle_home_input(app, key),
        RouteOutcome::Render(view) => handle_form_input(app, view, key),
        RouteOutcome::Waiting | RouteOutcome::Redirect(_) => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('q')) {
                app.state = AppState::Quitting;
                return true;
            }
            false
        }
    }
}

fn handle_home_input(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => {
            app.state = AppState::Quitting;
            return true;
        }
        KeyCode::Enter | KeyCode::Char('l') => app.request(Action::Logout),
        _ => {}
    }
    false
}

fn handle_form_input(app: &mut App, view: View, key: KeyEvent) -> bool {
    let Some(form) = app.active_form() else {
        return false;
    };

    match key.code {
        KeyCode::Esc => {
            app.state = AppState::Quitting;
            return true;
        }
        KeyCode::Down | KeyCode::Tab => {
            form.focus = form.focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            form.focus = form.focus.prev();
        }
        KeyCode::Enter => match form.focus {
            FormFocus::Email => form.focus = FormFocus::Password,
            FormFocus::Password | FormFocus::Submit => {
                form.focus = FormFocus::Submit;
                let action = match view {
                    View::SignUp => Action::SubmitSignup,
                    _ => Action::SubmitLogin,
                };
                app.request(action);
            }
            FormFocus::Link => app.follow_link(),
        },
        KeyCode::Backspace => form.pop_char(),
        KeyCode::Char(c) => form.push_char(c),
        _ => {}
    }
    false
}
