use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use userportal_core::router::{RouteOutcome, View};

use crate::app::{App, FormFields, FormFocus};

use super::styles;

/// Width of the login/sign-up dialog
const FORM_WIDTH: u16 = 52;

/// Visible width of a text field
const FIELD_WIDTH: usize = 28;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);

    match app.route {
        RouteOutcome::Render(View::Login) => render_form(frame, app, &app.login, View::Login, chunks[1]),
        RouteOutcome::Render(View::SignUp) => {
            render_form(frame, app, &app.signup, View::SignUp, chunks[1])
        }
        RouteOutcome::Render(View::Home) => render_home(frame, app, chunks[1]),
        RouteOutcome::Waiting | RouteOutcome::Redirect(_) => render_waiting(frame, chunks[1]),
    }

    render_status_bar(frame, app, chunks[2]);
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  userportal";
    let location = app.navigator.path();

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            area.width
                .saturating_sub(title.len() as u16 + location.len() as u16 + 4)
                as usize,
        )),
        Span::styled(location.to_string(), styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_waiting(frame: &mut Frame, area: Rect) {
    let area = centered_rect_fixed(30, 3, area);
    let paragraph = Paragraph::new(Line::from(Span::styled(
        "Loading...",
        styles::muted_style(),
    )))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).border_style(styles::muted_style()));
    frame.render_widget(paragraph, area);
}

fn field_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::field_style()
    };
    // The cursor takes one column of the field when focused
    let (cursor, width) = if focused {
        ("▌", FIELD_WIDTH - 1)
    } else {
        ("", FIELD_WIDTH)
    };
    // Show the tail of long values so the cursor stays visible
    let shown: String = {
        let count = value.chars().count();
        value.chars().skip(count.saturating_sub(width)).collect()
    };
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{:<9}[", label), styles::muted_style()),
        Span::styled(format!("{:<width$}{}", shown, cursor, width = width), style),
        Span::styled("]", styles::muted_style()),
    ])
}

fn field_error_line(error: Option<&'static str>) -> Option<Line<'static>> {
    error.map(|message| {
        Line::from(Span::styled(
            format!("           {}", message),
            styles::error_style(),
        ))
    })
}

fn render_form(frame: &mut Frame, app: &App, form: &FormFields, view: View, area: Rect) {
    let (heading, button, prompt, link) = match view {
        View::SignUp => ("Create Your Account", "Sign Up", "Already have an account?", "Login"),
        _ => ("Welcome Back", "Login", "Don't have an account?", "Sign Up"),
    };

    let mut lines = vec![
        Line::from(Span::styled(heading, styles::title_style())).alignment(Alignment::Center),
        Line::from(""),
    ];

    if let Some(ref feedback) = app.feedback {
        lines.push(
            Line::from(Span::styled(
                feedback.text.clone(),
                styles::feedback_style(feedback.kind),
            ))
            .alignment(Alignment::Center),
        );
        lines.push(Line::from(""));
    }

    lines.push(field_line("Email:", &form.email, form.focus == FormFocus::Email));
    lines.extend(field_error_line(form.errors.email));

    let masked = "*".repeat(form.password.chars().count());
    lines.push(field_line("Password:", &masked, form.focus == FormFocus::Password));
    lines.extend(field_error_line(form.errors.password));

    lines.push(Line::from(""));
    let button_label = if app.busy {
        format!("   {}...   ", button)
    } else if form.focus == FormFocus::Submit {
        format!(" ▶ {} ◀ ", button)
    } else {
        format!("   {}   ", button)
    };
    let button_style = if form.focus == FormFocus::Submit {
        styles::selected_style()
    } else {
        styles::field_style()
    };
    lines.push(
        Line::from(vec![
            Span::raw("["),
            Span::styled(button_label, button_style),
            Span::raw("]"),
        ])
        .alignment(Alignment::Center),
    );

    lines.push(Line::from(""));
    lines.push(
        Line::from(vec![
            Span::styled(format!("{} ", prompt), styles::muted_style()),
            Span::styled(link, styles::link_style(form.focus == FormFocus::Link)),
        ])
        .alignment(Alignment::Center),
    );

    let height = lines.len() as u16 + 2;
    let area = centered_rect_fixed(FORM_WIDTH, height, area);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_home(frame: &mut Frame, app: &App, area: Rect) {
    let Some(user) = app.auth.user() else {
        let paragraph = Paragraph::new("Loading user data...").style(styles::muted_style());
        frame.render_widget(paragraph, area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(
            format!("Welcome, {}!", user.email),
            styles::title_style(),
        ))
        .alignment(Alignment::Center),
        Line::from(Span::styled(
            "This is your protected dashboard.",
            styles::muted_style(),
        ))
        .alignment(Alignment::Center),
        Line::from(""),
    ];

    if let Some(ref feedback) = app.feedback {
        lines.push(
            Line::from(Span::styled(
                feedback.text.clone(),
                styles::feedback_style(feedback.kind),
            ))
            .alignment(Alignment::Center),
        );
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(" Your Profile", styles::title_style())));
    lines.push(Line::from(vec![
        Span::styled(" Email:  ", styles::muted_style()),
        Span::styled(user.email.clone(), styles::field_style()),
    ]));
    lines.push(Line::from(vec![
        Span::styled(" Joined: ", styles::muted_style()),
        Span::styled(user.joined_display(), styles::field_style()),
    ]));
    lines.push(Line::from(""));

    let logout_label = if app.busy { "  Logging out...  " } else { " ▶ Logout ◀ " };
    lines.push(
        Line::from(vec![
            Span::raw("["),
            Span::styled(logout_label, styles::selected_style()),
            Span::raw("]"),
        ])
        .alignment(Alignment::Center),
    );

    let height = lines.len() as u16 + 2;
    let area = centered_rect_fixed(FORM_WIDTH + 8, height, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let hints = match app.route {
        RouteOutcome::Render(View::Home) => " [Enter/l] Logout  [q] Quit",
        RouteOutcome::Render(_) => " [Tab] Next field  [Enter] Select  [Esc] Quit",
        _ => " [Esc] Quit",
    };

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(styles::muted_style());
    let paragraph = Paragraph::new(Line::from(Span::styled(hints, styles::muted_style()))).block(block);
    frame.render_widget(paragraph, area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fits_inside() {
        let outer = Rect::new(0, 0, 40, 10);
        let inner = centered_rect_fixed(52, 12, outer);
        assert_eq!(inner.width, 40);
        assert_eq!(inner.height, 10);

        let inner = centered_rect_fixed(20, 4, Rect::new(0, 0, 40, 10));
        assert_eq!((inner.x, inner.y), (10, 3));
    }

    #[test]
    fn test_field_line_shows_tail_of_long_value() {
        let value = "x".repeat(FIELD_WIDTH) + "END";
        let line = field_line("Email:", &value, false);
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(text.contains("END"));
    }

    #[test]
    fn test_focused_field_keeps_width() {
        let width = |line: Line<'static>| -> usize {
            line.spans.iter().map(|s| s.content.chars().count()).sum()
        };
        let long = "x".repeat(FIELD_WIDTH + 5);
        for value in ["", "a@b.com", long.as_str()] {
            assert_eq!(
                width(field_line("Email:", value, true)),
                width(field_line("Email:", value, false))
            );
        }
    }
}
