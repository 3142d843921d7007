//! Application state for the userportal terminal client.
//!
//! `App` owns the auth coordinator and the navigator, the state of the login
//! and sign-up forms, and the feedback line shown after each action.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use userportal_core::auth::{AuthCoordinator, SubmitError};
use userportal_core::forms::{FormErrors, LoginForm, SignUpForm};
use userportal_core::router::{Navigator, RouteOutcome, View, HOME_PATH, LOGIN_PATH, SIGNUP_PATH};
use userportal_core::Config;

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for email input.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Delay before leaving the sign-up view after an account is created
const SIGNUP_REDIRECT_DELAY: Duration = Duration::from_millis(1500);

pub const LOGIN_SUCCESS: &str = "Login successful! Redirecting...";
pub const LOGIN_FAILED: &str = "Invalid email or password.";
pub const SIGNUP_SUCCESS: &str = "Account created successfully. Redirecting to login...";
pub const SIGNUP_FAILED: &str = "Error creating account.";
pub const LOGOUT_DONE: &str = "You have been logged out successfully.";
pub const SESSION_EXPIRED: &str = "Your session has expired. Please log in again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormFocus {
    Email,
    Password,
    Submit,
    /// "Sign Up" / "Login" link to the other form
    Link,
}

impl FormFocus {
    pub fn next(self) -> Self {
        match self {
            FormFocus::Email => FormFocus::Password,
            FormFocus::Password => FormFocus::Submit,
            FormFocus::Submit => FormFocus::Link,
            FormFocus::Link => FormFocus::Email,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            FormFocus::Email => FormFocus::Link,
            FormFocus::Password => FormFocus::Email,
            FormFocus::Submit => FormFocus::Password,
            FormFocus::Link => FormFocus::Submit,
        }
    }
}

/// Request queued by input handling, run after the busy frame is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SubmitLogin,
    SubmitSignup,
    Logout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub text: String,
}

impl Feedback {
    fn new(kind: FeedbackKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }
}

/// Input state of one email/password form
#[derive(Debug, Clone)]
pub struct FormFields {
    pub email: String,
    pub password: String,
    pub focus: FormFocus,
    pub errors: FormErrors,
}

impl FormFields {
    fn new(email: String) -> Self {
        let focus = if email.is_empty() {
            FormFocus::Email
        } else {
            FormFocus::Password
        };
        Self {
            email,
            password: String::new(),
            focus,
            errors: FormErrors::default(),
        }
    }

    pub fn push_char(&mut self, c: char) {
        if c.is_control() {
            return;
        }
        match self.focus {
            FormFocus::Email if self.email.len() < MAX_EMAIL_LENGTH => self.email.push(c),
            FormFocus::Password if self.password.len() < MAX_PASSWORD_LENGTH => {
                self.password.push(c)
            }
            _ => {}
        }
    }

    pub fn pop_char(&mut self) {
        match self.focus {
            FormFocus::Email => {
                self.email.pop();
            }
            FormFocus::Password => {
                self.password.pop();
            }
            FormFocus::Submit | FormFocus::Link => {}
        }
    }
}

pub struct App {
    pub config: Config,
    pub auth: AuthCoordinator,
    pub navigator: Navigator,

    pub state: AppState,
    /// Outcome of the last route resolution, what gets drawn
    pub route: RouteOutcome,

    pub login: FormFields,
    pub signup: FormFields,
    pub feedback: Option<Feedback>,
    /// Set while a request is queued or in flight
    pub busy: bool,

    pending_action: Option<Action>,
    pending_redirect: Option<(Instant, &'static str)>,
    config_path: Option<PathBuf>,
}

impl App {
    /// Create a new application instance
    pub fn new(config: Config) -> Result<Self> {
        let auth = config.auth_coordinator()?;
        let config_path = match Config::config_path() {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "No config directory, last email will not be saved");
                None
            }
        };
        Ok(Self::with_coordinator(config, auth, config_path))
    }

    /// Build around an existing coordinator. `config_path` is where the last
    /// used email is saved, if anywhere.
    pub fn with_coordinator(
        config: Config,
        auth: AuthCoordinator,
        config_path: Option<PathBuf>,
    ) -> Self {
        let navigator = Navigator::new(HOME_PATH, auth.session().subscribe());
        let email = config.last_email.clone().unwrap_or_default();

        Self {
            auth,
            navigator,
            state: AppState::Normal,
            route: RouteOutcome::Waiting,
            login: FormFields::new(email),
            signup: FormFields::new(String::new()),
            feedback: None,
            busy: false,
            pending_action: None,
            pending_redirect: None,
            config,
            config_path,
        }
    }

    /// Restore any saved session. The waiting screen is shown until this returns.
    pub async fn initialize(&mut self) {
        self.auth.initialize().await;
        self.sync_route();
    }

    /// Process session events and timers, then resolve the route
    pub fn tick(&mut self) {
        for event in self.navigator.poll_session_events() {
            let was_authenticated = self.auth.is_authenticated();
            self.auth.handle_session_event(event);
            // A rejected login also ends the (empty) session; keep its message
            if was_authenticated {
                self.feedback = Some(Feedback::new(FeedbackKind::Error, SESSION_EXPIRED));
            }
        }

        if let Some((deadline, path)) = self.pending_redirect {
            if Instant::now() >= deadline {
                self.pending_redirect = None;
                self.navigator.navigate(path);
            }
        }

        self.sync_route();
    }

    fn sync_route(&mut self) {
        self.route = self.navigator.current(&self.auth.state());
    }

    pub fn current_view(&self) -> Option<View> {
        match self.route {
            RouteOutcome::Render(view) => Some(view),
            _ => None,
        }
    }

    /// Form for the current view, if it has one
    pub fn active_form(&mut self) -> Option<&mut FormFields> {
        match self.current_view() {
            Some(View::Login) => Some(&mut self.login),
            Some(View::SignUp) => Some(&mut self.signup),
            _ => None,
        }
    }

    /// Follow the link under a form to the other form
    pub fn follow_link(&mut self) {
        let target = match self.current_view() {
            Some(View::Login) => SIGNUP_PATH,
            Some(View::SignUp) => LOGIN_PATH,
            _ => return,
        };
        self.feedback = None;
        self.pending_redirect = None;
        self.navigator.navigate(target);
        self.sync_route();
    }

    /// Queue a request; the main loop runs it via `run_pending`
    pub fn request(&mut self, action: Action) {
        self.pending_action = Some(action);
        self.busy = true;
    }

    pub async fn run_pending(&mut self) {
        if let Some(action) = self.pending_action.take() {
            match action {
                Action::SubmitLogin => self.submit_login().await,
                Action::SubmitSignup => self.submit_signup().await,
                Action::Logout => self.logout().await,
            }
        }
        self.busy = false;
    }

    /// Attempt login with the credentials from the login form
    async fn submit_login(&mut self) {
        self.feedback = None;
        let form = LoginForm::new(&self.login.email, &self.login.password);

        let result = self.auth.submit_login(&form).await;

        match result {
            Ok(_) => {
                self.login.errors = FormErrors::default();
                self.login.password.clear();
                self.feedback = Some(Feedback::new(FeedbackKind::Success, LOGIN_SUCCESS));
                self.remember_email(&form.email);
            }
            Err(SubmitError::Invalid(errors)) => {
                debug!(%errors, "Login form invalid");
                self.login.errors = errors;
            }
            Err(SubmitError::Api(e)) => {
                error!(error = %e, "Login failed");
                self.login.errors = FormErrors::default();
                let text = e.user_message().unwrap_or(LOGIN_FAILED);
                self.feedback = Some(Feedback::new(FeedbackKind::Error, text));
            }
        }
        self.sync_route();
    }

    /// Create an account from the sign-up form, then head to login
    async fn submit_signup(&mut self) {
        self.feedback = None;
        let form = SignUpForm::new(&self.signup.email, &self.signup.password);

        let result = self.auth.register(&form).await;

        match result {
            Ok(()) => {
                self.signup.errors = FormErrors::default();
                self.signup.password.clear();
                self.login.email = form.email;
                self.login.focus = FormFocus::Password;
                self.feedback = Some(Feedback::new(FeedbackKind::Success, SIGNUP_SUCCESS));
                self.pending_redirect = Some((Instant::now() + SIGNUP_REDIRECT_DELAY, LOGIN_PATH));
            }
            Err(SubmitError::Invalid(errors)) => {
                debug!(%errors, "Sign-up form invalid");
                self.signup.errors = errors;
            }
            Err(SubmitError::Api(e)) => {
                error!(error = %e, "Sign-up failed");
                self.signup.errors = FormErrors::default();
                let text = e.user_message().unwrap_or(SIGNUP_FAILED);
                self.feedback = Some(Feedback::new(FeedbackKind::Error, text));
            }
        }
    }

    async fn logout(&mut self) {
        self.feedback = None;
        self.auth.logout().await;
        self.feedback = Some(Feedback::new(FeedbackKind::Info, LOGOUT_DONE));
        info!("Logged out");
        self.sync_route();
    }

    fn remember_email(&mut self, email: &str) {
        if self.config.last_email.as_deref() == Some(email) {
            return;
        }
        self.config.last_email = Some(email.to_string());
        let Some(path) = self.config_path.as_deref() else {
            return;
        };
        if let Err(e) = self.config.save_to(path) {
            warn!(error = %e, "Failed to save config");
        }
    }

    // =========================================================================
    // Command-line modes
    // =========================================================================

    /// Interactive login on the plain terminal (`--login`)
    pub async fn login_interactive(&mut self) -> Result<()> {
        let email = Self::prompt_email(self.config.last_email.as_deref())?;
        let password = rpassword::prompt_password("Password: ")?;

        let form = LoginForm::new(&email, &password);
        match self.auth.submit_login(&form).await {
            Ok(Some(user)) => {
                self.remember_email(&user.email);
                println!("Logged in as {} (joined {})", user.email, user.joined_display());
                Ok(())
            }
            Ok(None) => Err(anyhow::anyhow!("Logged in, but the profile could not be loaded")),
            Err(SubmitError::Invalid(errors)) => Err(anyhow::anyhow!("{}", errors)),
            Err(SubmitError::Api(e)) => {
                let message = e.user_message().unwrap_or(LOGIN_FAILED).to_string();
                Err(anyhow::Error::new(e).context(message))
            }
        }
    }

    /// Print who is logged in (`--status`)
    pub async fn print_status(&mut self) -> Result<()> {
        self.initialize().await;
        match self.auth.user() {
            Some(user) => println!("Logged in as {} (joined {})", user.email, user.joined_display()),
            None => println!("Not logged in"),
        }
        Ok(())
    }

    /// Restore the saved session, if any, and end it (`--logout`)
    pub async fn logout_command(&mut self) -> Result<()> {
        self.initialize().await;
        self.logout().await;
        println!("{}", LOGOUT_DONE);
        Ok(())
    }

    fn prompt_email(default: Option<&str>) -> Result<String> {
        match default {
            Some(d) => print!("Email [{}]: ", d),
            None => print!("Email: "),
        }
        io::stdout().flush()?;
        let mut email = String::new();
        io::stdin()
            .read_line(&mut email)
            .context("Failed to read email")?;
        let email = email.trim();
        Ok(match (email.is_empty(), default) {
            (true, Some(d)) => d.to_string(),
            _ => email.to_string(),
        })
    }
}
