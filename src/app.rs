use crate::activity::ActivitySignal;
use crate::cache::{DataCache, Resource};
use crate::commands::{self, Command};
use crate::config::Config;
use crate::event::{Event, EventHandler, SessionEvent};
use crate::session::Session;
use crate::ui;
use color_eyre::Result;
use crossterm::event::{DisableFocusChange, EnableFocusChange, KeyCode, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Command,
}

/// Main application state
pub struct App {
  /// Current input mode
  mode: Mode,

  /// Command input buffer (after pressing :)
  command_input: String,

  /// Selected autocomplete suggestion index
  selected_suggestion: usize,

  /// Application configuration
  config: Config,

  /// Signed-in session
  session: Arc<Session>,

  /// Terminal focus, fed to the session cache
  activity: ActivitySignal,

  /// One-line feedback for the last command
  status: Option<String>,

  /// Event sender for async tasks
  event_tx: mpsc::UnboundedSender<Event>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let activity = ActivitySignal::new(true);
    let session = Arc::new(Session::connect(&config, &activity)?);
    let (tx, _rx) = mpsc::unbounded_channel();

    Ok(Self {
      mode: Mode::Normal,
      command_input: String::new(),
      selected_suggestion: 0,
      config,
      session,
      activity,
      status: None,
      event_tx: tx,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableFocusChange)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create event handler
    let mut events = EventHandler::new(Duration::from_millis(250));
    self.event_tx = events.sender();

    // Initial data load
    self.refresh_all();

    // Main loop
    while !self.should_quit {
      // Draw UI
      terminal.draw(|frame| ui::draw(frame, self))?;

      // Handle events
      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }

    self.session.end();

    // Cleanup terminal
    stdout().execute(DisableFocusChange)?;
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn refresh_all(&self) {
    let session = Arc::clone(&self.session);
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let outcomes = session.refresh_all().await;
      let failed = outcomes.iter().filter(|(_, r)| r.is_failed()).count();
      let _ = tx.send(Event::Session(SessionEvent::Refreshed { failed }));
    });
  }

  fn enroll(&self, plan: String) {
    let session = Arc::clone(&self.session);
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let event = match session.enroll(&plan).await {
        Ok(cached) => SessionEvent::Enrolled { plan, cached },
        Err(error) => SessionEvent::EnrollFailed { plan, error },
      };
      let _ = tx.send(Event::Session(event));
    });
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Focus(foreground) => self.activity.set_foreground(foreground),
      Event::Tick => {} // UI refresh happens automatically
      Event::Session(session_event) => self.handle_session_event(session_event),
    }
  }

  fn handle_session_event(&mut self, event: SessionEvent) {
    self.status = Some(match event {
      SessionEvent::Refreshed { failed: 0 } => "Refreshed".to_string(),
      SessionEvent::Refreshed { failed } => format!("Refresh finished, {} failed", failed),
      SessionEvent::Enrolled { plan, cached: true } => format!("Enrolled in {}", plan),
      SessionEvent::Enrolled { plan, cached: false } => {
        format!("Enrolled in {}, but the session has ended", plan)
      }
      SessionEvent::EnrollFailed { plan, error } => {
        warn!(%plan, %error, "enrollment failed");
        format!("Could not enroll in {}: {}", plan, error)
      }
    });
  }

  fn handle_key(&mut self, key: crossterm::event::KeyEvent) {
    match self.mode {
      Mode::Normal => self.handle_normal_mode_key(key),
      Mode::Command => self.handle_command_mode_key(key),
    }
  }

  fn handle_normal_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    match key.code {
      KeyCode::Char('q') => self.should_quit = true,
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }
      KeyCode::Char('r') => {
        self.status = Some("Refreshing...".to_string());
        self.refresh_all();
      }
      KeyCode::Char(':') => {
        self.mode = Mode::Command;
        self.command_input.clear();
      }
      _ => {}
    }
  }

  fn handle_command_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }
      KeyCode::Enter => {
        self.execute_command();
        self.mode = Mode::Normal;
        self.selected_suggestion = 0;
      }
      KeyCode::Tab | KeyCode::Down => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = (self.selected_suggestion + 1) % suggestions.len();
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            suggestions.len() - 1
          } else {
            self.selected_suggestion - 1
          };
        }
      }
      KeyCode::Backspace => {
        self.command_input.pop();
        self.selected_suggestion = 0; // Reset selection on input change
      }
      KeyCode::Char(c) => {
        self.command_input.push(c);
        self.selected_suggestion = 0; // Reset selection on input change
      }
      _ => {}
    }
  }

  fn execute_command(&mut self) {
    let input = std::mem::take(&mut self.command_input);
    let invocation = commands::parse(&input);

    // Use the highlighted suggestion for the command word, keep the typed argument
    let suggestions = commands::get_suggestions(&input);
    let cmd = match suggestions.get(self.selected_suggestion) {
      Some(suggestion) => suggestion.name.to_string(),
      None => invocation.word.to_lowercase(),
    };

    match cmd.as_str() {
      "refresh" => {
        self.status = Some("Refreshing...".to_string());
        self.refresh_all();
      }
      "enroll" => match invocation.arg {
        Some(plan) => {
          self.status = Some(format!("Enrolling in {}...", plan));
          self.enroll(plan.to_string());
        }
        None => self.status = Some("Usage: enroll <plan-id>".to_string()),
      },
      "clear" => {
        self.session.cache().invalidate_all();
        self.status = Some("Cache cleared".to_string());
      }
      "logout" => {
        info!("logout requested");
        self.should_quit = true;
      }
      "quit" => {
        self.should_quit = true;
      }
      other => {
        self.status = Some(format!("Unknown command: {}", other));
      }
    }
  }

  // Accessors for UI rendering
  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn command_input(&self) -> &str {
    &self.command_input
  }

  pub fn cache(&self) -> &DataCache {
    self.session.cache()
  }

  pub fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  pub fn is_foreground(&self) -> bool {
    self.activity.is_foreground()
  }

  pub fn title(&self) -> &str {
    self
      .config
      .title
      .as_deref()
      .unwrap_or(&self.config.api.url)
  }

  pub fn user_id(&self) -> &str {
    &self.config.api.user_id
  }

  pub fn autocomplete_suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.command_input)
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected_suggestion
  }

  /// Resources whose last refresh failed
  pub fn failed_resources(&self) -> Vec<Resource> {
    Resource::ALL
      .into_iter()
      .filter(|r| self.cache().last_error(*r).is_some())
      .collect()
  }
}
