mod command_overlay;
mod header;
mod panels;
mod utils;

use crate::app::{App, Mode};
use chrono::Utc;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  header::draw_header(
    frame,
    chunks[0],
    app.title(),
    app.user_id(),
    app.is_foreground(),
  );

  draw_dashboard(frame, chunks[1], app);

  if *app.mode() == Mode::Command {
    command_overlay::draw_command_overlay(
      frame,
      chunks[1],
      app.command_input(),
      &app.autocomplete_suggestions(),
      app.selected_suggestion(),
    );
  }

  draw_status_bar(frame, chunks[2], app);
}

fn draw_dashboard(frame: &mut Frame, area: Rect, app: &App) {
  let cache = app.cache();
  let now = Utc::now();

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
    .split(area);
  let top = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
    .split(rows[0]);

  panels::draw_subscription(frame, top[0], &cache.subscription().snapshot(), now);
  panels::draw_active_plans(frame, top[1], &cache.active_plans().snapshot(), now);
  panels::draw_profile_picture(frame, rows[1], &cache.profile_picture().snapshot(), now);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let (content, style) = match (app.mode(), app.status()) {
    (Mode::Command, _) => (
      format!(":{}", app.command_input()),
      Style::default().fg(Color::Yellow),
    ),
    (Mode::Normal, Some(status)) => (format!(" {}", status), Style::default().fg(Color::White)),
    (Mode::Normal, None) => {
      let failed = app.failed_resources();
      if failed.is_empty() {
        let hint = " r:refresh  :command  q:quit";
        (hint.to_string(), Style::default().fg(Color::DarkGray))
      } else {
        let names: Vec<&str> = failed.iter().map(|r| r.as_str()).collect();
        (
          format!(" Last refresh failed for {}", names.join(", ")),
          Style::default().fg(Color::Red),
        )
      }
    }
  };

  let paragraph = Paragraph::new(content).style(style);
  frame.render_widget(paragraph, area);
}
