//! One panel per cached resource.
//!
//! Cached values stay on screen while a refresh runs or after it fails;
//! only the panel's status line changes.

use chrono::{DateTime, Utc};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};

use super::utils::{format_age, subscription_status_color, truncate};
use crate::api::{ActivePlans, ProfilePicture, Subscription};
use crate::cache::Snapshot;

/// Status line for a resource: fetch progress, age, staleness and last error.
pub fn status_line<T>(snapshot: &Snapshot<T>, now: DateTime<Utc>) -> Line<'static> {
  let mut spans = Vec::new();

  if snapshot.fetch_state.is_loading {
    spans.push(Span::styled("loading...", Style::default().fg(Color::Yellow)));
  } else if snapshot.fetch_state.is_refreshing {
    spans.push(Span::styled("refreshing...", Style::default().fg(Color::Yellow)));
  } else if let Some(at) = snapshot.fetched_at {
    let age = format_age(at, now);
    let style = if snapshot.is_stale {
      Style::default().fg(Color::DarkGray).italic()
    } else {
      Style::default().fg(Color::DarkGray)
    };
    spans.push(Span::styled(format!("updated {}", age), style));
  } else {
    spans.push(Span::styled("not loaded", Style::default().fg(Color::DarkGray)));
  }

  if let Some(error) = &snapshot.error {
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
      format!("! {}", truncate(&error.to_string(), 60)),
      Style::default().fg(Color::Red),
    ));
  }

  Line::from(spans)
}

fn panel(title: &'static str) -> Block<'static> {
  Block::default()
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray))
    .title(Span::styled(title, Style::default().fg(Color::Cyan).bold()))
}

fn split_status(area: Rect) -> (Rect, Rect) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Min(0), Constraint::Length(1)])
    .split(area);
  (chunks[0], chunks[1])
}

pub fn draw_subscription(
  frame: &mut Frame,
  area: Rect,
  snapshot: &Snapshot<Subscription>,
  now: DateTime<Utc>,
) {
  let block = panel(" Subscription ");
  let inner = block.inner(area);
  frame.render_widget(block, area);
  let (body, status) = split_status(inner);

  let lines = match &snapshot.value {
    None => vec![],
    Some(Subscription::None) => vec![Line::styled(
      "No active subscription",
      Style::default().fg(Color::White),
    )],
    Some(Subscription::Active(details)) => {
      let mut lines = vec![
        Line::from(vec![
          Span::styled("Tier    ", Style::default().fg(Color::DarkGray)),
          Span::styled(details.tier.clone(), Style::default().fg(Color::White).bold()),
        ]),
        Line::from(vec![
          Span::styled("Status  ", Style::default().fg(Color::DarkGray)),
          Span::styled(
            details.status.clone(),
            Style::default().fg(subscription_status_color(&details.status)),
          ),
        ]),
      ];
      if let Some(product) = &details.product_name {
        lines.push(Line::from(vec![
          Span::styled("Product ", Style::default().fg(Color::DarkGray)),
          Span::raw(product.clone()),
        ]));
      }
      if let Some(end) = details.current_period_end {
        lines.push(Line::from(vec![
          Span::styled("Renews  ", Style::default().fg(Color::DarkGray)),
          Span::raw(end.format("%Y-%m-%d").to_string()),
        ]));
      }
      lines
    }
  };

  frame.render_widget(Paragraph::new(lines), body);
  frame.render_widget(Paragraph::new(status_line(snapshot, now)), status);
}

pub fn draw_active_plans(
  frame: &mut Frame,
  area: Rect,
  snapshot: &Snapshot<ActivePlans>,
  now: DateTime<Utc>,
) {
  let block = panel(" Active plans ");
  let inner = block.inner(area);
  frame.render_widget(block, area);
  let (body, status) = split_status(inner);

  match &snapshot.value {
    Some(plans) if plans.is_empty() => {
      let empty = Paragraph::new("Not enrolled in any plan")
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(empty, body);
    }
    Some(plans) => {
      let items: Vec<ListItem> = plans
        .iter()
        .map(|plan| ListItem::new(format!("• {}", plan)))
        .collect();
      frame.render_widget(List::new(items), body);
    }
    None => {}
  }

  frame.render_widget(Paragraph::new(status_line(snapshot, now)), status);
}

pub fn draw_profile_picture(
  frame: &mut Frame,
  area: Rect,
  snapshot: &Snapshot<ProfilePicture>,
  now: DateTime<Utc>,
) {
  let block = panel(" Profile picture ");
  let inner = block.inner(area);
  frame.render_widget(block, area);
  let (body, status) = split_status(inner);

  let text = match &snapshot.value {
    Some(ProfilePicture { url: Some(url) }) => Line::styled(url.clone(), Style::default().fg(Color::White)),
    Some(ProfilePicture { url: None }) => {
      Line::styled("No picture uploaded", Style::default().fg(Color::DarkGray))
    }
    None => Line::default(),
  };

  frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }), body);
  frame.render_widget(Paragraph::new(status_line(snapshot, now)), status);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::FetchError;
  use crate::cache::FetchState;

  fn text(line: &Line) -> String {
    line.spans.iter().map(|s| s.content.as_ref()).collect()
  }

  fn snapshot(fetched_at: Option<DateTime<Utc>>) -> Snapshot<u32> {
    Snapshot {
      value: fetched_at.map(|_| 1),
      fetched_at,
      error: None,
      fetch_state: FetchState::default(),
      is_stale: false,
    }
  }

  #[test]
  fn test_status_line_not_loaded() {
    assert_eq!(text(&status_line(&snapshot(None), Utc::now())), "not loaded");
  }

  #[test]
  fn test_status_line_loading_and_refreshing() {
    let now = Utc::now();
    let mut snap = snapshot(None);
    snap.fetch_state.is_loading = true;
    assert_eq!(text(&status_line(&snap, now)), "loading...");

    let mut snap = snapshot(Some(now));
    snap.fetch_state.is_refreshing = true;
    assert_eq!(text(&status_line(&snap, now)), "refreshing...");
  }

  #[test]
  fn test_status_line_shows_age_and_error() {
    let now = Utc::now();
    let mut snap = snapshot(Some(now - chrono::Duration::minutes(7)));
    snap.error = Some(FetchError::upstream(403, "forbidden"));

    let line = text(&status_line(&snap, now));
    assert!(line.starts_with("updated 7m ago"));
    assert!(line.contains("! upstream error 403: forbidden"));
  }
}
