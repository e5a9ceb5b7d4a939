use colored::*;
use eventsource::MessageEvent;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Running count of received events per type.
#[derive(Clone, Default)]
pub struct Tally(Arc<Mutex<BTreeMap<String, usize>>>);

impl Tally {
    pub fn record(&self, event: &MessageEvent) {
        let mut counts = self.0.lock().unwrap_or_else(|e| e.into_inner());
        *counts.entry(event.event_type.clone()).or_default() += 1;
    }

    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Payload as printed: pretty JSON when it parses, the raw text otherwise.
pub fn format_payload(data: &str) -> String {
    serde_json::from_str::<Value>(data)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| data.to_string())
}

/// Human readable text of a `stream-error` payload (`{"condition": .., "text": ..}`).
pub fn stream_error_text(data: &str) -> String {
    let text = serde_json::from_str::<Value>(data).ok().and_then(|value| {
        let condition = value.get("condition")?.as_str()?.to_string();
        let text = value.get("text").and_then(Value::as_str).unwrap_or("");
        Some(format!("{condition}: {text}"))
    });
    text.unwrap_or_else(|| data.to_string())
}

pub fn print_connected(url: &str) {
    println!("{} connected to {}", "✓".green(), url.bright_white());
}

pub fn print_disconnected(message: &str) {
    println!("{} connection lost ({}), reconnecting", "✗".red(), message.dimmed());
}

pub fn print_event(event: &MessageEvent) {
    let id = event
        .last_event_id
        .as_deref()
        .map(|id| format!(" id={id}"))
        .unwrap_or_default();

    println!(
        "\n[{}]{}",
        event.event_type.yellow().bold(),
        id.dimmed()
    );

    if !event.data.is_empty() {
        for line in format_payload(&event.data).lines() {
            println!("   {}", line);
        }
    }
}

pub fn print_stream_reset() {
    println!(
        "{} server could not resume from the last event, state may be stale",
        "!".yellow().bold()
    );
}

pub fn print_stream_error(data: &str) {
    println!(
        "{} {}",
        "stream error".red().bold(),
        stream_error_text(data).red()
    );
}

pub fn print_summary(tally: &Tally, last_event_id: Option<&str>) {
    println!("\n{}", "=== SUMMARY ===".bright_white().bold());

    let counts = tally.counts();
    if counts.is_empty() {
        println!("{}", "no events received".dimmed());
    }
    for (event_type, count) in &counts {
        println!("{:>16}  {}", event_type.yellow(), count.to_string().green());
    }

    if let Some(id) = last_event_id {
        println!("\n{}: {}", "Resume with".bold(), format!("--last-event-id '{id}'").cyan());
    }
}
