//! Output formatting for CLI

use kino_player::{BackendType, ContentType, DrmType, UnifiedEvent};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output format options
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Format output based on selected format
pub fn format_output<T: Serialize>(data: &T, format: &str) -> String {
    match OutputFormat::from(format) {
        OutputFormat::Json => {
            serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
        }
        OutputFormat::Table | OutputFormat::Text => {
            serde_json::to_string(data).unwrap_or_default()
        }
    }
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Tabled)]
pub struct CapabilityRow {
    #[tabled(rename = "Backend")]
    backend: String,
    #[tabled(rename = "DRM types")]
    drm_types: String,
    #[tabled(rename = "Content types")]
    content_types: String,
    #[tabled(rename = "Adverts")]
    adverts: String,
}

impl CapabilityRow {
    pub fn new(
        backend: BackendType,
        drm_types: &[DrmType],
        content_types: &[ContentType],
        adverts: bool,
    ) -> Self {
        Self {
            backend: backend.to_string(),
            drm_types: join(drm_types),
            content_types: join(content_types),
            adverts: if adverts { "yes" } else { "no" }.to_string(),
        }
    }
}

#[derive(Tabled)]
struct EventRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Payload")]
    payload: String,
}

pub fn table<R: Tabled>(rows: impl IntoIterator<Item = R>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Payload of a unified event without its kind tag
fn payload(event: &UnifiedEvent) -> String {
    match serde_json::to_value(event) {
        Ok(mut value) => match value.get_mut("event").map(serde_json::Value::take) {
            Some(serde_json::Value::Null) | None => String::new(),
            Some(inner) => inner.to_string(),
        },
        Err(e) => format!("<unserializable: {e}>"),
    }
}

/// Print recorded unified events in the selected format
pub fn print_events(events: &[UnifiedEvent], format: &str) -> anyhow::Result<()> {
    match OutputFormat::from(format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(events)?),
        OutputFormat::Table => {
            let rows = events.iter().enumerate().map(|(index, event)| EventRow {
                index,
                kind: event.kind().to_string(),
                payload: payload(event),
            });
            println!("{}", table(rows));
        }
        OutputFormat::Text => {
            for (index, event) in events.iter().enumerate() {
                println!("{index:>3}  {:<22} {}", event.kind().to_string(), payload(event));
            }
        }
    }
    Ok(())
}
