//! Turns one calendar event into a notification candidate, or
//! classifies it as non-qualifying.

use anyhow::{Error, Result};
use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use handlebars::Handlebars;
use regex::Regex;
use serde_json::json;

use crate::google::calendar::{CalendarEvent, EventStart};
use crate::pipeline::directory::PhoneDirectory;

/// A parsed, not-yet-sent notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationCandidate {
    pub recipient_name: String,
    pub phone_number: String,
    pub message: String,
}

/// Outcome of examining one event.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// No `*Name*` marker in the summary; nobody asked to be notified
    NonQualifying,
    /// Marked for notification but unusable
    Invalid {
        recipient_name: String,
        reason: String,
    },
    Candidate(NotificationCandidate),
}

/// Placeholders the template may reference; anything else renders `?`.
const KNOWN_PLACEHOLDERS: &[&str] = &["eventSummary", "recipientName", "replyTo", "date", "time"];

pub struct CandidateBuilder<'a> {
    directory: &'a PhoneDirectory,
    default_tz: Tz,
    template: String,
    reply_to: String,
    max_chars: usize,
    marker: Regex,
    placeholder: Regex,
    registry: Handlebars<'static>,
}

impl<'a> CandidateBuilder<'a> {
    pub fn new(
        directory: &'a PhoneDirectory,
        default_tz: Tz,
        template: &str,
        reply_to: &str,
        max_chars: usize,
    ) -> Self {
        let mut registry = Handlebars::new();
        // SMS bodies are plain text, not HTML
        registry.register_escape_fn(handlebars::no_escape);

        Self {
            directory,
            default_tz,
            template: template.to_string(),
            reply_to: reply_to.to_string(),
            max_chars,
            marker: Regex::new(r"\*([^*]+)\*").expect("marker pattern is valid"),
            placeholder: Regex::new(r"\{\{\s*([A-Za-z][A-Za-z0-9_]*)\s*\}\}")
                .expect("placeholder pattern is valid"),
            registry,
        }
    }

    /// Classify one event. Pure with respect to external services and
    /// free of await points, so it can run inside concurrent dispatch
    /// tasks without interleaving hazards.
    pub fn build(&self, event: &CalendarEvent) -> Classified {
        let Some(captures) = self.marker.captures(&event.summary) else {
            return Classified::NonQualifying;
        };
        let recipient_name = captures[1].trim().to_string();

        let Some(phone_number) = self.directory.lookup(&recipient_name) else {
            return Classified::Invalid {
                recipient_name,
                reason: "no phone number on file".to_string(),
            };
        };

        let local_start = self.local_start(event);
        let message = match self.render(event, &recipient_name, &local_start) {
            Ok(message) => message,
            Err(e) => {
                return Classified::Invalid {
                    recipient_name,
                    reason: format!("message template failed to render: {}", e),
                };
            }
        };
        if message.is_empty() {
            return Classified::Invalid {
                recipient_name,
                reason: "rendered message is empty".to_string(),
            };
        }

        Classified::Candidate(NotificationCandidate {
            recipient_name,
            phone_number: phone_number.to_string(),
            message,
        })
    }

    /// The event's start in its own zone, falling back to the
    /// calendar's default. Date-only events start at local midnight.
    fn local_start(&self, event: &CalendarEvent) -> DateTime<Tz> {
        let tz = event
            .time_zone
            .as_deref()
            .and_then(|name| name.parse::<Tz>().ok())
            .unwrap_or(self.default_tz);

        match &event.start {
            EventStart::Date(date) => local_midnight(tz, *date),
            EventStart::DateTime(instant) => instant.with_timezone(&tz),
        }
    }

    fn render(
        &self,
        event: &CalendarEvent,
        recipient_name: &str,
        local_start: &DateTime<Tz>,
    ) -> Result<String, Error> {
        // Blank out placeholders we don't recognize before rendering
        let template = self
            .placeholder
            .replace_all(&self.template, |caps: &regex::Captures| {
                if KNOWN_PLACEHOLDERS.contains(&&caps[1]) {
                    caps[0].to_string()
                } else {
                    "?".to_string()
                }
            });

        let stripped_summary = self.marker.replace(&event.summary, "").trim().to_string();
        let data = json!({
            "eventSummary": stripped_summary,
            "recipientName": recipient_name,
            "replyTo": self.reply_to,
            "date": local_start.format("%A, %B %-d").to_string(),
            "time": local_start.format("%-I:%M%P").to_string(),
        });

        let rendered = self.registry.render_template(&template, &data)?;
        Ok(rendered.chars().take(self.max_chars).collect())
    }
}

/// Midnight of a local day. Handles the DST edge where midnight does
/// not exist or happens twice.
pub(crate) fn local_midnight(tz: Tz, date: NaiveDate) -> DateTime<Tz> {
    let naive = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(instant) => instant,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz.from_utc_datetime(&naive),
    }
}
