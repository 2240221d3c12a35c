//! Google Calendar API v3 client for fetching today's events.

use anyhow::{Error, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;

/// Calendar metadata, fetched for the default time zone.
#[derive(Debug, Clone)]
pub struct CalendarMeta {
    pub id: String,
    pub time_zone: String,
}

/// Start of an event: all-day events carry a date only, timed events a
/// full datetime with offset.
#[derive(Debug, Clone, PartialEq)]
pub enum EventStart {
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
}

/// A normalized single-occurrence calendar event.
#[derive(Debug, Clone)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub start: EventStart,
    /// IANA zone override on the event itself, if any
    pub time_zone: Option<String>,
}

#[async_trait]
pub trait CalendarService: Send + Sync {
    async fn get_calendar(&self, calendar_id: &str) -> Result<CalendarMeta, Error>;

    /// List events between two ISO instants, recurring events expanded
    /// to single occurrences, ordered by start time.
    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: &str,
        time_max: &str,
    ) -> Result<Vec<CalendarEvent>, Error>;
}

// ============================================================================
// API response types
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarResource {
    id: String,
    time_zone: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsResponse {
    #[serde(default)]
    items: Vec<EventRaw>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventRaw {
    #[serde(default)]
    id: String,
    #[serde(default)]
    summary: Option<String>,
    start: Option<EventDateTime>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: Option<String>,
    date: Option<String>,
    time_zone: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

pub struct GoogleCalendar {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GoogleCalendar {
    pub fn new(base_url: &str, access_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
            access_token: access_token.to_string(),
        }
    }
}

#[async_trait]
impl CalendarService for GoogleCalendar {
    async fn get_calendar(&self, calendar_id: &str) -> Result<CalendarMeta, Error> {
        let url = format!(
            "{}/calendar/v3/calendars/{}",
            self.base_url,
            urlencoding::encode(calendar_id)
        );
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?;
        let resource: CalendarResource = resp.json().await?;
        Ok(CalendarMeta {
            id: resource.id,
            time_zone: resource.time_zone,
        })
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: &str,
        time_max: &str,
    ) -> Result<Vec<CalendarEvent>, Error> {
        let url = format!(
            "{}/calendar/v3/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        );

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .bearer_auth(&self.access_token)
                .query(&[
                    ("timeMin", time_min),
                    ("timeMax", time_max),
                    ("singleEvents", "true"),
                    ("orderBy", "startTime"),
                    ("maxResults", "250"),
                ]);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let resp = request.send().await?.error_for_status()?;
            let page: EventsResponse = resp.json().await?;

            for raw in page.items {
                if raw.status.as_deref() == Some("cancelled") {
                    continue;
                }
                match normalize_event(raw) {
                    Ok(event) => events.push(event),
                    Err(e) => tracing::warn!("Skipping unparseable event: {}", e),
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(events)
    }
}

fn normalize_event(raw: EventRaw) -> Result<CalendarEvent, Error> {
    let start = raw
        .start
        .ok_or_else(|| anyhow!("event {} has no start", raw.id))?;
    let parsed = if let Some(date_time) = start.date_time {
        EventStart::DateTime(DateTime::parse_from_rfc3339(&date_time)?)
    } else if let Some(date) = start.date {
        EventStart::Date(date.parse::<NaiveDate>()?)
    } else {
        return Err(anyhow!("event {} has neither date nor dateTime", raw.id));
    };

    Ok(CalendarEvent {
        id: raw.id,
        summary: raw.summary.unwrap_or_default(),
        start: parsed,
        time_zone: start.time_zone,
    })
}
