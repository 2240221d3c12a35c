//! Sequences one run: authorize, fetch inputs, process candidates
//! concurrently, then finalize. Fetch failures abort the run before
//! anything is written; per-candidate and finalize failures are
//! absorbed and reported.

use std::sync::Arc;

use anyhow::{Error, Result, anyhow};
use chrono::{Duration, Utc};
use chrono_tz::Tz;
use futures::future::join_all;

use crate::core::AppConfig;
use crate::google::calendar::{CalendarEvent, CalendarService, GoogleCalendar};
use crate::google::gmail::{EmailService, GmailClient};
use crate::google::oauth::{self, CredentialSnapshot};
use crate::google::sheets::{ContactSheet, GoogleSheets};
use crate::pipeline::candidate::{CandidateBuilder, Classified, local_midnight};
use crate::pipeline::directory::PhoneDirectory;
use crate::pipeline::dispatch::Dispatcher;
use crate::pipeline::quota::QuotaGate;
use crate::pipeline::summary::RunSummary;
use crate::sms::{MessagingService, TwilioClient};
use crate::store::{KvStore, QuotaRecord, StoredCredential};

/// Key under which the Google credential blob is stored.
pub const CREDENTIAL_TOKEN_ID: &str = "google-oauth";

/// The external collaborators one run talks to.
pub struct Services {
    pub calendar: Arc<dyn CalendarService>,
    pub contacts: Arc<dyn ContactSheet>,
    pub messaging: Arc<dyn MessagingService>,
    pub email: Arc<dyn EmailService>,
}

impl Services {
    pub fn google(config: &AppConfig, access_token: &str) -> Self {
        Self {
            calendar: Arc::new(GoogleCalendar::new(&config.google_api_url, access_token)),
            contacts: Arc::new(GoogleSheets::new(&config.google_api_url, access_token)),
            messaging: Arc::new(TwilioClient::new(
                &config.twilio_api_url,
                &config.twilio_account_sid,
                &config.twilio_auth_token,
                &config.twilio_from_number,
            )),
            email: Arc::new(GmailClient::new(&config.google_api_url, access_token)),
        }
    }
}

/// What one run produced, for the caller to print or inspect.
#[derive(Debug)]
pub struct RunReport {
    pub lines: Vec<String>,
    pub admitted: u32,
    pub used: u32,
    pub ceiling: u32,
}

/// Run the whole pipeline once.
pub async fn run(config: &AppConfig, store: &KvStore) -> Result<RunReport, Error> {
    let snapshot = authorize(config, store).await?;
    let services = Services::google(config, &snapshot.access_token);
    run_with_services(config, store, &services, &snapshot).await
}

/// Obtain a usable credential, refreshing the access token if the
/// stored one has expired. A refresh produces a snapshot carrying an
/// id_token, which marks it for persistence at finalize.
async fn authorize(config: &AppConfig, store: &KvStore) -> Result<CredentialSnapshot, Error> {
    let stored: StoredCredential = store
        .get(CREDENTIAL_TOKEN_ID)
        .await?
        .ok_or_else(|| anyhow!("No stored Google credential. Run `headsup auth` first"))?;
    let snapshot: CredentialSnapshot = serde_json::from_str(&stored.content)?;

    if snapshot.is_expired(Utc::now()) {
        tracing::info!("Stored access token expired, refreshing");
        oauth::refresh_access_token(
            &config.google_client_id,
            &config.google_client_secret,
            &snapshot.refresh_token,
            &config.google_token_url,
        )
        .await
    } else {
        Ok(snapshot)
    }
}

/// Everything after authorization. Tests drive this directly with
/// stand-in services.
pub async fn run_with_services(
    config: &AppConfig,
    store: &KvStore,
    services: &Services,
    snapshot: &CredentialSnapshot,
) -> Result<RunReport, Error> {
    let month = Utc::now().format("%Y-%m").to_string();

    // Fetch phase: all three inputs in parallel, any failure is fatal
    // and nothing has been written yet
    tracing::info!("Fetching contact directory, events, and quota baseline");
    let (directory, (tz, events), baseline) = tokio::try_join!(
        fetch_directory(services.contacts.as_ref(), config),
        fetch_today_events(services.calendar.as_ref(), &config.calendar_id),
        fetch_quota_baseline(store, &month),
    )?;
    tracing::info!(
        "Fetched {} events, {} contacts, {} of {} quota used",
        events.len(),
        directory.len(),
        baseline,
        config.monthly_quota
    );

    // Process phase: events are independent, dispatch them
    // concurrently but keep outcome lines in input order
    let gate = QuotaGate::new(baseline, config.monthly_quota);
    let builder = CandidateBuilder::new(
        &directory,
        tz,
        &config.message_template,
        &config.reply_to,
        config.max_sms_chars,
    );
    let dispatcher = Dispatcher::new(services.messaging.as_ref(), config.dry_run);

    let mut summary = RunSummary::default();
    if events.is_empty() {
        summary.record_no_events();
    } else {
        let lines = join_all(
            events
                .iter()
                .map(|event| process_event(event, &builder, &gate, &dispatcher)),
        )
        .await;
        for line in lines {
            summary.record(line);
        }
    }
    summary.finalize_tally(gate.used(), config.monthly_quota);

    // Finalize phase: three independent actions; a failure in one is
    // logged and must not block the others
    let today = Utc::now().with_timezone(&tz).format("%Y-%m-%d").to_string();
    let (quota_result, email_result, credential_result) = tokio::join!(
        persist_quota(store, &month, &gate),
        send_summary(config, services.email.as_ref(), &summary, &today),
        reconcile_credential(store, snapshot),
    );
    if let Err(e) = quota_result {
        tracing::error!("Failed to persist quota count: {:#}", e);
    }
    match email_result {
        Ok(line) => tracing::info!("{}", line),
        Err(e) => tracing::error!("Failed to send summary email: {:#}", e),
    }
    match credential_result {
        Ok(line) => tracing::info!("{}", line),
        Err(e) => tracing::error!("Failed to persist credential: {:#}", e),
    }

    Ok(RunReport {
        lines: summary.all_lines(),
        admitted: gate.admitted_this_run(),
        used: gate.used(),
        ceiling: config.monthly_quota,
    })
}

/// Classify, admit, and dispatch one event. The admission check and
/// increment are a single atomic step with no await between them.
async fn process_event(
    event: &CalendarEvent,
    builder: &CandidateBuilder<'_>,
    gate: &QuotaGate,
    dispatcher: &Dispatcher<'_>,
) -> String {
    match builder.build(event) {
        Classified::NonQualifying => {
            tracing::debug!("Event {} has no notification marker", event.id);
            format!("No notification requested: {}", event.summary)
        }
        Classified::Invalid {
            recipient_name,
            reason,
        } => format!("Could not notify {}: {}", recipient_name, reason),
        Classified::Candidate(candidate) => {
            if gate.try_admit() {
                dispatcher.dispatch(&candidate).await
            } else {
                format!(
                    "Monthly quota reached, skipped notifying {} at {}",
                    candidate.recipient_name, candidate.phone_number
                )
            }
        }
    }
}

async fn fetch_directory(
    contacts: &dyn ContactSheet,
    config: &AppConfig,
) -> Result<PhoneDirectory, Error> {
    let rows = contacts
        .get_rows(&config.sheet_id, &config.sheet_range)
        .await?;
    Ok(PhoneDirectory::from_rows(&rows))
}

/// Resolve the calendar's zone and list today's events in it.
async fn fetch_today_events(
    calendar: &dyn CalendarService,
    calendar_id: &str,
) -> Result<(Tz, Vec<CalendarEvent>), Error> {
    let meta = calendar.get_calendar(calendar_id).await?;
    let tz: Tz = meta.time_zone.parse().unwrap_or_else(|_| {
        tracing::warn!("Unknown calendar time zone {}, using UTC", meta.time_zone);
        Tz::UTC
    });

    let today = Utc::now().with_timezone(&tz).date_naive();
    let start = local_midnight(tz, today);
    let end = local_midnight(tz, today + Duration::days(1));
    let events = calendar
        .list_events(calendar_id, &start.to_rfc3339(), &end.to_rfc3339())
        .await?;
    Ok((tz, events))
}

async fn fetch_quota_baseline(store: &KvStore, month: &str) -> Result<u32, Error> {
    let record: Option<QuotaRecord> = store.get(month).await?;
    Ok(record.map(|r| r.count).unwrap_or(0))
}

/// Write the new monthly count, but only if this run admitted anyone.
async fn persist_quota(store: &KvStore, month: &str, gate: &QuotaGate) -> Result<(), Error> {
    if gate.admitted_this_run() == 0 {
        return Ok(());
    }
    store
        .put_quota(&QuotaRecord {
            month: month.to_string(),
            count: gate.used(),
        })
        .await
}

async fn send_summary(
    config: &AppConfig,
    email: &dyn EmailService,
    summary: &RunSummary,
    today: &str,
) -> Result<String, Error> {
    if config.summary_recipients.is_empty() {
        return Ok("Summary email disabled, no recipients configured".to_string());
    }
    let subject = format!("Notification summary for {}", today);
    let body = summary.render_html("Notification summary");
    if config.dry_run {
        return Ok(format!("Simulated summary email: {}", subject));
    }
    let message_id = email
        .send(
            &config.summary_recipients,
            &subject,
            &body,
            &config.summary_from,
        )
        .await?;
    Ok(format!("Summary email sent ({})", message_id))
}

/// Persist the credential only when a refresh happened this run. The
/// write is idempotent: repeating it with the same snapshot leaves the
/// same stored state.
pub async fn reconcile_credential(
    store: &KvStore,
    snapshot: &CredentialSnapshot,
) -> Result<String, Error> {
    if !snapshot.is_complete() {
        return Ok("Google credential unchanged, no update necessary".to_string());
    }
    store
        .put(&StoredCredential {
            token_id: CREDENTIAL_TOKEN_ID.to_string(),
            content: serde_json::to_string(snapshot)?,
        })
        .await?;
    Ok("Stored refreshed Google credential".to_string())
}
