//! End-to-end pipeline runs against mocked Google and Twilio APIs

mod test_utils;

use mockito::{Matcher, Mock, ServerGuard};

use headsup::pipeline;
use headsup::store::{QuotaRecord, StoredCredential};
use headsup::pipeline::orchestrator::CREDENTIAL_TOKEN_ID;

use crate::test_utils::{current_month, seed_credential, test_config, test_store};

async fn mock_calendar_meta(server: &mut ServerGuard) -> Mock {
    server
        .mock("GET", "/calendar/v3/calendars/primary")
        .with_body(r#"{"id": "primary", "timeZone": "US/Eastern"}"#)
        .create_async()
        .await
}

async fn mock_events(server: &mut ServerGuard, items: &str) -> Mock {
    server
        .mock("GET", "/calendar/v3/calendars/primary/events")
        .match_query(Matcher::Any)
        .with_body(format!(r#"{{"items": {}}}"#, items))
        .create_async()
        .await
}

async fn mock_contacts(server: &mut ServerGuard) -> Mock {
    server
        .mock("GET", "/v4/spreadsheets/sheet-1/values/Contacts%21A2%3AB")
        .with_body(r#"{"values": [["Jane", "(555) 123-4567"], ["Bob", "not a number"]]}"#)
        .create_async()
        .await
}

async fn mock_twilio(server: &mut ServerGuard, expected_hits: usize) -> Mock {
    server
        .mock("POST", "/2010-04-01/Accounts/AC123/Messages.json")
        .with_body(r#"{"sid": "SM1"}"#)
        .expect(expected_hits)
        .create_async()
        .await
}

const MARKED_EVENT: &str = r#"[{"id": "e1", "summary": "*Jane*Standup call",
    "start": {"date": "2024-05-01"}}]"#;

#[tokio::test]
async fn it_notifies_a_marked_event_and_updates_the_quota() {
    let mut server = mockito::Server::new_async().await;
    let _meta = mock_calendar_meta(&mut server).await;
    let _events = mock_events(&mut server, MARKED_EVENT).await;
    let _contacts = mock_contacts(&mut server).await;
    let twilio = mock_twilio(&mut server, 1).await;

    let config = test_config(&server.url());
    let (store, _dir) = test_store().await;
    seed_credential(&store, false).await;

    let report = pipeline::run(&config, &store).await.unwrap();

    twilio.assert_async().await;
    assert_eq!(report.admitted, 1);
    assert_eq!(report.used, 1);
    assert_eq!(report.lines.len(), 2);
    assert_eq!(
        report.lines[0],
        "Notified Jane at +15551234567: Reminder: Standup call at 12:00am"
    );
    assert_eq!(report.lines[1], "1 of 100 monthly notifications used");

    // The new count was persisted for the current month
    let record: QuotaRecord = store.get(&current_month()).await.unwrap().unwrap();
    assert_eq!(record.count, 1);
}

#[tokio::test]
async fn it_skips_dispatch_when_the_quota_is_exhausted() {
    let mut server = mockito::Server::new_async().await;
    let _meta = mock_calendar_meta(&mut server).await;
    let _events = mock_events(&mut server, MARKED_EVENT).await;
    let _contacts = mock_contacts(&mut server).await;
    let twilio = mock_twilio(&mut server, 0).await;

    let config = test_config(&server.url());
    let (store, _dir) = test_store().await;
    seed_credential(&store, false).await;
    store
        .put(&QuotaRecord {
            month: current_month(),
            count: 100,
        })
        .await
        .unwrap();

    let report = pipeline::run(&config, &store).await.unwrap();

    twilio.assert_async().await;
    assert_eq!(report.admitted, 0);
    assert!(report.lines[0].starts_with("Monthly quota reached, skipped notifying Jane"));
    assert_eq!(report.lines[1], "100 of 100 monthly notifications used");

    // Nothing admitted, so the stored count is untouched
    let record: QuotaRecord = store.get(&current_month()).await.unwrap().unwrap();
    assert_eq!(record.count, 100);
}

#[tokio::test]
async fn it_classifies_unmarked_events_without_contacting_twilio() {
    let mut server = mockito::Server::new_async().await;
    let _meta = mock_calendar_meta(&mut server).await;
    let _events = mock_events(
        &mut server,
        r#"[{"id": "e1", "summary": "Dentist", "start": {"date": "2024-05-01"}}]"#,
    )
    .await;
    let _contacts = mock_contacts(&mut server).await;
    let twilio = mock_twilio(&mut server, 0).await;

    let config = test_config(&server.url());
    let (store, _dir) = test_store().await;
    seed_credential(&store, false).await;

    let report = pipeline::run(&config, &store).await.unwrap();

    twilio.assert_async().await;
    assert_eq!(report.lines[0], "No notification requested: Dentist");
    assert_eq!(report.admitted, 0);
}

#[tokio::test]
async fn it_reports_an_empty_calendar() {
    let mut server = mockito::Server::new_async().await;
    let _meta = mock_calendar_meta(&mut server).await;
    let _events = mock_events(&mut server, "[]").await;
    let _contacts = mock_contacts(&mut server).await;

    let config = test_config(&server.url());
    let (store, _dir) = test_store().await;
    seed_credential(&store, false).await;

    let report = pipeline::run(&config, &store).await.unwrap();
    assert_eq!(
        report.lines,
        vec![
            "No events today.".to_string(),
            "0 of 100 monthly notifications used".to_string()
        ]
    );
}

#[tokio::test]
async fn it_counts_a_failed_dispatch_against_the_quota() {
    let mut server = mockito::Server::new_async().await;
    let _meta = mock_calendar_meta(&mut server).await;
    let _events = mock_events(&mut server, MARKED_EVENT).await;
    let _contacts = mock_contacts(&mut server).await;
    let _twilio = server
        .mock("POST", "/2010-04-01/Accounts/AC123/Messages.json")
        .with_status(500)
        .with_body(r#"{"message": "internal error"}"#)
        .create_async()
        .await;

    let config = test_config(&server.url());
    let (store, _dir) = test_store().await;
    seed_credential(&store, false).await;

    let report = pipeline::run(&config, &store).await.unwrap();

    // The run succeeds; the failure is a line, and the admitted slot
    // stays consumed
    assert!(report.lines[0].starts_with("Failed to notify Jane at +15551234567"));
    assert_eq!(report.admitted, 1);
    let record: QuotaRecord = store.get(&current_month()).await.unwrap().unwrap();
    assert_eq!(record.count, 1);
}

#[tokio::test]
async fn it_rejects_a_marked_event_with_no_phone_number() {
    let mut server = mockito::Server::new_async().await;
    let _meta = mock_calendar_meta(&mut server).await;
    let _events = mock_events(
        &mut server,
        r#"[{"id": "e1", "summary": "*Bob* Poker night", "start": {"date": "2024-05-01"}}]"#,
    )
    .await;
    let _contacts = mock_contacts(&mut server).await;
    let twilio = mock_twilio(&mut server, 0).await;

    let config = test_config(&server.url());
    let (store, _dir) = test_store().await;
    seed_credential(&store, false).await;

    let report = pipeline::run(&config, &store).await.unwrap();

    twilio.assert_async().await;
    // Bob's sheet row had an unusable phone number, so he never made
    // it into the directory
    assert_eq!(
        report.lines[0],
        "Could not notify Bob: no phone number on file"
    );
    assert_eq!(report.admitted, 0);
}

#[tokio::test]
async fn it_simulates_sends_in_dry_run() {
    let mut server = mockito::Server::new_async().await;
    let _meta = mock_calendar_meta(&mut server).await;
    let _events = mock_events(&mut server, MARKED_EVENT).await;
    let _contacts = mock_contacts(&mut server).await;
    let twilio = mock_twilio(&mut server, 0).await;

    let mut config = test_config(&server.url());
    config.dry_run = true;
    let (store, _dir) = test_store().await;
    seed_credential(&store, false).await;

    let report = pipeline::run(&config, &store).await.unwrap();

    twilio.assert_async().await;
    assert!(report.lines[0].starts_with("Simulated notification for Jane"));
    // Admission happens before the dispatcher, so a dry run still
    // consumes quota
    assert_eq!(report.admitted, 1);
}

#[tokio::test]
async fn it_refreshes_an_expired_credential_and_persists_it() {
    let mut server = mockito::Server::new_async().await;
    let token = server
        .mock("POST", "/token")
        .match_body(Matcher::UrlEncoded(
            "grant_type".into(),
            "refresh_token".into(),
        ))
        .with_body(
            r#"{"access_token": "ya29.fresh", "expires_in": 3600, "id_token": "eyJrotated"}"#,
        )
        .expect(1)
        .create_async()
        .await;
    let _meta = mock_calendar_meta(&mut server).await;
    let _events = mock_events(&mut server, "[]").await;
    let _contacts = mock_contacts(&mut server).await;

    let config = test_config(&server.url());
    let (store, _dir) = test_store().await;
    seed_credential(&store, true).await;

    pipeline::run(&config, &store).await.unwrap();

    token.assert_async().await;
    let stored: StoredCredential = store.get(CREDENTIAL_TOKEN_ID).await.unwrap().unwrap();
    assert!(stored.content.contains("ya29.fresh"));
    assert!(stored.content.contains("eyJrotated"));
}

#[tokio::test]
async fn it_leaves_a_fresh_credential_alone() {
    let mut server = mockito::Server::new_async().await;
    let token = server.mock("POST", "/token").expect(0).create_async().await;
    let _meta = mock_calendar_meta(&mut server).await;
    let _events = mock_events(&mut server, "[]").await;
    let _contacts = mock_contacts(&mut server).await;

    let config = test_config(&server.url());
    let (store, _dir) = test_store().await;
    let seeded = seed_credential(&store, false).await;

    pipeline::run(&config, &store).await.unwrap();

    token.assert_async().await;
    let stored: StoredCredential = store.get(CREDENTIAL_TOKEN_ID).await.unwrap().unwrap();
    let snapshot: headsup::google::oauth::CredentialSnapshot =
        serde_json::from_str(&stored.content).unwrap();
    assert_eq!(snapshot.access_token, seeded.access_token);
    assert!(snapshot.id_token.is_none());
}

#[tokio::test]
async fn it_emails_the_summary_when_recipients_are_configured() {
    let mut server = mockito::Server::new_async().await;
    let _meta = mock_calendar_meta(&mut server).await;
    let _events = mock_events(&mut server, MARKED_EVENT).await;
    let _contacts = mock_contacts(&mut server).await;
    let _twilio = mock_twilio(&mut server, 1).await;
    let gmail = server
        .mock("POST", "/gmail/v1/users/me/messages/send")
        .with_body(r#"{"id": "msg-1"}"#)
        .expect(1)
        .create_async()
        .await;

    let mut config = test_config(&server.url());
    config.summary_recipients = vec!["ops@example.com".to_string()];
    let (store, _dir) = test_store().await;
    seed_credential(&store, false).await;

    pipeline::run(&config, &store).await.unwrap();
    gmail.assert_async().await;
}

#[tokio::test]
async fn it_aborts_without_writes_when_a_fetch_fails() {
    let mut server = mockito::Server::new_async().await;
    let _meta = mock_calendar_meta(&mut server).await;
    let _events = mock_events(&mut server, MARKED_EVENT).await;
    // Sheets is down
    let _contacts = server
        .mock("GET", "/v4/spreadsheets/sheet-1/values/Contacts%21A2%3AB")
        .with_status(503)
        .create_async()
        .await;
    let twilio = mock_twilio(&mut server, 0).await;

    let config = test_config(&server.url());
    let (store, _dir) = test_store().await;
    seed_credential(&store, false).await;

    let result = pipeline::run(&config, &store).await;

    twilio.assert_async().await;
    assert!(result.is_err());
    // No quota record was written
    let record: Option<QuotaRecord> = store.get(&current_month()).await.unwrap();
    assert!(record.is_none());
}
