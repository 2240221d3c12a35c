use std::env;

/// Default SMS template. Placeholders are resolved by the candidate
/// builder; anything unrecognized renders as `?`.
const DEFAULT_TEMPLATE: &str = "Heads up {{ recipientName }}: {{ eventSummary }} on {{ date }} at {{ time }}. Questions? Reply to {{ replyTo }}.";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub storage_path: String,
    pub calendar_id: String,
    pub sheet_id: String,
    pub sheet_range: String,
    pub monthly_quota: u32,
    pub message_template: String,
    pub reply_to: String,
    pub max_sms_chars: usize,
    pub dry_run: bool,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_number: String,
    pub summary_recipients: Vec<String>,
    pub summary_from: String,
    // API hostnames are overridable so tests can point at a local mock
    pub google_api_url: String,
    pub google_token_url: String,
    pub twilio_api_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let storage_path = env::var("HEADSUP_STORAGE_PATH").unwrap_or("./".to_string());
        let calendar_id =
            env::var("HEADSUP_CALENDAR_ID").expect("Missing env var HEADSUP_CALENDAR_ID");
        let sheet_id = env::var("HEADSUP_SHEET_ID").expect("Missing env var HEADSUP_SHEET_ID");
        let sheet_range =
            env::var("HEADSUP_SHEET_RANGE").unwrap_or_else(|_| "Contacts!A2:B".to_string());
        let monthly_quota = env::var("HEADSUP_MONTHLY_QUOTA")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .expect("HEADSUP_MONTHLY_QUOTA must be an integer");
        let message_template =
            env::var("HEADSUP_MESSAGE_TEMPLATE").unwrap_or_else(|_| DEFAULT_TEMPLATE.to_string());
        let reply_to = env::var("HEADSUP_REPLY_TO").unwrap_or_default();
        let max_sms_chars = env::var("HEADSUP_MAX_SMS_CHARS")
            .unwrap_or_else(|_| "320".to_string())
            .parse()
            .expect("HEADSUP_MAX_SMS_CHARS must be an integer");
        let dry_run = env::var("HEADSUP_DRY_RUN")
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false);
        let google_client_id =
            env::var("HEADSUP_GOOGLE_CLIENT_ID").expect("Missing HEADSUP_GOOGLE_CLIENT_ID");
        let google_client_secret =
            env::var("HEADSUP_GOOGLE_CLIENT_SECRET").expect("Missing HEADSUP_GOOGLE_CLIENT_SECRET");
        let twilio_account_sid =
            env::var("HEADSUP_TWILIO_ACCOUNT_SID").expect("Missing HEADSUP_TWILIO_ACCOUNT_SID");
        let twilio_auth_token =
            env::var("HEADSUP_TWILIO_AUTH_TOKEN").expect("Missing HEADSUP_TWILIO_AUTH_TOKEN");
        let twilio_from_number =
            env::var("HEADSUP_TWILIO_FROM_NUMBER").expect("Missing HEADSUP_TWILIO_FROM_NUMBER");
        let summary_recipients = env::var("HEADSUP_SUMMARY_RECIPIENTS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let summary_from = env::var("HEADSUP_SUMMARY_FROM").unwrap_or_else(|_| "me".to_string());
        let google_api_url = env::var("HEADSUP_GOOGLE_API_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com".to_string());
        let google_token_url = env::var("HEADSUP_GOOGLE_TOKEN_URL")
            .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string());
        let twilio_api_url = env::var("HEADSUP_TWILIO_API_URL")
            .unwrap_or_else(|_| "https://api.twilio.com".to_string());

        Self {
            storage_path,
            calendar_id,
            sheet_id,
            sheet_range,
            monthly_quota,
            message_template,
            reply_to,
            max_sms_chars,
            dry_run,
            google_client_id,
            google_client_secret,
            twilio_account_sid,
            twilio_auth_token,
            twilio_from_number,
            summary_recipients,
            summary_from,
            google_api_url,
            google_token_url,
            twilio_api_url,
        }
    }
}
