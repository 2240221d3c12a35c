use std::io::{self, Write};

use anyhow::Result;

use crate::core::db::{async_db, initialize_db};
use crate::google::oauth::{SCOPES, exchange_code_for_token};
use crate::pipeline::orchestrator::CREDENTIAL_TOKEN_ID;
use crate::store::{KvStore, StoredCredential};

pub async fn run() -> Result<()> {
    let client_id = std::env::var("HEADSUP_GOOGLE_CLIENT_ID")
        .expect("Set HEADSUP_GOOGLE_CLIENT_ID in your environment");
    let client_secret = std::env::var("HEADSUP_GOOGLE_CLIENT_SECRET")
        .expect("Set HEADSUP_GOOGLE_CLIENT_SECRET in your environment");
    let redirect_uri = std::env::var("HEADSUP_GOOGLE_REDIRECT_URI")
        .unwrap_or_else(|_| "urn:ietf:wg:oauth:2.0:oob".to_string());
    let token_url = std::env::var("HEADSUP_GOOGLE_TOKEN_URL")
        .unwrap_or_else(|_| "https://oauth2.googleapis.com/token".to_string());

    let auth_url = format!(
        "https://accounts.google.com/o/oauth2/v2/auth?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
        urlencoding::encode(&client_id),
        urlencoding::encode(&redirect_uri),
        urlencoding::encode(SCOPES)
    );
    println!(
        "\nPlease open the following URL in your browser and authorize access:\n\n{}\n",
        auth_url
    );
    print!("Paste the authorization code shown by Google here: ");
    io::stdout().flush().unwrap();
    let mut code = String::new();
    io::stdin().read_line(&mut code).expect("Failed to read code");
    let code = code.trim();

    let snapshot =
        exchange_code_for_token(&client_id, &client_secret, code, &redirect_uri, &token_url)
            .await?;

    // Store the credential blob; future runs refresh from it
    let storage_path = std::env::var("HEADSUP_STORAGE_PATH").unwrap_or("./".to_string());
    let db = async_db(&storage_path).await?;
    db.call(|conn| {
        initialize_db(conn)?;
        Ok(())
    })
    .await?;
    let store = KvStore::new(db);
    store
        .put(&StoredCredential {
            token_id: CREDENTIAL_TOKEN_ID.to_string(),
            content: serde_json::to_string(&snapshot)?,
        })
        .await?;

    println!("Stored Google credential. You can now run `headsup run`.");
    Ok(())
}
