/*!
 * OAuth credentials for the Drive backend.
 *
 * Tokens are kept behind the `TokenProvider` trait so the Drive client never
 * touches files or global state directly. `FileTokenStore` reads `token.json`
 * (the same layout the Go oauth2 library writes) and refreshes it with the
 * client secrets in `credentials.json` when it has expired. On the first run,
 * when there is no token yet, it walks the user through the consent page and
 * exchanges the authorization code for a token.
 */

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{debug, info};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::errors::ProviderError;

/// Tokens closer than this to their expiry are treated as expired
const EXPIRY_MARGIN_SECS: i64 = 60;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_REDIRECT_URI: &str = "http://localhost";

/// Full Drive access; the OCR documents are created and deleted by us
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Opaque state sent with the consent request
const AUTH_STATE: &str = "state-token";

/// An OAuth2 bearer token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuthToken {
    pub access_token: String,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Absolute expiry; `None` means the token never expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl OAuthToken {
    /// Whether the token is expired (or about to be) at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            // Go's oauth2 writes the zero time for tokens without expiry
            Some(expiry) if expiry.timestamp() > 0 => {
                expiry <= now + ChronoDuration::seconds(EXPIRY_MARGIN_SECS)
            }
            _ => false,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Value of the `Authorization` header
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Source of OAuth tokens
#[async_trait]
pub trait TokenProvider: Send + Sync + std::fmt::Debug {
    /// Return a currently valid token, refreshing it if needed
    async fn acquire(&self) -> Result<OAuthToken, ProviderError>;

    /// Store a token for later runs
    async fn persist(&self, token: &OAuthToken) -> Result<(), ProviderError>;
}

/// OAuth client secrets as downloaded from the Google Cloud console
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    #[serde(alias = "web")]
    pub installed: ClientSecret,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

impl ClientSecret {
    /// The first registered redirect URI
    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris.first().map(String::as_str).unwrap_or(DEFAULT_REDIRECT_URI)
    }

    /// Consent page URL asking for offline access to `scope`
    pub fn authorization_url(&self, scope: &str) -> Result<Url, ProviderError> {
        Url::parse_with_params(
            &self.auth_uri,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri()),
                ("response_type", "code"),
                ("scope", scope),
                ("access_type", "offline"),
                ("state", AUTH_STATE),
            ],
        )
        .map_err(|e| ProviderError::AuthenticationError(format!("Invalid auth_uri '{}': {}", self.auth_uri, e)))
    }
}

/// Asks the user to approve access and hands back the authorization code
#[async_trait]
pub trait AuthorizationPrompt: Send + Sync + std::fmt::Debug {
    async fn authorization_code(&self, auth_url: &str) -> Result<String, ProviderError>;
}

/// Prints the consent URL and reads the code from stdin
#[derive(Debug, Default)]
pub struct ConsolePrompt;

#[async_trait]
impl AuthorizationPrompt for ConsolePrompt {
    async fn authorization_code(&self, auth_url: &str) -> Result<String, ProviderError> {
        println!("Open this URL in your browser and authorize the application:\n{}", auth_url);
        print!("Enter the authorization code (or the full URL you were redirected to): ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .map_err(|e| ProviderError::AuthenticationError(format!("Failed to read the authorization code: {}", e)))?;
        Ok(line)
    }
}

/// The code itself, or the `code` parameter of a pasted redirect URL
pub fn extract_authorization_code(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    match Url::parse(input) {
        Ok(url) => url
            .query_pairs()
            .find(|(key, _)| key == "code")
            .map(|(_, code)| code.into_owned())
            .filter(|code| !code.is_empty()),
        Err(_) => Some(input.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_token(self, fallback_type: &str, fallback_refresh: Option<String>) -> OAuthToken {
        OAuthToken {
            access_token: self.access_token,
            token_type: self.token_type.unwrap_or_else(|| fallback_type.to_string()),
            refresh_token: self.refresh_token.or(fallback_refresh),
            expiry: self.expires_in.map(|secs| Utc::now() + ChronoDuration::seconds(secs)),
        }
    }
}

/// Token provider backed by `token.json` and `credentials.json`
#[derive(Debug)]
pub struct FileTokenStore {
    token_path: PathBuf,
    credentials_path: PathBuf,
    client: Client,
    prompt: Arc<dyn AuthorizationPrompt>,
}

impl FileTokenStore {
    pub fn new(token_path: impl Into<PathBuf>, credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            token_path: token_path.into(),
            credentials_path: credentials_path.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            prompt: Arc::new(ConsolePrompt),
        }
    }

    /// Use another way of asking for the authorization code
    pub fn with_prompt(mut self, prompt: Arc<dyn AuthorizationPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// The stored token, or `None` if there is no token file yet
    async fn load_token(&self) -> Result<Option<OAuthToken>, ProviderError> {
        let content = match tokio::fs::read_to_string(&self.token_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ProviderError::AuthenticationError(format!(
                    "Failed to read token file {:?}: {}",
                    self.token_path, e
                )));
            }
        };

        serde_json::from_str(&content).map(Some).map_err(|e| {
            ProviderError::ParseError(format!("Invalid token file {:?}: {}", self.token_path, e))
        })
    }

    async fn load_secrets(&self) -> Result<ClientSecret, ProviderError> {
        let content = tokio::fs::read_to_string(&self.credentials_path).await.map_err(|e| {
            ProviderError::AuthenticationError(format!(
                "Failed to read credentials file {:?}: {}",
                self.credentials_path, e
            ))
        })?;

        let secrets: ClientSecrets = serde_json::from_str(&content).map_err(|e| {
            ProviderError::ParseError(format!(
                "Invalid credentials file {:?}: {}",
                self.credentials_path, e
            ))
        })?;
        Ok(secrets.installed)
    }

    async fn refresh(&self, token: &OAuthToken) -> Result<OAuthToken, ProviderError> {
        let refresh_token = token.refresh_token.clone().ok_or_else(|| {
            ProviderError::AuthenticationError(
                "Token expired and has no refresh token; authorize the application again".to_string(),
            )
        })?;
        let secret = self.load_secrets().await?;

        debug!("Refreshing OAuth token at {}", secret.token_uri);
        let response = self.client.post(&secret.token_uri)
            .form(&[
                ("client_id", secret.client_id.as_str()),
                ("client_secret", secret.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthenticationError(format!(
                "Token refresh failed ({}): {}",
                status, body
            )));
        }

        let refreshed: TokenResponse = response.json().await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(refreshed.into_token(&token.token_type, Some(refresh_token)))
    }

    /// First-run consent: ask for an authorization code and exchange it
    async fn authorize(&self) -> Result<OAuthToken, ProviderError> {
        let secret = self.load_secrets().await?;
        let auth_url = secret.authorization_url(DRIVE_SCOPE)?;

        let input = self.prompt.authorization_code(auth_url.as_str()).await?;
        let code = extract_authorization_code(&input).ok_or_else(|| {
            ProviderError::AuthenticationError("No authorization code entered".to_string())
        })?;

        debug!("Exchanging authorization code at {}", secret.token_uri);
        let response = self.client.post(&secret.token_uri)
            .form(&[
                ("code", code.as_str()),
                ("client_id", secret.client_id.as_str()),
                ("client_secret", secret.client_secret.as_str()),
                ("redirect_uri", secret.redirect_uri()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthenticationError(format!(
                "Authorization code exchange failed ({}): {}",
                status, body
            )));
        }

        let granted: TokenResponse = response.json().await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;
        Ok(granted.into_token("Bearer", None))
    }
}

#[async_trait]
impl TokenProvider for FileTokenStore {
    async fn acquire(&self) -> Result<OAuthToken, ProviderError> {
        let Some(token) = self.load_token().await? else {
            info!("No OAuth token at {:?}, authorization required", self.token_path);
            let token = self.authorize().await?;
            info!("Saving the OAuth token to {:?}", self.token_path);
            self.persist(&token).await?;
            return Ok(token);
        };

        if !token.is_expired() {
            return Ok(token);
        }

        info!("Stored OAuth token expired, refreshing");
        let refreshed = self.refresh(&token).await?;
        self.persist(&refreshed).await?;
        Ok(refreshed)
    }

    async fn persist(&self, token: &OAuthToken) -> Result<(), ProviderError> {
        let json = serde_json::to_string_pretty(token)
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        if let Some(parent) = self.token_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    ProviderError::AuthenticationError(format!("Failed to create {:?}: {}", parent, e))
                })?;
            }
        }

        tokio::fs::write(&self.token_path, json).await.map_err(|e| {
            ProviderError::AuthenticationError(format!(
                "Failed to save token to {:?}: {}",
                self.token_path, e
            ))
        })?;
        debug!("Saved OAuth token to {:?}", self.token_path);
        Ok(())
    }
}
