//! CI identity tokens.

use super::CredentialError;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Audience requested for tokens exchanged with STS.
pub const DEFAULT_AUDIENCE: &str = "sts.amazonaws.com";

/// Where the CI run's identity token comes from.
#[derive(Clone)]
pub enum IdentityTokenSource {
    /// GitHub Actions OIDC token endpoint
    GitHubActions {
        /// `ACTIONS_ID_TOKEN_REQUEST_URL`
        request_url: String,
        /// `ACTIONS_ID_TOKEN_REQUEST_TOKEN`
        request_token: String,
        /// Token audience
        audience: String,
    },
    /// File holding the token (`AWS_WEB_IDENTITY_TOKEN_FILE`)
    File(PathBuf),
    /// Token supplied directly
    Token(String),
}

impl fmt::Debug for IdentityTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GitHubActions {
                request_url,
                audience,
                ..
            } => f
                .debug_struct("GitHubActions")
                .field("request_url", request_url)
                .field("audience", audience)
                .finish_non_exhaustive(),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
        }
    }
}

#[derive(Deserialize)]
struct GitHubTokenResponse {
    value: String,
}

impl IdentityTokenSource {
    /// Detect a token source from the process environment.
    pub fn from_env() -> Option<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Detect a token source through `get`.
    ///
    /// The GitHub Actions endpoint wins over a token file when both are set.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let non_empty = |name: &str| get(name).filter(|v| !v.is_empty());

        if let (Some(request_url), Some(request_token)) = (
            non_empty("ACTIONS_ID_TOKEN_REQUEST_URL"),
            non_empty("ACTIONS_ID_TOKEN_REQUEST_TOKEN"),
        ) {
            return Some(Self::GitHubActions {
                request_url,
                request_token,
                audience: DEFAULT_AUDIENCE.to_string(),
            });
        }

        non_empty("AWS_WEB_IDENTITY_TOKEN_FILE").map(|p| Self::File(PathBuf::from(p)))
    }

    /// Retrieve the token.
    pub async fn fetch(&self, http: &reqwest::Client) -> Result<String, CredentialError> {
        match self {
            Self::GitHubActions {
                request_url,
                request_token,
                audience,
            } => {
                let mut url = Url::parse(request_url).map_err(|e| CredentialError::IdentityToken {
                    reason: format!("invalid token request URL: {e}"),
                })?;
                url.query_pairs_mut().append_pair("audience", audience);

                log::debug!("Requesting identity token for audience {audience}");
                let response = http
                    .get(url)
                    .bearer_auth(request_token)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .send()
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(CredentialError::IdentityToken {
                        reason: format!("token endpoint returned {status}: {body}"),
                    });
                }

                let token: GitHubTokenResponse =
                    response
                        .json()
                        .await
                        .map_err(|e| CredentialError::Malformed {
                            reason: format!("identity token response: {e}"),
                        })?;
                non_empty_token(token.value)
            }
            Self::File(path) => {
                let token = tokio::fs::read_to_string(path).await.map_err(|e| {
                    CredentialError::IdentityToken {
                        reason: format!("reading {}: {e}", path.display()),
                    }
                })?;
                non_empty_token(token.trim().to_string())
            }
            Self::Token(token) => non_empty_token(token.clone()),
        }
    }
}

fn non_empty_token(token: String) -> Result<String, CredentialError> {
    if token.is_empty() {
        Err(CredentialError::IdentityToken {
            reason: "token is empty".to_string(),
        })
    } else {
        Ok(token)
    }
}
