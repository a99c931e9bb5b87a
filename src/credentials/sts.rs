//! Role assumption through STS `AssumeRoleWithWebIdentity`.
//!
//! The call is unsigned: the identity token itself authenticates the request.
//! Responses are requested as JSON.

use super::{CredentialError, CredentialProvider, Credentials, IdentityTokenSource, RoleSpec};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use url::Url;

const STS_API_VERSION: &str = "2011-06-15";

/// Exchanges the CI identity token for role credentials.
#[derive(Debug, Clone)]
pub struct WebIdentityProvider {
    http: reqwest::Client,
    token_source: IdentityTokenSource,
    endpoint: Option<Url>,
}

impl WebIdentityProvider {
    /// Create a provider using `token_source` and the regional STS endpoint.
    pub fn new(token_source: IdentityTokenSource) -> Self {
        Self {
            http: reqwest::Client::new(),
            token_source,
            endpoint: None,
        }
    }

    /// Use a custom STS endpoint instead of `https://sts.<region>.amazonaws.com/`.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    fn endpoint_for(&self, region: &str) -> Result<Url, CredentialError> {
        match &self.endpoint {
            Some(url) => Ok(url.clone()),
            None => Url::parse(&format!("https://sts.{region}.amazonaws.com/")).map_err(|e| {
                CredentialError::Malformed {
                    reason: format!("invalid STS endpoint for region '{region}': {e}"),
                }
            }),
        }
    }
}

impl CredentialProvider for WebIdentityProvider {
    async fn assume_role(
        &self,
        role: &RoleSpec,
        region: &str,
    ) -> Result<Credentials, CredentialError> {
        let token = self.token_source.fetch(&self.http).await?;
        let endpoint = self.endpoint_for(region)?;
        let role_arn = role.arn();

        let duration = role.duration_seconds.map(|d| d.to_string());
        let mut form = vec![
            ("Action", "AssumeRoleWithWebIdentity"),
            ("Version", STS_API_VERSION),
            ("RoleArn", role_arn.as_str()),
            ("RoleSessionName", role.session_name.as_str()),
            ("WebIdentityToken", token.as_str()),
        ];
        if let Some(duration) = &duration {
            form.push(("DurationSeconds", duration.as_str()));
        }

        log::info!("Assuming role {role_arn} in {region}");
        let response = self
            .http
            .post(endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let (code, message) = parse_error_body(&body)
                .unwrap_or_else(|| (status.as_u16().to_string(), body.clone()));
            return Err(CredentialError::AssumeRoleRejected {
                role_arn,
                code,
                message,
            });
        }

        let credentials = parse_assume_role_response(&body)?;
        if let Some(expiry) = credentials.expires_at() {
            log::info!("Role session valid until {expiry}");
        }
        Ok(credentials)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleEnvelope {
    assume_role_with_web_identity_response: AssumeRoleResponse,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleResponse {
    assume_role_with_web_identity_result: AssumeRoleResult,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleResult {
    credentials: StsCredentials,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expiration: StsTimestamp,
}

/// STS JSON responses carry epoch seconds; tolerate RFC 3339 text too.
#[derive(Deserialize)]
#[serde(untagged)]
enum StsTimestamp {
    Epoch(f64),
    Text(String),
}

impl StsTimestamp {
    fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            StsTimestamp::Epoch(secs) => {
                let millis = (secs * 1000.0).round() as i64;
                Utc.timestamp_millis_opt(millis).single()
            }
            StsTimestamp::Text(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    code: String,
    #[serde(default)]
    message: String,
}

/// Parse a successful `AssumeRoleWithWebIdentity` JSON body.
pub fn parse_assume_role_response(body: &str) -> Result<Credentials, CredentialError> {
    let envelope: AssumeRoleEnvelope =
        serde_json::from_str(body).map_err(|e| CredentialError::Malformed {
            reason: e.to_string(),
        })?;
    let creds = envelope
        .assume_role_with_web_identity_response
        .assume_role_with_web_identity_result
        .credentials;
    let expires_at = creds
        .expiration
        .to_datetime()
        .ok_or_else(|| CredentialError::Malformed {
            reason: "unreadable Expiration".to_string(),
        })?;

    Ok(Credentials::new(
        creds.access_key_id,
        creds.secret_access_key,
        Some(creds.session_token),
        Some(expires_at),
    ))
}

fn parse_error_body(body: &str) -> Option<(String, String)> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|e| (e.error.code, e.error.message))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPOCH_BODY: &str = r#"{
        "AssumeRoleWithWebIdentityResponse": {
            "AssumeRoleWithWebIdentityResult": {
                "Credentials": {
                    "AccessKeyId": "ASIAEXAMPLE",
                    "SecretAccessKey": "secret",
                    "SessionToken": "session",
                    "Expiration": 1.7000036E9
                },
                "SubjectFromWebIdentityToken": "repo:org/repo:ref:refs/tags/v1.0.0"
            },
            "ResponseMetadata": { "RequestId": "abc" }
        }
    }"#;

    #[test]
    fn test_parse_epoch_expiration() {
        let creds = parse_assume_role_response(EPOCH_BODY).unwrap();
        assert_eq!(creds.access_key_id(), "ASIAEXAMPLE");
        assert_eq!(creds.session_token(), Some("session"));
        assert_eq!(
            creds.expires_at().unwrap(),
            Utc.timestamp_opt(1_700_003_600, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_text_expiration() {
        let body = EPOCH_BODY.replace("1.7000036E9", "\"2023-11-14T23:13:20Z\"");
        let creds = parse_assume_role_response(&body).unwrap();
        assert_eq!(
            creds.expires_at().unwrap().to_rfc3339(),
            "2023-11-14T23:13:20+00:00"
        );
    }

    #[test]
    fn test_parse_malformed() {
        let err = parse_assume_role_response("{}").unwrap_err();
        assert!(matches!(err, CredentialError::Malformed { .. }));
    }

    #[test]
    fn test_parse_error_body() {
        let body = r#"{"Error":{"Code":"AccessDenied","Message":"Not authorized","Type":"Sender"},"RequestId":"x"}"#;
        assert_eq!(
            parse_error_body(body),
            Some(("AccessDenied".to_string(), "Not authorized".to_string()))
        );
        assert_eq!(parse_error_body("<xml/>"), None);
    }

    #[test]
    fn test_regional_endpoint() {
        let provider = WebIdentityProvider::new(IdentityTokenSource::Token("t".into()));
        assert_eq!(
            provider.endpoint_for("eu-west-1").unwrap().as_str(),
            "https://sts.eu-west-1.amazonaws.com/"
        );
    }
}
