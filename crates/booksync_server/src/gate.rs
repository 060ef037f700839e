//! Authentication gate run before the delta endpoint.
//!
//! Credential lookup order: `Authorization: Bearer <token>`, then the
//! `__session` cookie. Token values never reach the logs.

use crate::auth::{IdentityVerifier, VerifiedIdentity};
use crate::error::{AuthFailure, ServerError, ServerResult};
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use std::fmt;
use std::sync::Arc;

/// Name of the session cookie consulted when no bearer header is present.
pub const SESSION_COOKIE: &str = "__session";

/// Where a credential was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// `Authorization: Bearer` header.
    BearerHeader,
    /// `__session` cookie.
    SessionCookie,
}

impl CredentialSource {
    fn as_str(self) -> &'static str {
        match self {
            CredentialSource::BearerHeader => "bearer_header",
            CredentialSource::SessionCookie => "session_cookie",
        }
    }
}

/// A raw credential pulled from a request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// The token value.
    pub token: String,
    /// Where it came from.
    pub source: CredentialSource,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == SESSION_COOKIE)
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
}

/// Extracts a credential, preferring the bearer header over the cookie.
pub fn extract_credential(headers: &HeaderMap) -> Option<Credential> {
    if let Some(token) = bearer_token(headers) {
        return Some(Credential {
            token: token.to_string(),
            source: CredentialSource::BearerHeader,
        });
    }
    session_cookie(headers).map(|token| Credential {
        token: token.to_string(),
        source: CredentialSource::SessionCookie,
    })
}

/// Pluggable authentication step.
///
/// `Disabled` admits every request without an identity. `Required`
/// extracts a credential and verifies it.
#[derive(Clone)]
pub enum AuthGate {
    /// No authentication.
    Disabled,
    /// Every request must carry a credential the verifier accepts.
    Required(Arc<dyn IdentityVerifier>),
}

impl AuthGate {
    /// Gate that admits everything.
    pub fn disabled() -> Self {
        AuthGate::Disabled
    }

    /// Gate backed by `verifier`.
    pub fn required(verifier: Arc<dyn IdentityVerifier>) -> Self {
        AuthGate::Required(verifier)
    }

    /// Returns true if requests must authenticate.
    pub fn is_enabled(&self) -> bool {
        matches!(self, AuthGate::Required(_))
    }

    /// Admits or rejects a request.
    ///
    /// Returns `Ok(None)` when the gate is disabled and `Ok(Some(_))` for a
    /// verified caller.
    pub async fn admit(&self, headers: &HeaderMap) -> ServerResult<Option<VerifiedIdentity>> {
        let AuthGate::Required(verifier) = self else {
            return Ok(None);
        };

        let has_authorization = headers.contains_key(AUTHORIZATION);
        let has_cookie = headers.contains_key(COOKIE);

        let Some(credential) = extract_credential(headers) else {
            tracing::warn!(
                has_authorization,
                has_cookie,
                "rejecting request without credential"
            );
            return Err(ServerError::Unauthorized(AuthFailure::MissingCredential));
        };

        match verifier.verify(&credential.token).await {
            Ok(identity) => {
                tracing::debug!(
                    subject = %identity.subject,
                    source = credential.source.as_str(),
                    "credential verified"
                );
                Ok(Some(identity))
            }
            Err(reason) => {
                tracing::warn!(
                    has_authorization,
                    has_cookie,
                    source = credential.source.as_str(),
                    %reason,
                    "credential verification failed"
                );
                Err(ServerError::Unauthorized(AuthFailure::InvalidCredential))
            }
        }
    }
}

impl fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthGate::Disabled => f.write_str("AuthGate::Disabled"),
            AuthGate::Required(_) => f.write_str("AuthGate::Required"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthConfig, HmacTokenVerifier, StaticTokenVerifier};
    use axum::http::HeaderValue;
    use std::io;
    use std::sync::Mutex;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    use tracing_subscriber::fmt::MakeWriter;

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn gate() -> AuthGate {
        AuthGate::required(Arc::new(StaticTokenVerifier::new().with_token(
            "good",
            VerifiedIdentity::new("u1", Some("u1@example.com".into())),
        )))
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let h = headers(&[
            ("authorization", "Bearer abc"),
            ("cookie", "__session=xyz"),
        ]);
        let cred = extract_credential(&h).unwrap();
        assert_eq!(cred.token, "abc");
        assert_eq!(cred.source, CredentialSource::BearerHeader);
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let h = headers(&[("authorization", "bearer   abc  ")]);
        assert_eq!(extract_credential(&h).unwrap().token, "abc");
    }

    #[test]
    fn non_bearer_falls_back_to_cookie() {
        let h = headers(&[
            ("authorization", "Basic dXNlcjpwYXNz"),
            ("cookie", "theme=dark; __session=\"xyz\"; lang=en"),
        ]);
        let cred = extract_credential(&h).unwrap();
        assert_eq!(cred.token, "xyz");
        assert_eq!(cred.source, CredentialSource::SessionCookie);
    }

    #[test]
    fn cookie_in_second_header() {
        let h = headers(&[("cookie", "theme=dark"), ("cookie", "__session=s2")]);
        assert_eq!(extract_credential(&h).unwrap().token, "s2");
    }

    #[test]
    fn empty_values_are_absent() {
        let h = headers(&[("authorization", "Bearer "), ("cookie", "__session=")]);
        assert!(extract_credential(&h).is_none());
        assert!(extract_credential(&HeaderMap::new()).is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let cred = Credential {
            token: "super-secret".into(),
            source: CredentialSource::BearerHeader,
        };
        assert!(!format!("{cred:?}").contains("super-secret"));
    }

    #[tokio::test]
    async fn disabled_gate_admits_anonymously() {
        let admitted = AuthGate::disabled().admit(&HeaderMap::new()).await.unwrap();
        assert!(admitted.is_none());
    }

    #[tokio::test]
    async fn required_gate_outcomes() {
        let gate = gate();

        let missing = gate.admit(&HeaderMap::new()).await.unwrap_err();
        assert!(matches!(
            missing,
            ServerError::Unauthorized(AuthFailure::MissingCredential)
        ));

        let bad = gate
            .admit(&headers(&[("authorization", "Bearer bad")]))
            .await
            .unwrap_err();
        assert!(matches!(
            bad,
            ServerError::Unauthorized(AuthFailure::InvalidCredential)
        ));

        let identity = gate
            .admit(&headers(&[("cookie", "__session=good")]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(identity.user_email(), "u1@example.com");
    }

    #[tokio::test]
    async fn expired_token_logs_a_warning_without_the_token() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let verifier = HmacTokenVerifier::new(
            AuthConfig::new(b"gate-secret".to_vec()).with_expiry(Duration::from_secs(60)),
        );
        let issued = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64
            - 10 * 60 * 1000;
        let token = verifier.create_token_at("u1", None, issued).unwrap();
        let gate = AuthGate::required(Arc::new(verifier));

        let bearer = format!("Bearer {token}");
        let err = gate
            .admit(&headers(&[("authorization", bearer.as_str())]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServerError::Unauthorized(AuthFailure::InvalidCredential)
        ));

        let output = logs.contents();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("credential verification failed"), "{output}");
        assert!(output.contains("token expired"), "{output}");
        assert!(output.contains("bearer_header"), "{output}");
        assert!(!output.contains(&token), "{output}");
    }
}
