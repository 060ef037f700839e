//! Issue-token command implementation.

use booksync_server::{AuthConfig, HmacTokenVerifier};

/// Runs the issue-token command, printing the token on stdout.
pub fn run(
    subject: &str,
    email: Option<&str>,
    secret: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let token = mint(subject, email, secret)?;
    println!("{token}");
    Ok(())
}

fn mint(
    subject: &str,
    email: Option<&str>,
    secret: &str,
) -> Result<String, Box<dyn std::error::Error>> {
    if secret.is_empty() {
        return Err("auth secret must not be empty".into());
    }
    if subject.is_empty() {
        return Err("subject must not be empty".into());
    }
    let verifier = HmacTokenVerifier::new(AuthConfig::new(secret.as_bytes().to_vec()));
    Ok(verifier.create_token(subject, email)?)
}
