//! Sign-in for the command line.
//!
//! Both authenticators enforce the same policy first: the method must be
//! enabled and this client's origin must be authorized.

use async_trait::async_trait;
use mill_core::{AuthError, AuthOutcome, Authenticator, Identity};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;

use crate::config::AuthSettings;

fn check_policy(settings: &AuthSettings) -> Result<(), AuthError> {
    if !settings.enabled {
        return Err(AuthError::MethodDisabled);
    }
    if !settings
        .authorized_origins
        .iter()
        .any(|o| o == &settings.origin)
    {
        return Err(AuthError::UnauthorizedOrigin(settings.origin.clone()));
    }
    Ok(())
}

/// Resolves to a fixed operator, e.g. from `--user` or `auth.user_id`.
pub struct StaticAuthenticator {
    settings: AuthSettings,
    identity: Identity,
}

impl StaticAuthenticator {
    pub fn new(
        settings: AuthSettings,
        identity: Identity,
    ) -> Self {
        Self { settings, identity }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self) -> Result<AuthOutcome, AuthError> {
        check_policy(&self.settings)?;
        Ok(AuthOutcome::Authenticated(self.identity.clone()))
    }
}

/// Asks for an operator id on a line-oriented reader.
///
/// Waits for as long as the reader does. An empty line or end of input
/// cancels the sign-in.
pub struct ConsoleAuthenticator<R> {
    settings: AuthSettings,
    input: Mutex<R>,
}

impl<R> ConsoleAuthenticator<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(
        settings: AuthSettings,
        input: R,
    ) -> Self {
        Self {
            settings,
            input: Mutex::new(input),
        }
    }
}

impl ConsoleAuthenticator<BufReader<Stdin>> {
    pub fn stdin(settings: AuthSettings) -> Self {
        Self::new(settings, BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R> Authenticator for ConsoleAuthenticator<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn authenticate(&self) -> Result<AuthOutcome, AuthError> {
        check_policy(&self.settings)?;

        eprint!("Operator id (empty to cancel): ");
        let mut line = String::new();
        let read = self
            .input
            .lock()
            .await
            .read_line(&mut line)
            .await
            .map_err(|e| AuthError::Failed(e.to_string()))?;

        let user_id = line.trim();
        if read == 0 || user_id.is_empty() {
            tracing::debug!("sign-in cancelled");
            return Ok(AuthOutcome::Cancelled);
        }

        tracing::info!(user_id, "operator signed in");
        Ok(AuthOutcome::Authenticated(Identity::new(user_id)))
    }
}

/// Picks the authenticator the configuration asks for.
pub fn from_settings(settings: &AuthSettings) -> Box<dyn Authenticator> {
    match &settings.user_id {
        Some(user_id) => {
            let mut identity = Identity::new(user_id.as_str());
            if let Some(name) = &settings.display_name {
                identity = identity.with_display_name(name.as_str());
            }
            Box::new(StaticAuthenticator::new(settings.clone(), identity))
        }
        None => Box::new(ConsoleAuthenticator::stdin(settings.clone())),
    }
}
