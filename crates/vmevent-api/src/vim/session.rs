// Session lifecycle
//
// `SessionManager.Login` sets the `vmware_soap_session` cookie in the
// client's jar; every later call rides on it.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::Error;
use crate::vim::client::VimClient;
use crate::vim::models::{ManagedObjectReference, UserSession};
use crate::vim::soap::Request;

impl VimClient {
    fn session_manager(&self) -> Result<&ManagedObjectReference, Error> {
        self.service()
            .session_manager
            .as_ref()
            .ok_or_else(|| Error::missing("sessionManager", "ServiceContent"))
    }

    /// Authenticate with username/password.
    ///
    /// `locale` is optional; without it the endpoint picks the server default,
    /// reported back in [`UserSession::locale`].
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        locale: Option<&str>,
    ) -> Result<UserSession, Error> {
        debug!(username, "logging in at {}", self.sdk_url());

        let mut req = Request::new("Login", self.session_manager()?)
            .text("userName", username)
            .text("password", password.expose_secret());
        if let Some(locale) = locale {
            req = req.text("locale", locale);
        }

        let resp = self.call(req).await?;
        let session = resp
            .child("returnval")
            .map(UserSession::from_node)
            .ok_or_else(|| Error::missing("UserSession", &resp.name))?;

        debug!(locale = %session.locale, "login successful");
        Ok(session)
    }

    /// End the current session.
    pub async fn logout(&self) -> Result<(), Error> {
        debug!("logging out at {}", self.sdk_url());
        self.call(Request::new("Logout", self.session_manager()?))
            .await?;
        debug!("logout complete");
        Ok(())
    }
}
