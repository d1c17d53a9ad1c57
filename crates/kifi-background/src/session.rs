use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use kifi_config::keys;
use kifi_protocol::endpoints;
use kifi_remote::ApiCall;
use kifi_telemetry::EventFamily;
use kifi_types::Session;

use crate::context::Background;
use crate::error::{BackgroundError, BackgroundResult};

impl Background {
    /// Log in.
    ///
    /// In development the interactive popup is opened straight away. In
    /// production the silent handshake is tried first and the popup is the
    /// fallback. Resolves once a session exists, which for the popup path
    /// means once the user finishes logging in.
    pub async fn authenticate(&self) -> BackgroundResult<Session> {
        self.events().record(EventFamily::Extension, "started");
        if self.config().env().is_development() {
            return self.login_popup().await;
        }
        match self.start_session().await {
            Ok(session) => Ok(session),
            Err(e) => {
                info!(error = %e, "handshake failed, falling back to login popup");
                self.login_popup().await
            }
        }
    }

    /// Silent handshake against `/kifi/start`.
    ///
    /// On success the session is set, the identity and installation id are
    /// persisted, and the keep folders are resolved with their root stored
    /// in `bookmark_id`.
    pub async fn start_session(&self) -> BackgroundResult<Session> {
        let config = self.config().get();
        let call = ApiCall::Start {
            installation: config.kifi_installation_id.clone(),
            version: self.settings().version.clone(),
            agent: self.settings().user_agent.clone(),
        };
        let body = self.remote().call(&config.server, &call).await?;
        let session =
            Session::from_handshake(body).map_err(|e| BackgroundError::Handshake(e.to_string()))?;
        debug!(installation = ?session.installation_id, "handshake done");

        self.events().record(EventFamily::Extension, "authenticated");
        self.set_session(Some(session.clone()));
        self.config().set_user(&session.user())?;
        if let Some(id) = &session.installation_id {
            self.config().set(keys::KIFI_INSTALLATION_ID, id)?;
        }

        if let Err(e) = self.resolve_and_store_folders().await {
            warn!(error = %e, "could not resolve keep folders");
        }
        Ok(session)
    }

    /// Interactive login.
    ///
    /// Opens the login popup, waits for its tab to start loading the
    /// callback URL, closes it, and retries the handshake once. Waits as
    /// long as the user takes.
    pub async fn login_popup(&self) -> BackgroundResult<Session> {
        self.config().remove(keys::USER)?;
        let config = self.config().get();
        let callback_url = config.url(endpoints::LOGIN_CALLBACK);
        let geometry = self.settings().login_popup;

        let mut updates = self.platform().tab_updates();
        let popup = self
            .platform()
            .open_popup(
                &config.url(endpoints::AUTHENTICATE_FACEBOOK),
                geometry.width,
                geometry.height,
            )
            .await?;
        info!(tab = %popup.tab_id, "login popup opened");

        loop {
            match updates.recv().await {
                Ok(update)
                    if update.tab.id == popup.tab_id
                        && update.is_loading()
                        && update.tab.url == callback_url =>
                {
                    break
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "login popup missed tab updates");
                }
                Err(RecvError::Closed) => return Err(BackgroundError::UpdatesClosed),
            }
        }

        debug!(tab = %popup.tab_id, "closing login popup");
        if let Err(e) = self.platform().close_tab(popup.tab_id).await {
            warn!(tab = %popup.tab_id, error = %e, "could not close login popup");
        }
        self.start_session().await
    }

    /// Log out: drop the session and open the small popup that ends the
    /// server-side session. Returns once the popup exists.
    pub async fn deauthenticate(&self) -> BackgroundResult<()> {
        info!("deauthenticating");
        self.set_session(None);
        let config = self.config().get();
        let geometry = self.settings().logout_popup;
        let popup = self
            .platform()
            .open_popup(
                &config.url(endpoints::SESSION_END),
                geometry.width,
                geometry.height,
            )
            .await?;
        debug!(tab = %popup.tab_id, "logout popup opened");
        Ok(())
    }
}
