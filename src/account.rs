// SPDX-License-Identifier: MPL-2.0

//! Owned session context: bootstrap from the persisted session, listen for
//! auth changes, and keep the active profile populated.
//!
//! The context owns two background tasks. The listener task reacts to
//! sign-in/sign-out events from the backend client; the apply task receives
//! fetched profiles over a channel and writes them into the shared state.
//! `shutdown` aborts both, along with any in-flight profile fetch.

use crate::config::PROFILE_FETCH_DEADLINE;
use crate::state::SessionManager;
use crate::supabase::{
    AuthEvent, ClientError, Profile, ProfileUpdate, Session, SessionUser, SupabaseClient,
};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const PROFILES_TABLE: &str = "user_profiles";

/// Point-in-time view of the account state, cheap to clone into the view
/// layer on every render.
#[derive(Debug, Clone, Default)]
pub struct AccountSnapshot {
    pub user: Option<SessionUser>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

struct Inner {
    client: Arc<SupabaseClient>,
    state: RwLock<AccountSnapshot>,
    profile_deadline: Duration,
    /// Most recent background profile fetch, aborted on sign-out/teardown.
    fetch_task: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn set_user(&self, user: Option<SessionUser>) {
        self.state.write().unwrap().user = user;
    }

    fn set_profile(&self, profile: Option<Profile>) {
        self.state.write().unwrap().profile = profile;
    }

    fn set_loading(&self, loading: bool) {
        self.state.write().unwrap().loading = loading;
    }

    fn abort_fetch(&self) {
        if let Some(task) = self.fetch_task.lock().unwrap().take() {
            task.abort();
        }
    }
}

/// Kick off the background profile fetch for `user`. The result is applied
/// through `tx` by the apply task; the caller never waits.
fn spawn_profile_fetch(inner: &Arc<Inner>, user: SessionUser, tx: mpsc::UnboundedSender<Profile>) {
    inner.abort_fetch();
    let task_inner = Arc::clone(inner);
    let task = tokio::spawn(async move {
        let (profile, persist) =
            fetch_profile_with_fallback(&task_inner.client, &user, task_inner.profile_deadline)
                .await;
        if persist {
            spawn_profile_create(&task_inner.client, &profile, tx.clone());
        }
        let _ = tx.send(profile);
    });
    *inner.fetch_task.lock().unwrap() = Some(task);
}

pub struct AccountContext {
    inner: Arc<Inner>,
    profile_tx: mpsc::UnboundedSender<Profile>,
    listener_task: JoinHandle<()>,
    apply_task: JoinHandle<()>,
}

impl AccountContext {
    /// Bootstrap the account state: adopt any persisted session, start the
    /// auth listener, and trigger a background profile fetch. Never fails;
    /// a broken session store just means starting signed out, and the
    /// loading flag is cleared regardless of outcome.
    pub async fn init(client: Arc<SupabaseClient>) -> Self {
        Self::init_with_profile_deadline(client, PROFILE_FETCH_DEADLINE).await
    }

    pub async fn init_with_profile_deadline(
        client: Arc<SupabaseClient>,
        profile_deadline: Duration,
    ) -> Self {
        let inner = Arc::new(Inner {
            client: Arc::clone(&client),
            state: RwLock::new(AccountSnapshot {
                loading: true,
                ..Default::default()
            }),
            profile_deadline,
            fetch_task: Mutex::new(None),
        });

        let (profile_tx, mut profile_rx) = mpsc::unbounded_channel::<Profile>();

        let apply_inner = Arc::clone(&inner);
        let apply_task = tokio::spawn(async move {
            while let Some(profile) = profile_rx.recv().await {
                apply_inner.set_profile(Some(profile));
            }
        });

        let mut events = client.subscribe();
        let listener_inner = Arc::clone(&inner);
        let listener_tx = profile_tx.clone();
        let listener_task = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "auth listener lagged, events dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                match event {
                    AuthEvent::SignedIn(session) => {
                        debug!(user = %session.user.id, "auth state changed: signed in");
                        listener_inner.set_user(Some(session.user.clone()));
                        spawn_profile_fetch(
                            &listener_inner,
                            session.user.clone(),
                            listener_tx.clone(),
                        );
                        tokio::spawn(async move {
                            if let Err(e) = SessionManager::store(&session).await {
                                warn!(error = %e, "failed to persist session");
                            }
                        });
                    }
                    AuthEvent::SignedOut => {
                        debug!("auth state changed: signed out");
                        listener_inner.abort_fetch();
                        listener_inner.set_user(None);
                        listener_inner.set_profile(None);
                        tokio::spawn(async {
                            // Best effort; absence of the key is fine.
                            if let Err(e) = SessionManager::clear().await {
                                debug!(error = %e, "session store cleanup skipped");
                            }
                        });
                    }
                }
            }
        });

        // Initial session: adopt if present, log and continue otherwise.
        match SessionManager::load().await {
            Ok(session) => {
                debug!(user = %session.user.id, "restored persisted session");
                client.restore_session(session.clone());
                inner.set_user(Some(session.user.clone()));
                spawn_profile_fetch(&inner, session.user, profile_tx.clone());
            }
            Err(e) => debug!(error = %e, "no persisted session adopted"),
        }
        inner.set_loading(false);

        Self {
            inner,
            profile_tx,
            listener_task,
            apply_task,
        }
    }

    /// Tear down the listener and any pending background work. Safe to
    /// call more than once; also invoked on drop.
    pub fn shutdown(&self) {
        self.listener_task.abort();
        self.apply_task.abort();
        self.inner.abort_fetch();
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        self.inner.state.read().unwrap().clone()
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.inner.state.read().unwrap().user.clone()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.inner.state.read().unwrap().profile.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.read().unwrap().loading
    }

    /// Whether the active user may curate the local catalog. Defaults to
    /// `false` when no profile is loaded; the stored flag is authoritative.
    pub fn is_admin(&self) -> bool {
        self.inner
            .state
            .read()
            .unwrap()
            .profile
            .as_ref()
            .is_some_and(|p| p.is_admin)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<Option<Session>, ClientError> {
        self.inner.set_loading(true);
        let result = self.inner.client.sign_up(email, password, full_name).await;
        self.inner.set_loading(false);
        result
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        self.inner.set_loading(true);
        let result = self.inner.client.sign_in(email, password).await;
        self.inner.set_loading(false);
        result
    }

    /// Sign out, clearing local identity immediately. The listener handles
    /// the same event, so state is cleared even if this future is dropped.
    pub async fn sign_out(&self) {
        self.inner.set_user(None);
        self.inner.set_profile(None);
        self.inner.client.sign_out().await;
    }

    /// Explicit profile edit; the updated row replaces the local copy.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Profile, ClientError> {
        let user = self.user().ok_or(ClientError::NotAuthenticated)?;
        let profile: Profile = self
            .inner
            .client
            .update_one(
                PROFILES_TABLE,
                &[("id", format!("eq.{}", user.id))],
                &update,
            )
            .await?;
        self.inner.set_profile(Some(profile.clone()));
        Ok(profile)
    }

    /// Re-run the background profile fetch for the active user.
    pub fn refresh_profile(&self) {
        if let Some(user) = self.user() {
            spawn_profile_fetch(&self.inner, user, self.profile_tx.clone());
        }
    }
}

impl Drop for AccountContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Single-row profile lookup with a deadline. Returns the profile to adopt
/// plus whether it should be persisted remotely (only when the row is
/// genuinely missing, not when the lookup merely failed).
async fn fetch_profile_with_fallback(
    client: &SupabaseClient,
    user: &SessionUser,
    deadline: Duration,
) -> (Profile, bool) {
    let filters = [("id", format!("eq.{}", user.id))];
    let lookup = client.select_one::<Profile>(PROFILES_TABLE, &filters);
    match tokio::time::timeout(deadline, lookup).await {
        Ok(Ok(profile)) => (profile, false),
        Ok(Err(ClientError::NotFound)) => {
            debug!(user = %user.id, "profile not found, synthesizing");
            (synthesize_profile(user), true)
        }
        Ok(Err(e)) => {
            warn!(user = %user.id, error = %e, "profile fetch failed, using fallback");
            (synthesize_profile(user), false)
        }
        Err(_) => {
            warn!(user = %user.id, "profile fetch timed out, using fallback");
            (synthesize_profile(user), false)
        }
    }
}

/// Minimal profile derived from session claims: the sign-up display name
/// if present, else the local part of the email address.
fn synthesize_profile(user: &SessionUser) -> Profile {
    let email = user.email.clone().unwrap_or_default();
    let full_name = user
        .full_name_claim()
        .or_else(|| email.split('@').next().map(str::to_string))
        .unwrap_or_default();
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

    Profile {
        id: user.id.clone(),
        email,
        full_name,
        is_admin: false,
        created_at: Some(now.clone()),
        updated_at: Some(now),
    }
}

/// Best-effort remote insert of a synthesized profile. Detached: nothing
/// awaits it, and a failure only produces a log line. On success the
/// stored row is pushed back through the apply channel.
fn spawn_profile_create(
    client: &Arc<SupabaseClient>,
    profile: &Profile,
    tx: mpsc::UnboundedSender<Profile>,
) {
    let client = Arc::clone(client);
    let row = serde_json::json!({
        "id": profile.id,
        "email": profile.email,
        "full_name": profile.full_name,
        "is_admin": false,
    });
    tokio::spawn(async move {
        match client.insert_row::<_, Profile>(PROFILES_TABLE, &row).await {
            Ok(stored) => {
                let _ = tx.send(stored);
            }
            Err(e) => warn!(error = %e, "background profile create failed"),
        }
    });
}
