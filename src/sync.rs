use crate::api::{ApiRequest, ApiResponse};
use crate::error::{EditorError, TransportError};
use crate::session::SessionCookie;
use crate::state::EditorState;
use crate::statics;
use crate::value::LbValue;
use std::collections::{HashMap, VecDeque};

pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    LoggingIn,
    LoggedIn { token: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A short message for the user (toast, status line, alert).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// A request waiting to be put on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    pub id: RequestId,
    pub request: ApiRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Login,
    Fetch,
    Save,
}

/// Drives the editor against the server.
///
/// Requests are queued in an outbox and their answers are fed back through
/// `handle_completion`, in whatever order they arrive. Nothing here blocks, and a late answer
/// is applied as is: the last response wins. Failures never escape as errors; they end up as
/// notices and in `last_error`.
#[derive(Debug, Default)]
pub struct SyncController {
    state: EditorState,
    session: Option<SessionState>,
    etag: Option<String>,
    cookie: Option<SessionCookie>,
    expert_text: Option<String>,
    notices: VecDeque<Notice>,
    last_error: Option<EditorError>,
    outbox: VecDeque<Outgoing>,
    pending: HashMap<RequestId, Pending>,
    next_id: RequestId,
}

impl SyncController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie(cookie: SessionCookie) -> Self {
        Self {
            cookie: Some(cookie),
            ..Self::default()
        }
    }

    /// Resume a previous login from the session cookie, or ask for one.
    pub fn start(&mut self) {
        let token = match self.cookie.as_ref().map(SessionCookie::load) {
            Some(Ok(token)) => token,
            Some(Err(e)) => {
                log::warn!("Ignoring unreadable session cookie: {e:#}");
                None
            }
            None => None,
        };

        match token {
            Some(token) => {
                log::info!("Resuming session from cookie");
                self.session = Some(SessionState::LoggedIn { token });
                self.fetch();
            }
            None => {
                self.session = Some(SessionState::LoggedOut);
                self.notify(NoticeLevel::Info, statics::EN_NOTICE_LOGIN_REQUIRED);
            }
        }
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    /// Edit sessions commit through this; see `EditorState::commit`.
    pub fn state_mut(&mut self) -> &mut EditorState {
        &mut self.state
    }

    pub fn session(&self) -> &SessionState {
        self.session.as_ref().unwrap_or(&SessionState::LoggedOut)
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self.session(), SessionState::LoggedIn { .. })
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.store().is_dirty()
    }

    pub fn is_busy(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn expert_text(&self) -> Option<&str> {
        self.expert_text.as_deref()
    }

    pub fn last_error(&self) -> Option<&EditorError> {
        self.last_error.as_ref()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn take_requests(&mut self) -> Vec<Outgoing> {
        self.outbox.drain(..).collect()
    }

    pub fn login(&mut self, username: &str, password: &str) -> RequestId {
        self.session = Some(SessionState::LoggingIn);
        self.enqueue(
            Pending::Login,
            ApiRequest::Login {
                username: username.to_string(),
                password: password.to_string(),
            },
        )
    }

    pub fn logout(&mut self) {
        self.forget_session();
        self.notify(NoticeLevel::Info, statics::EN_NOTICE_LOGIN_REQUIRED);
    }

    pub fn fetch(&mut self) -> Option<RequestId> {
        let token = self.require_token()?;
        Some(self.enqueue(Pending::Fetch, ApiRequest::FetchControlData { token }))
    }

    /// Send the whole document, without edit markers, conditional on the version tag of the
    /// last fetch.
    pub fn save(&mut self) -> Option<RequestId> {
        let token = self.require_token()?;

        for issue in self.state.store().check_references() {
            log::warn!("Saving with unresolved reference: {issue}");
            self.notify(NoticeLevel::Warning, &issue.to_string());
        }

        let body = self.state.store().snapshot_for_save();
        log::info!("Saving control data (If-Match: {:?})", self.etag);
        Some(self.enqueue(
            Pending::Save,
            ApiRequest::SaveControlData {
                token,
                etag: self.etag.clone(),
                body,
            },
        ))
    }

    /// Replace the document with hand-edited text and save it. Text that does not parse
    /// leaves everything as it was.
    pub fn save_raw_json(&mut self, text: &str) -> Result<RequestId, EditorError> {
        let parsed = LbValue::parse_json5(text).map_err(|e| EditorError::Parse(e.to_string()))?;
        if !self.is_logged_in() {
            return Err(EditorError::Auth(statics::EN_ERR_NOT_LOGGED_IN.to_string()));
        }
        self.state.store_mut().replace_document(parsed)?;
        self.save()
            .ok_or_else(|| EditorError::Auth(statics::EN_ERR_NOT_LOGGED_IN.to_string()))
    }

    /// Switch to raw text editing. Unsaved changes are dropped first, so `confirm` is asked
    /// before anything happens.
    pub fn enter_expert_mode(
        &mut self,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<&str, EditorError> {
        if !confirm(statics::EN_CONFIRM_EXPERT_MODE) {
            return Err(EditorError::ConfirmationDeclined);
        }
        self.state.revert();
        let text = self.state.store().pristine().to_json_pretty();
        Ok(self.expert_text.insert(text).as_str())
    }

    pub fn leave_expert_mode(&mut self) {
        self.expert_text = None;
    }

    pub fn revert(&mut self) {
        self.state.revert();
        self.notify(NoticeLevel::Info, statics::EN_NOTICE_REVERTED);
    }

    /// Apply the answer to an earlier request.
    pub fn handle_completion(
        &mut self,
        id: RequestId,
        result: Result<ApiResponse, TransportError>,
    ) {
        let Some(kind) = self.pending.remove(&id) else {
            log::warn!("Dropping answer to unknown request {id}");
            return;
        };

        match (kind, result) {
            (_, Err(e)) => self.on_transport_error(kind, e),
            (Pending::Login, Ok(resp)) => self.on_login(resp),
            (Pending::Fetch, Ok(resp)) => self.on_fetch(resp),
            (Pending::Save, Ok(resp)) => self.on_save(resp),
        }
    }

    fn on_login(&mut self, resp: ApiResponse) {
        let token = resp
            .is_success()
            .then(|| resp.token())
            .flatten()
            .map(str::to_string);
        let Some(token) = token else {
            log::warn!("Login rejected with HTTP {}", resp.status);
            self.session = Some(SessionState::LoggedOut);
            self.fail(EditorError::Auth(statics::EN_ERR_LOGIN_FAILED.to_string()));
            return;
        };

        if let Some(cookie) = self.cookie.as_ref()
            && let Err(e) = cookie.store(&token)
        {
            log::warn!("Could not persist session cookie: {e:#}");
        }
        log::info!("Logged in");
        self.session = Some(SessionState::LoggedIn { token });
        self.fetch();
    }

    fn on_fetch(&mut self, resp: ApiResponse) {
        if resp.status == 401 {
            self.auth_lost();
            return;
        }
        if !resp.is_success() {
            let message = server_message(&resp, statics::EN_ERR_LOAD_FAILED);
            log::warn!("Fetch failed with HTTP {}: {message}", resp.status);
            self.fail(EditorError::Transport(TransportError::new(message)));
            return;
        }

        if let Err(e) = self.state.load(resp.body) {
            log::warn!("Server sent unusable control data: {e}");
            self.fail(e);
            return;
        }
        if resp.etag.is_none() {
            log::warn!("Control data came without a version tag");
        }
        self.etag = resp.etag;
        self.last_error = None;
        log::info!(
            "Loaded control data: {} bridges, version {:?}",
            self.state.store().bridges().len(),
            self.etag
        );
    }

    fn on_save(&mut self, resp: ApiResponse) {
        if resp.status == 401 {
            self.auth_lost();
            return;
        }
        if !resp.is_success() {
            // The local document still differs from the server.
            self.state.store_mut().mark_dirty();
            let err = if resp.status == 412 {
                EditorError::Conflict(server_message(&resp, statics::EN_ERR_CONFLICT))
            } else {
                EditorError::Transport(TransportError::new(server_message(
                    &resp,
                    statics::EN_ERR_SAVE_FAILED,
                )))
            };
            log::warn!("Save rejected with HTTP {}: {err}", resp.status);
            self.fail(err);
            return;
        }

        log::info!("Control data saved");
        self.state.store_mut().mark_saved();
        self.expert_text = None;
        self.last_error = None;
        self.notify(NoticeLevel::Success, statics::EN_NOTICE_SAVED);
        self.fetch();
    }

    fn on_transport_error(&mut self, kind: Pending, e: TransportError) {
        log::warn!("{kind:?} request failed: {e}");
        match kind {
            Pending::Login => {
                self.session = Some(SessionState::LoggedOut);
                self.fail(EditorError::Auth(format!(
                    "{} {}",
                    statics::EN_ERR_LOGIN_FAILED,
                    e.message
                )));
            }
            Pending::Fetch => self.fail(EditorError::Transport(e)),
            Pending::Save => {
                self.state.store_mut().mark_dirty();
                self.fail(EditorError::Transport(e));
            }
        }
    }

    fn auth_lost(&mut self) {
        log::warn!("Session expired");
        self.forget_session();
        self.fail(EditorError::Auth(statics::EN_ERR_SESSION_EXPIRED.to_string()));
    }

    fn forget_session(&mut self) {
        self.session = Some(SessionState::LoggedOut);
        self.state.clear();
        self.etag = None;
        self.expert_text = None;
        if let Some(cookie) = self.cookie.as_ref()
            && let Err(e) = cookie.clear()
        {
            log::warn!("Could not remove session cookie: {e:#}");
        }
    }

    fn require_token(&mut self) -> Option<String> {
        match self.session() {
            SessionState::LoggedIn { token } => Some(token.clone()),
            _ => {
                self.fail(EditorError::Auth(statics::EN_ERR_NOT_LOGGED_IN.to_string()));
                None
            }
        }
    }

    fn enqueue(&mut self, kind: Pending, request: ApiRequest) -> RequestId {
        self.next_id += 1;
        let id = self.next_id;
        log::debug!("Queueing {} request {id}", request.name());
        self.pending.insert(id, kind);
        self.outbox.push_back(Outgoing { id, request });
        id
    }

    fn notify(&mut self, level: NoticeLevel, text: &str) {
        self.notices.push_back(Notice {
            level,
            text: text.to_string(),
        });
    }

    fn fail(&mut self, err: EditorError) {
        self.notify(NoticeLevel::Error, &err.to_string());
        self.last_error = Some(err);
    }
}

fn server_message(resp: &ApiResponse, fallback: &str) -> String {
    match (resp.error_message(), &resp.body) {
        (Some(message), _) => message.to_string(),
        (None, LbValue::String(text)) if !text.trim().is_empty() => text.trim().to_string(),
        _ => format!("{fallback} (HTTP {})", resp.status),
    }
}
