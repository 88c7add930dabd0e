//! Core library for editing livebridge control data.
//! Holds the document with its edit markers and snapshot, the per-entity edit sessions, the
//! suggestion tables, and the controller that syncs with the control data API.

mod api;
mod choices;
mod config;
mod dispatch;
mod document;
mod edit;
mod error;
mod session;
mod state;
pub mod statics;
mod sync;
mod value;

pub use api::{ApiRequest, ApiResponse, HttpTransport, Transport};
pub use choices::ChoiceIndex;
pub use config::EditorConfig;
pub use dispatch::{Completion, Dispatcher};
pub use document::{DocumentIssue, DocumentStore, normalize_document};
pub use edit::{EditSession, EditTarget, EntityKind, EntitySink, Mutation};
pub use error::{DocumentError, EditorError, TransportError, ValidationError};
pub use session::{SessionCookie, parse_set_cookie};
pub use state::EditorState;
pub use sync::{Notice, NoticeLevel, Outgoing, RequestId, SessionState, SyncController};
pub use value::{LbMap, LbNumber, LbValue};
