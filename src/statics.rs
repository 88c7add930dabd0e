// Central place for user-facing strings, document keys and API constants.
// Keep these out of the controller code to reduce duplication and make tweaks safer.

// Control data structure keys (LB_ prefix)
pub const LB_BRIDGES: &str = "bridges";
pub const LB_AUTH: &str = "auth";
pub const LB_TARGETS: &str = "targets";

// Required entity fields.
pub const LB_FIELD_TYPE: &str = "type";
pub const LB_FIELD_LABEL: &str = "label";

// Property through which bridges and targets name an auth account.
pub const LB_FIELD_AUTH_REF: &str = "auth";

// UI-only change marker; never sent to the server.
pub const LB_EDITED_MARKER: &str = "__edited";

// REST API (API_ prefix)
pub const API_SESSION_PATH: &str = "/api/v1/session";
pub const API_CONTROLDATA_PATH: &str = "/api/v1/controldata";
pub const API_HEADER_AUTH_TOKEN: &str = "X-Auth-Token";
pub const API_FIELD_TOKEN: &str = "token";
pub const API_FIELD_ERROR: &str = "error";
pub const API_FORM_USERNAME: &str = "username";
pub const API_FORM_PASSWORD: &str = "password";

// Session cookie set by the server on login.
pub const SESSION_COOKIE_NAME: &str = "lb-db";

// Configuration
pub const CONFIG_DIR_NAME: &str = "bridge-editor";
pub const CONFIG_SESSION_FILE: &str = "session";
pub const CONFIG_DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const CONFIG_DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const ENV_BASE_URL: &str = "BRIDGE_EDITOR_URL";

// English UI strings (EN_ prefix to make future localization easier)
pub const EN_NOTICE_SAVED: &str = "Data was successfully saved!";
pub const EN_NOTICE_REVERTED: &str = "All unsaved changes were discarded.";
pub const EN_NOTICE_LOGIN_REQUIRED: &str = "Please log in.";

pub const EN_CONFIRM_EXPERT_MODE: &str =
    "Expert mode discards all unsaved changes. Do you want to continue?";

pub const EN_ADVISORY_TYPE_UNDEFINED: &str = "Please choose a type before saving.";
pub const EN_HINT_LABEL_REQUIRED: &str = "label";
pub const EN_HINT_TYPE_REQUIRED: &str = "type";
pub const EN_HINT_ACCOUNT_REQUIRED: &str = "account name";

pub const EN_ERR_LOGIN_FAILED: &str = "Login failed.";
pub const EN_ERR_SESSION_EXPIRED: &str = "Your session expired, please log in again.";
pub const EN_ERR_NOT_LOGGED_IN: &str = "Not logged in.";
pub const EN_ERR_CONFLICT: &str =
    "The control data was changed on the server. Reload before saving again.";
pub const EN_ERR_LOAD_FAILED: &str = "Loading control data failed";
pub const EN_ERR_SAVE_FAILED: &str = "Saving control data failed";
pub const EN_ERR_INVALID_DOCUMENT: &str = "Control data must be an object";
pub const EN_ERR_NON_FINITE: &str = "Control data contains a number JSON cannot represent";

pub const EN_WARN_UNKNOWN_AUTH: &str = "references unknown auth account";
pub const EN_WARN_DUPLICATE_TARGET: &str = "duplicates an earlier target of the same bridge";
pub const EN_WARN_DUPLICATE_BRIDGE: &str = "has the same source as bridge";

pub const EN_LABEL_BRIDGE: &str = "Bridge";
pub const EN_LABEL_TARGET: &str = "Target";
