use bridge_editor::{
    ApiRequest, ApiResponse, EditTarget, EditorError, LbValue, SyncController, statics,
};
use pretty_assertions::assert_eq;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

fn loaded() -> Result<SyncController> {
    let mut ctl = SyncController::new();
    let login = ctl.login("admin", "admin");
    ctl.take_requests();
    ctl.handle_completion(
        login,
        Ok(ApiResponse::new(200, LbValue::parse_json(r#"{"token": "tok"}"#)?)),
    );
    let fetch = ctl.take_requests().remove(0).id;
    let doc = r#"{"bridges": [{"type": "a", "label": "L1", "targets": []}], "auth": {}}"#;
    ctl.handle_completion(
        fetch,
        Ok(ApiResponse::new(200, LbValue::parse_json(doc)?).with_etag("v1")),
    );
    ctl.take_notices();
    Ok(ctl)
}

#[test]
fn entering_reverts_and_renders_the_snapshot() -> Result<()> {
    let mut ctl = loaded()?;
    let mut session = ctl.state().open(EditTarget::Bridge(0))?;
    session.set_field("label", "changed")?;
    ctl.state_mut().commit(&mut session)?;
    assert!(ctl.is_dirty());

    let text = ctl.enter_expert_mode(|_| true)?.to_string();
    assert!(!ctl.is_dirty());
    assert_eq!(
        text,
        "{\n    \"bridges\": [\n        {\n            \"type\": \"a\",\n            \"label\": \"L1\",\n            \"targets\": []\n        }\n    ],\n    \"auth\": {}\n}\n"
    );
    assert_eq!(ctl.expert_text(), Some(text.as_str()));

    ctl.leave_expert_mode();
    assert_eq!(ctl.expert_text(), None);
    Ok(())
}

#[test]
fn declined_confirmation_keeps_local_edits() -> Result<()> {
    let mut ctl = loaded()?;
    ctl.state_mut().remove_bridge(0)?;

    let err = ctl.enter_expert_mode(|_| false).unwrap_err();
    assert_eq!(err, EditorError::ConfirmationDeclined);
    assert!(ctl.is_dirty());
    assert!(ctl.state().store().bridges().is_empty());
    Ok(())
}

#[test]
fn parse_error_changes_nothing() -> Result<()> {
    let mut ctl = loaded()?;
    ctl.enter_expert_mode(|_| true)?;
    let before = ctl.state().store().document().clone();
    let revision = ctl.state().store().revision();

    let err = ctl.save_raw_json("{ bridges: [ }").unwrap_err();
    assert!(matches!(err, EditorError::Parse(_)));

    let err = ctl.save_raw_json("{ bridges: [{ weight: Infinity }] }").unwrap_err();
    assert_eq!(err, EditorError::Parse(statics::EN_ERR_NON_FINITE.to_string()));

    let err = ctl.save_raw_json("[]").unwrap_err();
    assert!(matches!(err, EditorError::Parse(_)));

    assert_eq!(ctl.state().store().document(), &before);
    assert_eq!(ctl.state().store().revision(), revision);
    assert!(!ctl.is_dirty());
    assert!(ctl.take_requests().is_empty());
    assert!(ctl.expert_text().is_some());
    Ok(())
}

#[test]
fn raw_text_is_saved_like_a_form_edit() -> Result<()> {
    let mut ctl = loaded()?;
    ctl.enter_expert_mode(|_| true)?;

    let text = r#"{
        // hand edited
        bridges: [
            { type: "a", label: "L1", __edited: true, targets: [{ type: "b", label: "T1" }] },
        ],
        auth: {},
    }"#;
    let id = ctl.save_raw_json(text)?;
    assert!(ctl.is_dirty());

    let out = ctl.take_requests().remove(0);
    assert_eq!(out.id, id);
    let ApiRequest::SaveControlData { etag, body, .. } = out.request else {
        return Err("expected a save request".into());
    };
    assert_eq!(etag.as_deref(), Some("v1"));
    assert_eq!(
        body.to_json_compact(),
        r#"{"bridges":[{"type":"a","label":"L1","targets":[{"type":"b","label":"T1"}]}],"auth":{}}"#
    );

    ctl.handle_completion(id, Ok(ApiResponse::new(200, LbValue::Null)));
    assert!(!ctl.is_dirty());
    assert_eq!(ctl.expert_text(), None);
    Ok(())
}
