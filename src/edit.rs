use crate::error::{DocumentError, EditorError, ValidationError};
use crate::statics;
use crate::value::{LbMap, LbValue};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Bridge,
    Target,
    Auth,
}

/// Which entity an edit form works on. The `New*` variants open the form in add mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    NewBridge,
    Bridge(usize),
    NewTarget { bridge: usize },
    Target { bridge: usize, target: usize },
    NewAuth,
    Auth(String),
}

impl EditTarget {
    pub fn kind(&self) -> EntityKind {
        match self {
            EditTarget::NewBridge | EditTarget::Bridge(_) => EntityKind::Bridge,
            EditTarget::NewTarget { .. } | EditTarget::Target { .. } => EntityKind::Target,
            EditTarget::NewAuth | EditTarget::Auth(_) => EntityKind::Auth,
        }
    }

    pub fn is_add(&self) -> bool {
        matches!(
            self,
            EditTarget::NewBridge | EditTarget::NewTarget { .. } | EditTarget::NewAuth
        )
    }

    /// Whether the target names its entity by list position rather than by name.
    pub fn is_positional(&self) -> bool {
        matches!(
            self,
            EditTarget::Bridge(_) | EditTarget::NewTarget { .. } | EditTarget::Target { .. }
        )
    }
}

/// A committed edit, as handed to the document owner.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    AddBridge(LbMap),
    UpdateBridge(usize, LbMap),
    AddTarget { bridge: usize, entity: LbMap },
    UpdateTarget { bridge: usize, target: usize, entity: LbMap },
    AddAuth { name: String, entity: LbMap },
    UpdateAuth { name: String, entity: LbMap },
}

impl fmt::Display for Mutation {
    // Entities stay out of this: auth records carry credentials.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::AddBridge(_) => write!(f, "add bridge"),
            Mutation::UpdateBridge(index, _) => write!(f, "update bridge {index}"),
            Mutation::AddTarget { bridge, .. } => write!(f, "add target to bridge {bridge}"),
            Mutation::UpdateTarget { bridge, target, .. } => {
                write!(f, "update target {bridge}/{target}")
            }
            Mutation::AddAuth { name, .. } => write!(f, "add auth account '{name}'"),
            Mutation::UpdateAuth { name, .. } => write!(f, "update auth account '{name}'"),
        }
    }
}

impl Mutation {
    pub fn entity(&self) -> &LbMap {
        match self {
            Mutation::AddBridge(entity)
            | Mutation::UpdateBridge(_, entity)
            | Mutation::AddTarget { entity, .. }
            | Mutation::UpdateTarget { entity, .. }
            | Mutation::AddAuth { entity, .. }
            | Mutation::UpdateAuth { entity, .. } => entity,
        }
    }
}

/// The side of the editor that owns the document. Edit sessions read the committed entity
/// from it when they open and hand their result back through `apply`.
pub trait EntitySink {
    fn lookup(&self, target: &EditTarget) -> Option<&LbMap>;
    /// Counter that moves whenever entities may have changed position.
    fn layout(&self) -> u64;
    fn apply(&mut self, mutation: Mutation) -> Result<(), EditorError>;
}

/// One open edit form.
///
/// Works on a private copy of the entity. Nothing reaches the document before `commit`, and
/// after a commit the session is spent.
#[derive(Debug, Clone)]
pub struct EditSession {
    target: EditTarget,
    staged: Option<LbMap>,
    account: String,
    hints: ValidationError,
    advisory: Option<&'static str>,
    layout: u64,
}

impl EditSession {
    pub fn open<S: EntitySink + ?Sized>(target: EditTarget, sink: &S) -> Result<Self, EditorError> {
        let staged = match &target {
            EditTarget::NewBridge => skeleton(EntityKind::Bridge),
            EditTarget::NewAuth => skeleton(EntityKind::Auth),
            EditTarget::NewTarget { bridge } => {
                sink.lookup(&EditTarget::Bridge(*bridge))
                    .ok_or(DocumentError::BridgeIndex(*bridge))?;
                skeleton(EntityKind::Target)
            }
            EditTarget::Bridge(index) => {
                copy_of(sink, &target).ok_or(DocumentError::BridgeIndex(*index))?
            }
            EditTarget::Target { bridge, target: t } => copy_of(sink, &target).ok_or(
                DocumentError::TargetIndex {
                    bridge: *bridge,
                    target: *t,
                },
            )?,
            EditTarget::Auth(name) => {
                copy_of(sink, &target).ok_or_else(|| DocumentError::AuthMissing(name.clone()))?
            }
        };

        Ok(Self {
            target,
            staged: Some(staged),
            account: String::new(),
            hints: ValidationError::default(),
            advisory: None,
            layout: sink.layout(),
        })
    }

    pub fn target(&self) -> &EditTarget {
        &self.target
    }

    pub fn is_open(&self) -> bool {
        self.staged.is_some()
    }

    pub fn staged(&self) -> Option<&LbMap> {
        self.staged.as_ref()
    }

    pub fn field(&self, key: &str) -> Option<&LbValue> {
        self.staged.as_ref()?.get(key)
    }

    /// Free-form properties, i.e. everything except the required fields and the target list.
    pub fn extra_fields(&self) -> Vec<(&str, &LbValue)> {
        let Some(staged) = self.staged.as_ref() else {
            return Vec::new();
        };
        staged
            .iter()
            .filter(|(k, _)| {
                ![
                    statics::LB_FIELD_TYPE,
                    statics::LB_FIELD_LABEL,
                    statics::LB_TARGETS,
                    statics::LB_EDITED_MARKER,
                ]
                .contains(&k.as_str())
            })
            .map(|(k, v)| (k.as_str(), v))
            .collect()
    }

    pub fn hints(&self) -> &ValidationError {
        &self.hints
    }

    pub fn advisory(&self) -> Option<&'static str> {
        self.advisory
    }

    pub fn account_name(&self) -> &str {
        &self.account
    }

    /// Name of the account an add-auth form creates. Existing accounts keep their name.
    pub fn set_account_name(&mut self, name: &str) -> Result<(), EditorError> {
        if self.staged.is_none() {
            return Err(EditorError::SessionClosed);
        }
        if self.target != EditTarget::NewAuth {
            return Err(EditorError::ReservedField(
                statics::EN_HINT_ACCOUNT_REQUIRED.to_string(),
            ));
        }
        self.account = name.trim().to_string();
        Ok(())
    }

    pub fn set_field(&mut self, key: &str, value: impl Into<LbValue>) -> Result<(), EditorError> {
        let value = value.into();
        self.check_key(key)?;
        if !value.is_scalar() {
            return Err(EditorError::NotScalar(key.to_string()));
        }
        let staged = self.staged.as_mut().ok_or(EditorError::SessionClosed)?;
        staged.insert(key.to_string(), value);
        Ok(())
    }

    pub fn remove_field(&mut self, key: &str) -> Result<Option<LbValue>, EditorError> {
        self.check_key(key)?;
        let staged = self.staged.as_mut().ok_or(EditorError::SessionClosed)?;
        Ok(staged.shift_remove(key))
    }

    /// Check required fields and refresh the form hints. The staged entity is left as is.
    pub fn validate(&mut self) -> Result<(), EditorError> {
        let staged = self.staged.as_ref().ok_or(EditorError::SessionClosed)?;

        let mut hints = ValidationError::default();
        match self.target.kind() {
            EntityKind::Bridge | EntityKind::Target => {
                hints.label_missing = !has_text(staged, statics::LB_FIELD_LABEL);
                hints.type_undefined = !staged.contains_key(statics::LB_FIELD_TYPE);
                hints.type_missing = !has_text(staged, statics::LB_FIELD_TYPE);
            }
            EntityKind::Auth => {
                hints.account_missing =
                    self.target == EditTarget::NewAuth && self.account.is_empty();
            }
        }

        self.advisory = hints
            .type_undefined
            .then_some(statics::EN_ADVISORY_TYPE_UNDEFINED);
        self.hints = hints.clone();

        if hints.is_empty() {
            Ok(())
        } else {
            Err(hints.into())
        }
    }

    /// Validate, then hand the staged entity to `sink`. On failure the session stays open
    /// with its input intact.
    ///
    /// Forms that address their entity by position refuse to commit once entities have moved,
    /// since the position may now name a different one.
    pub fn commit<S: EntitySink + ?Sized>(&mut self, sink: &mut S) -> Result<(), EditorError> {
        self.validate()?;
        if self.target.is_positional() && sink.layout() != self.layout {
            return Err(DocumentError::Moved.into());
        }
        let entity = self.staged.clone().ok_or(EditorError::SessionClosed)?;

        let mutation = match &self.target {
            EditTarget::NewBridge => Mutation::AddBridge(entity),
            EditTarget::Bridge(index) => Mutation::UpdateBridge(*index, entity),
            EditTarget::NewTarget { bridge } => Mutation::AddTarget {
                bridge: *bridge,
                entity,
            },
            EditTarget::Target { bridge, target } => Mutation::UpdateTarget {
                bridge: *bridge,
                target: *target,
                entity,
            },
            EditTarget::NewAuth => {
                let existing = EditTarget::Auth(self.account.clone());
                if sink.lookup(&existing).is_some() {
                    return Err(DocumentError::AuthExists(self.account.clone()).into());
                }
                Mutation::AddAuth {
                    name: self.account.clone(),
                    entity,
                }
            }
            EditTarget::Auth(name) => Mutation::UpdateAuth {
                name: name.clone(),
                entity,
            },
        };

        sink.apply(mutation)?;
        self.staged = None;
        Ok(())
    }

    /// Add forms start over from the empty skeleton; edit forms close.
    pub fn cancel(&mut self) {
        self.hints = ValidationError::default();
        self.advisory = None;
        self.account.clear();
        self.staged = self
            .target
            .is_add()
            .then(|| skeleton(self.target.kind()));
    }

    fn check_key(&self, key: &str) -> Result<(), EditorError> {
        if key.is_empty() {
            return Err(EditorError::EmptyFieldName);
        }
        let reserved = key == statics::LB_EDITED_MARKER
            || (self.target.kind() == EntityKind::Bridge && key == statics::LB_TARGETS);
        if reserved {
            return Err(EditorError::ReservedField(key.to_string()));
        }
        Ok(())
    }
}

/// Committed entity without edit markers.
fn copy_of<S: EntitySink + ?Sized>(sink: &S, target: &EditTarget) -> Option<LbMap> {
    let mut copy = LbValue::Object(sink.lookup(target)?.clone());
    copy.strip_key(statics::LB_EDITED_MARKER);
    match copy {
        LbValue::Object(map) => Some(map),
        _ => None,
    }
}

fn skeleton(kind: EntityKind) -> LbMap {
    let mut map = LbMap::new();
    if kind != EntityKind::Auth {
        map.insert(statics::LB_FIELD_TYPE.to_string(), LbValue::from(""));
        map.insert(statics::LB_FIELD_LABEL.to_string(), LbValue::from(""));
    }
    map
}

fn has_text(entity: &LbMap, key: &str) -> bool {
    entity
        .get(key)
        .and_then(|v| v.as_str())
        .is_some_and(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{EditSession, EditTarget, EntitySink, Mutation};
    use crate::error::{DocumentError, EditorError};
    use crate::statics;
    use crate::value::{LbMap, LbValue};

    /// Records mutations instead of applying them.
    #[derive(Default)]
    struct Recorder {
        bridge: LbMap,
        applied: Vec<Mutation>,
        layout: u64,
    }

    impl EntitySink for Recorder {
        fn lookup(&self, target: &EditTarget) -> Option<&LbMap> {
            match target {
                EditTarget::Bridge(0) => Some(&self.bridge),
                _ => None,
            }
        }

        fn layout(&self) -> u64 {
            self.layout
        }

        fn apply(&mut self, mutation: Mutation) -> Result<(), EditorError> {
            self.applied.push(mutation);
            Ok(())
        }
    }

    fn recorder() -> Recorder {
        let bridge = LbValue::parse_json(
            r#"{"type": "liveblog", "label": "Blog", "__edited": true, "targets": []}"#,
        )
        .unwrap();
        Recorder {
            bridge: bridge.as_object().unwrap().clone(),
            applied: Vec::new(),
            layout: 0,
        }
    }

    #[test]
    fn add_mode_starts_from_skeleton() {
        let sink = recorder();
        let session = EditSession::open(EditTarget::NewBridge, &sink).unwrap();
        let keys: Vec<_> = session.staged().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["type", "label"]);

        let auth = EditSession::open(EditTarget::NewAuth, &sink).unwrap();
        assert!(auth.staged().unwrap().is_empty());
    }

    #[test]
    fn edit_mode_copies_entity_without_marker() {
        let sink = recorder();
        let mut session = EditSession::open(EditTarget::Bridge(0), &sink).unwrap();
        assert!(session.field(statics::LB_EDITED_MARKER).is_none());
        session.set_field("label", "Other").unwrap();
        assert_eq!(sink.bridge.get("label").unwrap().as_str(), Some("Blog"));
    }

    #[test]
    fn open_missing_entity_fails() {
        let sink = recorder();
        let err = EditSession::open(EditTarget::Bridge(5), &sink).unwrap_err();
        assert_eq!(err, EditorError::Document(DocumentError::BridgeIndex(5)));
        let err = EditSession::open(EditTarget::NewTarget { bridge: 2 }, &sink).unwrap_err();
        assert_eq!(err, EditorError::Document(DocumentError::BridgeIndex(2)));
        let err = EditSession::open(EditTarget::Target { bridge: 0, target: 3 }, &sink).unwrap_err();
        assert_eq!(
            err,
            EditorError::Document(DocumentError::TargetIndex { bridge: 0, target: 3 })
        );
        let err = EditSession::open(EditTarget::Auth("svc".to_string()), &sink).unwrap_err();
        assert_eq!(err, EditorError::Document(DocumentError::AuthMissing("svc".to_string())));
    }

    #[test]
    fn validate_flags_empty_and_undefined_fields_without_touching_staged() {
        let sink = recorder();
        let mut session = EditSession::open(EditTarget::NewTarget { bridge: 0 }, &sink).unwrap();
        let before = session.staged().cloned();

        assert!(matches!(session.validate(), Err(EditorError::Validation(_))));
        assert!(session.hints().label_missing);
        assert!(session.hints().type_missing);
        assert!(session.advisory().is_none());
        assert_eq!(session.staged().cloned(), before);

        session.remove_field("type").unwrap();
        session.set_field("label", "T1").unwrap();
        assert!(session.validate().is_err());
        assert!(!session.hints().label_missing);
        assert!(session.hints().type_undefined);
        assert_eq!(session.advisory(), Some(statics::EN_ADVISORY_TYPE_UNDEFINED));

        session.set_field("type", "slack").unwrap();
        session.validate().unwrap();
        assert!(session.hints().is_empty());
        assert!(session.advisory().is_none());
    }

    #[test]
    fn commit_hands_mutation_to_sink_and_closes() {
        let mut sink = recorder();
        let mut session = EditSession::open(EditTarget::Bridge(0), &sink).unwrap();
        session.set_field("endpoint", "https://example.org").unwrap();
        session.commit(&mut sink).unwrap();

        assert!(!session.is_open());
        assert!(matches!(&sink.applied[0], Mutation::UpdateBridge(0, e) if e.contains_key("endpoint")));
        assert_eq!(session.set_field("x", "y"), Err(EditorError::SessionClosed));
        assert_eq!(session.commit(&mut sink), Err(EditorError::SessionClosed));
    }

    #[test]
    fn positional_commit_refuses_after_entities_moved() {
        let mut sink = recorder();
        let mut edit = EditSession::open(EditTarget::Bridge(0), &sink).unwrap();
        let mut add = EditSession::open(EditTarget::NewTarget { bridge: 0 }, &sink).unwrap();
        let mut auth = EditSession::open(EditTarget::NewAuth, &sink).unwrap();
        edit.set_field("label", "Renamed").unwrap();
        add.set_field("type", "slack").unwrap();
        add.set_field("label", "T").unwrap();
        auth.set_account_name("svc").unwrap();

        sink.layout += 1;
        assert_eq!(
            edit.commit(&mut sink),
            Err(EditorError::Document(DocumentError::Moved))
        );
        assert_eq!(
            add.commit(&mut sink),
            Err(EditorError::Document(DocumentError::Moved))
        );
        assert!(edit.is_open() && add.is_open());
        assert!(sink.applied.is_empty());

        auth.commit(&mut sink).unwrap();
        assert_eq!(sink.applied.len(), 1);
    }

    #[test]
    fn mutation_display_leaves_out_entity() {
        let mut entity = LbMap::new();
        entity.insert("password".to_string(), LbValue::from("hunter2"));
        let shown = Mutation::UpdateAuth {
            name: "svc1".to_string(),
            entity,
        }
        .to_string();
        assert_eq!(shown, "update auth account 'svc1'");
    }

    #[test]
    fn failed_validation_blocks_commit() {
        let mut sink = recorder();
        let mut session = EditSession::open(EditTarget::NewBridge, &sink).unwrap();
        assert!(session.commit(&mut sink).is_err());
        assert!(sink.applied.is_empty());
        assert!(session.is_open());
    }

    #[test]
    fn cancel_in_add_mode_resets_skeleton() {
        let sink = recorder();
        let mut session = EditSession::open(EditTarget::NewBridge, &sink).unwrap();
        let fresh = session.staged().cloned();
        session.set_field("type", "liveblog").unwrap();
        session.set_field("extra", "typed").unwrap();
        let _ = session.validate();
        session.cancel();

        assert_eq!(session.staged().cloned(), fresh);
        assert!(session.hints().is_empty());

        let mut edit = EditSession::open(EditTarget::Bridge(0), &sink).unwrap();
        edit.cancel();
        assert!(!edit.is_open());
    }

    #[test]
    fn reserved_and_structured_fields_are_rejected() {
        let sink = recorder();
        let mut session = EditSession::open(EditTarget::Bridge(0), &sink).unwrap();
        assert_eq!(
            session.set_field(statics::LB_TARGETS, "x"),
            Err(EditorError::ReservedField("targets".to_string()))
        );
        assert_eq!(
            session.set_field(statics::LB_EDITED_MARKER, true),
            Err(EditorError::ReservedField("__edited".to_string()))
        );
        assert_eq!(session.set_field("", "x"), Err(EditorError::EmptyFieldName));
        assert_eq!(
            session.set_field("nested", LbValue::empty_object()),
            Err(EditorError::NotScalar("nested".to_string()))
        );
    }

    #[test]
    fn add_auth_requires_a_name() {
        let mut sink = recorder();
        let mut session = EditSession::open(EditTarget::NewAuth, &sink).unwrap();
        session.set_field("user", "admin").unwrap();
        let err = session.commit(&mut sink).unwrap_err();
        assert!(matches!(err, EditorError::Validation(v) if v.account_missing));

        session.set_account_name(" svc1 ").unwrap();
        session.commit(&mut sink).unwrap();
        assert!(matches!(&sink.applied[0], Mutation::AddAuth { name, .. } if name == "svc1"));
    }

    #[test]
    fn extra_fields_skip_required_ones() {
        let sink = recorder();
        let mut session = EditSession::open(EditTarget::Bridge(0), &sink).unwrap();
        session.set_field("endpoint", "https://a").unwrap();
        let extra: Vec<_> = session.extra_fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(extra, vec!["endpoint"]);
    }
}
