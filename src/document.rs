use crate::error::{DocumentError, EditorError};
use crate::value::{LbMap, LbValue};
use crate::statics;
use std::fmt;

/// A problem the server would trip over when it resolves the saved document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentIssue {
    UnknownAuth {
        bridge: usize,
        target: Option<usize>,
        account: String,
    },
    DuplicateTarget {
        bridge: usize,
        target: usize,
    },
    /// Same source as an earlier bridge; the server merges their targets into that one.
    DuplicateBridge {
        bridge: usize,
        first: usize,
    },
}

impl fmt::Display for DocumentIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentIssue::UnknownAuth {
                bridge,
                target: None,
                account,
            } => write!(
                f,
                "{} {bridge} {} '{account}'",
                statics::EN_LABEL_BRIDGE,
                statics::EN_WARN_UNKNOWN_AUTH
            ),
            DocumentIssue::UnknownAuth {
                bridge,
                target: Some(target),
                account,
            } => write!(
                f,
                "{} {bridge}/{target} {} '{account}'",
                statics::EN_LABEL_TARGET,
                statics::EN_WARN_UNKNOWN_AUTH
            ),
            DocumentIssue::DuplicateTarget { bridge, target } => write!(
                f,
                "{} {bridge}/{target} {}",
                statics::EN_LABEL_TARGET,
                statics::EN_WARN_DUPLICATE_TARGET
            ),
            DocumentIssue::DuplicateBridge { bridge, first } => write!(
                f,
                "{} {bridge} {} {first}",
                statics::EN_LABEL_BRIDGE,
                statics::EN_WARN_DUPLICATE_BRIDGE
            ),
        }
    }
}

/// The authoritative control data plus the snapshot taken at the last fetch or save.
///
/// Every change to the document goes through the methods here, which also own the dirty flag
/// and the transient edit markers. `revision` increases on every change so views can tell when
/// to redraw.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    current: LbValue,
    pristine: LbValue,
    dirty: bool,
    revision: u64,
    layout: u64,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::empty()
    }
}

impl DocumentStore {
    pub fn empty() -> Self {
        Self {
            current: empty_document(),
            pristine: empty_document(),
            dirty: false,
            revision: 0,
            layout: 0,
        }
    }

    /// Replace document and snapshot with a fresh server copy.
    pub fn load(&mut self, root: LbValue) -> Result<(), EditorError> {
        let root = normalize_document(root)?;
        self.pristine = root.deep_clone();
        self.current = root;
        self.dirty = false;
        self.reshape();
        self.touch();
        Ok(())
    }

    /// Replace the working document wholesale (expert mode). The snapshot is kept.
    pub fn replace_document(&mut self, root: LbValue) -> Result<(), EditorError> {
        self.current = normalize_document(root)?;
        self.reshape();
        self.mark_dirty();
        Ok(())
    }

    /// Forget everything, e.g. after the session expired.
    pub fn clear(&mut self) {
        self.current = empty_document();
        self.pristine = empty_document();
        self.dirty = false;
        self.reshape();
        self.touch();
    }

    pub fn revert(&mut self) {
        self.current = self.pristine.deep_clone();
        self.current.strip_key(statics::LB_EDITED_MARKER);
        self.dirty = false;
        self.reshape();
        self.touch();
    }

    pub fn document(&self) -> &LbValue {
        &self.current
    }

    pub fn pristine(&self) -> &LbValue {
        &self.pristine
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Changes whenever bridges or targets may have moved to other positions. Updates in
    /// place leave it alone.
    pub fn layout(&self) -> u64 {
        self.layout
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.touch();
    }

    /// The server accepted the document: nothing counts as edited any more.
    pub fn mark_saved(&mut self) {
        self.current.strip_key(statics::LB_EDITED_MARKER);
        self.dirty = false;
        self.touch();
    }

    /// Copy of the document as it goes over the wire: no edit markers at any depth.
    pub fn snapshot_for_save(&self) -> LbValue {
        let mut out = self.current.deep_clone();
        out.strip_key(statics::LB_EDITED_MARKER);
        out
    }

    pub fn bridges(&self) -> &[LbValue] {
        self.current
            .get(statics::LB_BRIDGES)
            .and_then(|v| v.as_array())
            .unwrap_or(&[])
    }

    pub fn bridge(&self, index: usize) -> Option<&LbMap> {
        self.bridges().get(index)?.as_object()
    }

    pub fn targets(&self, bridge: usize) -> &[LbValue] {
        self.bridge(bridge)
            .and_then(|b| b.get(statics::LB_TARGETS))
            .and_then(|v| v.as_array())
            .unwrap_or(&[])
    }

    pub fn target(&self, bridge: usize, target: usize) -> Option<&LbMap> {
        self.targets(bridge).get(target)?.as_object()
    }

    pub fn auth_record(&self, name: &str) -> Option<&LbMap> {
        self.auth_map()?.get(name)?.as_object()
    }

    pub fn auth_names(&self) -> Vec<&str> {
        self.auth_map()
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn has_auth(&self, name: &str) -> bool {
        self.auth_map().is_some_and(|m| m.contains_key(name))
    }

    pub fn is_bridge_edited(&self, index: usize) -> bool {
        self.bridge(index).is_some_and(is_marked)
    }

    pub fn is_target_edited(&self, bridge: usize, target: usize) -> bool {
        self.target(bridge, target).is_some_and(is_marked)
    }

    pub fn is_auth_edited(&self, name: &str) -> bool {
        self.auth_record(name).is_some_and(is_marked)
    }

    /// New bridges go to the front of the list.
    pub fn add_bridge(&mut self, mut bridge: LbMap) {
        bridge
            .entry(statics::LB_TARGETS.to_string())
            .or_insert_with(|| LbValue::Array(Vec::new()));
        mark(&mut bridge);
        self.bridges_mut().insert(0, LbValue::Object(bridge));
        self.reshape();
        self.mark_dirty();
    }

    /// Replace the bridge's own properties. Its targets are only changed through the
    /// target operations, so the committed list is carried over.
    pub fn update_bridge(&mut self, index: usize, mut bridge: LbMap) -> Result<(), DocumentError> {
        let slot = self
            .bridges_mut()
            .get_mut(index)
            .ok_or(DocumentError::BridgeIndex(index))?;
        let targets = slot
            .get(statics::LB_TARGETS)
            .cloned()
            .unwrap_or_else(|| LbValue::Array(Vec::new()));
        bridge.insert(statics::LB_TARGETS.to_string(), targets);
        mark(&mut bridge);
        *slot = LbValue::Object(bridge);
        self.mark_dirty();
        Ok(())
    }

    pub fn remove_bridge(&mut self, index: usize) -> Result<LbValue, DocumentError> {
        let bridges = self.bridges_mut();
        if index >= bridges.len() {
            return Err(DocumentError::BridgeIndex(index));
        }
        let removed = bridges.remove(index);
        self.reshape();
        self.mark_dirty();
        Ok(removed)
    }

    /// New targets are appended to the owning bridge.
    pub fn add_target(&mut self, bridge: usize, mut target: LbMap) -> Result<(), DocumentError> {
        mark(&mut target);
        let owner = self.bridge_mut(bridge)?;
        targets_of(owner).push(LbValue::Object(target));
        mark(owner);
        self.reshape();
        self.mark_dirty();
        Ok(())
    }

    pub fn update_target(
        &mut self,
        bridge: usize,
        target: usize,
        mut value: LbMap,
    ) -> Result<(), DocumentError> {
        mark(&mut value);
        let owner = self.bridge_mut(bridge)?;
        let slot = targets_of(owner)
            .get_mut(target)
            .ok_or(DocumentError::TargetIndex { bridge, target })?;
        *slot = LbValue::Object(value);
        mark(owner);
        self.mark_dirty();
        Ok(())
    }

    /// Removing a target changes what the bridge shows, so the bridge gets marked.
    pub fn remove_target(&mut self, bridge: usize, target: usize) -> Result<LbValue, DocumentError> {
        let owner = self.bridge_mut(bridge)?;
        let targets = targets_of(owner);
        if target >= targets.len() {
            return Err(DocumentError::TargetIndex { bridge, target });
        }
        let removed = targets.remove(target);
        mark(owner);
        self.reshape();
        self.mark_dirty();
        Ok(removed)
    }

    pub fn add_auth(&mut self, name: &str, mut record: LbMap) -> Result<(), DocumentError> {
        let auth = self.auth_map_mut();
        if auth.contains_key(name) {
            return Err(DocumentError::AuthExists(name.to_string()));
        }
        mark(&mut record);
        auth.insert(name.to_string(), LbValue::Object(record));
        self.mark_dirty();
        Ok(())
    }

    pub fn update_auth(&mut self, name: &str, mut record: LbMap) -> Result<(), DocumentError> {
        let slot = self
            .auth_map_mut()
            .get_mut(name)
            .ok_or_else(|| DocumentError::AuthMissing(name.to_string()))?;
        mark(&mut record);
        *slot = LbValue::Object(record);
        self.mark_dirty();
        Ok(())
    }

    pub fn remove_auth(&mut self, name: &str) -> Result<LbValue, DocumentError> {
        let removed = self
            .auth_map_mut()
            .shift_remove(name)
            .ok_or_else(|| DocumentError::AuthMissing(name.to_string()))?;
        self.mark_dirty();
        Ok(removed)
    }

    /// Auth references the server cannot resolve, and bridges or targets it would fold
    /// together as duplicates.
    pub fn check_references(&self) -> Vec<DocumentIssue> {
        let mut issues = Vec::new();
        let known = |name: &str| self.has_auth(name);
        let mut sources: Vec<LbValue> = Vec::new();

        for (b, bridge) in self.bridges().iter().enumerate() {
            let mut source = bridge.deep_clone();
            source.strip_key(statics::LB_EDITED_MARKER);
            if let Some(map) = source.as_object_mut() {
                map.insert(statics::LB_TARGETS.to_string(), LbValue::Array(Vec::new()));
            }
            match sources.iter().position(|s| *s == source) {
                Some(first) => issues.push(DocumentIssue::DuplicateBridge { bridge: b, first }),
                None => sources.push(source),
            }

            if let Some(account) = auth_ref(bridge)
                && !known(account)
            {
                issues.push(DocumentIssue::UnknownAuth {
                    bridge: b,
                    target: None,
                    account: account.to_string(),
                });
            }

            let mut seen: Vec<LbValue> = Vec::new();
            for (t, target) in self.targets(b).iter().enumerate() {
                if let Some(account) = auth_ref(target)
                    && !known(account)
                {
                    issues.push(DocumentIssue::UnknownAuth {
                        bridge: b,
                        target: Some(t),
                        account: account.to_string(),
                    });
                }

                let mut plain = target.deep_clone();
                plain.strip_key(statics::LB_EDITED_MARKER);
                if seen.contains(&plain) {
                    issues.push(DocumentIssue::DuplicateTarget {
                        bridge: b,
                        target: t,
                    });
                } else {
                    seen.push(plain);
                }
            }
        }

        issues
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn reshape(&mut self) {
        self.layout += 1;
    }

    fn auth_map(&self) -> Option<&LbMap> {
        self.current.get(statics::LB_AUTH)?.as_object()
    }

    fn root_mut(&mut self) -> &mut LbMap {
        ensure_object(&mut self.current)
    }

    fn bridges_mut(&mut self) -> &mut Vec<LbValue> {
        let slot = self
            .root_mut()
            .entry(statics::LB_BRIDGES.to_string())
            .or_insert_with(|| LbValue::Array(Vec::new()));
        ensure_array(slot)
    }

    fn bridge_mut(&mut self, index: usize) -> Result<&mut LbMap, DocumentError> {
        self.bridges_mut()
            .get_mut(index)
            .map(ensure_object)
            .ok_or(DocumentError::BridgeIndex(index))
    }

    fn auth_map_mut(&mut self) -> &mut LbMap {
        let slot = self
            .root_mut()
            .entry(statics::LB_AUTH.to_string())
            .or_insert_with(LbValue::empty_object);
        ensure_object(slot)
    }
}

fn empty_document() -> LbValue {
    let mut root = LbMap::new();
    root.insert(statics::LB_BRIDGES.to_string(), LbValue::Array(Vec::new()));
    root.insert(statics::LB_AUTH.to_string(), LbValue::empty_object());
    LbValue::Object(root)
}

/// Bring a document from the server (or from expert mode) into the shape the editor relies on:
/// a `bridges` list of objects that each carry a `targets` list, and an `auth` object.
pub fn normalize_document(mut root: LbValue) -> Result<LbValue, EditorError> {
    let invalid = |what: String| EditorError::Parse(what);

    if !root.is_json_safe() {
        return Err(invalid(statics::EN_ERR_NON_FINITE.to_string()));
    }
    root.strip_key(statics::LB_EDITED_MARKER);

    let Some(map) = root.as_object_mut() else {
        return Err(invalid(statics::EN_ERR_INVALID_DOCUMENT.to_string()));
    };

    let bridges = map
        .entry(statics::LB_BRIDGES.to_string())
        .or_insert_with(|| LbValue::Array(Vec::new()));
    let Some(bridges) = bridges.as_array_mut() else {
        return Err(invalid(format!("'{}' must be a list", statics::LB_BRIDGES)));
    };
    for (i, bridge) in bridges.iter_mut().enumerate() {
        let Some(bridge) = bridge.as_object_mut() else {
            return Err(invalid(format!("bridge {i} must be an object")));
        };
        let targets = bridge
            .entry(statics::LB_TARGETS.to_string())
            .or_insert_with(|| LbValue::Array(Vec::new()));
        let Some(targets) = targets.as_array() else {
            return Err(invalid(format!("targets of bridge {i} must be a list")));
        };
        if let Some(t) = targets.iter().position(|t| t.as_object().is_none()) {
            return Err(invalid(format!("target {t} of bridge {i} must be an object")));
        }
    }

    let auth = map
        .entry(statics::LB_AUTH.to_string())
        .or_insert_with(LbValue::empty_object);
    if auth.as_object().is_none() {
        return Err(invalid(format!("'{}' must be an object", statics::LB_AUTH)));
    }

    Ok(root)
}

fn auth_ref(entity: &LbValue) -> Option<&str> {
    entity
        .get(statics::LB_FIELD_AUTH_REF)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

fn is_marked(entity: &LbMap) -> bool {
    entity
        .get(statics::LB_EDITED_MARKER)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

fn mark(entity: &mut LbMap) {
    entity.insert(statics::LB_EDITED_MARKER.to_string(), LbValue::Bool(true));
}

fn targets_of(bridge: &mut LbMap) -> &mut Vec<LbValue> {
    let slot = bridge
        .entry(statics::LB_TARGETS.to_string())
        .or_insert_with(|| LbValue::Array(Vec::new()));
    ensure_array(slot)
}

fn ensure_object(value: &mut LbValue) -> &mut LbMap {
    if value.as_object().is_none() {
        *value = LbValue::empty_object();
    }
    match value {
        LbValue::Object(map) => map,
        _ => unreachable!("replaced with an object above"),
    }
}

fn ensure_array(value: &mut LbValue) -> &mut Vec<LbValue> {
    if value.as_array().is_none() {
        *value = LbValue::Array(Vec::new());
    }
    match value {
        LbValue::Array(values) => values,
        _ => unreachable!("replaced with an array above"),
    }
}
