use crate::choices::ChoiceIndex;
use crate::document::DocumentStore;
use crate::edit::{EditSession, EditTarget, EntitySink, Mutation};
use crate::error::{DocumentError, EditorError};
use crate::value::{LbMap, LbValue};

/// Everything one editor instance knows about the control data: the document with its
/// snapshot, and the suggestion tables derived from it.
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    store: DocumentStore,
    choices: ChoiceIndex,
}

impl EditorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut DocumentStore {
        &mut self.store
    }

    pub fn choices(&self) -> &ChoiceIndex {
        &self.choices
    }

    /// Take a fresh server copy and rebuild the suggestions from it.
    pub fn load(&mut self, root: LbValue) -> Result<(), EditorError> {
        self.store.load(root)?;
        self.choices.rebuild(self.store.document());
        Ok(())
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.choices = ChoiceIndex::new();
    }

    pub fn open(&self, target: EditTarget) -> Result<EditSession, EditorError> {
        EditSession::open(target, self)
    }

    pub fn commit(&mut self, session: &mut EditSession) -> Result<(), EditorError> {
        session.commit(self)
    }

    pub fn remove_bridge(&mut self, index: usize) -> Result<LbValue, DocumentError> {
        self.store.remove_bridge(index)
    }

    pub fn remove_target(&mut self, bridge: usize, target: usize) -> Result<LbValue, DocumentError> {
        self.store.remove_target(bridge, target)
    }

    pub fn remove_auth(&mut self, name: &str) -> Result<LbValue, DocumentError> {
        self.store.remove_auth(name)
    }

    pub fn revert(&mut self) {
        self.store.revert();
    }
}

impl EntitySink for EditorState {
    fn lookup(&self, target: &EditTarget) -> Option<&LbMap> {
        match target {
            EditTarget::Bridge(index) => self.store.bridge(*index),
            EditTarget::Target { bridge, target } => self.store.target(*bridge, *target),
            EditTarget::Auth(name) => self.store.auth_record(name),
            EditTarget::NewBridge | EditTarget::NewTarget { .. } | EditTarget::NewAuth => None,
        }
    }

    fn layout(&self) -> u64 {
        self.store.layout()
    }

    fn apply(&mut self, mutation: Mutation) -> Result<(), EditorError> {
        let committed = LbValue::Object(mutation.entity().clone());
        let account = match &mutation {
            Mutation::AddAuth { name, .. } => Some(name.clone()),
            _ => None,
        };
        log::debug!("Applying {mutation}");

        match mutation {
            Mutation::AddBridge(entity) => self.store.add_bridge(entity),
            Mutation::UpdateBridge(index, entity) => self.store.update_bridge(index, entity)?,
            Mutation::AddTarget { bridge, entity } => self.store.add_target(bridge, entity)?,
            Mutation::UpdateTarget {
                bridge,
                target,
                entity,
            } => self.store.update_target(bridge, target, entity)?,
            Mutation::AddAuth { name, entity } => self.store.add_auth(&name, entity)?,
            Mutation::UpdateAuth { name, entity } => self.store.update_auth(&name, entity)?,
        }

        self.choices.extend(&committed);
        if let Some(name) = account {
            self.choices.add_account(&name);
        }
        Ok(())
    }
}
