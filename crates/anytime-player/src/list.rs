//! The ordered, user-editable list of macro actions

use crate::action::Action;
use anytime_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Ordered actions; insertion order is playback order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionList {
    actions: Vec<Action>,
}

impl ActionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn remove_at(&mut self, index: usize) -> Result<Action> {
        if index >= self.actions.len() {
            return Err(Error::index_out_of_range(index, self.actions.len()));
        }
        Ok(self.actions.remove(index))
    }

    /// Re-sequence to match an externally held order of rendered labels
    ///
    /// Each label takes the first action that renders to it and has not been
    /// taken yet. Actions whose label never appears are dropped, and so are
    /// identical duplicates beyond the number of matching labels.
    pub fn reorder<S: AsRef<str>>(&mut self, external_order: &[S]) {
        let rendered = self.renderings();
        let mut taken = vec![false; self.actions.len()];
        let mut reordered = Vec::with_capacity(external_order.len());

        for label in external_order {
            let label = label.as_ref();
            let hit = rendered
                .iter()
                .enumerate()
                .find(|(i, r)| !taken[*i] && r.as_str() == label)
                .map(|(i, _)| i);
            if let Some(i) = hit {
                taken[i] = true;
                reordered.push(self.actions[i].clone());
            }
        }

        self.actions = reordered;
    }

    /// Move one entry, the way dropping a dragged row in the list view does
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.actions.len();
        if from >= len {
            return Err(Error::index_out_of_range(from, len));
        }
        if to >= len {
            return Err(Error::index_out_of_range(to, len));
        }
        let mut order = self.renderings();
        let label = order.remove(from);
        order.insert(to, label);
        self.reorder(&order);
        Ok(())
    }

    pub fn renderings(&self) -> Vec<String> {
        self.actions.iter().map(Action::render).collect()
    }

    /// Copy handed to playback; later edits never reach an in-flight run
    pub fn snapshot(&self) -> Vec<Action> {
        self.actions.clone()
    }

    pub fn get(&self, index: usize) -> Option<&Action> {
        self.actions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.actions.serialize(&mut ser)?;
        String::from_utf8(buf).map_err(|e| Error::malformed_data(e.to_string()))
    }

    /// Parse a macro file; every action is validated on the way in
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::malformed_data(format!("Invalid macro data: {}", e)))
    }
}

impl From<Vec<Action>> for ActionList {
    fn from(actions: Vec<Action>) -> Self {
        Self { actions }
    }
}

impl<'a> IntoIterator for &'a ActionList {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}
