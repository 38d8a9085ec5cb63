use crate::api::types::EntityId;

/// Ordered set of owned children, stored by id.
/// The entities themselves live in the simulation arena; a container only
/// decides who owns whom and in which order hooks visit them.
#[derive(Debug, Clone, Default)]
pub struct Container {
    children: Vec<EntityId>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a child. Adding the same id twice is a no-op.
    pub fn add_child(&mut self, id: EntityId) {
        if !self.children.contains(&id) {
            self.children.push(id);
        }
    }

    /// Remove a child, keeping the order of the rest. Returns whether it was present.
    pub fn remove_child(&mut self, id: EntityId) -> bool {
        match self.children.iter().position(|c| *c == id) {
            Some(idx) => {
                self.children.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Drop every child and hand back their ids in order.
    pub fn clear(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.children)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.children.contains(&id)
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
