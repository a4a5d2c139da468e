//! Slot storage for document nodes.
//!
//! Released slots are reused by later insertions. Every slot carries a
//! generation that is bumped on release, so an [`ElementId`] kept past the
//! release of its element stops resolving instead of aliasing whatever
//! element takes the slot next.

use super::{ElementId, Node};

struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Default)]
pub(super) struct NodeArena {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl NodeArena {
    pub(super) fn insert(&mut self, node: Node) -> ElementId {
        if let Some(index) = self.free.pop() {
            if let Some(slot) = self.slots.get_mut(index) {
                slot.node = Some(node);
                return ElementId {
                    index,
                    generation: slot.generation,
                };
            }
        }
        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        ElementId {
            index,
            generation: 0,
        }
    }

    pub(super) fn get(&self, id: ElementId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub(super) fn get_mut(&mut self, id: ElementId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Free `id` and all of its descendants.
    pub(super) fn release(&mut self, id: ElementId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Some(slot) = self
                .slots
                .get_mut(id.index)
                .filter(|slot| slot.generation == id.generation)
            else {
                continue;
            };
            let Some(node) = slot.node.take() else {
                continue;
            };
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id.index);
            pending.extend(node.children);
        }
    }

    /// Elements currently allocated, attached or not.
    pub(super) fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Slots ever allocated.
    #[cfg(test)]
    pub(super) fn capacity(&self) -> usize {
        self.slots.len()
    }
}
