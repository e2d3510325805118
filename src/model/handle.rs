use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::RegistrationError;

/// A unique identifier for one simulated entity.
///
/// Combines a slot index with a generation count. When an entity terminates its
/// index can be recycled, but the generation is bumped, so messages still in
/// flight for the old entity can never touch the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle {
    pub index: u32,
    pub generation: u32,
}

impl EntityHandle {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

#[derive(Debug, Default)]
struct AllocatorState {
    generations: Vec<u32>,
    free: Vec<u32>,
}

/// Hands out entity handles to whichever component creates an entity.
///
/// Clones share the same pool.
#[derive(Debug, Clone, Default)]
pub struct HandleAllocator {
    state: Arc<Mutex<AllocatorState>>,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new or recycled handle. Recycled slots come back with a bumped generation.
    pub fn allocate(&self) -> EntityHandle {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(index) = state.free.pop() {
            let generation = &mut state.generations[index as usize];
            *generation = generation.wrapping_add(1);
            EntityHandle::new(index, *generation)
        } else {
            let index = state.generations.len() as u32;
            state.generations.push(0);
            EntityHandle::new(index, 0)
        }
    }

    /// Returns the handle's slot to the pool. Releasing a stale or already released handle is ignored.
    pub fn release(&self, handle: EntityHandle) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let current = state.generations.get(handle.index as usize).copied();
        if current == Some(handle.generation) && !state.free.contains(&handle.index) {
            state.free.push(handle.index);
        }
    }

    /// Number of handles currently handed out.
    pub fn live(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.generations.len() - state.free.len()
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slots an insert may add past the current end. Allocated indices stay dense,
/// so anything further out was not handed out by a [`HandleAllocator`].
const MAX_GROWTH: usize = 4096;

/// Dense, generation-checked storage keyed by [`EntityHandle`].
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new(), len: 0 }
    }

    /// Stores `value` under `handle`.
    ///
    /// Fails if the handle is already occupied, if the slot has since been
    /// claimed by a newer generation, or if the index lies far past the end.
    pub fn insert(&mut self, handle: EntityHandle, value: T) -> Result<(), RegistrationError> {
        let index = handle.index as usize;
        if index >= self.slots.len() + MAX_GROWTH {
            return Err(RegistrationError::IndexOutOfRange(handle));
        }
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || Slot { generation: 0, value: None });
        }
        let slot = &mut self.slots[index];
        match &slot.value {
            Some(_) if slot.generation == handle.generation => {
                return Err(RegistrationError::DuplicateHandle(handle));
            }
            _ if slot.generation > handle.generation => {
                return Err(RegistrationError::StaleHandle(handle));
            }
            Some(_) => {}
            None => self.len += 1,
        }
        slot.generation = handle.generation;
        slot.value = Some(value);
        Ok(())
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: EntityHandle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn remove(&mut self, handle: EntityHandle) -> Option<T> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)?;
        let value = slot.value.take();
        if value.is_some() {
            self.len -= 1;
        }
        value
    }

    pub fn contains(&self, handle: EntityHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (EntityHandle::new(index as u32, slot.generation), value))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityHandle, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value
                .as_mut()
                .map(|value| (EntityHandle::new(index as u32, generation), value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_refuses_runaway_indices() {
        let mut arena = Arena::new();
        let far = EntityHandle::new(u32::MAX, 0);
        assert_eq!(arena.insert(far, ()), Err(RegistrationError::IndexOutOfRange(far)));
        assert!(arena.is_empty());

        // sparse but reachable indices are fine
        let near = EntityHandle::new(100, 0);
        arena.insert(near, ()).unwrap();
        assert!(arena.contains(near));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn allocator_recycles_with_new_generation() {
        let alloc = HandleAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_ne!(a, b);
        assert_eq!(alloc.live(), 2);

        alloc.release(a);
        alloc.release(a); // double release is ignored
        assert_eq!(alloc.live(), 1);

        let c = alloc.allocate();
        assert_eq!(c.index, a.index);
        assert_eq!(c.generation, a.generation + 1);

        // a is stale now, releasing it must not free c's slot
        alloc.release(a);
        assert_eq!(alloc.live(), 2);
    }

    #[test]
    fn arena_rejects_duplicates_and_stale_handles() {
        let mut arena = Arena::new();
        let h = EntityHandle::new(3, 1);
        arena.insert(h, "first").unwrap();
        assert_eq!(arena.insert(h, "again"), Err(RegistrationError::DuplicateHandle(h)));
        assert_eq!(arena.get(h), Some(&"first"));
        assert_eq!(arena.len(), 1);

        let old = EntityHandle::new(3, 0);
        assert_eq!(arena.insert(old, "old"), Err(RegistrationError::StaleHandle(old)));
        assert!(arena.get(old).is_none());
    }

    #[test]
    fn stale_handle_cannot_reach_recycled_slot() {
        let mut arena = Arena::new();
        let old = EntityHandle::new(0, 0);
        arena.insert(old, 1).unwrap();
        assert_eq!(arena.remove(old), Some(1));
        assert!(arena.is_empty());

        let new = EntityHandle::new(0, 1);
        arena.insert(new, 2).unwrap();
        assert!(arena.get_mut(old).is_none());
        assert!(arena.remove(old).is_none());
        assert_eq!(arena.get(new), Some(&2));
        assert_eq!(arena.iter().map(|(h, _)| h).collect::<Vec<_>>(), vec![new]);
    }
}
