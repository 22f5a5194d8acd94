//! Concurrent in-memory homework store.
//!
//! The store is a growable vector of independently locked slots behind one
//! structural lock. The structural lock is taken exclusively only by
//! [`HomeworkStore::append`]; every other operation takes it shared, so reads
//! and edits of different slots run in parallel while still being excluded
//! from a concurrent append.
//!
//! Lock order is always store lock first, then slot lock. Neither lock is held
//! across I/O.

use parking_lot::RwLock;
use tracing::trace;

use crate::{
    error::{Action, StoreError},
    record::{Homework, Slot, SlotView},
};

pub type Result<T> = std::result::Result<T, StoreError>;

/// Ordered, append-only collection of homework slots.
///
/// Indices handed out by `append` stay valid for the lifetime of the store:
/// slots are never removed or reordered, deletion only tombstones them.
#[derive(Default)]
pub struct HomeworkStore {
    slots: RwLock<Vec<RwLock<Slot>>>,
}

impl HomeworkStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }

    /// Creates a store holding the course's starting assignments.
    pub fn seeded() -> Self {
        let store = Self::new();
        for (name, desc) in [
            ("hw1", "Getting to know Go"),
            ("proj1", "Step 1 to the grand project"),
            ("hw2", "Getting to know Go again"),
            ("proj2", "Step 2 to the grand project"),
        ] {
            store.append(Homework::new(name, desc));
        }
        store
    }

    /// Number of slots, tombstoned ones included.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a new active slot and returns its index.
    ///
    /// The submission counter of a new record always starts at zero.
    pub fn append(&self, homework: Homework) -> usize {
        let homework = Homework {
            submissions: 0,
            ..homework
        };

        let mut slots = self.slots.write();
        slots.push(RwLock::new(Slot::Active(homework)));
        let index = slots.len() - 1;
        trace!(index, "appended slot");
        index
    }

    /// Copies every slot, in index order, tagging tombstoned ones.
    pub fn read_all(&self) -> Vec<SlotView> {
        let slots = self.slots.read();
        slots.iter().map(|slot| slot.read().view()).collect()
    }

    /// Copies the record at `index`.
    ///
    /// Tombstoned slots still return their last contents.
    pub fn read_one(&self, index: usize) -> Result<Homework> {
        let slots = self.slots.read();
        let slot = slot_at(&slots, index)?.read();
        Ok(slot.homework().clone())
    }

    /// Overwrites name and description at `index` and counts one submission.
    ///
    /// Only the store lock's shared mode is needed here: the slot's own lock
    /// serializes conflicting edits, and the shared store lock is enough to
    /// keep an append from growing the vector underneath us.
    pub fn edit(&self, index: usize, name: String, desc: String) -> Result<()> {
        let slots = self.slots.read();
        let mut slot = slot_at(&slots, index)?.write();

        let homework = slot.active_mut().ok_or(StoreError::AlreadyDeleted {
            index,
            action: Action::Edit,
        })?;
        homework.name = name;
        homework.desc = desc;
        homework.submissions += 1;
        trace!(index, submissions = homework.submissions, "edited slot");
        Ok(())
    }

    /// Tombstones the slot at `index`.
    pub fn delete(&self, index: usize) -> Result<()> {
        let slots = self.slots.read();
        let mut slot = slot_at(&slots, index)?.write();

        if !slot.tombstone() {
            return Err(StoreError::AlreadyDeleted {
                index,
                action: Action::Delete,
            });
        }
        trace!(index, "deleted slot");
        Ok(())
    }
}

fn slot_at(slots: &[RwLock<Slot>], index: usize) -> Result<&RwLock<Slot>> {
    slots.get(index).ok_or(StoreError::OutOfRange {
        index: i64::try_from(index).unwrap_or(i64::MAX),
        len: slots.len(),
    })
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn append_returns_sequential_indices() {
        let store = HomeworkStore::new();
        assert_eq!(store.append(Homework::new("hw1", "d1")), 0);
        assert_eq!(store.append(Homework::new("hw2", "d2")), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn append_resets_submission_counter() {
        let store = HomeworkStore::new();
        let index = store.append(Homework {
            name: "hw1".into(),
            desc: "d1".into(),
            submissions: 42,
        });
        assert_eq!(store.read_one(index).unwrap().submissions, 0);
    }

    #[test]
    fn edit_counts_each_submission() {
        let store = HomeworkStore::new();
        let index = store.append(Homework::new("hw1", "d1"));

        for round in 1..=3 {
            store
                .edit(index, format!("hw1-{round}"), "d1".into())
                .expect("edit active slot");
        }

        let homework = store.read_one(index).unwrap();
        assert_eq!(homework.name, "hw1-3");
        assert_eq!(homework.submissions, 3);
    }

    #[test]
    fn tombstones_are_permanent() {
        let store = HomeworkStore::new();
        let index = store.append(Homework::new("hw1", "d1"));

        store.delete(index).expect("first delete");
        assert_eq!(
            store.delete(index),
            Err(StoreError::AlreadyDeleted {
                index,
                action: Action::Delete
            })
        );
        assert_eq!(
            store.edit(index, "x".into(), "y".into()),
            Err(StoreError::AlreadyDeleted {
                index,
                action: Action::Edit
            })
        );

        assert_eq!(store.read_one(index), Ok(Homework::new("hw1", "d1")));

        let views = store.read_all();
        assert!(views[index].deleted);
        assert_eq!(views[index].homework, Homework::new("hw1", "d1"));
    }

    #[test]
    fn out_of_range_operations_do_not_mutate() {
        let store = HomeworkStore::new();
        store.append(Homework::new("hw1", "d1"));

        let expected = StoreError::OutOfRange { index: 5, len: 1 };
        assert_eq!(store.read_one(5), Err(expected.clone()));
        assert_eq!(store.edit(5, "x".into(), "y".into()), Err(expected.clone()));
        assert_eq!(store.delete(5), Err(expected));

        assert_eq!(store.len(), 1);
        assert_eq!(store.read_all()[0].homework, Homework::new("hw1", "d1"));
    }

    #[test]
    fn later_appends_do_not_disturb_earlier_indices() {
        let store = HomeworkStore::new();
        let first = store.append(Homework::new("hw1", "d1"));
        store.edit(first, "hw1b".into(), "d1b".into()).unwrap();

        for n in 0..50 {
            store.append(Homework::new(format!("extra{n}"), "x"));
        }

        let homework = store.read_one(first).unwrap();
        assert_eq!(homework.name, "hw1b");
        assert_eq!(homework.submissions, 1);
    }

    #[test]
    fn seeded_store_has_four_active_assignments() {
        let store = HomeworkStore::seeded();
        let views = store.read_all();
        assert_eq!(views.len(), 4);
        assert!(views.iter().all(|view| !view.deleted));
        assert_eq!(views[1].homework.name, "proj1");
    }

    #[test]
    fn concurrent_edits_on_different_slots_commute() {
        let store = Arc::new(HomeworkStore::new());
        let a = store.append(Homework::new("a", "a"));
        let b = store.append(Homework::new("b", "b"));

        let handles: Vec<_> = [(a, "a2"), (b, "b2")]
            .into_iter()
            .map(|(index, name)| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.edit(index, name.into(), "done".into()))
            })
            .collect();
        for handle in handles {
            handle.join().expect("edit thread").expect("edit");
        }

        assert_eq!(store.read_one(a).unwrap().name, "a2");
        assert_eq!(store.read_one(b).unwrap().name, "b2");
        assert_eq!(store.read_one(a).unwrap().submissions, 1);
        assert_eq!(store.read_one(b).unwrap().submissions, 1);
    }
}
