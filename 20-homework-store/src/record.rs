//! Homework records and the slots that hold them inside the store.

use serde::{Deserialize, Serialize};

/// A single homework assignment.
///
/// Records carry no key of their own; the store identifies them by the index
/// of the slot they live in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Homework {
    pub name: String,
    pub desc: String,
    #[serde(default)]
    pub submissions: u64,
}

impl Homework {
    /// Creates a fresh record with no submissions yet.
    pub fn new(name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            submissions: 0,
        }
    }
}

/// Contents of one store cell.
///
/// A deleted slot keeps its last record so listings can still show it, tagged
/// as deleted. Nothing turns a `Deleted` slot back into an `Active` one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Active(Homework),
    Deleted(Homework),
}

impl Slot {
    pub fn homework(&self) -> &Homework {
        match self {
            Slot::Active(homework) | Slot::Deleted(homework) => homework,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Slot::Deleted(_))
    }

    /// Returns the live record for mutation, or `None` once tombstoned.
    pub fn active_mut(&mut self) -> Option<&mut Homework> {
        match self {
            Slot::Active(homework) => Some(homework),
            Slot::Deleted(_) => None,
        }
    }

    /// Tombstones the slot. Returns `false` if it was already deleted.
    pub fn tombstone(&mut self) -> bool {
        match self {
            Slot::Active(homework) => {
                let homework = std::mem::take(homework);
                *self = Slot::Deleted(homework);
                true
            }
            Slot::Deleted(_) => false,
        }
    }

    pub fn view(&self) -> SlotView {
        SlotView {
            homework: self.homework().clone(),
            deleted: self.is_deleted(),
        }
    }
}

/// Point-in-time copy of a slot, as returned by listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotView {
    pub homework: Homework,
    pub deleted: bool,
}
