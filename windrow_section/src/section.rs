// Copyright 2026 the Windrow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sections: ordered stores of heterogeneous items with type bindings.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::{Any, TypeId};
use core::fmt::Debug;
use core::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use smallvec::SmallVec;

/// Errors surfaced by section and list mutation.
///
/// All three variants are caller contract violations. None are recovered
/// internally: silently skipping a mutation would leave the span index and
/// the host's rendered state disagreeing about offsets, which is a far worse
/// failure than surfacing the error.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SectionError {
    /// The section key is stale or was never attached to this list.
    #[error("section key is stale or not attached to this list")]
    UnknownKey,
    /// An item's runtime type has no binding registered in its section.
    ///
    /// Distinguishes "forgot to register a binding" from data bugs.
    #[error("no binding registered for item type {0:?}")]
    Unbound(TypeId),
    /// A local index fell outside the valid range for the operation.
    #[error("local index {index} out of range for section of length {len}")]
    OutOfRange {
        /// The offending local index.
        index: usize,
        /// The section's length at the time of the call.
        len: usize,
    },
}

/// Identity tag for one type→binding registration.
///
/// Host frameworks use this as the view-type discriminator when creating and
/// recycling views. Tags are allocated once at bind time and never
/// recomputed, so they are unique across all sections in the process and
/// stable across a section's detach/attach cycles — recycled views created
/// for a tag stay valid when their section is re-attached.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ViewType(u64);

impl ViewType {
    fn next() -> Self {
        // Relaxed suffices: only the counter itself must be atomic.
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

struct Binding<B> {
    view_type: ViewType,
    binder: B,
}

/// One stored item plus the view type resolved for it at insertion.
struct Slot {
    view_type: ViewType,
    item: Box<dyn Any>,
}

/// An independently managed, ordered group of heterogeneous items.
///
/// A section is a plain collection until it is attached to a
/// [`SectionList`](crate::SectionList): every mutation below is legal in both
/// states, and none of them notify anything — notification is the attached
/// list's job. Detaching returns the section with items and bindings intact,
/// so it can be re-attached later (at any rank) with its data unchanged.
///
/// Items are type-erased, but every item must have a binding registered for
/// its concrete type **before** it is stored ([`Section::bind`]); the binding
/// is resolved once at insertion and the resulting [`ViewType`] travels with
/// the item from then on. `B` is the binding payload — opaque to this crate,
/// typically a renderer handle owned by the host.
pub struct Section<B> {
    bindings: HashMap<TypeId, Binding<B>>,
    items: Vec<Slot>,
}

impl<B> Section<B> {
    /// Create an empty section with no bindings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            items: Vec::new(),
        }
    }

    /// Create a section with a single binding already registered.
    #[must_use]
    pub fn with_binding<T: Any>(binder: B) -> Self {
        let mut section = Self::new();
        section.bind::<T>(binder);
        section
    }

    /// Register (or replace) the binding for items of type `T`.
    ///
    /// Idempotent per type: re-binding replaces the binder value but keeps
    /// the original [`ViewType`], so items already stored under it — and any
    /// host views recycled against it — stay coherent.
    pub fn bind<T: Any>(&mut self, binder: B) -> ViewType {
        match self.bindings.entry(TypeId::of::<T>()) {
            Entry::Occupied(mut occupied) => {
                let view_type = occupied.get().view_type;
                occupied.get_mut().binder = binder;
                view_type
            }
            Entry::Vacant(vacant) => {
                let view_type = ViewType::next();
                vacant.insert(Binding { view_type, binder });
                view_type
            }
        }
    }

    /// Remove the binding for type `T`, returning its binder.
    ///
    /// Only future insertions are affected: items already stored keep their
    /// resolved [`ViewType`] and remain in the list.
    pub fn unbind<T: Any>(&mut self) -> Option<B> {
        self.bindings.remove(&TypeId::of::<T>()).map(|b| b.binder)
    }

    /// The view type registered for `T`, if any.
    #[must_use]
    pub fn view_type_of<T: Any>(&self) -> Option<ViewType> {
        self.bindings.get(&TypeId::of::<T>()).map(|b| b.view_type)
    }

    /// The binder registered for `T`, if any.
    #[must_use]
    pub fn binder_of<T: Any>(&self) -> Option<&B> {
        self.bindings.get(&TypeId::of::<T>()).map(|b| &b.binder)
    }

    /// The binder behind a view type, if this section registered it.
    #[must_use]
    pub fn binder_by_view_type(&self, view_type: ViewType) -> Option<&B> {
        self.bindings
            .values()
            .find(|b| b.view_type == view_type)
            .map(|b| &b.binder)
    }

    /// Number of items stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the section stores no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item at `local`, type-erased.
    #[must_use]
    pub fn get(&self, local: usize) -> Option<&dyn Any> {
        self.items.get(local).map(|slot| &*slot.item)
    }

    /// The item at `local`, downcast to `T`.
    #[must_use]
    pub fn get_as<T: Any>(&self, local: usize) -> Option<&T> {
        self.items.get(local)?.item.downcast_ref()
    }

    /// The view type resolved for the item at `local`.
    #[must_use]
    pub fn view_type_at(&self, local: usize) -> Option<ViewType> {
        self.items.get(local).map(|slot| slot.view_type)
    }

    /// Iterate the stored items in order, type-erased.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Any> + '_ {
        self.items.iter().map(|slot| &*slot.item)
    }

    /// The local offset of the first item equal to `item`, if present.
    #[must_use]
    pub fn position_of<T: Any + PartialEq>(&self, item: &T) -> Option<usize> {
        self.items
            .iter()
            .position(|slot| slot.item.downcast_ref::<T>() == Some(item))
    }

    /// Append one item.
    pub fn push<T: Any>(&mut self, item: T) -> Result<(), SectionError> {
        let local = self.items.len();
        self.insert(local, alloc::vec![Box::new(item) as Box<dyn Any>])
            .map(|_| ())
    }

    /// Splice `items` into the store at `local`, returning how many went in.
    ///
    /// Fails with [`SectionError::Unbound`] if any item's type has no
    /// binding, and with [`SectionError::OutOfRange`] if `local > len()`.
    /// The whole batch is validated before anything is stored, so a failed
    /// insert leaves the section untouched.
    pub fn insert(
        &mut self,
        local: usize,
        items: Vec<Box<dyn Any>>,
    ) -> Result<usize, SectionError> {
        if local > self.items.len() {
            return Err(SectionError::OutOfRange {
                index: local,
                len: self.items.len(),
            });
        }
        let slots = self.resolve_slots(items)?;
        let count = slots.len();
        self.items.splice(local..local, slots);
        Ok(count)
    }

    /// Replace the whole item sequence.
    ///
    /// The new batch is validated before the old items are dropped; on error
    /// the previous contents survive.
    pub fn set_items(&mut self, items: Vec<Box<dyn Any>>) -> Result<(), SectionError> {
        let slots = self.resolve_slots(items)?;
        self.items.clear();
        self.items.extend(slots);
        Ok(())
    }

    /// Replace the item at `local`, returning the old one.
    ///
    /// The incoming item is validated like an insertion: its slot needs a
    /// freshly resolved [`ViewType`].
    pub fn replace(
        &mut self,
        local: usize,
        item: Box<dyn Any>,
    ) -> Result<Box<dyn Any>, SectionError> {
        if local >= self.items.len() {
            return Err(SectionError::OutOfRange {
                index: local,
                len: self.items.len(),
            });
        }
        let view_type = self.resolve_view_type(&*item)?;
        let old = core::mem::replace(&mut self.items[local], Slot { view_type, item });
        Ok(old.item)
    }

    /// Remove and return the item at `local`.
    pub fn remove_at(&mut self, local: usize) -> Result<Box<dyn Any>, SectionError> {
        if local >= self.items.len() {
            return Err(SectionError::OutOfRange {
                index: local,
                len: self.items.len(),
            });
        }
        Ok(self.items.remove(local).item)
    }

    /// Remove the first item equal to `item`.
    ///
    /// Returns `None` without error if no such item is stored: a caller
    /// racing a removal against other mutations is a normal pattern.
    pub fn remove_item<T: Any + PartialEq>(&mut self, item: &T) -> Option<Box<dyn Any>> {
        let local = self.position_of(item)?;
        Some(self.items.remove(local).item)
    }

    /// Move the item at `from` so it ends up at index `to`.
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<(), SectionError> {
        let len = self.items.len();
        for index in [from, to] {
            if index >= len {
                return Err(SectionError::OutOfRange { index, len });
            }
        }
        let slot = self.items.remove(from);
        self.items.insert(to, slot);
        Ok(())
    }

    /// Remove every item. Bindings are kept.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// The `(view type, item)` pair at `local`.
    pub(crate) fn slot(&self, local: usize) -> Option<(ViewType, &dyn Any)> {
        self.items.get(local).map(|slot| (slot.view_type, &*slot.item))
    }

    /// View types of every registered binding, in no particular order.
    pub(crate) fn view_types(&self) -> impl Iterator<Item = ViewType> + '_ {
        self.bindings.values().map(|b| b.view_type)
    }

    fn resolve_view_type(&self, item: &dyn Any) -> Result<ViewType, SectionError> {
        let type_id = item.type_id();
        self.bindings
            .get(&type_id)
            .map(|b| b.view_type)
            .ok_or(SectionError::Unbound(type_id))
    }

    /// Validate a batch and pair every item with its view type. Nothing is
    /// stored until the whole batch has resolved.
    fn resolve_slots(
        &self,
        items: Vec<Box<dyn Any>>,
    ) -> Result<SmallVec<[Slot; 4]>, SectionError> {
        items
            .into_iter()
            .map(|item| {
                let view_type = self.resolve_view_type(&*item)?;
                Ok(Slot { view_type, item })
            })
            .collect()
    }
}

impl<B> Default for Section<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Debug for Section<B> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Section")
            .field("len", &self.items.len())
            .field("bindings", &self.bindings.len())
            .finish_non_exhaustive()
    }
}
