// Copyright 2026 the Windrow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The sectioned list: sections composed over a span index, notifying a sink.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::any::Any;
use core::fmt::Debug;

use hashbrown::HashMap;
use windrow_index::{Span, SpanIndex};

use crate::section::{Section, SectionError, ViewType};
use crate::sink::ChangeSink;

/// Message used whenever the span index and the slot arena must agree.
const SPAN_INVARIANT: &str = "attached section must be registered in the span index";

/// Generational handle for an attached section.
///
/// Handed out by [`SectionList::attach`] and invalidated by
/// [`SectionList::detach`]; a key outlives its section's attachment only as
/// an inert value — using it afterwards is detected (not misresolved), even
/// if the underlying slot has been reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SectionKey(u32, u32);

impl SectionKey {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Section keys are intentionally 32-bit; higher bits are truncated by design."
    )]
    const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Slot in the arena of attached sections.
///
/// The generation persists across vacancy so a stale key can never match a
/// successor occupying the same slot.
struct SectionSlot<B> {
    generation: u32,
    section: Option<Section<B>>,
}

/// Resolved view of one global position.
pub struct Resolved<'a> {
    /// Key of the owning section.
    pub key: SectionKey,
    /// Offset within the owning section.
    pub local: usize,
    /// View-type tag resolved for the item when it was stored.
    pub view_type: ViewType,
    /// The item itself.
    pub item: &'a dyn Any,
}

impl Debug for Resolved<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Resolved")
            .field("key", &self.key)
            .field("local", &self.local)
            .field("view_type", &self.view_type)
            .finish_non_exhaustive()
    }
}

/// A flat, linearly addressed list composed of independently managed
/// [`Section`]s.
///
/// The list owns three things: the attached sections, the
/// [`SpanIndex`] that is the *sole* authority over where each section sits in
/// the flat coordinate space, and the [`ChangeSink`] that receives
/// flat-position notifications. Every attached mutation follows the same
/// path: validate, splice the section's local store, report the new length to
/// the index (shifting every later section), then notify the sink at the
/// freshly translated global position. Sections never cache their own span,
/// so there is no copy to go stale.
///
/// Attachment transfers ownership: [`SectionList::attach`] consumes the
/// section, [`SectionList::detach`] gives it back untouched. A section is
/// therefore provably standalone or attached, never both.
///
/// Attach and detach themselves notify nothing — they only rewrite offsets.
/// A caller that wants the host to animate a section's disappearance clears
/// it first, then detaches.
///
/// The whole structure expects the single-writer discipline of a UI update
/// thread; nothing here locks or suspends.
pub struct SectionList<B, S> {
    index: SpanIndex<SectionKey>,
    slots: Vec<SectionSlot<B>>,
    free_list: Vec<usize>,
    /// Reverse map from view type to the section that registered it, kept in
    /// step by attach/detach/bind/unbind.
    owners: HashMap<ViewType, SectionKey>,
    sink: S,
}

impl<B, S: ChangeSink> SectionList<B, S> {
    /// Create an empty list notifying `sink`.
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self {
            index: SpanIndex::new(),
            slots: Vec::new(),
            free_list: Vec::new(),
            owners: HashMap::new(),
            sink,
        }
    }

    /// The sink notifications are delivered to.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the sink (e.g. to drain a
    /// [`ChangeLog`](crate::ChangeLog)).
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Total number of items across all attached sections.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.index.total()
    }

    /// Number of attached sections.
    #[must_use]
    pub fn section_count(&self) -> usize {
        self.index.len()
    }

    /// Attach `section` at the end of the rank order.
    pub fn attach(&mut self, section: Section<B>) -> SectionKey {
        self.attach_at(self.index.len(), section)
    }

    /// Attach `section` at `rank` (clamped; out-of-range appends).
    ///
    /// The section's current length is registered with the index, shifting
    /// every section at or after `rank`. No notification fires.
    pub fn attach_at(&mut self, rank: usize, section: Section<B>) -> SectionKey {
        let len = section.len();
        let view_types: Vec<ViewType> = section.view_types().collect();
        let key = self.store(section);
        self.index.register_at(rank, key, len);
        for view_type in view_types {
            self.owners.insert(view_type, key);
        }
        key
    }

    /// Detach the section behind `key`, returning it with items and bindings
    /// intact so it can be re-attached later.
    ///
    /// Later sections shift down; no notification fires. Stale or unknown
    /// keys are a valid no-op (`None`).
    pub fn detach(&mut self, key: SectionKey) -> Option<Section<B>> {
        let slot = self.slots.get_mut(key.idx())?;
        if slot.generation != key.1 {
            return None;
        }
        let section = slot.section.take()?;
        self.free_list.push(key.idx());
        self.index.unregister(key);
        for view_type in section.view_types() {
            self.owners.remove(&view_type);
        }
        Some(section)
    }

    /// Register (or replace) the binding for `T` in an attached section.
    ///
    /// See [`Section::bind`]; the list additionally keeps its view-type
    /// ownership map current.
    pub fn bind<T: Any>(&mut self, key: SectionKey, binder: B) -> Result<ViewType, SectionError> {
        let view_type = self.attached_mut(key)?.bind::<T>(binder);
        self.owners.insert(view_type, key);
        Ok(view_type)
    }

    /// Remove the binding for `T` from an attached section.
    ///
    /// Items already stored keep displaying; only future insertions of `T`
    /// are rejected, and [`SectionList::binder_for`] stops resolving the tag.
    pub fn unbind<T: Any>(&mut self, key: SectionKey) -> Result<Option<B>, SectionError> {
        let section = self.attached_mut(key)?;
        let view_type = section.view_type_of::<T>();
        let binder = section.unbind::<T>();
        if let Some(view_type) = view_type {
            self.owners.remove(&view_type);
        }
        Ok(binder)
    }

    /// Splice `items` into the section at local offset `local`.
    ///
    /// Validates the whole batch first (see [`Section::insert`]), then grows
    /// the section's span and notifies an insertion at the translated flat
    /// position.
    pub fn insert(
        &mut self,
        key: SectionKey,
        local: usize,
        items: Vec<Box<dyn Any>>,
    ) -> Result<(), SectionError> {
        let count = self.attached_mut(key)?.insert(local, items)?;
        let span = self.resync_len(key);
        if count > 0 {
            self.sink.inserted(span.to_global(local), count);
        }
        Ok(())
    }

    /// Append one item to the section.
    pub fn push<T: Any>(&mut self, key: SectionKey, item: T) -> Result<(), SectionError> {
        let local = self.attached(key).ok_or(SectionError::UnknownKey)?.len();
        self.insert(key, local, alloc::vec![Box::new(item) as Box<dyn Any>])
    }

    /// Replace the section's entire item sequence.
    ///
    /// Notifies as a removal of the old run followed by an insertion of the
    /// new one — the plain two-notification contract. A collaborator that
    /// computes a minimal edit script can instead replay it through
    /// [`SectionList::insert`], [`SectionList::remove_at`],
    /// [`SectionList::move_item`], and [`SectionList::mark_changed`].
    pub fn set_items(
        &mut self,
        key: SectionKey,
        items: Vec<Box<dyn Any>>,
    ) -> Result<(), SectionError> {
        let section = self.attached_mut(key)?;
        let old_len = section.len();
        section.set_items(items)?;
        let span = self.resync_len(key);
        if old_len > 0 {
            self.sink.removed(span.start, old_len);
        }
        if span.len > 0 {
            self.sink.inserted(span.start, span.len);
        }
        Ok(())
    }

    /// Replace the item at `local`, notifying a change at its flat position.
    pub fn replace(
        &mut self,
        key: SectionKey,
        local: usize,
        item: Box<dyn Any>,
    ) -> Result<Box<dyn Any>, SectionError> {
        let old = self.attached_mut(key)?.replace(local, item)?;
        let span = self.index.span_of(key).expect(SPAN_INVARIANT);
        self.sink.changed(span.to_global(local), 1);
        Ok(old)
    }

    /// Typed convenience for [`SectionList::replace`].
    pub fn set<T: Any>(
        &mut self,
        key: SectionKey,
        local: usize,
        item: T,
    ) -> Result<Box<dyn Any>, SectionError> {
        self.replace(key, local, Box::new(item))
    }

    /// Remove and return the item at `local`, notifying a removal.
    pub fn remove_at(
        &mut self,
        key: SectionKey,
        local: usize,
    ) -> Result<Box<dyn Any>, SectionError> {
        let item = self.attached_mut(key)?.remove_at(local)?;
        let span = self.resync_len(key);
        self.sink.removed(span.to_global(local), 1);
        Ok(item)
    }

    /// Remove the first item equal to `item` from the section.
    ///
    /// `Ok(false)` — not an error — when no such item is stored.
    pub fn remove_item<T: Any + PartialEq>(
        &mut self,
        key: SectionKey,
        item: &T,
    ) -> Result<bool, SectionError> {
        let section = self.attached(key).ok_or(SectionError::UnknownKey)?;
        match section.position_of(item) {
            Some(local) => {
                self.remove_at(key, local)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Move the item at `from` to `to` (both section-local), notifying the
    /// host with translated flat positions.
    pub fn move_item(
        &mut self,
        key: SectionKey,
        from: usize,
        to: usize,
    ) -> Result<(), SectionError> {
        self.attached_mut(key)?.move_item(from, to)?;
        if from != to {
            let span = self.index.span_of(key).expect(SPAN_INVARIANT);
            self.sink.moved(span.to_global(from), span.to_global(to));
        }
        Ok(())
    }

    /// Notify the host that `len` items starting at `local` changed in
    /// place, without touching the store.
    ///
    /// For callers that mutate item internals through other means and need
    /// the host to re-render the affected run.
    pub fn mark_changed(
        &mut self,
        key: SectionKey,
        local: usize,
        len: usize,
    ) -> Result<(), SectionError> {
        let section_len = self.attached(key).ok_or(SectionError::UnknownKey)?.len();
        if local.checked_add(len).is_none_or(|end| end > section_len) {
            return Err(SectionError::OutOfRange {
                index: local,
                len: section_len,
            });
        }
        if len > 0 {
            let span = self.index.span_of(key).expect(SPAN_INVARIANT);
            self.sink.changed(span.to_global(local), len);
        }
        Ok(())
    }

    /// Shared read access to an attached section.
    #[must_use]
    pub fn section(&self, key: SectionKey) -> Option<&Section<B>> {
        self.attached(key)
    }

    /// The span currently occupied by the section, fetched from the index.
    #[must_use]
    pub fn span_of(&self, key: SectionKey) -> Option<Span> {
        self.index.span_of(key)
    }

    /// The rank of the section in the flat order.
    #[must_use]
    pub fn rank_of(&self, key: SectionKey) -> Option<usize> {
        self.index.rank_of(key)
    }

    /// Iterate `(key, span)` pairs in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (SectionKey, Span)> + '_ {
        self.index.iter()
    }

    /// Resolve a global position to its section, local offset, view type,
    /// and item.
    ///
    /// Takes `&mut self` because the lookup moves the index's locality
    /// cursor; results are unaffected by cursor state.
    pub fn resolve(&mut self, pos: usize) -> Option<Resolved<'_>> {
        let (key, local) = self.index.locate(pos)?;
        let section = self.slots[key.idx()]
            .section
            .as_ref()
            .expect("located key must be attached");
        let (view_type, item) = section
            .slot(local)
            .expect("located offset must be in range");
        Some(Resolved {
            key,
            local,
            view_type,
            item,
        })
    }

    /// The view-type tag at a global position.
    pub fn view_type_at(&mut self, pos: usize) -> Option<ViewType> {
        Some(self.resolve(pos)?.view_type)
    }

    /// The item at a global position, type-erased.
    pub fn item_at(&mut self, pos: usize) -> Option<&dyn Any> {
        Some(self.resolve(pos)?.item)
    }

    /// The binder behind a view-type tag, wherever it is registered.
    ///
    /// This is what a host calls when asked to create a view for a tag it
    /// has not seen yet.
    #[must_use]
    pub fn binder_for(&self, view_type: ViewType) -> Option<&B> {
        let key = *self.owners.get(&view_type)?;
        self.attached(key)
            .expect("owner map must point at an attached section")
            .binder_by_view_type(view_type)
    }

    fn attached(&self, key: SectionKey) -> Option<&Section<B>> {
        let slot = self.slots.get(key.idx())?;
        if slot.generation != key.1 {
            return None;
        }
        slot.section.as_ref()
    }

    fn attached_mut(&mut self, key: SectionKey) -> Result<&mut Section<B>, SectionError> {
        self.slots
            .get_mut(key.idx())
            .filter(|slot| slot.generation == key.1)
            .and_then(|slot| slot.section.as_mut())
            .ok_or(SectionError::UnknownKey)
    }

    /// Report the section's current length to the index and return the
    /// refreshed span. Callers must have verified attachment.
    fn resync_len(&mut self, key: SectionKey) -> Span {
        let len = self
            .attached(key)
            .expect("resync caller must hold a live key")
            .len();
        self.index.set_len(key, len).expect(SPAN_INVARIANT)
    }

    fn store(&mut self, section: Section<B>) -> SectionKey {
        if let Some(idx) = self.free_list.pop() {
            let slot = &mut self.slots[idx];
            debug_assert!(slot.section.is_none(), "free list slot must be vacant");
            slot.generation += 1;
            slot.section = Some(section);
            SectionKey::new(idx, slot.generation)
        } else {
            self.slots.push(SectionSlot {
                generation: 1,
                section: Some(section),
            });
            SectionKey::new(self.slots.len() - 1, 1)
        }
    }
}

impl<B, S: ChangeSink + Default> Default for SectionList<B, S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<B, S> Debug for SectionList<B, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SectionList")
            .field("sections", &self.index.len())
            .field("total_len", &self.index.total())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::vec;
    use core::any::Any;

    use windrow_index::Span;

    use super::{SectionKey, SectionList};
    use crate::section::{Section, SectionError};
    use crate::sink::{Change, ChangeLog};

    fn boxed<T: Any>(value: T) -> Box<dyn Any> {
        Box::new(value)
    }

    fn rows(values: &[u32]) -> Section<&'static str> {
        let mut section = Section::with_binding::<u32>("row");
        for &n in values {
            section.push(n).unwrap();
        }
        section
    }

    #[test]
    fn growing_a_later_section_notifies_at_flat_positions() {
        let mut list = SectionList::new(ChangeLog::new());
        let a = list.attach(rows(&[0, 1, 2]));
        let b = list.attach(rows(&[]));

        assert_eq!(list.total_len(), 3);
        assert!(list.sink().is_empty(), "attach must not notify");

        list.insert(b, 0, vec![boxed(10_u32), boxed(11_u32)]).unwrap();
        assert_eq!(
            list.sink_mut().drain(),
            vec![Change::Inserted { pos: 3, len: 2 }]
        );
        assert_eq!(list.span_of(b), Some(Span::new(3, 2)));
        assert_eq!(list.total_len(), 5);

        // Detach only rewrites offsets; nothing is notified.
        let detached = list.detach(a).unwrap();
        assert_eq!(detached.len(), 3);
        assert!(list.sink().is_empty());
        assert_eq!(list.span_of(b), Some(Span::new(0, 2)));
        assert_eq!(list.total_len(), 2);
    }

    #[test]
    fn mutations_in_early_sections_shift_later_spans_only() {
        let mut list = SectionList::new(ChangeLog::new());
        let a = list.attach(rows(&[1]));
        let b = list.attach(rows(&[2, 3]));
        let c = list.attach(rows(&[4, 5, 6]));

        list.set_items(b, vec![boxed(7_u32)]).unwrap();

        assert_eq!(list.span_of(a), Some(Span::new(0, 1)));
        assert_eq!(list.span_of(b), Some(Span::new(1, 1)));
        assert_eq!(list.span_of(c), Some(Span::new(2, 3)));
        assert_eq!(list.total_len(), 5);
        assert_eq!(
            list.sink_mut().drain(),
            vec![
                Change::Removed { pos: 1, len: 2 },
                Change::Inserted { pos: 1, len: 1 },
            ]
        );
    }

    #[test]
    fn replace_and_mark_changed_notify_changed_runs() {
        let mut list = SectionList::new(ChangeLog::new());
        let _head = list.attach(rows(&[9]));
        let body = list.attach(rows(&[1, 2, 3]));

        let old = list.set(body, 1, 20_u32).unwrap();
        assert_eq!(old.downcast_ref::<u32>(), Some(&2));

        list.mark_changed(body, 1, 2).unwrap();
        assert_eq!(
            list.sink_mut().drain(),
            vec![
                Change::Changed { pos: 2, len: 1 },
                Change::Changed { pos: 2, len: 2 },
            ]
        );

        assert_eq!(
            list.mark_changed(body, 2, 2),
            Err(SectionError::OutOfRange { index: 2, len: 3 })
        );
    }

    #[test]
    fn move_item_reorders_and_notifies_flat_positions() {
        let mut list = SectionList::new(ChangeLog::new());
        let _head = list.attach(rows(&[9, 9]));
        let body = list.attach(rows(&[1, 2, 3]));

        list.move_item(body, 0, 2).unwrap();
        assert_eq!(
            list.sink_mut().drain(),
            vec![Change::Moved { from: 2, to: 4 }]
        );
        let section = list.section(body).unwrap();
        assert_eq!(section.get_as::<u32>(0), Some(&2));
        assert_eq!(section.get_as::<u32>(2), Some(&1));

        // Moving an item onto itself is a no-op notification-wise.
        list.move_item(body, 1, 1).unwrap();
        assert!(list.sink().is_empty());
    }

    #[test]
    fn removals_notify_before_positions() {
        let mut list = SectionList::new(ChangeLog::new());
        let body = list.attach(rows(&[4, 5, 6]));

        let removed = list.remove_at(body, 1).unwrap();
        assert_eq!(removed.downcast_ref::<u32>(), Some(&5));
        assert_eq!(
            list.sink_mut().drain(),
            vec![Change::Removed { pos: 1, len: 1 }]
        );

        assert_eq!(list.remove_item(body, &6_u32), Ok(true));
        assert_eq!(list.remove_item(body, &6_u32), Ok(false));
        assert_eq!(
            list.sink_mut().drain(),
            vec![Change::Removed { pos: 1, len: 1 }]
        );
        assert_eq!(list.total_len(), 1);
    }

    #[test]
    fn unbound_inserts_leave_list_and_index_untouched() {
        let mut list = SectionList::new(ChangeLog::new());
        let body = list.attach(rows(&[1]));

        let result = list.insert(body, 0, vec![boxed(2_u32), boxed("unbound")]);
        assert!(matches!(result, Err(SectionError::Unbound(_))));
        assert_eq!(list.total_len(), 1);
        assert!(list.sink().is_empty());
    }

    #[test]
    fn empty_batches_do_not_notify() {
        let mut list = SectionList::new(ChangeLog::new());
        let body = list.attach(rows(&[]));

        list.insert(body, 0, vec![]).unwrap();
        list.set_items(body, vec![]).unwrap();
        assert!(list.sink().is_empty());
    }

    #[test]
    fn detach_preserves_items_bindings_and_view_types() {
        let mut list = SectionList::new(ChangeLog::new());
        let _head = list.attach(rows(&[9]));
        let body = list.attach(rows(&[1, 2]));

        let view_type = list.resolve(1).unwrap().view_type;

        let section = list.detach(body).unwrap();
        assert_eq!(list.binder_for(view_type), None);
        assert_eq!(section.get_as::<u32>(1), Some(&2));

        // Re-attach at the front: same items, same tag, new flat positions.
        let body = list.attach_at(0, section);
        let resolved = list.resolve(0).unwrap();
        assert_eq!(resolved.key, body);
        assert_eq!(resolved.view_type, view_type);
        assert_eq!(resolved.item.downcast_ref::<u32>(), Some(&1));
        assert_eq!(list.binder_for(view_type), Some(&"row"));
        assert_eq!(list.span_of(body), Some(Span::new(0, 2)));
    }

    #[test]
    fn stale_keys_are_rejected_even_after_slot_reuse() {
        let mut list = SectionList::new(ChangeLog::new());
        let first = list.attach(rows(&[1]));
        let section = list.detach(first).unwrap();

        let second = list.attach(section);
        assert_ne!(first, second);
        assert_eq!(list.section(first).map(Section::len), None);
        assert_eq!(list.push(first, 2_u32), Err(SectionError::UnknownKey));
        assert_eq!(list.detach(first).map(|s| s.len()), None);

        list.push(second, 2_u32).unwrap();
        assert_eq!(list.total_len(), 2);
    }

    #[test]
    fn resolve_walks_every_position_and_rejects_the_rest() {
        let mut list = SectionList::new(ChangeLog::new());
        struct Header(&'static str);
        let mut head = Section::with_binding::<Header>("header");
        head.push(Header("Today")).unwrap();
        let head_key = list.attach(head);
        let body = list.attach(rows(&[10, 11]));

        let resolved: [(SectionKey, usize); 3] = [
            (head_key, 0),
            (body, 0),
            (body, 1),
        ];
        for (pos, (key, local)) in resolved.into_iter().enumerate() {
            let r = list.resolve(pos).unwrap();
            assert_eq!((r.key, r.local), (key, local), "position {pos}");
        }
        assert_eq!(
            list.resolve(0).unwrap().item.downcast_ref::<Header>().map(|h| h.0),
            Some("Today")
        );
        assert!(list.resolve(3).is_none());
        assert!(list.item_at(usize::MAX).is_none());
    }

    #[test]
    fn bind_through_the_list_keeps_binder_resolution_current() {
        let mut list = SectionList::new(ChangeLog::new());
        let body = list.attach(rows(&[1]));

        let vt = list.bind::<&'static str>(body, "label").unwrap();
        list.push(body, "hello").unwrap();
        assert_eq!(list.view_type_at(1), Some(vt));
        assert_eq!(list.binder_for(vt), Some(&"label"));

        assert_eq!(list.unbind::<&'static str>(body), Ok(Some("label")));
        assert_eq!(list.binder_for(vt), None);
        // The stored item still resolves with its original tag.
        assert_eq!(list.view_type_at(1), Some(vt));
    }
}
