// Copyright 2026 the Windrow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Windrow Section: sectioned list composition over a span index.
//!
//! A [`SectionList`] presents several independently managed [`Section`]s to a
//! host list framework as one flat, linearly addressed sequence. Each section
//! owns an ordered store of heterogeneous items and a table of type→binding
//! registrations; the list owns the [`windrow_index::SpanIndex`] that decides
//! where every section sits, and a [`ChangeSink`] that receives flat-position
//! change notifications the host can translate into re-layout work.
//!
//! The division of labor:
//!
//! - [`Section`]: a standalone, fully mutable collection. Constructing and
//!   filling one fires no notifications. Every stored item must have a
//!   binding registered for its concrete type first; the binding's
//!   [`ViewType`] is resolved once at insertion and travels with the item.
//! - [`SectionList`]: attaches sections (taking ownership), routes every
//!   attached mutation through the span index, and notifies its sink at
//!   translated flat positions. Detaching hands the section back intact.
//! - [`ChangeSink`] / [`ChangeLog`]: the host boundary, either callback-style
//!   or as a drainable batch of [`Change`] values.
//!
//! What this crate deliberately does **not** do: inflate views, recycle
//! view holders, compute pixel geometry, or diff item sequences.
//! [`SectionList::set_items`] is the plain remove-all/insert-all contract; an
//! external diff engine can replay a minimal edit script through the
//! insert/remove/move/change primitives instead.
//!
//! ## Example
//!
//! ```rust
//! use windrow_section::{ChangeLog, Section, SectionList};
//!
//! // Bindings are opaque to the list; hosts typically store a renderer here.
//! let mut header = Section::new();
//! header.bind::<&'static str>("title renderer");
//! header.push("Inbox").unwrap();
//!
//! let mut list = SectionList::new(ChangeLog::new());
//! let _header_key = list.attach(header);
//!
//! let feed_key = list.attach(Section::with_binding::<u32>("row renderer"));
//!
//! // Mutations notify the sink in flat-list positions.
//! list.push(feed_key, 7_u32).unwrap();
//! list.push(feed_key, 9_u32).unwrap();
//! assert_eq!(list.total_len(), 3);
//! assert_eq!(list.sink().changes().len(), 2);
//!
//! // The render path: position -> (section, offset, view type, item).
//! let resolved = list.resolve(1).unwrap();
//! assert_eq!(resolved.item.downcast_ref::<u32>(), Some(&7));
//! let view_type = resolved.view_type;
//! assert_eq!(list.binder_for(view_type), Some(&"row renderer"));
//! ```
//!
//! Everything here expects the host framework's single-writer threading
//! model: one update thread drives all mutation, and notifications fire
//! synchronously inside the mutating call. A sink cannot re-enter the list
//! it is attached to — it only ever receives `&mut` to itself — so the
//! re-entrant-mutation hazard of callback-based adapters is ruled out at
//! compile time rather than documented around.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod list;
mod section;
mod sink;

pub use list::{Resolved, SectionKey, SectionList};
pub use section::{Section, SectionError, ViewType};
pub use sink::{Change, ChangeLog, ChangeSink};

pub use windrow_index::{Span, SpanIndex};
