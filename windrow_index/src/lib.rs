// Copyright 2026 the Windrow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Windrow Index: the partition-position index behind sectioned lists.
//!
//! A sectioned list presents several independently managed groups of items to
//! a host list framework as one flat, linearly addressed sequence. This crate
//! owns the one hard part of that composition: maintaining a contiguous
//! global ordering over sections whose sizes change independently, and
//! translating between global positions and `(section, local offset)` pairs
//! in both directions.
//!
//! The core concepts are:
//!
//! - [`Span`]: the `[start, start + len)` slice of global positions a section
//!   currently occupies.
//! - [`SpanIndex`]: the rank-ordered table of sections. Registering,
//!   unregistering, and resizing keep adjacent spans meeting exactly;
//!   [`SpanIndex::locate`] resolves a global position through a one-entry
//!   locality cursor, a bounded neighbor probe, and a binary-search fallback,
//!   in that order.
//!
//! This crate deliberately knows nothing about items, renderers, or widgets.
//! It stores opaque keys and counts; a companion crate (or host framework)
//! owns the data each section contributes.
//!
//! ## Minimal example
//!
//! ```rust
//! use windrow_index::SpanIndex;
//!
//! let mut index = SpanIndex::new();
//! index.register("header", 1);
//! index.register("feed", 3);
//!
//! assert_eq!(index.total(), 4);
//! assert_eq!(index.locate(0), Some(("header", 0)));
//! assert_eq!(index.locate(2), Some(("feed", 1)));
//!
//! // Growing one section shifts everything after it.
//! index.set_len("header", 2).unwrap();
//! assert_eq!(index.total(), 5);
//! assert_eq!(index.locate(2), Some(("feed", 0)));
//! ```
//!
//! ## Access pattern
//!
//! Lookups are tuned for scrolling: long monotone runs of nearby positions.
//! Repeats inside the same section are O(1) via the cursor, steps into a
//! neighboring section are caught by a three-rank probe biased toward the
//! sweep direction, and arbitrary jumps cost O(log sections). The cursor is
//! never a source of truth — every hit is verified against the live span
//! table, so results are identical whether or not the cursor is warm.
//!
//! All operations are synchronous and none allocate on the lookup path. The
//! index expects a single-writer discipline: it is driven from whichever
//! thread owns the host list, with no internal locking.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod index;
mod types;

pub use index::{SpanIndex, UnknownKey};
pub use types::Span;
