// Copyright 2026 the Windrow Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A sectioned feed driving a simulated host list.
//!
//! This example plays the role a real list framework would: it keeps a
//! mirror of the rendered rows and updates it *only* by applying the change
//! notifications drained from the list's [`ChangeLog`]. If the mirror and a
//! full re-render ever disagree, the index's offset bookkeeping is broken.
//!
//! Run:
//! - `cargo run -p windrow_demos --example feed`

use std::any::Any;

use windrow_index::Span;
use windrow_section::{Change, ChangeLog, Section, SectionList};

/// The demo's "renderer": turn an item into the row text a host would show.
type Renderer = fn(&dyn Any) -> String;

/// Section header row.
struct Header(&'static str);

/// One task in the feed.
struct Task {
    title: String,
    done: bool,
}

fn render_header(item: &dyn Any) -> String {
    let header = item.downcast_ref::<Header>().expect("header renderer got a non-header");
    format!("== {} ==", header.0)
}

fn render_task(item: &dyn Any) -> String {
    let task = item.downcast_ref::<Task>().expect("task renderer got a non-task");
    format!("[{}] {}", if task.done { "x" } else { " " }, task.title)
}

fn task(title: &str) -> Task {
    Task {
        title: title.to_owned(),
        done: false,
    }
}

/// Render one flat position through the binding table, exactly as a host
/// would: tag first, then renderer, then item.
fn render(list: &mut SectionList<Renderer, ChangeLog>, pos: usize) -> String {
    let view_type = list
        .view_type_at(pos)
        .expect("host only renders valid positions");
    let renderer = *list
        .binder_for(view_type)
        .expect("every stored item has a resolvable tag");
    renderer(list.item_at(pos).expect("position was just resolved"))
}

/// Apply drained changes to the mirror. This is the entire host protocol.
fn sync(mirror: &mut Vec<String>, list: &mut SectionList<Renderer, ChangeLog>) {
    for change in list.sink_mut().drain() {
        match change {
            Change::Inserted { pos, len } => {
                for i in 0..len {
                    let row = render(list, pos + i);
                    mirror.insert(pos + i, row);
                }
            }
            Change::Removed { pos, len } => {
                mirror.drain(pos..pos + len);
            }
            Change::Changed { pos, len } => {
                for i in pos..pos + len {
                    mirror[i] = render(list, i);
                }
            }
            Change::Moved { from, to } => {
                let row = mirror.remove(from);
                mirror.insert(to, row);
            }
        }
    }
}

fn print_state(label: &str, mirror: &[String], list: &SectionList<Renderer, ChangeLog>) {
    println!("-- {label}");
    let spans: Vec<Span> = list.iter().map(|(_, span)| span).collect();
    println!("   sections: {spans:?}");
    for row in mirror {
        println!("   {row}");
    }
}

fn main() {
    let mut list: SectionList<Renderer, ChangeLog> = SectionList::new(ChangeLog::new());

    let mut header = Section::with_binding::<Header>(render_header as Renderer);
    header.push(Header("Today")).unwrap();
    let _header_key = list.attach(header);

    let tasks_key = list.attach(Section::with_binding::<Task>(render_task as Renderer));

    // Attach is notification-silent, so the host populates its mirror once
    // from scratch — the same thing a list framework does on adapter swap.
    let mut mirror: Vec<String> = (0..list.total_len())
        .map(|pos| render(&mut list, pos))
        .collect();
    print_state("attached", &mirror, &list);

    // From here on the mirror is maintained purely from notifications.
    list.set_items(
        tasks_key,
        vec![
            Box::new(task("water the plants")),
            Box::new(task("file the report")),
            Box::new(task("fix the gate")),
        ],
    )
    .unwrap();
    sync(&mut mirror, &mut list);
    print_state("set_items", &mirror, &list);

    // Complete a task in place.
    let done = Task {
        title: "file the report".to_owned(),
        done: true,
    };
    list.set(tasks_key, 1, done).unwrap();
    sync(&mut mirror, &mut list);
    print_state("completed one", &mirror, &list);

    // Move the completed task to the bottom of its section.
    list.move_item(tasks_key, 1, 2).unwrap();
    sync(&mut mirror, &mut list);
    print_state("moved it down", &mirror, &list);

    // A late-arriving section slots in between header and tasks.
    let notice_key = list.attach_at(1, Section::with_binding::<Header>(render_header as Renderer));
    // (attach is silent and the section is empty, so the mirror needs no fixup)
    list.push(notice_key, Header("2 open")).unwrap();
    sync(&mut mirror, &mut list);
    print_state("notice inserted", &mirror, &list);

    // Visual removal is the caller's job: clear first (which notifies), then
    // detach (a silent offset rewrite).
    list.set_items(notice_key, vec![]).unwrap();
    let _notice = list.detach(notice_key).unwrap();
    sync(&mut mirror, &mut list);
    print_state("notice dismissed", &mirror, &list);

    // The mirror, built only from notifications, matches a full re-render.
    let full: Vec<String> = (0..list.total_len())
        .map(|pos| render(&mut list, pos))
        .collect();
    assert_eq!(mirror, full, "mirror drifted from the list");
    println!("-- mirror and list agree ({} rows)", mirror.len());
}
