//! Nested list reconstruction.
//!
//! List lines are recognized one at a time and carry only an
//! indentation-derived level. [`nest_items`] turns that flat run back
//! into nested list events in one linear pass over a stack of open
//! levels.

use smallvec::SmallVec;

use super::event::{BlockEvent, ListKind};
use crate::Range;

/// One list line: its nesting level, marker family and inline content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListItemRecord {
    /// Nesting level (2 columns of indentation per level).
    pub level: usize,
    /// Marker family; ordered items carry their number.
    pub kind: ListKind,
    /// Inline content after the marker.
    pub content: Range,
}

/// An open list on the nesting stack.
#[derive(Debug, Clone, Copy)]
struct OpenList {
    level: usize,
    kind: ListKind,
}

/// Emit list events for a contiguous run of list items.
///
/// For each item, open lists deeper than the item are closed; an open
/// list at the item's level receives it as a sibling (or is closed and
/// replaced when the marker family changes); otherwise a new list is
/// opened inside the current item. Everything still open is closed at
/// the end of the run.
pub fn nest_items(items: &[ListItemRecord], events: &mut Vec<BlockEvent>) {
    let mut stack: SmallVec<[OpenList; 8]> = SmallVec::new();

    for item in items {
        while let Some(top) = stack.last().copied() {
            if top.level <= item.level {
                break;
            }
            events.push(BlockEvent::ListItemEnd);
            events.push(BlockEvent::ListEnd { kind: top.kind });
            stack.pop();
        }

        match stack.last().copied() {
            Some(top) if top.level == item.level => {
                events.push(BlockEvent::ListItemEnd);
                if !top.kind.same_family(item.kind) {
                    events.push(BlockEvent::ListEnd { kind: top.kind });
                    stack.pop();
                    open_list(&mut stack, item, events);
                }
            }
            _ => open_list(&mut stack, item, events),
        }

        events.push(BlockEvent::ListItemStart);
        if !item.content.is_empty() {
            events.push(BlockEvent::Text(item.content));
        }
    }

    while let Some(top) = stack.pop() {
        events.push(BlockEvent::ListItemEnd);
        events.push(BlockEvent::ListEnd { kind: top.kind });
    }
}

#[inline]
fn open_list(stack: &mut SmallVec<[OpenList; 8]>, item: &ListItemRecord, events: &mut Vec<BlockEvent>) {
    stack.push(OpenList {
        level: item.level,
        kind: item.kind,
    });
    events.push(BlockEvent::ListStart { kind: item.kind });
}
