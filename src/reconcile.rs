//! Incremental repair of a [`Permutation`] when the file count changes.
//!
//! Changes are inferred positionally: when the count shrinks from `W` to `C`
//! the indices `C..W` are treated as removed, and when it grows the indices
//! `W..C` are treated as new. This relies on the lister producing a stable
//! order for an unchanged tree.

use tracing::debug;

use crate::permutation::{Permutation, PositionPicker};

/// Summary of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub previous_len: usize,
    pub current_len: usize,
    pub cursor_before: usize,
    pub cursor_after: usize,
    /// Slot each new index landed in, in insertion order.
    pub inserted_at: Vec<usize>,
    /// Slot each dropped index was taken from, in removal order.
    pub removed_from: Vec<usize>,
}

impl Reconciliation {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.previous_len != self.current_len
    }
}

/// Resize `order` to `new_len` entries, keeping the cursor on the same
/// logical next item.
///
/// New indices go to uniformly random slots in `0..=size` (size before the
/// insertion). The cursor is finally wrapped into `0..new_len`, or set to 0
/// when the set is empty.
pub fn reconcile(
    order: &mut Permutation,
    new_len: usize,
    picker: &mut impl PositionPicker,
) -> Reconciliation {
    let previous_len = order.size();
    let cursor_before = order.cursor();
    let mut cursor = cursor_before;
    let mut report = Reconciliation {
        previous_len,
        current_len: new_len,
        cursor_before,
        ..Reconciliation::default()
    };

    if previous_len > new_len {
        for index in new_len..previous_len {
            let Some(position) = order.position_of(index) else {
                continue;
            };
            if position < cursor {
                cursor -= 1;
            }
            order.remove_at(position);
            report.removed_from.push(position);
        }
    } else if new_len > previous_len {
        for index in previous_len..new_len {
            let position = picker.pick(order.size());
            if position <= cursor {
                cursor += 1;
            }
            order.insert_at(position, index);
            report.inserted_at.push(position);
        }
    }

    let cursor = if new_len == 0 { 0 } else { cursor % new_len };
    order.set_cursor(cursor);
    report.cursor_after = cursor;

    debug!(
        previous = previous_len,
        current = new_len,
        cursor_before,
        cursor_after = cursor,
        "reconciled permutation"
    );
    report
}
