//! Sibling ordering.
//!
//! Groups within a template and sections within a group each carry an integer
//! `position`. These routines keep the positions of one sibling list dense
//! (`0..N-1`, no gaps, no duplicates) and the list itself sorted by position,
//! after every insert, move or delete. Callers need `&mut` on the sibling
//! list, so mutations of one parent's children are serialised by the borrow
//! checker; the store adds a file lock for mutations across processes.

use log::debug;

use crate::error::{Error, Result};
use crate::template::{Section, SectionGroup};

/// Something that lives at an integer position among its siblings.
pub trait Positioned {
    fn id(&self) -> u64;
    fn position(&self) -> u32;
    fn set_position(&mut self, position: u32);
}

impl Positioned for SectionGroup {
    fn id(&self) -> u64 {
        self.id
    }
    fn position(&self) -> u32 {
        self.position
    }
    fn set_position(&mut self, position: u32) {
        self.position = position;
    }
}

impl Positioned for Section {
    fn id(&self) -> u64 {
        self.id
    }
    fn position(&self) -> u32 {
        self.position
    }
    fn set_position(&mut self, position: u32) {
        self.position = position;
    }
}

/// Set every item's position to its index.
pub fn renumber<T: Positioned>(items: &mut [T]) {
    for (index, item) in items.iter_mut().enumerate() {
        item.set_position(index as u32);
    }
}

/// Sort by stored position, keeping the current order for ties.
pub fn sort_by_position<T: Positioned>(items: &mut [T]) {
    items.sort_by_key(|item| item.position());
}

/// Insert `item` at `position` (clamped to the end), shifting later siblings up.
/// Returns the position the item landed at.
pub fn insert_at<T: Positioned>(items: &mut Vec<T>, mut item: T, position: u32) -> u32 {
    let index = (position as usize).min(items.len());
    item.set_position(index as u32);
    items.insert(index, item);
    renumber(items);
    index as u32
}

/// Append `item` after its last sibling.
pub fn push<T: Positioned>(items: &mut Vec<T>, item: T) -> u32 {
    let end = items.len() as u32;
    insert_at(items, item, end)
}

/// Remove the item with `id`, shifting later siblings down.
pub fn remove<T: Positioned>(items: &mut Vec<T>, id: u64) -> Option<T> {
    let index = items.iter().position(|item| item.id() == id)?;
    let removed = items.remove(index);
    renumber(items);
    debug!("removed {} from position {}, {} siblings remain", id, index, items.len());
    Some(removed)
}

/// Move the item with `id` to `position` (clamped to the last slot).
/// Returns the new position, or `None` if no sibling has that id.
pub fn move_to<T: Positioned>(items: &mut Vec<T>, id: u64, position: u32) -> Option<u32> {
    let from = items.iter().position(|item| item.id() == id)?;
    let item = items.remove(from);
    let to = (position as usize).min(items.len());
    items.insert(to, item);
    renumber(items);
    debug!("moved {} from position {} to {}", id, from, to);
    Some(to as u32)
}

/// Swap the item with its previous sibling. Returns false at the top.
pub fn move_up<T: Positioned>(items: &mut Vec<T>, id: u64) -> bool {
    match items.iter().position(|item| item.id() == id) {
        Some(index) if index > 0 => {
            move_to(items, id, index as u32 - 1);
            true
        }
        _ => false,
    }
}

/// Swap the item with its next sibling. Returns false at the bottom.
pub fn move_down<T: Positioned>(items: &mut Vec<T>, id: u64) -> bool {
    match items.iter().position(|item| item.id() == id) {
        Some(index) if index + 1 < items.len() => {
            move_to(items, id, index as u32 + 1);
            true
        }
        _ => false,
    }
}

/// Fail unless positions are exactly `0..N-1` in list order.
pub fn validate<T: Positioned>(items: &[T], scope: &str) -> Result<()> {
    let dense = items
        .iter()
        .enumerate()
        .all(|(index, item)| item.position() as usize == index);
    if dense {
        Ok(())
    } else {
        Err(Error::OrderingCorrupt {
            scope: scope.to_string(),
            len: items.len(),
            found: items.iter().map(Positioned::position).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u64,
        position: u32,
    }

    impl Positioned for Item {
        fn id(&self) -> u64 {
            self.id
        }
        fn position(&self) -> u32 {
            self.position
        }
        fn set_position(&mut self, position: u32) {
            self.position = position;
        }
    }

    fn items(n: u64) -> Vec<Item> {
        (0..n).map(|i| Item { id: i + 100, position: i as u32 }).collect()
    }

    fn positions(items: &[Item]) -> Vec<u32> {
        items.iter().map(|i| i.position).collect()
    }

    fn ids(items: &[Item]) -> Vec<u64> {
        items.iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_insert_shifts_later_siblings() {
        let mut list = items(3);
        let at = insert_at(&mut list, Item { id: 1, position: 99 }, 1);
        assert_eq!(at, 1);
        assert_eq!(ids(&list), vec![100, 1, 101, 102]);
        assert_eq!(positions(&list), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_insert_past_end_is_clamped() {
        let mut list = items(2);
        assert_eq!(insert_at(&mut list, Item { id: 1, position: 0 }, 40), 2);
        assert_eq!(push(&mut list, Item { id: 2, position: 0 }), 3);
        assert_eq!(ids(&list), vec![100, 101, 1, 2]);
        assert!(validate(&list, "test").is_ok());
    }

    #[test]
    fn test_remove_shifts_down() {
        let mut list = items(4);
        let removed = remove(&mut list, 101).unwrap();
        assert_eq!(removed.id, 101);
        assert_eq!(ids(&list), vec![100, 102, 103]);
        assert_eq!(positions(&list), vec![0, 1, 2]);
        assert!(remove(&mut list, 7).is_none());
    }

    #[test]
    fn test_remove_only_item_leaves_empty_list() {
        let mut list = items(1);
        remove(&mut list, 100).unwrap();
        assert!(list.is_empty());
        assert!(validate(&list, "test").is_ok());
    }

    #[test]
    fn test_move_to_front_is_dense_for_all_sizes() {
        for k in 1..=12u64 {
            for from in 0..k {
                let mut list = items(k);
                assert_eq!(move_to(&mut list, 100 + from, 0), Some(0));
                assert_eq!(list[0].id, 100 + from);
                assert_eq!(positions(&list), (0..k as u32).collect::<Vec<_>>());
                assert!(validate(&list, "test").is_ok());
            }
        }
    }

    #[test]
    fn test_move_to_end_and_back() {
        let mut list = items(3);
        assert_eq!(move_to(&mut list, 100, 10), Some(2));
        assert_eq!(ids(&list), vec![101, 102, 100]);
        assert_eq!(move_to(&mut list, 100, 1), Some(1));
        assert_eq!(ids(&list), vec![101, 100, 102]);
        assert_eq!(move_to(&mut list, 5, 0), None);
    }

    #[test]
    fn test_move_up_and_down() {
        let mut list = items(3);
        assert!(!move_up(&mut list, 100));
        assert!(move_down(&mut list, 100));
        assert_eq!(ids(&list), vec![101, 100, 102]);
        assert!(move_up(&mut list, 102));
        assert_eq!(ids(&list), vec![101, 102, 100]);
        assert!(!move_down(&mut list, 100));
        assert_eq!(positions(&list), vec![0, 1, 2]);
    }

    #[test]
    fn test_validate_reports_gaps_and_duplicates() {
        let gapped = vec![Item { id: 1, position: 0 }, Item { id: 2, position: 2 }];
        let err = validate(&gapped, "group 1").unwrap_err();
        assert!(matches!(err, Error::OrderingCorrupt { ref found, len: 2, .. } if found == &vec![0, 2]));

        let duplicated = vec![Item { id: 1, position: 0 }, Item { id: 2, position: 0 }];
        assert!(validate(&duplicated, "group 1").is_err());
    }

    #[test]
    fn test_sort_by_position_restores_list_order() {
        let mut list = vec![
            Item { id: 1, position: 2 },
            Item { id: 2, position: 0 },
            Item { id: 3, position: 1 },
        ];
        sort_by_position(&mut list);
        assert_eq!(ids(&list), vec![2, 3, 1]);
        assert!(validate(&list, "test").is_ok());
    }
}
