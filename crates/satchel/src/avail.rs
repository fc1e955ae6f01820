//! The available list: blocks with free capacity.
//!
//! A doubly-linked list threaded through the writer's block table by block
//! ordinal. Only the writer reads or mutates it, so the links are plain
//! integers with no synchronization. The front of the list is the next
//! insertion target.

/// Per-block list membership.
#[derive(Clone, Copy, Debug, Default)]
struct Links {
    prev: Option<usize>,
    next: Option<usize>,
    linked: bool,
}

/// Doubly-linked list of block ordinals with O(1) push and unlink.
#[derive(Debug, Default)]
pub(crate) struct AvailableList {
    links: Vec<Links>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl AvailableList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Make room for the next block ordinal. Returns the ordinal.
    pub(crate) fn register(&mut self) -> usize {
        self.links.push(Links::default());
        self.links.len() - 1
    }

    /// The next insertion target.
    pub(crate) fn head(&self) -> Option<usize> {
        self.head
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn contains(&self, block: usize) -> bool {
        self.links.get(block).is_some_and(|l| l.linked)
    }

    /// Link `block` at the front. No-op if it is already a member.
    pub(crate) fn push_front(&mut self, block: usize) {
        assert!(block < self.links.len(), "block {block} is not registered");
        if self.links[block].linked {
            return;
        }
        let old_head = self.head;
        self.links[block] = Links {
            prev: None,
            next: old_head,
            linked: true,
        };
        match old_head {
            Some(h) => self.links[h].prev = Some(block),
            None => self.tail = Some(block),
        }
        self.head = Some(block);
        self.len += 1;
        self.debug_check_ends();
    }

    /// Unlink `block`. No-op if it is not a member.
    pub(crate) fn unlink(&mut self, block: usize) {
        let Some(&Links { prev, next, linked }) = self.links.get(block) else {
            return;
        };
        if !linked {
            return;
        }
        match prev {
            Some(p) => self.links[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.links[n].prev = prev,
            None => self.tail = prev,
        }
        self.links[block] = Links::default();
        self.len -= 1;
        self.debug_check_ends();
    }

    /// Both ends are set exactly when the list is non-empty, and they have
    /// no outer neighbours.
    fn debug_check_ends(&self) {
        debug_assert_eq!(self.head.is_none(), self.len == 0);
        debug_assert_eq!(self.tail.is_none(), self.len == 0);
        debug_assert!(self.head.is_none_or(|h| self.links[h].prev.is_none()));
        debug_assert!(self.tail.is_none_or(|t| self.links[t].next.is_none()));
    }

    /// Members from front to back.
    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.head, move |&b| self.links[b].next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_with(n: usize) -> AvailableList {
        let mut list = AvailableList::new();
        for _ in 0..n {
            list.register();
        }
        list
    }

    #[test]
    fn empty_list() {
        let list = list_with(3);
        assert_eq!(list.head(), None);
        assert_eq!(list.len(), 0);
        assert!(!list.contains(0));
        assert_eq!(list.iter().count(), 0);
    }

    #[test]
    fn push_front_orders_newest_first() {
        let mut list = list_with(3);
        list.push_front(0);
        list.push_front(1);
        list.push_front(2);
        assert_eq!(list.head(), Some(2));
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![2, 1, 0]);
        assert_eq!(list.tail, Some(0));
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn unlink_head_middle_and_tail() {
        let mut list = list_with(4);
        for b in 0..4 {
            list.push_front(b);
        }
        // 3, 2, 1, 0
        list.unlink(2);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![3, 1, 0]);
        list.unlink(3);
        assert_eq!(list.head(), Some(1));
        list.unlink(0);
        assert_eq!(list.tail, Some(1));
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![1]);
        list.unlink(1);
        assert_eq!(list.head(), None);
        assert_eq!(list.tail, None);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn double_push_and_double_unlink_are_idempotent() {
        let mut list = list_with(2);
        list.push_front(1);
        list.push_front(1);
        assert_eq!(list.len(), 1);
        list.unlink(1);
        list.unlink(1);
        list.unlink(7);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn relink_after_unlink() {
        let mut list = list_with(2);
        list.push_front(0);
        list.push_front(1);
        list.unlink(0);
        list.push_front(0);
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![0, 1]);
        assert!(list.contains(0));
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn unregistered_block_panics() {
        let mut list = list_with(1);
        list.push_front(5);
    }
}
