//! Index-linked doubly linked list with a sentinel.
//!
//! Entries live in a fixed slab supplied at construction (an array or a slice
//! allocated once). Links are slab indices rather than pointers, so a
//! [`NodeId`] is the "node pointer" of a classic intrusive list and
//! [`IndexList::get`] is the container lookup from it. Vacant slots are
//! chained on an internal free list; nothing is allocated after construction.

use core::fmt;

use crate::eds_assert;

const NIL: u16 = u16::MAX;

/// Position of an entry inside an [`IndexList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u16);

impl NodeId {
    pub const fn new(index: u16) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

/// One slab slot. Build storage from [`Node::VACANT`].
pub struct Node<T> {
    prev: u16,
    next: u16,
    entry: Option<T>,
}

impl<T> Node<T> {
    pub const VACANT: Self = Self {
        prev: NIL,
        next: NIL,
        entry: None,
    };
}

pub struct IndexList<T, S> {
    nodes: S,
    // sentinel links: first and last linked node
    first: u16,
    last: u16,
    free: u16,
    len: usize,
    _entry: core::marker::PhantomData<T>,
}

impl<T, S> IndexList<T, S>
where
    S: AsRef<[Node<T>]> + AsMut<[Node<T>]>,
{
    /// Wraps vacant `nodes` as an empty list.
    pub fn new(mut nodes: S) -> Self {
        let slab = nodes.as_mut();
        eds_assert!(slab.len() < NIL as usize, "list", "index list slab too large");
        // nodes past the addressable range never join the free list
        let count = slab.len().min(NIL as usize);
        for (index, node) in slab.iter_mut().enumerate() {
            node.entry = None;
            node.prev = NIL;
            node.next = if index + 1 < count { (index + 1) as u16 } else { NIL };
        }
        Self {
            nodes,
            first: NIL,
            last: NIL,
            free: if count == 0 { NIL } else { 0 },
            len: 0,
            _entry: core::marker::PhantomData,
        }
    }

    pub fn capacity(&self) -> usize {
        self.nodes.as_ref().len().min(NIL as usize)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.first == NIL
    }

    pub fn is_full(&self) -> bool {
        self.free == NIL
    }

    pub fn head(&self) -> Option<NodeId> {
        Self::wrap(self.first)
    }

    pub fn tail(&self) -> Option<NodeId> {
        Self::wrap(self.last)
    }

    pub fn next(&self, node: NodeId) -> Option<NodeId> {
        self.linked(node).and_then(|n| Self::wrap(n.next))
    }

    pub fn prev(&self, node: NodeId) -> Option<NodeId> {
        self.linked(node).and_then(|n| Self::wrap(n.prev))
    }

    /// Entry embedded at `node`
    pub fn get(&self, node: NodeId) -> Option<&T> {
        self.linked(node).and_then(|n| n.entry.as_ref())
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut T> {
        self.nodes
            .as_mut()
            .get_mut(node.index())
            .and_then(|n| n.entry.as_mut())
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.linked(node).is_some()
    }

    pub fn add_head(&mut self, entry: T) -> Result<NodeId, T> {
        let first = self.first;
        self.link(entry, NIL, first)
    }

    pub fn add_tail(&mut self, entry: T) -> Result<NodeId, T> {
        let last = self.last;
        self.link(entry, last, NIL)
    }

    /// Links `entry` right after `node`. `node` must be linked.
    pub fn add_after(&mut self, node: NodeId, entry: T) -> Result<NodeId, T> {
        let next = match self.linked(node) {
            Some(n) => n.next,
            None => return Err(entry),
        };
        self.link(entry, node.0, next)
    }

    /// Links `entry` right before `node`. `node` must be linked.
    pub fn add_before(&mut self, node: NodeId, entry: T) -> Result<NodeId, T> {
        let prev = match self.linked(node) {
            Some(n) => n.prev,
            None => return Err(entry),
        };
        self.link(entry, prev, node.0)
    }

    /// Unlinks `node` and hands back its entry.
    pub fn remove(&mut self, node: NodeId) -> Option<T> {
        let (prev, next) = {
            let n = self.linked(node)?;
            (n.prev, n.next)
        };
        self.set_next(prev, next);
        self.set_prev(next, prev);

        let free = self.free;
        let slot = &mut self.nodes.as_mut()[node.index()];
        let entry = slot.entry.take();
        slot.prev = NIL;
        slot.next = free;
        self.free = node.0;
        self.len -= 1;
        entry
    }

    /// Linked entries, head first
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            nodes: self.nodes.as_ref(),
            cursor: self.first,
        }
    }

    fn link(&mut self, entry: T, prev: u16, next: u16) -> Result<NodeId, T> {
        let index = self.free;
        if index == NIL {
            return Err(entry);
        }
        let slot = &mut self.nodes.as_mut()[index as usize];
        self.free = slot.next;
        slot.prev = prev;
        slot.next = next;
        slot.entry = Some(entry);

        self.set_next(prev, index);
        self.set_prev(next, index);
        self.len += 1;
        Ok(NodeId(index))
    }

    // NIL on either side addresses the sentinel
    fn set_next(&mut self, at: u16, to: u16) {
        if at == NIL {
            self.first = to;
        } else {
            self.nodes.as_mut()[at as usize].next = to;
        }
    }

    fn set_prev(&mut self, at: u16, to: u16) {
        if at == NIL {
            self.last = to;
        } else {
            self.nodes.as_mut()[at as usize].prev = to;
        }
    }

    fn linked(&self, node: NodeId) -> Option<&Node<T>> {
        self.nodes
            .as_ref()
            .get(node.index())
            .filter(|n| n.entry.is_some())
    }

    fn wrap(index: u16) -> Option<NodeId> {
        (index != NIL).then_some(NodeId(index))
    }
}

pub struct Iter<'a, T> {
    nodes: &'a [Node<T>],
    cursor: u16,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (NodeId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let index = self.cursor;
        let node = &self.nodes[index as usize];
        self.cursor = node.next;
        node.entry.as_ref().map(|entry| (NodeId(index), entry))
    }
}
