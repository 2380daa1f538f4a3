//! Arena of circular sentinel rings.

use crate::QueueError;
use std::fmt;

/// Handle to a list sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeadId {
    index: u32,
    generation: u32,
}

impl fmt::Display for HeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Head({}v{})", self.index, self.generation)
    }
}

/// Handle to a content node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId {
    index: u32,
    generation: u32,
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link({}v{})", self.index, self.generation)
    }
}

/// A position a link can be inserted next to: a list head or another link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Head(HeadId),
    Link(LinkId),
}

impl From<HeadId> for Anchor {
    fn from(head: HeadId) -> Self {
        Anchor::Head(head)
    }
}

impl From<LinkId> for Anchor {
    fn from(link: LinkId) -> Self {
        Anchor::Link(link)
    }
}

#[derive(Debug)]
enum Node<T> {
    Head,
    Link(T),
    Free,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    suc: u32,
    pred: u32,
    node: Node<T>,
}

/// Arena holding any number of rings.
///
/// Heads and links are allocated from the same table. Released slots are
/// recycled with a bumped generation, so a stale id is detected instead of
/// silently aliasing a newer node.
#[derive(Debug)]
pub struct Ring<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Default for Ring<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Ring<T> {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Allocate a new, empty list.
    pub fn new_head(&mut self) -> HeadId {
        let (index, generation) = self.allocate(Node::Head);
        HeadId { index, generation }
    }

    /// Allocate a detached link carrying `item`.
    pub fn insert(&mut self, item: T) -> LinkId {
        let (index, generation) = self.allocate(Node::Link(item));
        LinkId { index, generation }
    }

    fn allocate(&mut self, node: Node<T>) -> (u32, u32) {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.suc = index;
                slot.pred = index;
                slot.node = node;
                (index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    suc: index,
                    pred: index,
                    node,
                });
                (index, 0)
            }
        }
    }

    fn link_index(&self, link: LinkId) -> Result<u32, QueueError> {
        match self.slots.get(link.index as usize) {
            Some(slot) if slot.generation == link.generation => match slot.node {
                Node::Link(_) => Ok(link.index),
                _ => Err(QueueError::UnknownLink(link)),
            },
            _ => Err(QueueError::UnknownLink(link)),
        }
    }

    fn head_index(&self, head: HeadId) -> Result<u32, QueueError> {
        match self.slots.get(head.index as usize) {
            Some(slot) if slot.generation == head.generation => match slot.node {
                Node::Head => Ok(head.index),
                _ => Err(QueueError::UnknownHead(head)),
            },
            _ => Err(QueueError::UnknownHead(head)),
        }
    }

    fn anchor_index(&self, anchor: Anchor) -> Result<u32, QueueError> {
        match anchor {
            Anchor::Head(head) => self.head_index(head),
            Anchor::Link(link) => self.link_index(link),
        }
    }

    fn as_link(&self, index: u32) -> Option<LinkId> {
        let slot = &self.slots[index as usize];
        match slot.node {
            Node::Link(_) => Some(LinkId {
                index,
                generation: slot.generation,
            }),
            _ => None,
        }
    }

    fn unlink(&mut self, index: u32) {
        let (suc, pred) = {
            let slot = &self.slots[index as usize];
            (slot.suc, slot.pred)
        };
        if suc == index {
            return;
        }
        self.slots[pred as usize].suc = suc;
        self.slots[suc as usize].pred = pred;
        let slot = &mut self.slots[index as usize];
        slot.suc = index;
        slot.pred = index;
    }

    fn splice_after(&mut self, index: u32, after: u32) {
        let next = self.slots[after as usize].suc;
        {
            let slot = &mut self.slots[index as usize];
            slot.pred = after;
            slot.suc = next;
        }
        self.slots[after as usize].suc = index;
        self.slots[next as usize].pred = index;
    }

    /// A link anchor that is itself detached has no list to join; moving
    /// next to it leaves the moved link detached.
    fn anchor_in_list(&self, anchor: Anchor, index: u32) -> bool {
        match anchor {
            Anchor::Head(_) => true,
            Anchor::Link(_) => self.slots[index as usize].suc != index,
        }
    }

    /// Detach `link` from its list (if any) and insert it right after `anchor`.
    pub fn follow(&mut self, link: LinkId, anchor: impl Into<Anchor>) -> Result<(), QueueError> {
        let anchor = anchor.into();
        let index = self.link_index(link)?;
        let after = self.anchor_index(anchor)?;
        self.unlink(index);
        if after != index && self.anchor_in_list(anchor, after) {
            self.splice_after(index, after);
        }
        Ok(())
    }

    /// Detach `link` from its list (if any) and insert it right before `anchor`.
    pub fn precede(&mut self, link: LinkId, anchor: impl Into<Anchor>) -> Result<(), QueueError> {
        let anchor = anchor.into();
        let index = self.link_index(link)?;
        let before = self.anchor_index(anchor)?;
        self.unlink(index);
        if before != index && self.anchor_in_list(anchor, before) {
            let after = self.slots[before as usize].pred;
            self.splice_after(index, after);
        }
        Ok(())
    }

    /// Append `link` at the end of `head`'s list.
    pub fn append(&mut self, link: LinkId, head: HeadId) -> Result<(), QueueError> {
        self.precede(link, head)
    }

    /// Detach `link` from its list. No-op if it is already detached.
    pub fn out(&mut self, link: LinkId) -> Result<(), QueueError> {
        let index = self.link_index(link)?;
        self.unlink(index);
        Ok(())
    }

    /// First content node of `head`'s list.
    pub fn first(&self, head: HeadId) -> Option<LinkId> {
        let index = self.head_index(head).ok()?;
        self.as_link(self.slots[index as usize].suc)
    }

    /// Last content node of `head`'s list.
    pub fn last(&self, head: HeadId) -> Option<LinkId> {
        let index = self.head_index(head).ok()?;
        self.as_link(self.slots[index as usize].pred)
    }

    /// Next content node, or `None` at the end of the list (or if detached).
    pub fn suc(&self, link: LinkId) -> Option<LinkId> {
        let index = self.link_index(link).ok()?;
        let suc = self.slots[index as usize].suc;
        if suc == index {
            return None;
        }
        self.as_link(suc)
    }

    /// Previous content node, or `None` at the start of the list (or if detached).
    pub fn pred(&self, link: LinkId) -> Option<LinkId> {
        let index = self.link_index(link).ok()?;
        let pred = self.slots[index as usize].pred;
        if pred == index {
            return None;
        }
        self.as_link(pred)
    }

    /// True iff the head's successor is the head itself.
    ///
    /// An unknown head is reported as empty.
    pub fn is_empty(&self, head: HeadId) -> bool {
        match self.head_index(head) {
            Ok(index) => self.slots[index as usize].suc == index,
            Err(_) => true,
        }
    }

    /// Number of links in `head`'s list. O(n).
    pub fn cardinal(&self, head: HeadId) -> usize {
        self.iter(head).count()
    }

    /// Whether `link` is currently a member of some list.
    pub fn is_linked(&self, link: LinkId) -> bool {
        match self.link_index(link) {
            Ok(index) => self.slots[index as usize].suc != index,
            Err(_) => false,
        }
    }

    /// Detach every link of `head`'s list.
    pub fn clear(&mut self, head: HeadId) -> Result<(), QueueError> {
        let index = self.head_index(head)?;
        loop {
            let suc = self.slots[index as usize].suc;
            if suc == index {
                return Ok(());
            }
            self.unlink(suc);
        }
    }

    /// Payload of a link.
    pub fn get(&self, link: LinkId) -> Option<&T> {
        let index = self.link_index(link).ok()?;
        match &self.slots[index as usize].node {
            Node::Link(item) => Some(item),
            _ => None,
        }
    }

    /// Mutable payload of a link.
    pub fn get_mut(&mut self, link: LinkId) -> Option<&mut T> {
        let index = self.link_index(link).ok()?;
        match &mut self.slots[index as usize].node {
            Node::Link(item) => Some(item),
            _ => None,
        }
    }

    /// Detach and destroy a link, returning its payload.
    pub fn release(&mut self, link: LinkId) -> Result<T, QueueError> {
        let index = self.link_index(link)?;
        self.unlink(index);
        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        let node = std::mem::replace(&mut slot.node, Node::Free);
        self.free.push(index);
        match node {
            Node::Link(item) => Ok(item),
            _ => unreachable!("link_index only accepts link slots"),
        }
    }

    /// Detach all members of a list and destroy its head.
    pub fn release_head(&mut self, head: HeadId) -> Result<(), QueueError> {
        self.clear(head)?;
        let slot = &mut self.slots[head.index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        slot.node = Node::Free;
        self.free.push(head.index);
        Ok(())
    }

    /// Iterate the list in order, from first to last.
    pub fn iter(&self, head: HeadId) -> Iter<'_, T> {
        let (head_index, next) = match self.head_index(head) {
            Ok(index) => (index, self.slots[index as usize].suc),
            Err(_) => (head.index, head.index),
        };
        Iter {
            ring: self,
            head: head_index,
            next,
        }
    }
}

/// In-order iterator over a list.
pub struct Iter<'a, T> {
    ring: &'a Ring<T>,
    head: u32,
    next: u32,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (LinkId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == self.head {
            return None;
        }
        let index = self.next;
        let slot = &self.ring.slots[index as usize];
        self.next = slot.suc;
        match &slot.node {
            Node::Link(item) => Some((
                LinkId {
                    index,
                    generation: slot.generation,
                },
                item,
            )),
            _ => None,
        }
    }
}
