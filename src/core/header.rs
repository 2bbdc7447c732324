//! Intrusive allocation headers.
//!
//! Every tracked block is allocated as one contiguous `(header, payload)`
//! region. The header lives directly before the payload, so it can be
//! recovered from a bare user pointer with a constant-offset subtraction
//! and no side table. Headers double as nodes of their owning domain's
//! doubly-linked list; they are never allocated on their own and live
//! exactly as long as their payload.
//!
//! The layout is a hard contract: every consumer bakes `HEADER_SIZE` /
//! `SUB_HEADER_SIZE` into pointer arithmetic as compile-time constants.
//! A mismatch between the declared size and the real layout would silently
//! corrupt adjacent memory, so the contract is enforced by `const`
//! assertions below rather than any runtime check.

use std::io::{self, Write};
use std::mem;

use crate::core::domain::Domain;

/// Byte size of a plain [`Header`]: 16 bytes on 32-bit targets, 32 on 64-bit.
#[cfg(feature = "tracking")]
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

/// Byte size of a [`SubHeader`]: always twice [`HEADER_SIZE`].
#[cfg(feature = "tracking")]
pub const SUB_HEADER_SIZE: usize = mem::size_of::<SubHeader>();

/// With tracking disabled no metadata is placed before payloads.
#[cfg(not(feature = "tracking"))]
pub const HEADER_SIZE: usize = 0;

/// With tracking disabled no metadata is placed before payloads.
#[cfg(not(feature = "tracking"))]
pub const SUB_HEADER_SIZE: usize = 0;

/// Tag value for a plain header placed by the allocator adaptor.
pub(crate) const TAG_PLAIN: usize = 0;

/// Tag value for an extended header placed by the global hook.
pub(crate) const TAG_TRACKED: usize = 1;

// Layout contract. Four words per header, no padding, word alignment.
const _: () = assert!(mem::size_of::<Header>() == 4 * mem::size_of::<usize>());
const _: () = assert!(mem::size_of::<SubHeader>() == 2 * mem::size_of::<Header>());
const _: () = assert!(mem::align_of::<Header>() == mem::align_of::<usize>());
const _: () = assert!(mem::align_of::<SubHeader>() == mem::align_of::<usize>());

#[cfg(target_pointer_width = "32")]
const _: () = assert!(mem::size_of::<Header>() == 16);

#[cfg(target_pointer_width = "64")]
const _: () = assert!(mem::size_of::<Header>() == 32);

/// Fixed-layout metadata record embedded directly before a tracked payload.
///
/// `tag` distinguishes a plain `Header` from a `SubHeader` without any
/// dynamic type inspection; it also keeps the struct at a whole number of
/// words on both target widths.
#[repr(C)]
pub(crate) struct Header {
    prev: *mut Header,
    next: *mut Header,
    size: usize,
    tag: usize,
}

impl Header {
    pub(crate) fn new(size: usize, tag: usize) -> Self {
        Self {
            prev: std::ptr::null_mut(),
            next: std::ptr::null_mut(),
            size,
            tag,
        }
    }

    /// Payload byte count.
    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub(crate) fn next(&self) -> *mut Header {
        self.next
    }

    /// Append `node` after this header.
    ///
    /// # Safety
    ///
    /// `self` must be the current tail of its list and `node` must be an
    /// unlinked header.
    pub(crate) unsafe fn add(&mut self, node: *mut Header) {
        self.next = node;
        (*node).prev = self;
    }

    /// Unlink an interior node, fixing both neighbor pointers.
    ///
    /// # Safety
    ///
    /// The node must be linked with non-null `prev` and `next`.
    pub(crate) unsafe fn remove(&mut self) {
        (*self.prev).next = self.next;
        (*self.next).prev = self.prev;
    }

    /// Unlink the first node of a list, returning the new begin.
    ///
    /// # Safety
    ///
    /// The node must be the current list begin.
    pub(crate) unsafe fn remove_begin(&mut self) -> *mut Header {
        let next = self.next;
        if !next.is_null() {
            (*next).prev = std::ptr::null_mut();
        }
        next
    }

    /// Unlink the last node of a list, returning the new end.
    ///
    /// # Safety
    ///
    /// The node must be the current list end.
    pub(crate) unsafe fn remove_end(&mut self) -> *mut Header {
        let prev = self.prev;
        if !prev.is_null() {
            (*prev).next = std::ptr::null_mut();
        }
        prev
    }

    /// Emit one diagnostic line for this node.
    ///
    /// # Safety
    ///
    /// If the tag marks this header as tracked it must actually be the
    /// leading field of a [`SubHeader`].
    pub(crate) unsafe fn print(&self, out: &mut dyn Write, indent: usize) -> io::Result<()> {
        let pad = indent * 2;
        if self.tag == TAG_TRACKED {
            let sub = self as *const Header as *const SubHeader;
            writeln!(
                out,
                "{:pad$}- {} bytes ({}:{})",
                "",
                self.size,
                (*sub).file,
                (*sub).line,
                pad = pad
            )
        } else {
            writeln!(out, "{:pad$}- {} bytes", "", self.size, pad = pad)
        }
    }
}

/// Extended header placed by the global hook.
///
/// Carries allocation provenance and a pointer to the owning domain so a
/// free routine that receives only a bare payload pointer can still charge
/// the right ledger. A null `domain` marks a block allocated while
/// accounting was suspended; its free skips ledger mutation entirely.
#[repr(C)]
pub(crate) struct SubHeader {
    header: Header,
    file: &'static str,
    line: usize,
    domain: *const Domain,
}

impl SubHeader {
    pub(crate) fn new(size: usize, file: &'static str, line: usize, domain: *const Domain) -> Self {
        Self {
            header: Header::new(size, TAG_TRACKED),
            file,
            line,
            domain,
        }
    }

    #[inline]
    pub(crate) fn domain(&self) -> *const Domain {
        self.domain
    }
}

/// Boundary pointers of one domain's intrusive header list.
///
/// Invariant: `begin`/`end` are null iff the list is empty, and the chain
/// between them is always consistent. Mutation happens only under the
/// owning domain's lock.
pub(crate) struct HeaderList {
    begin: *mut Header,
    end: *mut Header,
}

impl HeaderList {
    pub(crate) const fn new() -> Self {
        Self {
            begin: std::ptr::null_mut(),
            end: std::ptr::null_mut(),
        }
    }

    #[inline]
    pub(crate) fn begin(&self) -> *mut Header {
        self.begin
    }

    /// Append a node at the tail in O(1).
    ///
    /// # Safety
    ///
    /// `node` must point to a live, unlinked header.
    pub(crate) unsafe fn push_back(&mut self, node: *mut Header) {
        if self.end.is_null() {
            self.begin = node;
            self.end = node;
        } else {
            (*self.end).add(node);
            self.end = node;
        }
    }

    /// Unlink a node in O(1), updating the boundary pointers as needed.
    ///
    /// # Safety
    ///
    /// `node` must be a member of this list.
    pub(crate) unsafe fn unlink(&mut self, node: *mut Header) {
        let at_begin = node == self.begin;
        let at_end = node == self.end;

        if at_begin && at_end {
            self.begin = std::ptr::null_mut();
            self.end = std::ptr::null_mut();
        } else if at_begin {
            self.begin = (*node).remove_begin();
        } else if at_end {
            self.end = (*node).remove_end();
        } else {
            (*node).remove();
        }
    }
}
