//! Domain ledgers.
//!
//! A domain is a named ledger for one logical category of the program:
//! it owns an intrusive list of the headers of its live allocations plus
//! a live count and byte total. Domains are `const`-constructible so they
//! can live in plain `static`s; tree edges are wired once at startup (or
//! on first registration) and never removed. Each domain carries its own
//! lock, so operations on distinct domains proceed fully in parallel.
//!
//! An allocation is charged to exactly one domain for its entire
//! lifetime; nothing here ever moves a block between ledgers.

use std::io::{self, Write};

#[cfg(feature = "tracking")]
use std::sync::OnceLock;

#[cfg(feature = "tracking")]
use crate::core::header::{Header, HeaderList, SubHeader, TAG_PLAIN};
#[cfg(feature = "tracking")]
use crate::core::registry;
#[cfg(feature = "tracking")]
use crate::core::suspend;
#[cfg(feature = "tracking")]
use crate::sync::Mutex;
#[cfg(feature = "tracking")]
use crate::util::size::format_bytes;

/// Live totals plus the boundary pointers of the header list.
///
/// Mutated only while the owning domain's lock is held, so list links and
/// counters always change atomically with respect to other mutators.
#[cfg(feature = "tracking")]
struct Ledger {
    count: usize,
    bytes: usize,
    list: HeaderList,
}

// SAFETY: the raw header pointers in the list are only dereferenced under
// the domain's mutex, and each header is owned by exactly one live
// allocation.
#[cfg(feature = "tracking")]
unsafe impl Send for Ledger {}

/// A named allocation ledger positioned in the domain tree.
///
/// ```rust
/// use domainalloc::Domain;
///
/// static PHYSICS: Domain = Domain::new("physics");
/// ```
#[cfg(feature = "tracking")]
pub struct Domain {
    name: &'static str,
    ledger: Mutex<Ledger>,
    parent: OnceLock<&'static Domain>,
    children: Mutex<Vec<&'static Domain>>,
    registered: std::sync::Once,
}

#[cfg(feature = "tracking")]
impl Domain {
    /// Create a new domain ledger.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            ledger: Mutex::new(Ledger {
                count: 0,
                bytes: 0,
                list: HeaderList::new(),
            }),
            parent: OnceLock::new(),
            children: Mutex::new(Vec::new()),
            registered: std::sync::Once::new(),
        }
    }

    /// Get the domain name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wire this domain into the tree as a child of `parent`.
    ///
    /// The edge is set exactly once; concurrent and repeated calls are
    /// safe and all but the first are ignored. Registration only affects
    /// reporting - accounting works on unregistered domains too.
    pub fn register(&'static self, parent: &'static Domain) {
        self.registered.call_once(|| {
            let _ = self.parent.set(parent);
            parent.children.lock().push(self);
            registry::record(self);

            #[cfg(feature = "log")]
            log::debug!("registered domain '{}' under '{}'", self.name, parent.name);
        });
    }

    /// Get the parent domain, if this domain has been registered.
    pub fn parent(&self) -> Option<&'static Domain> {
        self.parent.get().copied()
    }

    /// Construct and link a plain header for a block owned by this domain.
    ///
    /// # Safety
    ///
    /// `internal` must point to the start of a live raw block with at
    /// least [`HEADER_SIZE`] writable bytes, correctly aligned for a
    /// header, and must not already be linked anywhere.
    ///
    /// [`HEADER_SIZE`]: crate::core::header::HEADER_SIZE
    pub(crate) unsafe fn add(&self, internal: *mut u8, size: usize) {
        let header = internal as *mut Header;
        header.write(Header::new(size, TAG_PLAIN));

        let mut ledger = self.ledger.lock();
        ledger.list.push_back(header);
        ledger.count += 1;
        ledger.bytes += size;
    }

    /// Construct and link an extended header carrying provenance and an
    /// owning-domain pointer (global hook path).
    ///
    /// # Safety
    ///
    /// Same as [`add`], but with [`SUB_HEADER_SIZE`] writable bytes.
    ///
    /// [`add`]: Domain::add
    /// [`SUB_HEADER_SIZE`]: crate::core::header::SUB_HEADER_SIZE
    pub(crate) unsafe fn add_tracked(
        &'static self,
        internal: *mut u8,
        size: usize,
        file: &'static str,
        line: usize,
    ) {
        let sub = internal as *mut SubHeader;
        sub.write(SubHeader::new(size, file, line, self));

        let mut ledger = self.ledger.lock();
        ledger.list.push_back(sub as *mut Header);
        ledger.count += 1;
        ledger.bytes += size;
    }

    /// Unlink the header at `internal` and decrement the totals.
    ///
    /// This is also the dispatch target when a free routine recovered
    /// this domain from a stored header pointer rather than from static
    /// knowledge of the owner.
    ///
    /// # Safety
    ///
    /// `internal` must point to a header previously linked into this
    /// domain and not yet removed. Passing anything else is undefined
    /// behavior - by design there is no runtime validation on this path.
    pub(crate) unsafe fn remove(&self, internal: *mut u8) {
        let header = internal as *mut Header;

        let mut ledger = self.ledger.lock();
        ledger.list.unlink(header);
        ledger.count -= 1;
        ledger.bytes -= (*header).size();
    }

    /// Number of live allocations charged to this domain.
    pub fn count(&self) -> usize {
        self.ledger.lock().count
    }

    /// Total bytes of live allocations charged to this domain.
    pub fn bytes(&self) -> usize {
        self.ledger.lock().bytes
    }

    /// Print this domain's totals and recurse into registered children.
    ///
    /// Each domain is read under its own lock, so every printed line is a
    /// consistent snapshot of that ledger; mutation of a domain blocks
    /// while its line is being taken. Parent totals are not aggregated
    /// from children - every ledger reports independently.
    pub fn print(&self, out: &mut dyn Write, indent: usize) -> io::Result<()> {
        let _guard = suspend::suspend_accounting();

        {
            let ledger = self.ledger.lock();
            writeln!(
                out,
                "{:pad$}{}: {} allocations, {}",
                "",
                self.name,
                ledger.count,
                format_bytes(ledger.bytes),
                pad = indent * 2
            )?;
        }

        let children = self.children.lock();
        for child in children.iter() {
            child.print(out, indent + 1)?;
        }
        Ok(())
    }

    /// Print one diagnostic line per live block and return the number of
    /// nodes walked.
    ///
    /// Holds the domain lock for the whole traversal; diagnostic use only.
    pub fn print_blocks(&self, out: &mut dyn Write) -> io::Result<usize> {
        let _guard = suspend::suspend_accounting();

        let ledger = self.ledger.lock();
        let mut walked = 0;
        let mut node = ledger.list.begin();
        while !node.is_null() {
            // SAFETY: every node in the list is a live header, linked
            // under this lock and unlinked before its block is freed.
            unsafe {
                (*node).print(out, 1)?;
                node = (*node).next();
            }
            walked += 1;
        }
        Ok(walked)
    }
}

/// No-op ledger used when the `tracking` feature is disabled.
///
/// Presents the identical capability surface at zero cost: every
/// operation compiles away, counters read zero and header sizes collapse
/// to zero, so callers need no code changes.
#[cfg(not(feature = "tracking"))]
pub struct Domain {
    name: &'static str,
}

#[cfg(not(feature = "tracking"))]
impl Domain {
    /// Create a new domain ledger.
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    /// Get the domain name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// No-op when tracking is disabled.
    pub fn register(&'static self, _parent: &'static Domain) {}

    /// Always `None` when tracking is disabled.
    pub fn parent(&self) -> Option<&'static Domain> {
        None
    }

    pub(crate) unsafe fn add(&self, _internal: *mut u8, _size: usize) {}

    pub(crate) unsafe fn add_tracked(
        &'static self,
        _internal: *mut u8,
        _size: usize,
        _file: &'static str,
        _line: usize,
    ) {
    }

    pub(crate) unsafe fn remove(&self, _internal: *mut u8) {}

    /// Always zero when tracking is disabled.
    pub fn count(&self) -> usize {
        0
    }

    /// Always zero when tracking is disabled.
    pub fn bytes(&self) -> usize {
        0
    }

    /// No-op when tracking is disabled.
    pub fn print(&self, _out: &mut dyn Write, _indent: usize) -> io::Result<()> {
        Ok(())
    }

    /// No-op when tracking is disabled.
    pub fn print_blocks(&self, _out: &mut dyn Write) -> io::Result<usize> {
        Ok(0)
    }
}

#[cfg(all(test, feature = "tracking"))]
mod tests {
    use super::*;
    use crate::core::header::HEADER_SIZE;
    use std::alloc::{alloc, dealloc, Layout};

    fn block_layout(payload: usize) -> Layout {
        Layout::from_size_align(payload + HEADER_SIZE, std::mem::align_of::<usize>()).unwrap()
    }

    #[test]
    fn test_add_remove_balances_totals() {
        static DOM: Domain = Domain::new("test_add_remove");

        let layout = block_layout(40);
        let raw = unsafe { alloc(layout) };
        assert!(!raw.is_null());

        unsafe {
            DOM.add(raw, 40);
        }
        assert_eq!(DOM.count(), 1);
        assert_eq!(DOM.bytes(), 40);

        unsafe {
            DOM.remove(raw);
            dealloc(raw, layout);
        }
        assert_eq!(DOM.count(), 0);
        assert_eq!(DOM.bytes(), 0);
    }

    #[test]
    fn test_print_reports_totals() {
        static DOM: Domain = Domain::new("test_print");

        let layout = block_layout(64);
        let raw = unsafe { alloc(layout) };

        unsafe {
            DOM.add(raw, 64);
        }

        let mut out = Vec::new();
        DOM.print(&mut out, 0).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("test_print: 1 allocations, 64 B"));

        unsafe {
            DOM.remove(raw);
            dealloc(raw, layout);
        }
    }

    #[test]
    fn test_block_walk_matches_count() {
        static DOM: Domain = Domain::new("test_walk");

        let layout = block_layout(8);
        let blocks: Vec<*mut u8> = (0..5)
            .map(|_| {
                let raw = unsafe { alloc(layout) };
                unsafe { DOM.add(raw, 8) };
                raw
            })
            .collect();

        let mut out = Vec::new();
        let walked = DOM.print_blocks(&mut out).unwrap();
        assert_eq!(walked, DOM.count());
        assert_eq!(walked, 5);

        // Remove out of order to exercise interior and boundary unlinks.
        for &i in &[2usize, 0, 4, 1, 3] {
            unsafe {
                DOM.remove(blocks[i]);
                dealloc(blocks[i], layout);
            }
        }
        assert_eq!(DOM.count(), 0);
        assert_eq!(DOM.bytes(), 0);
    }

    #[test]
    fn test_register_is_idempotent() {
        static PARENT: Domain = Domain::new("test_reg_parent");
        static CHILD: Domain = Domain::new("test_reg_child");

        CHILD.register(&PARENT);
        CHILD.register(&PARENT);

        assert_eq!(PARENT.children.lock().len(), 1);
        assert!(std::ptr::eq(CHILD.parent().unwrap(), &PARENT));
    }
}
