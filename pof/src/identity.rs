//! Stream-scoped identity/reference tracking.
//!
//! The writer mints a monotonic id the first time it sees a given `Rc`
//! allocation and writes `T_REFERENCE` for every later sighting. The reader
//! mirrors this by registering each `T_IDENTITY` value before returning it,
//! so a `T_REFERENCE` occurring later in the same stream resolves to the
//! same allocation.
//!
//! The static `Rc<T>` path ([`PofWriter::write_shared`]/[`PofReader::read_shared`])
//! only supports acyclic sharing (a DAG): an `Rc<T>` can't be registered
//! before `T` itself is fully decoded, so a true cycle would recurse
//! forever. The dynamic [`crate::value::Value`] tree closes that gap by
//! registering an `Rc<RefCell<Value>>` placeholder before decoding the
//! value it will hold, so a self-reference resolves to the same cell rather
//! than recursing.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};

/// Writer-side identity table, keyed by allocation pointer identity.
#[derive(Default)]
pub struct IdentityWriterTable {
    next_id: i32,
    seen: HashMap<*const (), i32>,
}

impl IdentityWriterTable {
    /// An empty table, numbering from id `0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `rc`'s allocation if unseen and returns `(id, false)`, or
    /// returns its previously assigned `(id, true)` if already seen.
    pub fn mark<T>(&mut self, rc: &Rc<T>) -> (i32, bool) {
        self.mark_ptr(Rc::as_ptr(rc) as *const ())
    }

    /// Like [`Self::mark`], keyed directly by an already-erased pointer —
    /// used where the allocation isn't held as an `Rc<T>` (e.g. a `&T`
    /// behind `enable_references`, where identity is pointer identity, not
    /// shared ownership).
    pub fn mark_ptr(&mut self, ptr: *const ()) -> (i32, bool) {
        if let Some(&id) = self.seen.get(&ptr) {
            (id, true)
        } else {
            let id = self.next_id;
            self.next_id += 1;
            self.seen.insert(ptr, id);
            (id, false)
        }
    }
}

/// Reader-side identity table, keyed by the stream-scoped id minted by the
/// writer.
#[derive(Default)]
pub struct IdentityReaderTable {
    slots: HashMap<i32, Rc<dyn Any>>,
}

impl IdentityReaderTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` under `id`.
    pub fn insert<T: 'static>(&mut self, id: i32, value: Rc<T>) {
        self.slots.insert(id, value as Rc<dyn Any>);
    }

    /// Resolves `id` back to the `Rc<T>` registered under it.
    pub fn resolve<T: 'static>(&self, id: i32) -> Result<Rc<T>> {
        let any = self.slots.get(&id).ok_or(Error::UnresolvedIdentity(id))?;
        any.clone().downcast::<T>().map_err(|_| Error::UnresolvedIdentity(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_table_dedupes_same_allocation() {
        let shared = Rc::new(42i32);
        let mut table = IdentityWriterTable::new();
        let (id_a, seen_a) = table.mark(&shared);
        let (id_b, seen_b) = table.mark(&shared);
        assert!(!seen_a);
        assert!(seen_b);
        assert_eq!(id_a, id_b);
    }

    #[test]
    fn reader_table_roundtrip() {
        let mut table = IdentityReaderTable::new();
        table.insert(0, Rc::new(String::from("shared")));
        let resolved: Rc<String> = table.resolve(0).unwrap();
        assert_eq!(*resolved, "shared");
    }
}
