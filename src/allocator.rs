use crate::{
    error::{Error, Result},
    item_id::ItemId,
};

/// Hands out sequential ids from a high-water mark.
///
/// Not synchronized on its own: the owner must hold a lock across
/// "allocate, write file, advance" so two ingests cannot claim one id.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    current_max: u64,
}

impl IdAllocator {
    /// Seed from the highest id present in the store. An empty store
    /// starts at zero, so the first item becomes #1.
    pub fn seeded(max_in_store: Option<ItemId>) -> Self {
        Self {
            current_max: max_in_store.map_or(0, ItemId::get),
        }
    }

    pub fn current_max(&self) -> u64 {
        self.current_max
    }

    /// The id the next ingest should write under. Does not change state.
    pub fn next(&self) -> Result<ItemId> {
        self.current_max
            .checked_add(1)
            .and_then(ItemId::new)
            .ok_or_else(|| Error::Inconsistent("item id space exhausted".into()))
    }

    /// Record that `id` was durably written.
    ///
    /// Anything other than exactly `current_max + 1` means the allocator
    /// and the store disagree.
    pub fn advance(&mut self, id: ItemId) -> Result<()> {
        let expected = self.next()?;
        if id != expected {
            return Err(Error::Inconsistent(format!(
                "allocator expected {expected} but {id} was written"
            )));
        }
        self.current_max = id.get();
        Ok(())
    }

    /// Whether `id` is within the range handed out so far.
    pub fn has_issued(&self, id: ItemId) -> bool {
        id.get() <= self.current_max
    }
}
