// CRUD façade over the item collection

use crate::error::Result;
use crate::filter::Filter;
use crate::item::Item;
use crate::live::Subscription;
use crate::record::Schema;
use crate::store::Store;
use std::path::Path;
use tracing::{debug, info};

/// Item operations, each a single read or a single write transaction
pub struct ItemManager {
    store: Store,
}

impl ItemManager {
    /// The record types an item store is opened with
    pub fn schema() -> Schema {
        Schema::new().with::<Item>()
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            store: Store::open(path, Self::schema())?,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            store: Store::open_in_memory(Self::schema())?,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Insert a new incomplete item
    pub fn create(&mut self, summary: &str) -> Result<Item> {
        let item = Item::new(summary);
        self.store.write(|txn| txn.insert(&item))?;
        info!(id = %item.id, summary = %item.summary, "Created item");
        Ok(item)
    }

    /// Insert a new item with one of the stock summaries
    pub fn create_random(&mut self) -> Result<Item> {
        self.create(Item::random_summary())
    }

    /// Every item, in store order
    pub fn read_all(&self) -> Result<Vec<Item>> {
        self.store.list(&[])
    }

    /// Items whose `field` starts with `prefix` (case-sensitive)
    ///
    /// `field` must be an indexed string field of [`Item`], otherwise this
    /// fails with `StoreError::InvalidFilter`.
    pub fn query_by_prefix(&self, field: &str, prefix: &str) -> Result<Vec<Item>> {
        self.store.list(&[Filter::starts_with(field, prefix)])
    }

    /// Mark the first incomplete item as complete
    ///
    /// Returns the updated item, or `None` when every item is already complete.
    pub fn complete_first_incomplete(&mut self) -> Result<Option<Item>> {
        let completed = self.store.write(|txn| {
            let incomplete: Vec<Item> = txn.list(&[Filter::eq("is_complete", false)])?;
            let Some(mut first) = incomplete.into_iter().next() else {
                return Ok(None);
            };
            first.complete();
            txn.update(&first)?;
            Ok(Some(first))
        })?;

        match &completed {
            Some(item) => info!(id = %item.id, "Completed item"),
            None => debug!("No incomplete items"),
        }
        Ok(completed)
    }

    /// Delete the first item in store order
    pub fn delete_first(&mut self) -> Result<Option<Item>> {
        let deleted = self.store.write(|txn| {
            let items: Vec<Item> = txn.list(&[])?;
            let Some(first) = items.into_iter().next() else {
                return Ok(None);
            };
            txn.delete::<Item>(&first.id.to_hex())?;
            Ok(Some(first))
        })?;

        match &deleted {
            Some(item) => info!(id = %item.id, "Deleted item"),
            None => debug!("No items to delete"),
        }
        Ok(deleted)
    }

    /// Delete every item. Returns how many were deleted.
    pub fn delete_all(&mut self) -> Result<usize> {
        let count = self.store.write(|txn| {
            let items: Vec<Item> = txn.list(&[])?;
            txn.delete_many(&items)
        })?;
        info!(count, "Deleted all items");
        Ok(count)
    }

    /// Live query over all items
    pub fn subscribe_all(&mut self) -> Result<Subscription<Item>> {
        self.store.subscribe(&[])
    }

    pub fn close(self) -> Result<()> {
        self.store.close()
    }
}
