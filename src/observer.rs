// Change observer for the item collection

use crate::error::Result;
use crate::item::Item;
use crate::items::ItemManager;
use crate::live::{ResultsChange, Subscription};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Idle,
    Subscribed,
}

/// Idle, or subscribed to the live "all items" query
#[derive(Debug, Default)]
pub struct Observer {
    subscription: Option<Subscription<Item>>,
}

impl Observer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ObserverState {
        match self.subscription {
            Some(_) => ObserverState::Subscribed,
            None => ObserverState::Idle,
        }
    }

    /// Attach to the live query on all items (idle -> subscribed)
    pub fn start(&mut self, items: &mut ItemManager) -> Result<()> {
        if self.subscription.is_some() {
            debug!("Observer already subscribed");
            return Ok(());
        }
        let subscription = items.subscribe_all()?;
        debug!(id = subscription.id(), "Observer subscribed");
        self.subscription = Some(subscription);
        Ok(())
    }

    /// Handle queued notifications
    ///
    /// Returns the number of times `on_update` ran.
    pub fn pump<F>(&mut self, mut on_update: F) -> Result<usize>
    where
        F: FnMut() -> Result<()>,
    {
        let Some(subscription) = &self.subscription else {
            return Ok(0);
        };

        let mut renders = 0;
        while let Some(change) = subscription.try_next()? {
            match change {
                ResultsChange::Updated(updated) => {
                    debug!(
                        insertions = updated.insertions.len(),
                        changes = updated.changes.len(),
                        deletions = updated.deletions.len(),
                        "Items changed"
                    );
                    on_update()?;
                    renders += 1;
                }
                ResultsChange::Initial { .. } => {}
            }
        }

        if !subscription.is_active() {
            warn!("Live query disconnected, observer going idle");
            self.subscription = None;
        }
        Ok(renders)
    }

    /// Detach from the live query (subscribed -> idle)
    pub fn cancel(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
    }
}
