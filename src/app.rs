// Application shell: the five user actions wired to the item façade

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::items::ItemManager;
use crate::observer::{Observer, ObserverState};
use crate::render::{TextSink, render};
use std::str::FromStr;
use tracing::{debug, warn};

/// A user-triggered action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    DeleteFirst,
    DeleteAll,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::DeleteFirst,
        Action::DeleteAll,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::DeleteFirst => "delete-first",
            Action::DeleteAll => "delete-all",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" | "c" => Ok(Action::Create),
            "read" | "r" => Ok(Action::Read),
            "update" | "u" => Ok(Action::Update),
            "delete-first" | "delete" | "d" => Ok(Action::DeleteFirst),
            "delete-all" | "clear" => Ok(Action::DeleteAll),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

/// Owns the item store, the optional change observer and the display sink
///
/// Teardown cancels the observer before closing the store, through
/// [`App::close`] or on drop.
pub struct App<S: TextSink> {
    items: Option<ItemManager>,
    observer: Observer,
    sink: S,
}

impl<S: TextSink> App<S> {
    /// Open the configured store and show its contents
    pub fn open(config: &Config, sink: S) -> Result<Self> {
        let items = ItemManager::open(&config.store_path)?;
        Self::with_manager(items, config.live, sink)
    }

    /// Wrap an already opened item store
    pub fn with_manager(mut items: ItemManager, live: bool, sink: S) -> Result<Self> {
        let mut observer = Observer::new();
        if live {
            observer.start(&mut items)?;
        }

        let mut app = Self {
            items: Some(items),
            observer,
            sink,
        };
        app.refresh()?;
        Ok(app)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn observer_state(&self) -> ObserverState {
        self.observer.state()
    }

    pub fn items(&self) -> Result<&ItemManager> {
        self.items.as_ref().ok_or_else(closed)
    }

    fn items_mut(&mut self) -> Result<&mut ItemManager> {
        self.items.as_mut().ok_or_else(closed)
    }

    /// Run one action, then deliver any resulting change notifications
    pub fn dispatch(&mut self, action: Action) -> Result<()> {
        debug!(%action, "Dispatching action");
        match action {
            Action::Create => {
                self.items_mut()?.create_random()?;
            }
            Action::Read => self.refresh()?,
            Action::Update => {
                self.items_mut()?.complete_first_incomplete()?;
            }
            Action::DeleteFirst => {
                self.items_mut()?.delete_first()?;
            }
            Action::DeleteAll => {
                self.items_mut()?.delete_all()?;
            }
        }
        self.pump()?;
        Ok(())
    }

    /// Re-read every item and render it
    pub fn refresh(&mut self) -> Result<()> {
        let items = self.items.as_ref().ok_or_else(closed)?;
        show(items, &mut self.sink)
    }

    /// Deliver queued change notifications. Returns the number of re-renders.
    pub fn pump(&mut self) -> Result<usize> {
        let items = self.items.as_ref().ok_or_else(closed)?;
        let sink = &mut self.sink;
        self.observer.pump(|| show(items, &mut *sink))
    }

    /// Cancel the observer, then close the store
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.observer.cancel();
        match self.items.take() {
            Some(items) => items.close(),
            None => Ok(()),
        }
    }
}

impl<S: TextSink> Drop for App<S> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "Failed to close store on drop");
        }
    }
}

fn show<S: TextSink>(items: &ItemManager, sink: &mut S) -> Result<()> {
    let all = items.read_all()?;
    sink.set_text(&render(&all));
    Ok(())
}

fn closed() -> StoreError {
    StoreError::InvalidConfig("application already closed".to_string())
}
