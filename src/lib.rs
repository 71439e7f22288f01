// TodoStore - Embedded to-do items with live queries and a text front end

pub mod app;
pub mod config;
pub mod error;
pub mod filter;
pub mod item;
pub mod items;
pub mod live;
pub mod observer;
pub mod record;
pub mod render;
pub mod store;

// Re-export main types for convenience
pub use app::{Action, App};
pub use config::Config;
pub use error::{Result, StoreError};
pub use filter::{Filter, FilterOp};
pub use item::{Item, ItemId};
pub use items::ItemManager;
pub use live::{ResultsChange, Subscription, SubscriptionId, UpdatedResults};
pub use observer::{Observer, ObserverState};
pub use record::{IndexKind, IndexValue, Record, Schema};
pub use render::{Label, StdoutSink, TextSink, render};
pub use store::{Store, WriteTxn, now_ms};
