pub mod cli;
pub mod config;
pub mod events;
pub mod source;
pub mod ignore;
pub mod pending;
pub mod watcher;
pub mod store;
pub mod lifecycle;

pub use events::*;
pub use source::*;
pub use ignore::*;
pub use pending::*;
pub use watcher::*;
pub use store::*;
pub use lifecycle::*;
