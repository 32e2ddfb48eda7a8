mod cell;
pub mod core;
mod error;
mod key;
mod project;
mod shared;
mod snapshot;
mod state;
mod stream;
mod subscription;
mod watch;

pub use cell::{CellId, ReadCell, WriteCell};
pub use error::PersistError;
pub use key::{KeyEvent, KeyId, KeyReceiver, PersistenceKey, SaveMode};
pub use project::{Cached, CellExt, Lens, Mapped, Unwrapped};
pub use shared::Shared;
pub use snapshot::SnapshotStore;
pub use state::State;
pub use stream::Changes;
pub use subscription::Subscription;
