use std::{
    any::TypeId,
    fmt,
    sync::Arc,
};

use derive_ex::derive_ex;
use parse_display::Display;

use crate::{error::PersistError, subscription::Subscription};

/// Identity of a persistence key.
///
/// Couples the key type with a token so keys of different strategy types can
/// never collide on a token. Two keys with equal identity share one live
/// cell per [`Runtime`](crate::core::Runtime).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct KeyId {
    key_type: TypeId,
    token: Arc<str>,
}

impl KeyId {
    pub fn new<K: 'static>(token: impl AsRef<str>) -> Self {
        KeyId {
            key_type: TypeId::of::<K>(),
            token: Arc::from(token.as_ref()),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// How urgently a save must complete.
///
/// `Immediate` is an explicit, synchronous save; `Deferred` is the
/// best-effort save after a mutation, which a strategy may coalesce.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
#[display(style = "snake_case")]
pub enum SaveMode {
    Immediate,
    Deferred,
}

impl SaveMode {
    pub fn is_immediate(self) -> bool {
        self == SaveMode::Immediate
    }
}

/// One update from a key's live channel: a new value, "source has no
/// value", or a failure.
pub type KeyEvent<T> = Result<Option<T>, PersistError>;

/// Delivers subscription updates back to the cell that subscribed.
///
/// Callable from any thread. Events received after the cell is torn down
/// are dropped.
#[derive_ex(Clone, bound())]
pub struct KeyReceiver<T>(Arc<dyn Fn(KeyEvent<T>) + Send + Sync>);

impl<T> KeyReceiver<T> {
    pub(crate) fn new(f: impl Fn(KeyEvent<T>) + Send + Sync + 'static) -> Self {
        KeyReceiver(Arc::new(f))
    }

    pub fn receive(&self, event: KeyEvent<T>) {
        (self.0)(event);
    }
}

/// An external identity plus load/save/subscribe strategy backing a
/// [`Shared`](crate::Shared) cell.
///
/// `load` receives the caller-supplied initial value as a hint and returns
/// `Ok(None)` when the source has no value. `subscribe` opens a long-lived
/// update channel; the returned [`Subscription`] is cancelled exactly once,
/// when the last handle for the key is released, and must tolerate the
/// channel having already completed.
pub trait PersistenceKey: Send + Sync + 'static {
    type Value: Clone + Send + 'static;

    fn id(&self) -> KeyId;

    fn load(&self, initial: Option<&Self::Value>) -> Result<Option<Self::Value>, PersistError>;

    fn save(&self, value: &Self::Value, mode: SaveMode) -> Result<(), PersistError>;

    fn subscribe(
        &self,
        initial: Option<&Self::Value>,
        receiver: KeyReceiver<Self::Value>,
    ) -> Subscription {
        let _ = (initial, receiver);
        Subscription::empty()
    }
}
