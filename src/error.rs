use std::{error::Error, fmt, sync::Arc};

/// A load or save failure reported by a persistence strategy.
///
/// Cheaply cloneable so the same failure can sit in a cell's error field for
/// observers while also being returned to the caller that triggered it.
#[derive(Clone)]
pub struct PersistError(Arc<dyn Error + Send + Sync + 'static>);

impl PersistError {
    pub fn new(error: impl Error + Send + Sync + 'static) -> Self {
        PersistError(Arc::new(error))
    }

    pub fn msg(message: impl Into<String>) -> Self {
        PersistError(Arc::new(Message(message.into())))
    }

    pub fn get(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.0
    }

    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref()
    }
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl Error for PersistError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}
impl Error for Message {}

/// One error field of a persistence-backed cell.
///
/// The flag tracks whether the field was read since it was last written;
/// a consumer reading either error channel counts as actively monitoring
/// the cell, which suppresses global auto-reporting on the other channel.
#[derive(Default)]
pub(crate) struct ErrorSlot {
    error: Option<PersistError>,
    read_since_write: bool,
}

impl ErrorSlot {
    pub fn write(&mut self, error: Option<PersistError>) {
        self.error = error;
        self.read_since_write = false;
    }

    pub fn read(&mut self) -> Option<PersistError> {
        self.read_since_write = true;
        self.error.clone()
    }

    pub fn is_monitored(&self) -> bool {
        self.read_since_write
    }
}
