//! Thread-safe session handle.
//!
//! Writers are serialized through a mutex around the [`Session`]; after each
//! successful call the resulting graph and cache are published as one
//! immutable [`Snapshot`]. Readers clone the published `Arc` and never see a
//! graph paired with a cache from a different version.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::Result;
use crate::eval::NodeValue;
use crate::graph::NodeId;
use crate::session::{Session, Snapshot};

pub struct SharedSession {
    writer: Mutex<Session>,
    published: RwLock<Arc<Snapshot>>,
}

impl SharedSession {
    pub fn new(session: Session) -> Self {
        let published = RwLock::new(Arc::new(session.snapshot()));
        Self {
            writer: Mutex::new(session),
            published,
        }
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.published.read())
    }

    /// Run `f` with exclusive access to the session.
    ///
    /// The new state is published only if `f` succeeds. Since every session
    /// call is atomic, an error leaves the published snapshot current.
    pub fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session) -> Result<T>,
    {
        let mut session = self.writer.lock();
        let output = f(&mut session)?;
        *self.published.write() = Arc::new(session.snapshot());
        Ok(output)
    }

    /// Evaluate a node and publish the filled cache.
    pub fn evaluate(&self, id: &NodeId) -> Result<Arc<NodeValue>> {
        self.mutate(|session| session.evaluate(id))
    }
}

impl From<Session> for SharedSession {
    fn from(session: Session) -> Self {
        Self::new(session)
    }
}
