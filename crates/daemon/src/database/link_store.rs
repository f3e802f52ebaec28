use tokio::runtime::Handle;

use common::prelude::{LinkStore, ShareLink, StoreError};

use crate::database::Database;

/// [`LinkStore`] over the service database for exports running on a
/// blocking thread.
///
/// Each save blocks the calling thread on the async pool, so this must
/// never be used from inside the runtime's own worker threads.
#[derive(Clone)]
pub struct SqliteLinkStore {
    database: Database,
    handle: Handle,
}

impl SqliteLinkStore {
    pub fn new(database: Database, handle: Handle) -> Self {
        Self { database, handle }
    }
}

impl LinkStore for SqliteLinkStore {
    fn save(&self, link: &ShareLink) -> Result<(), StoreError> {
        self.handle
            .block_on(self.database.save_share_link(link))
            .map_err(StoreError::new)
    }
}
