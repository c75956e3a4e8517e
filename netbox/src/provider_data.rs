//! Provider data structure passed to resources

use crate::api::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct NetboxProviderData {
    pub client: Arc<Client>,
}

impl NetboxProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}
