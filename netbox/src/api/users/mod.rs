pub mod tokens;

use crate::api::Client;

/// Users API (`/api/users/`)
pub struct UsersApi<'a> {
    client: &'a Client,
}

impl<'a> UsersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn tokens(&self) -> tokens::TokensApi<'a> {
        tokens::TokensApi::new(self.client)
    }
}
