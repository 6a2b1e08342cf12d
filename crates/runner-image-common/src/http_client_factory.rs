// Creates the HTTP client used for registry requests.

use anyhow::Result;
use reqwest::Client;
use runner_image_sdk::Package;

/// Builds `reqwest` clients with the tool's user agent.
///
/// Proxy settings come from the standard `HTTP(S)_PROXY` / `NO_PROXY`
/// variables, which `reqwest` honours on its own. No request timeout is set,
/// so a hung registry call stalls the poll iteration it belongs to.
pub struct HttpClientFactory;

impl HttpClientFactory {
    pub fn create_client() -> Result<Client> {
        let client = Client::builder().user_agent(Package::user_agent()).build()?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_default_client() {
        assert!(HttpClientFactory::create_client().is_ok());
    }
}
