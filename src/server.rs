use std::sync::Arc;

use http::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    client::{HttpClient, Resource},
    config::Config,
    database::Database,
    error::CouchError,
    session::Session,
};

#[derive(Debug, Deserialize)]
struct UuidsResponse {
    uuids: Vec<String>,
}

/// Facade over the server root resource.
#[derive(Debug, Clone)]
pub struct Server {
    resource: Resource,
}

impl Server {
    /// Creates a server facade over the given HTTP transport.
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            resource: Resource::new(client),
        }
    }

    /// Creates a server facade over an existing root resource.
    pub fn with_resource(resource: Resource) -> Self {
        Self { resource }
    }

    /// Fetches server metadata from the root endpoint.
    pub async fn info(&self) -> Result<Value, CouchError> {
        let mut response = self.resource.simple(Method::GET).await?.ensure_success().await?;
        response.json().await
    }

    /// Lists all database names.
    pub async fn all_dbs(&self) -> Result<Vec<String>, CouchError> {
        let mut response = self
            .resource
            .join(["_all_dbs"])
            .simple(Method::GET)
            .await?
            .ensure_success()
            .await?;
        response.json().await
    }

    /// Requests server-generated UUIDs.
    pub async fn uuids(&self, count: usize) -> Result<Vec<String>, CouchError> {
        let query = vec![("count".to_owned(), count.to_string())];
        let mut response = self
            .resource
            .join(["_uuids"])
            .request(Method::GET, query, http::HeaderMap::new(), None)
            .await?
            .ensure_success()
            .await?;
        let uuids: UuidsResponse = response.json().await?;
        Ok(uuids.uuids)
    }

    /// Returns the database facade for the given name.
    pub fn db(&self, name: &str) -> Database {
        Database::new(self.resource.join([name]))
    }

    /// Returns the server configuration facade.
    pub fn config(&self) -> Config {
        Config::new(self.resource.join(["_config"]))
    }

    /// Returns the session facade.
    pub fn session(&self) -> Session {
        Session::new(self.resource.join(["_session"]))
    }
}
