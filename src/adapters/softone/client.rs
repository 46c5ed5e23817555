//! SoftOne web services client
//!
//! Issues the `login`/`authenticate` handshake and the two read services
//! (`getTable` and `SqlData`) over reqwest. Every call is a single attempt;
//! the sync orchestrator owns retries so the named-query fallback can see the
//! final error.

use super::credentials::CredentialDecryptor;
use super::models::{
    AuthenticateRequest, GetTableRequest, LoginRequest, RawPage, ServiceResponse, SqlDataRequest,
};
use super::source::{RemoteSource, TableRequest};
use crate::config::ConnectionConfig;
use crate::domain::{RemoteError, Result, SessionToken, SyncError};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Version tag sent with generic table reads
const GET_TABLE_VERSION: &str = "1";

/// SoftOne client bound to one connection
///
/// # Example
///
/// ```no_run
/// use parksync::adapters::softone::{PlaintextDecryptor, RemoteSource, SoftOneClient};
/// use parksync::config::ConnectionConfig;
/// use std::sync::Arc;
///
/// # async fn example(connection: ConnectionConfig) -> parksync::domain::Result<()> {
/// let client = SoftOneClient::new(connection, Arc::new(PlaintextDecryptor))?;
/// let token = client.authenticate().await?;
/// # Ok(())
/// # }
/// ```
pub struct SoftOneClient {
    client: Client,
    connection: ConnectionConfig,
    decryptor: Arc<dyn CredentialDecryptor>,
}

impl SoftOneClient {
    /// Create a new client for a connection
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        connection: ConnectionConfig,
        decryptor: Arc<dyn CredentialDecryptor>,
    ) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(connection.timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                SyncError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            connection,
            decryptor,
        })
    }

    /// Name of the connection this client is bound to
    pub fn connection_name(&self) -> &str {
        &self.connection.name
    }

    async fn call<B>(&self, body: &B) -> std::result::Result<ServiceResponse, RemoteError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let resp = self
            .client
            .post(&self.connection.base_url)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = resp.status();
        if status.is_server_error() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RemoteError::ServerError {
                status: status.as_u16(),
                message,
            });
        }
        if status.is_client_error() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RemoteError::ClientError {
                status: status.as_u16(),
                message,
            });
        }

        resp.json::<ServiceResponse>()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    async fn read(&self, body: &(impl Serialize + Sync)) -> Result<RawPage> {
        let response = self.call(body).await?;
        if !response.success {
            return Err(RemoteError::ServiceFailed(response.error_message()).into());
        }
        Ok(response.into_page()?)
    }
}

fn map_transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout(e.to_string())
    } else {
        RemoteError::ConnectionFailed(e.to_string())
    }
}

#[async_trait]
impl RemoteSource for SoftOneClient {
    async fn authenticate(&self) -> Result<SessionToken> {
        let password = self.decryptor.decrypt(&self.connection.password)?;

        let login = self
            .call(&LoginRequest {
                service: "login",
                username: &self.connection.username,
                password: password.expose_secret().as_str(),
                app_id: &self.connection.app_id,
            })
            .await?;
        drop(password);

        if !login.success {
            return Err(RemoteError::AuthenticationFailed(login.error_message()).into());
        }
        let login_client_id = login.client_id.ok_or_else(|| {
            RemoteError::AuthenticationFailed("login response carried no clientID".to_string())
        })?;

        let auth = self
            .call(&AuthenticateRequest {
                service: "authenticate",
                client_id: &login_client_id,
                company: &self.connection.company,
                branch: &self.connection.branch,
                module: &self.connection.module,
                refid: &self.connection.refid,
            })
            .await?;

        if !auth.success {
            return Err(RemoteError::AuthenticationFailed(auth.error_message()).into());
        }
        let client_id = auth.client_id.ok_or_else(|| {
            RemoteError::AuthenticationFailed(
                "authenticate response carried no clientID".to_string(),
            )
        })?;

        tracing::debug!(
            connection = %self.connection.name,
            serial = %self.connection.serial,
            "Authenticated against SoftOne"
        );

        Ok(SessionToken::new(client_id))
    }

    async fn fetch_table(&self, request: &TableRequest, token: &SessionToken) -> Result<RawPage> {
        tracing::debug!(
            table = %request.table,
            field_count = request.fields.len(),
            filter = %request.filter,
            "Fetching table"
        );

        self.read(&GetTableRequest {
            service: "getTable",
            client_id: token.as_str(),
            app_id: &self.connection.app_id,
            table_name: &request.table,
            fields: request.fields.join(","),
            filter: &request.filter,
            version: GET_TABLE_VERSION,
        })
        .await
    }

    async fn fetch_named_query(
        &self,
        query_id: &str,
        since: &str,
        token: &SessionToken,
    ) -> Result<RawPage> {
        tracing::debug!(query_id = %query_id, since = %since, "Running named query");

        self.read(&SqlDataRequest {
            service: "SqlData",
            client_id: token.as_str(),
            app_id: &self.connection.app_id,
            sql_name: query_id,
            param1: since,
        })
        .await
    }
}
