//! siad HTTP API Client
//!
//! Provides a typed client for the siad endpoints used by the ant runtime
//! and its jobs.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::types::*;

/// siad refuses requests that do not carry this user agent
const SIA_USER_AGENT: &str = "Sia-Agent";

/// Upper bound on a single API round trip
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors that can occur when interacting with the siad API
#[derive(Debug, Error)]
pub enum SiadError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("API error: {message} (status: {status})")]
    Api { message: String, status: u16 },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Result type for siad API operations
pub type SiadResult<T> = Result<T, SiadError>;

/// Client for a siad node's HTTP API
///
/// # Example
/// ```no_run
/// use sia_ant::client::SiadClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = SiadClient::new("localhost:9980", None)?;
/// let consensus = client.consensus().await?;
/// println!("height: {}", consensus.height);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SiadClient {
    /// Base URL of the API (e.g., http://localhost:9980/)
    base_url: Url,
    /// HTTP client for making requests
    client: Client,
    /// API password, sent as basic auth with an empty user
    password: Option<String>,
}

impl SiadClient {
    /// Create a client for the given API address
    ///
    /// `api_addr` may be a bare `host:port` as passed to siad's `--api-addr`,
    /// or a full URL.
    pub fn new(api_addr: &str, password: Option<&str>) -> SiadResult<Self> {
        let client = Client::builder()
            .user_agent(SIA_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Self::with_client(api_addr, password, client)
    }

    /// Create a client with a custom HTTP client
    ///
    /// The caller is responsible for setting the `Sia-Agent` user agent.
    pub fn with_client(api_addr: &str, password: Option<&str>, client: Client) -> SiadResult<Self> {
        Ok(Self {
            base_url: api_base_url(api_addr)?,
            client,
            password: password.filter(|p| !p.is_empty()).map(str::to_string),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn get(&self, path: &str) -> SiadResult<RequestBuilder> {
        let url = self.base_url.join(path)?;
        Ok(self.authorize(self.client.get(url)))
    }

    fn post(&self, path: &str) -> SiadResult<RequestBuilder> {
        let url = self.base_url.join(path)?;
        Ok(self.authorize(self.client.post(url)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.password {
            Some(password) => request.basic_auth("", Some(password)),
            None => request,
        }
    }

    // =========================================================================
    // Consensus / Daemon
    // =========================================================================

    /// Get the current consensus state
    ///
    /// GET /consensus. Also serves as the liveness check while waiting for
    /// the API to come up.
    pub async fn consensus(&self) -> SiadResult<ConsensusGet> {
        let response = self.get("consensus")?.send().await?;
        decode(response).await
    }

    /// Ask the daemon to shut down gracefully
    ///
    /// GET /daemon/stop
    pub async fn daemon_stop(&self) -> SiadResult<()> {
        let response = self.get("daemon/stop")?.send().await?;
        expect_success(response).await
    }

    // =========================================================================
    // Wallet
    // =========================================================================

    /// Initialize a new wallet with a freshly generated seed
    ///
    /// POST /wallet/init
    pub async fn wallet_init(&self) -> SiadResult<WalletInitPost> {
        let response = self.post("wallet/init")?.send().await?;
        decode(response).await
    }

    /// Unlock the wallet
    ///
    /// POST /wallet/unlock
    pub async fn wallet_unlock(&self, password: &str) -> SiadResult<()> {
        let response = self
            .post("wallet/unlock")?
            .form(&[("encryptionpassword", password)])
            .send()
            .await?;
        expect_success(response).await
    }

    /// Get wallet status and balances
    ///
    /// GET /wallet
    pub async fn wallet(&self) -> SiadResult<WalletGet> {
        let response = self.get("wallet")?.send().await?;
        decode(response).await
    }

    // =========================================================================
    // Miner
    // =========================================================================

    /// Get CPU miner status
    ///
    /// GET /miner
    pub async fn miner(&self) -> SiadResult<MinerGet> {
        let response = self.get("miner")?.send().await?;
        decode(response).await
    }

    /// Start the CPU miner
    ///
    /// GET /miner/start
    pub async fn miner_start(&self) -> SiadResult<()> {
        let response = self.get("miner/start")?.send().await?;
        expect_success(response).await
    }

    /// Stop the CPU miner
    ///
    /// GET /miner/stop
    pub async fn miner_stop(&self) -> SiadResult<()> {
        let response = self.get("miner/stop")?.send().await?;
        expect_success(response).await
    }

    // =========================================================================
    // Gateway
    // =========================================================================

    /// Get the gateway's address and peers
    ///
    /// GET /gateway
    pub async fn gateway(&self) -> SiadResult<GatewayGet> {
        let response = self.get("gateway")?.send().await?;
        decode(response).await
    }

    // =========================================================================
    // Host
    // =========================================================================

    /// Get host settings and metrics
    ///
    /// GET /host
    pub async fn host(&self) -> SiadResult<HostGet> {
        let response = self.get("host")?.send().await?;
        decode(response).await
    }

    /// Toggle whether the host accepts new contracts
    ///
    /// POST /host
    pub async fn host_accept_contracts(&self, accepting: bool) -> SiadResult<()> {
        let response = self
            .post("host")?
            .form(&[("acceptingcontracts", accepting.to_string())])
            .send()
            .await?;
        expect_success(response).await
    }

    /// Announce the host on the blockchain
    ///
    /// POST /host/announce
    pub async fn host_announce(&self) -> SiadResult<()> {
        let response = self.post("host/announce")?.send().await?;
        expect_success(response).await
    }

    /// Add a storage folder to the host
    ///
    /// POST /host/storage/folders/add
    pub async fn host_add_storage_folder(&self, path: &str, size: u64) -> SiadResult<()> {
        let response = self
            .post("host/storage/folders/add")?
            .form(&[("path", path.to_string()), ("size", size.to_string())])
            .send()
            .await?;
        expect_success(response).await
    }

    // =========================================================================
    // Renter
    // =========================================================================

    /// Set the renter allowance, forming contracts as needed
    ///
    /// POST /renter
    pub async fn renter_set_allowance(&self, allowance: &Allowance) -> SiadResult<()> {
        let response = self
            .post("renter")?
            .form(&[
                ("funds", allowance.funds.to_string()),
                ("hosts", allowance.hosts.to_string()),
                ("period", allowance.period.to_string()),
                ("renewwindow", allowance.renewwindow.to_string()),
            ])
            .send()
            .await?;
        expect_success(response).await
    }

    /// List the renter's active contracts
    ///
    /// GET /renter/contracts
    pub async fn renter_contracts(&self) -> SiadResult<RenterContracts> {
        let response = self.get("renter/contracts")?.send().await?;
        decode(response).await
    }
}

/// Build the API base URL from a siad `--api-addr` value
///
/// siad accepts `:9980` meaning all interfaces; the client dials localhost.
fn api_base_url(api_addr: &str) -> SiadResult<Url> {
    let addr = api_addr.trim_end_matches('/');
    let url = if addr.contains("://") {
        format!("{addr}/")
    } else if addr.starts_with(':') {
        format!("http://localhost{addr}/")
    } else {
        format!("http://{addr}/")
    };
    Ok(Url::parse(&url)?)
}

async fn api_error(response: Response) -> SiadError {
    let status = response.status().as_u16();
    let error: ApiError = response
        .json()
        .await
        .unwrap_or(ApiError { message: None });
    SiadError::Api {
        message: error.message.unwrap_or_else(|| "Unknown error".into()),
        status,
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> SiadResult<T> {
    if !response.status().is_success() {
        return Err(api_error(response).await);
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| SiadError::UnexpectedResponse(e.to_string()))
}

async fn expect_success(response: Response) -> SiadResult<()> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(api_error(response).await)
    }
}
