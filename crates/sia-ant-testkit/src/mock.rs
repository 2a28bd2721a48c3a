//! Mock siad API for unit and integration tests
//!
//! [`MockSiad`] binds an axum server to an ephemeral localhost port and
//! answers the siad endpoints the ant drives. Its [`MockState`] is shared with
//! the test, which can flip failure switches and inspect what the ant did.
//!
//! # Example
//!
//! ```rust,no_run
//! use sia_ant_testkit::mock::MockSiad;
//!
//! # async fn example() {
//! let siad = MockSiad::start().await;
//! siad.state().set_peers(vec!["10.0.0.2:9981".into()]);
//!
//! // point a client at siad.api_addr() ...
//! assert_eq!(siad.state().request_count("/gateway"), 0);
//! # }
//! ```

use axum::{
    Form, Json, Router,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::random::{PseudoGenerator, random_seed};

/// Shared, inspectable state of a mock siad
#[derive(Debug, Clone)]
pub struct MockState {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug)]
struct Inner {
    requests: HashMap<String, usize>,
    ready: bool,
    primary_seed: String,
    fail_wallet_init: bool,
    fail_daemon_stop: bool,
    failing: bool,
    unlocked: bool,
    unlock_passwords: Vec<String>,
    balance: u128,
    height: u64,
    current_block: String,
    netaddress: String,
    peers: Vec<String>,
    mining: bool,
    accepting_contracts: bool,
    announced: bool,
    storage_folders: Vec<(String, u64)>,
    allowance: Option<HashMap<String, String>>,
    contracts: usize,
}

impl MockState {
    /// Fresh node state with a random wallet seed and genesis tip
    pub fn new() -> Self {
        Self::with_seed(random_seed())
    }

    /// Like [`MockState::new`] but reproducible
    pub fn with_seed(seed: u64) -> Self {
        let mut rng = PseudoGenerator::new(seed);
        Self {
            inner: Arc::new(RwLock::new(Inner {
                requests: HashMap::new(),
                ready: true,
                primary_seed: rng.random_seed_phrase(),
                fail_wallet_init: false,
                fail_daemon_stop: false,
                failing: false,
                unlocked: false,
                unlock_passwords: Vec::new(),
                balance: 0,
                height: 0,
                current_block: rng.random_block_id(),
                netaddress: "127.0.0.1:9981".to_string(),
                peers: Vec::new(),
                mining: false,
                accepting_contracts: false,
                announced: false,
                storage_folders: Vec::new(),
                allowance: None,
                contracts: 0,
            })),
        }
    }

    fn record(&self, path: &str) {
        *self.inner.write().requests.entry(path.to_string()).or_default() += 1;
    }

    /// Number of requests received for `path` (e.g. "/wallet/init")
    pub fn request_count(&self, path: &str) -> usize {
        self.inner.read().requests.get(path).copied().unwrap_or(0)
    }

    /// Number of requests received on any path
    pub fn total_requests(&self) -> usize {
        self.inner.read().requests.values().sum()
    }

    /// While not ready, `/consensus` answers 503 like a daemon still loading
    pub fn set_ready(&self, ready: bool) {
        self.inner.write().ready = ready;
    }

    pub fn primary_seed(&self) -> String {
        self.inner.read().primary_seed.clone()
    }

    pub fn fail_wallet_init(&self, fail: bool) {
        self.inner.write().fail_wallet_init = fail;
    }

    pub fn fail_daemon_stop(&self, fail: bool) {
        self.inner.write().fail_daemon_stop = fail;
    }

    /// While failing, every endpoint answers 500
    pub fn set_failing(&self, failing: bool) {
        self.inner.write().failing = failing;
    }

    pub fn is_unlocked(&self) -> bool {
        self.inner.read().unlocked
    }

    /// Every password sent to `/wallet/unlock`, in order
    pub fn unlock_passwords(&self) -> Vec<String> {
        self.inner.read().unlock_passwords.clone()
    }

    /// Confirmed balance in hastings
    pub fn set_balance(&self, hastings: u128) {
        self.inner.write().balance = hastings;
    }

    pub fn balance(&self) -> u128 {
        self.inner.read().balance
    }

    /// Move the consensus tip
    pub fn set_tip(&self, height: u64, block_id: impl Into<String>) {
        let mut inner = self.inner.write();
        inner.height = height;
        inner.current_block = block_id.into();
    }

    pub fn set_peers(&self, peers: Vec<String>) {
        self.inner.write().peers = peers;
    }

    pub fn is_mining(&self) -> bool {
        self.inner.read().mining
    }

    pub fn is_accepting_contracts(&self) -> bool {
        self.inner.read().accepting_contracts
    }

    pub fn is_announced(&self) -> bool {
        self.inner.read().announced
    }

    /// Storage folders added to the host as `(path, size)`
    pub fn storage_folders(&self) -> Vec<(String, u64)> {
        self.inner.read().storage_folders.clone()
    }

    /// Last allowance posted to `/renter`, as raw form fields
    pub fn allowance(&self) -> Option<HashMap<String, String>> {
        self.inner.read().allowance.clone()
    }

    pub fn set_contracts(&self, count: usize) {
        self.inner.write().contracts = count;
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new()
    }
}

/// A running mock siad
///
/// The server task is aborted on drop.
#[derive(Debug)]
pub struct MockSiad {
    addr: SocketAddr,
    state: MockState,
    server: JoinHandle<()>,
}

impl MockSiad {
    /// Start a mock with fresh state
    pub async fn start() -> Self {
        Self::start_with(MockState::new()).await
    }

    /// Start a mock serving the given state
    pub async fn start_with(state: MockState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock siad listener");
        let addr = listener.local_addr().expect("mock siad local address");
        let app = router(state.clone());

        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!(error = %e, "Mock siad server exited");
            }
        });
        tracing::debug!(%addr, "Mock siad listening");

        Self {
            addr,
            state,
            server,
        }
    }

    /// Address in siad's `--api-addr` form (`127.0.0.1:port`)
    pub fn api_addr(&self) -> String {
        self.addr.to_string()
    }

    pub fn state(&self) -> &MockState {
        &self.state
    }
}

impl Drop for MockSiad {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: MockState) -> Router {
    Router::new()
        .route("/consensus", get(consensus))
        .route("/daemon/stop", get(daemon_stop))
        .route("/wallet", get(wallet))
        .route("/wallet/init", post(wallet_init))
        .route("/wallet/unlock", post(wallet_unlock))
        .route("/miner", get(miner))
        .route("/miner/start", get(miner_start))
        .route("/miner/stop", get(miner_stop))
        .route("/gateway", get(gateway))
        .route("/host", get(host).post(host_update))
        .route("/host/announce", post(host_announce))
        .route("/host/storage/folders/add", post(host_add_folder))
        .route("/renter", post(renter_allowance))
        .route("/renter/contracts", get(renter_contracts))
        .layer(middleware::from_fn_with_state(state.clone(), sia_agent))
        .with_state(state)
}

/// Count the request and enforce siad's user agent check
async fn sia_agent(State(state): State<MockState>, request: Request, next: Next) -> Response {
    state.record(request.uri().path());

    let agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !agent.contains("Sia-Agent") {
        return api_error(
            StatusCode::BAD_REQUEST,
            "Browser access disabled due to security vulnerability. Use Sia-UI or siac.",
        );
    }
    if state.inner.read().failing {
        return api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error");
    }
    next.run(request).await
}

fn api_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

async fn consensus(State(state): State<MockState>) -> Response {
    let inner = state.inner.read();
    if !inner.ready {
        return api_error(StatusCode::SERVICE_UNAVAILABLE, "siad is still loading");
    }
    Json(json!({
        "synced": true,
        "height": inner.height,
        "currentblock": inner.current_block,
        "difficulty": "1",
    }))
    .into_response()
}

async fn daemon_stop(State(state): State<MockState>) -> Response {
    if state.inner.read().fail_daemon_stop {
        return api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to stop");
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn wallet_init(State(state): State<MockState>) -> Response {
    let inner = state.inner.read();
    if inner.fail_wallet_init {
        return api_error(StatusCode::BAD_REQUEST, "wallet has already been encrypted");
    }
    Json(json!({ "primaryseed": inner.primary_seed })).into_response()
}

async fn wallet_unlock(
    State(state): State<MockState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let mut inner = state.inner.write();
    let password = form.get("encryptionpassword").cloned().unwrap_or_default();
    inner.unlock_passwords.push(password.clone());

    if password != inner.primary_seed {
        return api_error(StatusCode::BAD_REQUEST, "provided encryption key is incorrect");
    }
    inner.unlocked = true;
    StatusCode::NO_CONTENT.into_response()
}

async fn wallet(State(state): State<MockState>) -> Json<serde_json::Value> {
    let inner = state.inner.read();
    Json(json!({
        "encrypted": true,
        "unlocked": inner.unlocked,
        "confirmedsiacoinbalance": inner.balance.to_string(),
        "unconfirmedoutgoingsiacoins": "0",
        "unconfirmedincomingsiacoins": "0",
    }))
}

async fn miner(State(state): State<MockState>) -> Json<serde_json::Value> {
    let mining = state.inner.read().mining;
    Json(json!({
        "blocksmined": 0,
        "cpuhashrate": if mining { 1000 } else { 0 },
        "cpumining": mining,
        "staleblocksmined": 0,
    }))
}

async fn miner_start(State(state): State<MockState>) -> StatusCode {
    state.inner.write().mining = true;
    StatusCode::NO_CONTENT
}

async fn miner_stop(State(state): State<MockState>) -> StatusCode {
    state.inner.write().mining = false;
    StatusCode::NO_CONTENT
}

async fn gateway(State(state): State<MockState>) -> Json<serde_json::Value> {
    let inner = state.inner.read();
    let peers: Vec<_> = inner
        .peers
        .iter()
        .map(|p| json!({ "netaddress": p, "version": "1.3.0", "inbound": false }))
        .collect();
    Json(json!({ "netaddress": inner.netaddress, "peers": peers }))
}

async fn host(State(state): State<MockState>) -> Json<serde_json::Value> {
    let inner = state.inner.read();
    let total: u64 = inner.storage_folders.iter().map(|(_, size)| size).sum();
    Json(json!({
        "externalsettings": {
            "acceptingcontracts": inner.accepting_contracts,
            "netaddress": inner.netaddress,
            "remainingstorage": total,
            "totalstorage": total,
        },
        "financialmetrics": { "contractcount": inner.contracts },
    }))
}

async fn host_update(
    State(state): State<MockState>,
    Form(form): Form<HashMap<String, String>>,
) -> StatusCode {
    if let Some(accepting) = form.get("acceptingcontracts") {
        state.inner.write().accepting_contracts = accepting == "true";
    }
    StatusCode::NO_CONTENT
}

async fn host_announce(State(state): State<MockState>) -> Response {
    let mut inner = state.inner.write();
    if !inner.unlocked {
        return api_error(StatusCode::BAD_REQUEST, "wallet must be unlocked before it can be used");
    }
    inner.announced = true;
    StatusCode::NO_CONTENT.into_response()
}

async fn host_add_folder(
    State(state): State<MockState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let path = form.get("path").cloned().unwrap_or_default();
    let Some(size) = form.get("size").and_then(|s| s.parse::<u64>().ok()) else {
        return api_error(StatusCode::BAD_REQUEST, "could not read 'size'");
    };
    state.inner.write().storage_folders.push((path, size));
    StatusCode::NO_CONTENT.into_response()
}

async fn renter_allowance(
    State(state): State<MockState>,
    Form(form): Form<HashMap<String, String>>,
) -> StatusCode {
    state.inner.write().allowance = Some(form);
    StatusCode::NO_CONTENT
}

async fn renter_contracts(State(state): State<MockState>) -> Json<serde_json::Value> {
    let count = state.inner.read().contracts;
    if count == 0 {
        return Json(json!({ "contracts": null }));
    }
    let contracts: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "id": format!("{i:064x}"),
                "netaddress": format!("10.0.0.{}:9982", i + 1),
                "renterfunds": "1000",
                "endheight": 100,
            })
        })
        .collect();
    Json(json!({ "contracts": contracts }))
}
