//! siad API Types
//!
//! Response bodies for the handful of siad endpoints the ant drives.
//! Field names follow siad's JSON, which is all-lowercase without separators.
//! Every field the ant does not strictly need is `#[serde(default)]` so that
//! newer daemons with extra or missing fields still decode.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Height of a block in the chain
pub type BlockHeight = u64;

/// Block identifier (64 hex characters)
pub type BlockId = String;

/// Number of hastings in one siacoin (10^24)
pub const SIACOIN_PRECISION: u128 = 1_000_000_000_000_000_000_000_000;

/// An amount of hastings
///
/// siad encodes currency as a decimal string because values routinely
/// exceed 64 bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Currency(pub u128);

impl Currency {
    pub const ZERO: Currency = Currency(0);

    /// Convert a whole number of siacoins to hastings
    ///
    /// Saturates at `u128::MAX`, which is far beyond the total supply.
    pub const fn siacoins(sc: u64) -> Self {
        Currency((sc as u128).saturating_mul(SIACOIN_PRECISION))
    }

    pub fn hastings(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Currency {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Currency)
    }
}

impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error body returned by siad on non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: Option<String>,
}

/// Consensus state
/// Endpoint: GET /consensus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusGet {
    #[serde(default)]
    pub synced: bool,
    pub height: BlockHeight,
    /// Id of the block at `height`
    pub currentblock: BlockId,
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// Result of initializing a fresh wallet
/// Endpoint: POST /wallet/init
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInitPost {
    /// Seed phrase; also used as the wallet's encryption password
    pub primaryseed: String,
}

/// Wallet status and balances
/// Endpoint: GET /wallet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletGet {
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default)]
    pub confirmedsiacoinbalance: Currency,
    #[serde(default)]
    pub unconfirmedoutgoingsiacoins: Currency,
    #[serde(default)]
    pub unconfirmedincomingsiacoins: Currency,
}

/// CPU miner status
/// Endpoint: GET /miner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinerGet {
    #[serde(default)]
    pub blocksmined: u64,
    #[serde(default)]
    pub cpuhashrate: u64,
    #[serde(default)]
    pub cpumining: bool,
    #[serde(default)]
    pub staleblocksmined: u64,
}

/// A peer known to the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPeer {
    pub netaddress: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub inbound: bool,
}

/// Gateway status
/// Endpoint: GET /gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayGet {
    #[serde(default)]
    pub netaddress: String,
    #[serde(default)]
    pub peers: Vec<GatewayPeer>,
}

/// Settings the host advertises to renters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostExternalSettings {
    #[serde(default)]
    pub acceptingcontracts: bool,
    #[serde(default)]
    pub netaddress: String,
    #[serde(default)]
    pub remainingstorage: u64,
    #[serde(default)]
    pub totalstorage: u64,
}

/// Host financial counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostFinancialMetrics {
    #[serde(default)]
    pub contractcount: u64,
}

/// Host status
/// Endpoint: GET /host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostGet {
    #[serde(default)]
    pub externalsettings: HostExternalSettings,
    #[serde(default)]
    pub financialmetrics: HostFinancialMetrics,
}

/// A file contract held by the renter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenterContract {
    pub id: String,
    #[serde(default)]
    pub netaddress: String,
    #[serde(default)]
    pub renterfunds: Currency,
    #[serde(default)]
    pub endheight: BlockHeight,
}

/// Renter contracts
/// Endpoint: GET /renter/contracts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenterContracts {
    #[serde(default)]
    pub contracts: Option<Vec<RenterContract>>,
}

impl RenterContracts {
    /// siad reports an empty contract set as `null`
    pub fn count(&self) -> usize {
        self.contracts.as_ref().map_or(0, Vec::len)
    }
}

/// Renter allowance parameters
/// Endpoint: POST /renter
#[derive(Debug, Clone, Copy)]
pub struct Allowance {
    pub funds: Currency,
    pub hosts: u64,
    pub period: BlockHeight,
    pub renewwindow: BlockHeight,
}
