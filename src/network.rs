//! Network URL constants and protocol defaults.

use std::time::Duration;

/// Default Solana JSON-RPC endpoint.
pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Kamino REST API (lend markets, vaults, liquidity strategies, transaction builder).
pub const DEFAULT_KAMINO_API_URL: &str = "https://api.kamino.finance";

/// Kamino main lending market.
pub const DEFAULT_KAMINO_MARKET: &str = "7u3HeHxYDLhnCoErrtycNokbQYbWGzLs6JSDqGAv5PfF";

/// MarginFi REST API (banks, markets, accounts).
pub const DEFAULT_MARGINFI_API_URL: &str = "https://api.marginfi.com";

/// Meteora DLMM API.
pub const DEFAULT_METEORA_DLMM_API_URL: &str = "https://dlmm-api.meteora.ag";

/// Meteora dynamic AMM API.
pub const DEFAULT_METEORA_AMM_API_URL: &str = "https://amm-v2.meteora.ag";

/// DexScreener market-data API.
pub const DEFAULT_DEXSCREENER_API_URL: &str = "https://api.dexscreener.com";

/// RugCheck token-safety API.
pub const DEFAULT_RUGCHECK_API_URL: &str = "https://api.rugcheck.xyz";

/// Upper bound for a single upstream request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Interval between wallet balance polls while connected.
pub const DEFAULT_BALANCE_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Smallest on-chain units per SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;
