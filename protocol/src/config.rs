//! # Protocol Configuration & Constants
//!
//! Every magic number in TimeVault lives here. Fee arithmetic, name limits,
//! and the version string are read from these constants by the engine and
//! the node, so a change here is a change everywhere.

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// Engine version reported by the node's `/status` endpoint and `version`
/// subcommand.
pub const ENGINE_VERSION: &str = "0.1.0";

/// Domain separation tag mixed into vault address derivation. Changing it
/// changes every derived vault address, so don't.
pub const VAULT_ADDRESS_DOMAIN: &[u8] = b"timevault.vault";

// ---------------------------------------------------------------------------
// Fee Parameters
// ---------------------------------------------------------------------------

/// Basis point denominator. 1 bp = 1/10000.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Ceiling for the protocol fee: 1000 bps = 10%.
pub const MAX_PROTOCOL_FEE_BPS: u16 = 1_000;

/// Protocol fee a freshly created registry starts with: 50 bps = 0.5%.
pub const DEFAULT_PROTOCOL_FEE_BPS: u16 = 50;

/// Ceiling for a fixed emergency penalty rate. A penalty can take the whole
/// balance but never more.
pub const MAX_PENALTY_BPS: u16 = 10_000;

// ---------------------------------------------------------------------------
// Vault Limits
// ---------------------------------------------------------------------------

/// Maximum vault display name length in bytes. Enough for "Summer trip 2027",
/// not enough for a manifesto.
pub const MAX_VAULT_NAME_LENGTH: usize = 128;

/// Applies a basis-point rate to an amount, rounding down.
///
/// The product is computed in `u128` so that `amount * bps` can never
/// overflow, and the result is always `<= amount` for `bps <= 10_000`.
pub fn apply_bps(amount: u64, bps: u16) -> u64 {
    let scaled = u128::from(amount) * u128::from(bps) / u128::from(BPS_DENOMINATOR);
    // bps is capped at the denominator by every caller, so this fits.
    u64::try_from(scaled).unwrap_or(amount)
}
