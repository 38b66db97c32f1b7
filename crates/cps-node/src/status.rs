use cps_core::Network;
use serde::Serialize;

/// Operator-facing snapshot of the checkpoint subsystem (RPC / status page).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckpointStatus {
    pub network: Network,
    /// Accepted checkpoint hash, all zeros when none
    pub synccheckpoint: String,
    pub height: Option<u64>,
    pub timestamp: Option<u64>,
    pub pending: Option<String>,
    pub invalid: Option<String>,
    pub enforced: bool,
    pub warning: String,
    pub mature: bool,
    pub too_old: bool,
    /// Node holds the master private key
    pub authority: bool,
    pub public_key: String,
}
