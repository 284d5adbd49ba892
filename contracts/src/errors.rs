//! Protocol error definitions.

use odra::prelude::*;

/// Result type for the pure calculators
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// USB protocol errors
#[repr(u16)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProtocolError {
    // Vault errors (1xx)
    AarBelowSafeThreshold = 100,
    AarBelow100Percent = 101,
    AarBelowCircuitBreakerLineThreshold = 102,
    ConditionalDiscountPurchaseSuspended = 103,
    VaultNotAtAdjustmentAboveAaruPhase = 104,
    VaultNotAtAdjustmentBelowAarsPhase = 105,
    TooLargeUsbAmount = 106,
    TooLargeLeveragedTokenAmount = 107,
    ZeroAmount = 108,
    EmptyVault = 109,
    ArithmeticOverflow = 110,

    // Access control errors (2xx)
    Unauthorized = 200,
    UnauthorizedVault = 201,
    AlreadySet = 202,
    NotConfigured = 203,

    // Token errors (3xx)
    InsufficientBalance = 300,
    InsufficientAllowance = 301,
    InvalidLedgerState = 302,

    // PtyPool errors (4xx)
    InsufficientStakingBalance = 400,

    // Interest pool errors (5xx)
    InvalidRewardToken = 500,
    NoStakingAmount = 501,
    RewardTokenIsStakingToken = 502,

    // Configuration errors (6xx)
    InvalidParam = 600,
    InvalidParamValue = 601,
    InvalidParamOrdering = 602,

    // Oracle errors (7xx)
    InvalidPrice = 700,
}

impl ProtocolError {
    pub const fn message(&self) -> &'static str {
        match self {
            // Vault
            ProtocolError::AarBelowSafeThreshold => "AAR Below Safe Threshold",
            ProtocolError::AarBelow100Percent => "AAR Below 100%",
            ProtocolError::AarBelowCircuitBreakerLineThreshold => {
                "AAR Below Circuit Breaker AAR Threshold"
            }
            ProtocolError::ConditionalDiscountPurchaseSuspended => {
                "Conditional Discount Purchase suspended"
            }
            ProtocolError::VaultNotAtAdjustmentAboveAaruPhase => {
                "Vault not at adjustment above AARU phase"
            }
            ProtocolError::VaultNotAtAdjustmentBelowAarsPhase => {
                "Vault not at adjustment below AARS phase"
            }
            ProtocolError::TooLargeUsbAmount => "Too large $USB amount",
            ProtocolError::TooLargeLeveragedTokenAmount => "Too large leveraged token amount",
            ProtocolError::ZeroAmount => "Amount must be greater than 0",
            ProtocolError::EmptyVault => "Vault holds no leveraged token supply",
            ProtocolError::ArithmeticOverflow => "Arithmetic overflow",

            // Access control
            ProtocolError::Unauthorized => "Unauthorized: caller is not admin",
            ProtocolError::UnauthorizedVault => "Unauthorized: caller is not the vault",
            ProtocolError::AlreadySet => "Address already set",
            ProtocolError::NotConfigured => "Dependency not configured",

            // Token
            ProtocolError::InsufficientBalance => "Insufficient token balance",
            ProtocolError::InsufficientAllowance => "Insufficient allowance",
            ProtocolError::InvalidLedgerState => "Share ledger has shares but no supply",

            // PtyPool
            ProtocolError::InsufficientStakingBalance => "PtyPool: insufficient staking balance",

            // Interest pool
            ProtocolError::InvalidRewardToken => "Invalid reward token",
            ProtocolError::NoStakingAmount => "No staking amount",
            ProtocolError::RewardTokenIsStakingToken => "Reward token cannot be the staking token",

            // Config
            ProtocolError::InvalidParam => "Invalid param",
            ProtocolError::InvalidParamValue => "Invalid param value",
            ProtocolError::InvalidParamOrdering => "AARC < AARS < AART < AARU violated",

            // Oracle
            ProtocolError::InvalidPrice => "Invalid price",
        }
    }
}

impl core::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

impl From<ProtocolError> for OdraError {
    fn from(error: ProtocolError) -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            OdraError::user(error as u16)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            OdraError::user(error as u16, error.message())
        }
    }
}
