//! Protocol settings: global parameter defaults with per-vault overrides.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::errors::ProtocolError;
use crate::types::{
    one, ratio, VaultParams, PARAM_AARC, PARAM_AARS, PARAM_AART, PARAM_AARU, PARAM_BASIS_R,
    PARAM_C1, PARAM_C2, PARAM_CIRCUIT_BREAK_PERIOD, PARAM_KEYS, PARAM_PTY_POOL_INTEREST_SHARE,
    PARAM_PTY_POOL_YIELDS_SPLIT, PARAM_RATE_R, PARAM_Y, SECONDS_PER_HOUR,
};

const DECIMALS: u8 = 18;

/// Default value and allowed range of a parameter
#[odra::odra_type]
pub struct ParamConfig {
    pub default_value: U256,
    pub min: U256,
    pub max: U256,
}

pub mod events {
    use odra::prelude::*;
    use odra::casper_types::U256;

    #[odra::event]
    pub struct ParamConfigUpdated {
        pub key: String,
        pub default_value: U256,
        pub min: U256,
        pub max: U256,
    }

    #[odra::event]
    pub struct VaultParamUpdated {
        pub vault: Address,
        pub key: String,
        pub value: U256,
    }

    #[odra::event]
    pub struct TreasuryUpdated {
        pub treasury: Address,
    }
}

/// Settings contract shared by every vault
#[odra::module(events = [
    events::ParamConfigUpdated,
    events::VaultParamUpdated,
    events::TreasuryUpdated
])]
pub struct ProtocolSettings {
    /// Protocol admin address
    admin: Var<Address>,
    /// Fee recipient
    treasury: Var<Address>,
    /// Parameter defaults and bounds by key
    param_configs: Mapping<String, ParamConfig>,
    /// Per-vault override values
    vault_values: Mapping<(Address, String), U256>,
    /// Whether a per-vault override exists
    vault_value_set: Mapping<(Address, String), bool>,
}

#[odra::module]
impl ProtocolSettings {
    /// Initialize with the default parameter set, the deployer becomes admin
    pub fn init(&mut self, treasury: Address) {
        self.admin.set(self.env().caller());
        self.treasury.set(treasury);

        let defaults = VaultParams::default();
        for key in PARAM_KEYS {
            let (min, max) = default_bounds(key);
            let config = ParamConfig {
                default_value: defaults.get(key).unwrap_or_default(),
                min,
                max,
            };
            self.param_configs.set(&String::from(key), config);
        }
    }

    // ========== Queries ==========

    pub fn decimals(&self) -> u8 {
        DECIMALS
    }

    pub fn treasury(&self) -> Address {
        match self.treasury.get() {
            Some(treasury) => treasury,
            None => self.env().revert(ProtocolError::NotConfigured),
        }
    }

    pub fn get_admin(&self) -> Option<Address> {
        self.admin.get()
    }

    pub fn param_config(&self, key: String) -> Option<ParamConfig> {
        self.param_configs.get(&key)
    }

    /// Effective value of `key` for `vault`
    pub fn vault_param_value(&self, vault: Address, key: String) -> U256 {
        let config = match self.param_configs.get(&key) {
            Some(config) => config,
            None => self.env().revert(ProtocolError::InvalidParam),
        };
        let slot = (vault, key);
        if self.vault_value_set.get(&slot).unwrap_or(false) {
            self.vault_values.get(&slot).unwrap_or_default()
        } else {
            config.default_value
        }
    }

    /// Every effective parameter of `vault`
    pub fn vault_params(&self, vault: Address) -> VaultParams {
        let mut params = VaultParams::default();
        for key in PARAM_KEYS {
            params.set(key, self.vault_param_value(vault, String::from(key)));
        }
        params
    }

    // ========== Admin Functions ==========

    /// Create or replace the default and bounds of a parameter (admin only)
    ///
    /// The default threshold set must keep `AARC < AARS < AART < AARU`.
    pub fn upsert_param_config(&mut self, key: String, default_value: U256, min: U256, max: U256) {
        self.require_admin();
        if !PARAM_KEYS.contains(&key.as_str()) {
            self.env().revert(ProtocolError::InvalidParam);
        }
        if min > max || default_value < min || default_value > max {
            self.env().revert(ProtocolError::InvalidParamValue);
        }

        let mut defaults = self.default_params();
        defaults.set(&key, default_value);
        if !defaults.thresholds_ordered() {
            self.env().revert(ProtocolError::InvalidParamOrdering);
        }

        self.param_configs.set(&key, ParamConfig { default_value, min, max });
        self.env().emit_event(events::ParamConfigUpdated {
            key,
            default_value,
            min,
            max,
        });
    }

    /// Override a parameter for one vault (admin only)
    ///
    /// Rejects values outside the configured bounds and threshold sets that
    /// break `AARC < AARS < AART < AARU`.
    pub fn update_vault_param_value(&mut self, vault: Address, key: String, value: U256) {
        self.require_admin();
        let config = match self.param_configs.get(&key) {
            Some(config) => config,
            None => self.env().revert(ProtocolError::InvalidParam),
        };
        if value < config.min || value > config.max {
            self.env().revert(ProtocolError::InvalidParamValue);
        }

        let mut params = self.vault_params(vault);
        params.set(&key, value);
        if !params.thresholds_ordered() {
            self.env().revert(ProtocolError::InvalidParamOrdering);
        }

        let slot = (vault, key.clone());
        self.vault_values.set(&slot, value);
        self.vault_value_set.set(&slot, true);
        self.env().emit_event(events::VaultParamUpdated { vault, key, value });
    }

    /// Set the fee recipient (admin only)
    pub fn set_treasury(&mut self, treasury: Address) {
        self.require_admin();
        self.treasury.set(treasury);
        self.env().emit_event(events::TreasuryUpdated { treasury });
    }

    fn default_params(&self) -> VaultParams {
        let mut params = VaultParams::default();
        for key in PARAM_KEYS {
            if let Some(config) = self.param_configs.get(&String::from(key)) {
                params.set(key, config.default_value);
            }
        }
        params
    }

    fn require_admin(&self) {
        if self.admin.get() != Some(self.env().caller()) {
            self.env().revert(ProtocolError::Unauthorized);
        }
    }
}

/// Allowed range of each parameter
fn default_bounds(key: &str) -> (U256, U256) {
    match key {
        PARAM_Y => (U256::zero(), ratio(5, 1)),
        PARAM_AARU | PARAM_AART | PARAM_AARS | PARAM_AARC => (ratio(101, 2), one() * 10),
        PARAM_C1 | PARAM_C2 => (U256::zero(), ratio(1, 1)),
        PARAM_BASIS_R => (U256::zero(), one() * 10),
        PARAM_RATE_R => (U256::zero(), one()),
        PARAM_CIRCUIT_BREAK_PERIOD => (U256::one(), U256::from(30 * 24 * SECONDS_PER_HOUR)),
        PARAM_PTY_POOL_INTEREST_SHARE | PARAM_PTY_POOL_YIELDS_SPLIT => (U256::zero(), one()),
        _ => (U256::zero(), U256::zero()),
    }
}
