//! Price Feed Contract
//!
//! Admin-pushed reserve asset price with its decimals exponent. Staleness is
//! the feeder's concern; the vault only reads `latest_price`.

use odra::prelude::*;
use odra::casper_types::U256;
use crate::errors::ProtocolError;

/// Largest decimals exponent accepted
const MAX_DECIMALS: u8 = 36;

/// Last pushed price
#[odra::odra_type]
pub struct PriceData {
    /// Integer price value
    pub price: U256,
    /// Decimal places for `price`
    pub decimals: u8,
    /// Update time in milliseconds
    pub timestamp: u64,
}

pub mod events {
    use odra::prelude::*;
    use odra::casper_types::U256;

    #[odra::event]
    pub struct PriceUpdated {
        pub price: U256,
        pub decimals: u8,
    }
}

/// Price feed for one reserve asset
#[odra::module(events = [events::PriceUpdated])]
pub struct PriceFeed {
    /// Admin address (price pusher)
    admin: Var<Address>,
    /// Latest price
    data: Var<PriceData>,
}

#[odra::module]
impl PriceFeed {
    /// Initialize with a first price, the deployer becomes admin
    pub fn init(&mut self, price: U256, decimals: u8) {
        self.admin.set(self.env().caller());
        self.store(price, decimals);
    }

    /// `(price, decimals)` of the reserve asset
    pub fn latest_price(&self) -> (U256, u8) {
        let data = self.get_price_data();
        (data.price, data.decimals)
    }

    pub fn get_price_data(&self) -> PriceData {
        match self.data.get() {
            Some(data) => data,
            None => self.env().revert(ProtocolError::InvalidPrice),
        }
    }

    /// Push a new price (admin only)
    pub fn set_price(&mut self, price: U256, decimals: u8) {
        if self.admin.get() != Some(self.env().caller()) {
            self.env().revert(ProtocolError::Unauthorized);
        }
        self.store(price, decimals);
    }

    fn store(&mut self, price: U256, decimals: u8) {
        if price.is_zero() || decimals > MAX_DECIMALS {
            self.env().revert(ProtocolError::InvalidPrice);
        }
        self.data.set(PriceData {
            price,
            decimals,
            timestamp: self.env().get_block_time(),
        });
        self.env().emit_event(events::PriceUpdated { price, decimals });
    }
}
