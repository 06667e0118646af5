pub mod catalog;
pub mod currency;
pub mod export;
pub mod flyers;
pub mod ledger;
pub mod message;
pub mod receipt;
pub mod report;
pub mod table;

pub use crate::domain::ports::{FlyerLookup, RateProvider, Storage};
pub use crate::utils::error::Result;
