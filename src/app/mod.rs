pub mod tracker;

pub use tracker::{ManualPurchase, OcrOutcome, PurchaseOutcome, ReceiptOutcome, Tracker};
