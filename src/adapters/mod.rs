// Adapters layer: concrete implementations for external systems (files, CNB, n8n).

pub mod cnb;
pub mod n8n;
pub mod storage;
