// Adapters layer: concrete implementations for external systems (Atlassian API, storage, notifications).

pub mod http;
pub mod notify;
pub mod source;
pub mod storage;
