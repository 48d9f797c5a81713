// Adapters layer: concrete implementations of the domain ports (HTTP providers, stores).

pub mod http;
pub mod storage;
