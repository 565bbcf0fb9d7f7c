//! logsync-evm — EVM log source, ABI decoder, and engine builder.

pub mod builder;
pub mod decoder;
pub mod fetcher;
pub mod fingerprint;

pub use builder::EngineBuilder;
pub use decoder::AbiLogDecoder;
pub use fetcher::{EvmLogSource, EvmRpcClient, RawLog};
