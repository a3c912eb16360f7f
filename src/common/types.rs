//! Shared type aliases used across the adapter and submission layers.

/// Non-blocking RPC client, passed around behind an `Arc` by the pool.
pub type SolanaRpcClient = solana_client::nonblocking::rpc_client::RpcClient;

/// Convenience alias for functions that bridge into third-party error types
/// before being folded into an `EngineError` at the public boundary.
pub type AnyResult<T> = anyhow::Result<T>;
