//! Port implementations against real infrastructure.

mod rpc;

pub use rpc::{registry_id, RpcChain};
