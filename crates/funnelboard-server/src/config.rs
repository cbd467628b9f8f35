/// Re-export `Config` from `funnelboard-core` for use within this crate.
///
/// Environment parsing lives in the core crate so tests can build a `Config`
/// without going through the server.
pub use funnelboard_core::config::Config;
