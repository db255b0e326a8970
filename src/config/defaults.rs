pub(super) const DEFAULT_ENGINE_CMD: &str = "modalmate-engine";
pub(super) const ENGINE_ALLOWLIST: &[&str] = &[DEFAULT_ENGINE_CMD];

pub const DEFAULT_ROUTER_TIMEOUT_MS: u64 = 50;
pub const MIN_ROUTER_TIMEOUT_MS: u64 = 1;
pub const MAX_ROUTER_TIMEOUT_MS: u64 = 5_000;

pub const DEFAULT_MAX_QUERY_ROUNDS: usize = 16;
pub const MAX_QUERY_ROUNDS_LIMIT: usize = 128;

/// Keep argv small when forwarding engine arguments.
pub(super) const MAX_ENGINE_ARGS: usize = 64;
pub(super) const MAX_ENGINE_ARG_BYTES: usize = 8 * 1024;
