// Build-time identity from Cargo.toml (GET /version, agent user agent)

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");
