//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable, e.g.
/// `RUST_LOG=roomcull::tracer=trace` to see every room visit.
///
/// # Example
/// ```
/// roomcull::core::logging::init();
/// log::info!("Tracer ready");
/// ```
pub fn init() {
    // try_init so that tests and embedding hosts can call this more than once
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).try_init();
}
