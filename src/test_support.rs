/// Routes `tracing` output through the test harness.
///
/// Defaults to WARN, DEBUG for this crate; override with `RUST_LOG`.
pub(crate) fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("portalis=debug".parse().unwrap_or_default());
    // Another test may have installed it already.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_test_writer()
        .try_init();
}
