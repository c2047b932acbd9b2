use tracing_subscriber::EnvFilter;

const DEBUG_VAR: &str = "COUCHVIEW_DEBUG";

/// Whether `COUCHVIEW_DEBUG` is set to `1` or `true`.
pub fn debug_requested() -> bool {
    std::env::var(DEBUG_VAR)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Filter used by [`init`]: this crate at `debug` when debug mode is
/// requested, otherwise whatever `RUST_LOG` says (default `warn`).
pub fn env_filter() -> EnvFilter {
    if debug_requested() {
        EnvFilter::new("warn,couchview=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

/// Install a `fmt` subscriber on stderr. Safe to call more than once; only
/// the first call (or an application's own subscriber) wins.
pub fn init() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();
    if installed && debug_requested() {
        tracing::debug!("debug logging enabled via {DEBUG_VAR}");
    }
}
