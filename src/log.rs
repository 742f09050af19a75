use tracing::Level;

/// Times an expression and reports the duration at debug level.
///
/// # Examples
/// `
/// let sum = measure! { 2 + 2 };
/// `
macro_rules! measure {
    ($code:expr) => {{
        let start = std::time::Instant::now();
        tracing::trace!("measuring {} ...", stringify!($code));
        let result = $code;
        tracing::debug!(
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "finished {}",
            stringify!($code)
        );
        result
    }};
}

pub(crate) use measure;

/// Installs a stderr subscriber. Verdicts go to stdout, so only warnings and
/// errors are shown here.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
