// Environment detection and logger configuration.

use std::sync::OnceLock;

/// Cached environment, resolved once per process.
static ENV: OnceLock<Env> = OnceLock::new();

/// Deployment environment. The engine only consults this for the `Secure`
/// cookie attribute: browsers drop Secure cookies on plain HTTP, which
/// would lock developers out of their local setups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Env {
    #[default]
    Dev,
    Prod,
}

impl Env {
    pub fn is_prod(self) -> bool {
        self == Env::Prod
    }
}

/// Detect the environment from `LUCIA_ENV` or `RUST_ENV` (in that order).
/// Anything that is not explicitly production counts as `Dev`.
pub fn detect_env() -> Env {
    *ENV.get_or_init(|| {
        let val = std::env::var("LUCIA_ENV")
            .or_else(|_| std::env::var("RUST_ENV"))
            .unwrap_or_default()
            .to_lowercase();

        match val.as_str() {
            "production" | "prod" => Env::Prod,
            _ => Env::Dev,
        }
    })
}

/// Initialize the `tracing` subscriber. Honors `RUST_LOG` when set;
/// otherwise logs the `lucia` crates at debug level in development and
/// info level in production.
///
/// Call this once at startup. Applications with their own subscriber
/// should skip it and configure the `lucia` target themselves.
pub fn init_logger() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if detect_env().is_prod() {
            EnvFilter::new("lucia=info")
        } else {
            EnvFilter::new("lucia=debug")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
