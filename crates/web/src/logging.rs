use tracing::{Level, warn};
use tracing_subscriber::FmtSubscriber;

/// Installs a `fmt` subscriber as the global default.
///
/// Returns `false` when a global subscriber was already set, which is logged
/// through that subscriber and otherwise ignored.
pub fn init(level: Level) -> bool {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => true,
        Err(e) => {
            warn!(cause = %e, "global subscriber already set, keeping it");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_not_fatal() {
        init(Level::DEBUG);
        assert!(!init(Level::INFO));
    }
}
