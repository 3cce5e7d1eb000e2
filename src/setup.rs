//! Process-wide initialisation, run once by the host at start-up.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALISED: AtomicBool = AtomicBool::new(false);

/// Install the tracing subscriber and compile the pattern tables.
///
/// Only the first call does anything; it returns `true`, later calls `false`.
pub fn init() -> bool {
    if INITIALISED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return false;
    }

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();

    warm_patterns();
    true
}

/// Compile every lazily-built regex so the first turn does not pay for it.
fn warm_patterns() {
    crate::parser::thought::thinking_regex();
    crate::parser::markers::warm();
    crate::parser::fenced::warm();
    crate::patch::block_regex();
    crate::preview::assembler::warm();
}
