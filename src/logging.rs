// src/logging.rs
//! Tracing setup for binaries, plus the anonymized id used instead of raw report text.

use sha2::{Digest, Sha256};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "civic_report_classifier=info,warn";

/// Install a global subscriber. `RUST_LOG` wins over the default filter;
/// `LOG_FORMAT=json` switches to JSON lines. Safe to call twice (second call is a no-op).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

/// First 6 bytes of SHA-256 as hex. Never log raw description text; log this.
pub fn anon_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
