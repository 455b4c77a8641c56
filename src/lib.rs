//! # Playback Backend Facade
//!
//! Re-exports the workspace crates behind feature flags and wires the
//! default registry setup: every bundled codec registered in a
//! [`core_codec::CodecRegistry`], every bundled protocol in a
//! [`core_protocol::ProtocolRegistry`]. Hosts that need a custom mix
//! depend on the member crates directly instead.

pub use core_codec;

#[cfg(feature = "codecs")]
pub use codec_chiptune;
#[cfg(feature = "codecs")]
pub use codec_symphonia;

#[cfg(feature = "providers")]
pub use core_protocol;
#[cfg(feature = "providers")]
pub use provider_drive;
#[cfg(feature = "providers")]
pub use provider_local;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the process-wide log subscriber.
///
/// `RUST_LOG` overrides `default_filter`. Calling this more than once is a
/// no-op.
pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .ok();
}

/// Codec registry with every bundled format registered.
///
/// Packet-streaming formats come first, then the chiptune dump formats
/// rendered by `chip_engines`.
#[cfg(feature = "codecs")]
pub fn codec_registry(
    chip_engines: std::sync::Arc<dyn codec_chiptune::ChipEngineFactory>,
) -> core_codec::CodecRegistry {
    let mut registry = core_codec::CodecRegistry::new();
    codec_symphonia::register_all(&mut registry);
    codec_chiptune::register_all(&mut registry, chip_engines);
    registry
}

/// Protocol registry with every bundled source protocol registered.
#[cfg(feature = "providers")]
pub fn protocol_registry(
    http: std::sync::Arc<dyn core_protocol::HttpClient>,
    codecs: std::sync::Arc<core_codec::CodecRegistry>,
) -> core_protocol::ProtocolRegistry {
    let mut protocols = core_protocol::ProtocolRegistry::new();
    provider_local::register(&mut protocols, std::sync::Arc::clone(&codecs));
    provider_drive::register(&mut protocols, http, codecs);
    protocols
}
