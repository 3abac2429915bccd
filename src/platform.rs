//! Seam towards the hosting platform SDK.
//!
//! The platform pushes identity, context, visibility and broadcast events into
//! a controller's event queue. The controller only tells it when to start and
//! stop delivering broadcast payloads.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Listener registration on the platform's broadcast topic
pub trait Platform: Send + Sync {
    fn listen_broadcast(&self);
    fn unlisten_broadcast(&self);
}

/// Platform that only records registrations.
///
/// Used when events are injected by hand (the developer rig, tests).
#[derive(Debug, Default)]
pub struct ManualPlatform {
    listens: AtomicUsize,
    listening: AtomicBool,
}

impl ManualPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times a broadcast listener was registered
    pub fn listen_count(&self) -> usize {
        self.listens.load(Ordering::SeqCst)
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }
}

impl Platform for ManualPlatform {
    fn listen_broadcast(&self) {
        self.listens.fetch_add(1, Ordering::SeqCst);
        self.listening.store(true, Ordering::SeqCst);
        tracing::debug!("Broadcast listener registered");
    }

    fn unlisten_broadcast(&self) {
        self.listening.store(false, Ordering::SeqCst);
        tracing::debug!("Broadcast listener removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_platform_tracks_registration() {
        let platform = ManualPlatform::new();
        assert!(!platform.is_listening());

        platform.listen_broadcast();
        assert!(platform.is_listening());
        assert_eq!(platform.listen_count(), 1);

        platform.unlisten_broadcast();
        assert!(!platform.is_listening());
        assert_eq!(platform.listen_count(), 1);
    }
}
