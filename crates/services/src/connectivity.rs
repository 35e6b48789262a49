use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

/// Online/offline signal consulted before any network send.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// A settable online flag.
#[derive(Debug)]
pub struct ConnectivityFlag {
    online: AtomicBool,
}

impl ConnectivityFlag {
    #[must_use]
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    /// Online unless `ROGAINE_ONLINE=0`.
    #[must_use]
    pub fn from_env() -> Self {
        let forced_offline = env::var("ROGAINE_ONLINE").is_ok_and(|v| v.trim() == "0");
        Self::new(!forced_offline)
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for ConnectivityFlag {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }
}
