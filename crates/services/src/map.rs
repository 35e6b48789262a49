//! Single owner of the embedded map.
//!
//! The map library is expensive to load and its widget keeps rendering state
//! in its surface, so one surface and one widget live for the lifetime of the
//! manager. Views borrow them with `attach` and hand them back with `park`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::error::MapError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostId(String);

impl HostId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapOptions {
    pub center: Option<LatLng>,
    pub zoom: Option<f64>,
    pub gesture_handling: Option<String>,
}

/// A container the surface can be placed in.
pub trait HostElement: Send + Sync {
    fn id(&self) -> HostId;
    /// Remove everything currently inside the host.
    fn clear(&self);
}

/// The element the widget renders into.
pub trait MapSurface: Send + Sync {
    fn parent(&self) -> Option<HostId>;
    /// Move the surface under `host`, detaching it from its current parent.
    fn move_to(&self, host: &dyn HostElement);
}

pub trait MapWidget: Send + Sync {
    fn set_options(&self, options: &MapOptions);
    fn set_center(&self, center: LatLng);
    fn set_zoom(&self, zoom: f64);
}

/// The external map library.
#[async_trait]
pub trait MapProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `MapError::Load` if the library cannot be loaded.
    async fn load(&self) -> Result<(), MapError>;
    fn create_surface(&self) -> Arc<dyn MapSurface>;
    /// Hidden container that keeps the surface alive between views.
    fn parking_host(&self) -> Arc<dyn HostElement>;
    fn create_map(&self, surface: &Arc<dyn MapSurface>, options: &MapOptions)
    -> Arc<dyn MapWidget>;
}

#[derive(Default)]
struct MapSlot {
    surface: Option<Arc<dyn MapSurface>>,
    widget: Option<Arc<dyn MapWidget>>,
    parking: Option<Arc<dyn HostElement>>,
}

pub struct MapResourceManager {
    provider: Arc<dyn MapProvider>,
    loaded: OnceCell<()>,
    slot: Mutex<MapSlot>,
    last_ticket: AtomicU64,
}

impl MapResourceManager {
    #[must_use]
    pub fn new(provider: Arc<dyn MapProvider>) -> Self {
        Self {
            provider,
            loaded: OnceCell::new(),
            slot: Mutex::new(MapSlot::default()),
            last_ticket: AtomicU64::new(0),
        }
    }

    fn slot(&self) -> MutexGuard<'_, MapSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Show the map inside `host`, creating it on first use.
    ///
    /// When several attaches wait on the library load together, the one
    /// issued last decides where the surface ends up.
    ///
    /// # Errors
    ///
    /// Returns `MapError::Load` if the library fails to load. The next call
    /// tries the load again.
    pub async fn attach(
        &self,
        host: &dyn HostElement,
        options: &MapOptions,
    ) -> Result<Arc<dyn MapWidget>, MapError> {
        let ticket = self.last_ticket.fetch_add(1, Ordering::AcqRel) + 1;

        self.loaded
            .get_or_try_init(|| self.provider.load())
            .await
            .inspect_err(|err| log::warn!("map library load failed: {err}"))?;

        let mut slot = self.slot();
        let is_latest = ticket == self.last_ticket.load(Ordering::Acquire);
        let provider = &self.provider;
        let surface = Arc::clone(slot.surface.get_or_insert_with(|| provider.create_surface()));

        if is_latest && surface.parent().as_ref() != Some(&host.id()) {
            host.clear();
            surface.move_to(host);
            log::debug!("map surface moved to {}", host.id());
        }

        if let Some(widget) = slot.widget.as_ref() {
            if is_latest {
                widget.set_options(options);
                if let Some(center) = options.center {
                    widget.set_center(center);
                }
                if let Some(zoom) = options.zoom {
                    widget.set_zoom(zoom);
                }
            }
            return Ok(Arc::clone(widget));
        }

        let widget = self.provider.create_map(&surface, options);
        slot.widget = Some(Arc::clone(&widget));
        log::debug!("map widget created");
        Ok(widget)
    }

    /// Move the surface into the hidden parking host. No-op before the first attach.
    pub fn park(&self) {
        let mut slot = self.slot();
        let Some(surface) = slot.surface.clone() else {
            return;
        };
        let provider = &self.provider;
        let parking = Arc::clone(slot.parking.get_or_insert_with(|| provider.parking_host()));
        if surface.parent().as_ref() != Some(&parking.id()) {
            surface.move_to(parking.as_ref());
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<Arc<dyn MapWidget>> {
        self.slot().widget.clone()
    }
}
