//! Background resource loading.
//!
//! Each slot holds at most one live request. A new request for a busy slot bumps the
//! slot generation, so the older worker's result arrives as a stale completion and is
//! dropped in [`LoadCoordinator::pump`]. Workers only decode; all slot state changes
//! happen on the thread that owns the coordinator.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use ahash::AHashMap;
use log::{debug, info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};
use sc3_assets::Model;
use sc3_bridge::{LoadStatus, ResourceCategory, SlotKey};
use sc3_ids::LoadHandle;

use crate::error::{LoadError, SceneError};
use crate::source::AssetSource;

/// A 3D background set. Shares the model container format with characters.
#[derive(Debug)]
pub struct Background3D {
    pub id: u32,
    pub model: Model,
}

#[derive(Debug, Clone)]
pub enum LoadedResource {
    Background(Arc<Background3D>),
    Character(Arc<Model>),
}

impl LoadedResource {
    pub fn category(&self) -> ResourceCategory {
        match self {
            Self::Background(_) => ResourceCategory::Background,
            Self::Character(_) => ResourceCategory::Character,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderWorkers {
    /// Decode on the requesting thread; results still surface on the next pump.
    Inline,
    Pool { threads: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
    pub applied: usize,
    pub stale: usize,
}

struct Completion {
    slot: SlotKey,
    handle: LoadHandle,
    result: Result<LoadedResource, LoadError>,
}

#[derive(Debug, Default)]
struct SlotState {
    generation: u32,
    asset_id: u32,
    status: LoadStatus,
    resource: Option<LoadedResource>,
    error: Option<String>,
}

pub struct LoadCoordinator {
    source: Arc<dyn AssetSource>,
    pool: Option<ThreadPool>,
    completions_tx: Sender<Completion>,
    completions_rx: Receiver<Completion>,
    slots: AHashMap<SlotKey, SlotState>,
}

impl LoadCoordinator {
    pub fn new(source: Arc<dyn AssetSource>, workers: LoaderWorkers) -> Result<Self, SceneError> {
        let pool = match workers {
            LoaderWorkers::Inline => None,
            LoaderWorkers::Pool { threads } => Some(
                ThreadPoolBuilder::new()
                    .num_threads(threads.max(1))
                    .thread_name(|i| format!("sc3-loader-{i}"))
                    .build()?,
            ),
        };
        let (completions_tx, completions_rx) = mpsc::channel();
        Ok(Self {
            source,
            pool,
            completions_tx,
            completions_rx,
            slots: AHashMap::new(),
        })
    }

    /// Starts loading `asset_id` into `slot`. Any request still in flight for the slot
    /// is superseded and its result will be discarded.
    pub fn request_load(&mut self, slot: SlotKey, asset_id: u32) -> LoadHandle {
        if !slot.fits_handle() {
            warn!(
                "{} slot {} is out of range (max {}); load of asset {asset_id} ignored",
                slot.category.name(),
                slot.index,
                SlotKey::MAX_INDEX
            );
            return LoadHandle::nil();
        }
        let state = self.slots.entry(slot).or_default();
        if state.status == LoadStatus::Loading {
            debug!(
                "{} slot {} superseded: asset {} -> {}",
                slot.category.name(),
                slot.index,
                state.asset_id,
                asset_id
            );
        }
        state.generation = state.generation.wrapping_add(1).max(1);
        state.asset_id = asset_id;
        state.status = LoadStatus::Loading;
        state.resource = None;
        state.error = None;
        let handle = slot.handle(state.generation);

        let source = Arc::clone(&self.source);
        let tx = self.completions_tx.clone();
        let job = move || {
            let result = load_resource(source.as_ref(), slot.category, asset_id);
            // Receiver gone means the coordinator was dropped; nothing to report to.
            let _ = tx.send(Completion {
                slot,
                handle,
                result,
            });
        };
        match &self.pool {
            Some(pool) => pool.spawn(job),
            None => job(),
        }
        handle
    }

    /// Drops whatever the slot holds. An in-flight load becomes stale.
    pub fn release(&mut self, slot: SlotKey) {
        let Some(state) = self.slots.get_mut(&slot) else {
            return;
        };
        if state.status == LoadStatus::Unloaded {
            return;
        }
        state.generation = state.generation.wrapping_add(1).max(1);
        state.status = LoadStatus::Unloaded;
        state.resource = None;
        state.error = None;
        debug!("{} slot {} released", slot.category.name(), slot.index);
    }

    /// Applies every completion received so far. Call once per frame before scripts run.
    pub fn pump(&mut self) -> PumpReport {
        let mut report = PumpReport::default();
        while let Ok(completion) = self.completions_rx.try_recv() {
            if self.apply(completion) {
                report.applied += 1;
            } else {
                report.stale += 1;
            }
        }
        report
    }

    fn apply(&mut self, completion: Completion) -> bool {
        let Completion {
            slot,
            handle,
            result,
        } = completion;
        let Some(state) = self.slots.get_mut(&slot) else {
            return false;
        };
        if state.generation != handle.generation() || state.status != LoadStatus::Loading {
            debug!("dropping stale load result {handle:?}");
            return false;
        }

        match result {
            Ok(resource) => {
                info!(
                    "{} slot {} loaded asset {}",
                    slot.category.name(),
                    slot.index,
                    state.asset_id
                );
                state.status = LoadStatus::Loaded;
                state.resource = Some(resource);
            }
            Err(err) => {
                warn!(
                    "{} slot {} failed to load asset {}: {err}",
                    slot.category.name(),
                    slot.index,
                    state.asset_id
                );
                state.status = LoadStatus::Failed;
                state.error = Some(err.to_string());
            }
        }
        true
    }

    pub fn slot_status(&self, slot: SlotKey) -> LoadStatus {
        self.slots
            .get(&slot)
            .map_or(LoadStatus::Unloaded, |state| state.status)
    }

    /// Status of one request. Anything but the slot's current request reads `Unloaded`.
    pub fn poll_status(&self, handle: LoadHandle) -> LoadStatus {
        let Some(slot) = SlotKey::of_handle(handle) else {
            return LoadStatus::Unloaded;
        };
        match self.slots.get(&slot) {
            Some(state) if state.generation == handle.generation() => state.status,
            _ => LoadStatus::Unloaded,
        }
    }

    /// The slot's resource, only once fully loaded.
    pub fn resource(&self, slot: SlotKey) -> Option<&LoadedResource> {
        self.slots
            .get(&slot)
            .filter(|state| state.status == LoadStatus::Loaded)
            .and_then(|state| state.resource.as_ref())
    }

    pub fn last_error(&self, slot: SlotKey) -> Option<&str> {
        self.slots.get(&slot).and_then(|state| state.error.as_deref())
    }

    pub fn asset_id(&self, slot: SlotKey) -> Option<u32> {
        self.slots
            .get(&slot)
            .filter(|state| state.status != LoadStatus::Unloaded)
            .map(|state| state.asset_id)
    }

    pub fn has_pending(&self) -> bool {
        self.slots
            .values()
            .any(|state| state.status == LoadStatus::Loading)
    }
}

fn load_resource(
    source: &dyn AssetSource,
    category: ResourceCategory,
    asset_id: u32,
) -> Result<LoadedResource, LoadError> {
    let bytes = source.read(category, asset_id)?;
    let model = Model::load(&bytes, asset_id)?;
    Ok(match category {
        ResourceCategory::Background => LoadedResource::Background(Arc::new(Background3D {
            id: asset_id,
            model,
        })),
        ResourceCategory::Character => LoadedResource::Character(Arc::new(model)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use sc3_assets::Bone;
    use std::io;
    use std::sync::{Condvar, Mutex};
    use std::time::{Duration, Instant};

    fn model_bytes(id: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        Model::new(id, vec![Bone::root()], Vec::new())
            .write(&mut bytes)
            .unwrap();
        bytes
    }

    #[derive(Default)]
    struct Gate {
        open: Mutex<bool>,
        opened: Condvar,
    }

    impl Gate {
        fn open(&self) {
            *self.open.lock().unwrap() = true;
            self.opened.notify_all();
        }

        fn wait(&self) {
            let mut open = self.open.lock().unwrap();
            while !*open {
                open = self.opened.wait(open).unwrap();
            }
        }
    }

    /// Holds each read until the test opens that asset's gate.
    struct GatedSource {
        inner: MemorySource,
        gates: AHashMap<u32, Arc<Gate>>,
    }

    impl GatedSource {
        fn new(ids: &[u32]) -> Self {
            let mut inner = MemorySource::new();
            let mut gates = AHashMap::new();
            for &id in ids {
                inner.insert(ResourceCategory::Background, id, model_bytes(id));
                gates.insert(id, Arc::new(Gate::default()));
            }
            Self { inner, gates }
        }
    }

    impl AssetSource for GatedSource {
        fn read(&self, category: ResourceCategory, asset_id: u32) -> io::Result<Vec<u8>> {
            if let Some(gate) = self.gates.get(&asset_id) {
                gate.wait();
            }
            self.inner.read(category, asset_id)
        }
    }

    fn pump_until(
        loads: &mut LoadCoordinator,
        mut done: impl FnMut(&LoadCoordinator, &PumpReport) -> bool,
    ) -> PumpReport {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut total = PumpReport::default();
        loop {
            let report = loads.pump();
            total.applied += report.applied;
            total.stale += report.stale;
            if done(loads, &total) {
                return total;
            }
            assert!(Instant::now() < deadline, "loader did not finish in time");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn background_id(loads: &LoadCoordinator) -> Option<u32> {
        match loads.resource(SlotKey::BACKGROUND) {
            Some(LoadedResource::Background(bg)) => Some(bg.id),
            _ => None,
        }
    }

    #[test]
    fn inline_load_surfaces_on_next_pump() {
        let source = MemorySource::new().with(ResourceCategory::Background, 7, model_bytes(7));
        let mut loads = LoadCoordinator::new(Arc::new(source), LoaderWorkers::Inline).unwrap();

        let handle = loads.request_load(SlotKey::BACKGROUND, 7);
        assert_eq!(loads.poll_status(handle), LoadStatus::Loading);
        assert!(loads.resource(SlotKey::BACKGROUND).is_none());

        let report = loads.pump();
        assert_eq!(report.applied, 1);
        assert_eq!(loads.poll_status(handle), LoadStatus::Loaded);
        assert_eq!(background_id(&loads), Some(7));
    }

    #[test]
    fn later_request_wins_when_it_finishes_first() {
        let source = Arc::new(GatedSource::new(&[1, 2]));
        let mut loads =
            LoadCoordinator::new(source.clone(), LoaderWorkers::Pool { threads: 2 }).unwrap();

        let first = loads.request_load(SlotKey::BACKGROUND, 1);
        let second = loads.request_load(SlotKey::BACKGROUND, 2);
        assert_eq!(loads.poll_status(first), LoadStatus::Unloaded);

        source.gates[&2].open();
        pump_until(&mut loads, |l, _| {
            l.slot_status(SlotKey::BACKGROUND) == LoadStatus::Loaded
        });
        assert_eq!(background_id(&loads), Some(2));

        source.gates[&1].open();
        pump_until(&mut loads, |_, report| report.stale == 1);

        assert_eq!(background_id(&loads), Some(2));
        assert_eq!(loads.poll_status(first), LoadStatus::Unloaded);
        assert_eq!(loads.poll_status(second), LoadStatus::Loaded);
    }

    #[test]
    fn stale_completion_arriving_first_leaves_slot_loading() {
        let source = Arc::new(GatedSource::new(&[1, 2]));
        let mut loads =
            LoadCoordinator::new(source.clone(), LoaderWorkers::Pool { threads: 2 }).unwrap();

        loads.request_load(SlotKey::BACKGROUND, 1);
        let second = loads.request_load(SlotKey::BACKGROUND, 2);

        source.gates[&1].open();
        pump_until(&mut loads, |_, report| report.stale == 1);
        assert_eq!(loads.slot_status(SlotKey::BACKGROUND), LoadStatus::Loading);
        assert!(loads.resource(SlotKey::BACKGROUND).is_none());

        source.gates[&2].open();
        pump_until(&mut loads, |l, _| l.poll_status(second) == LoadStatus::Loaded);
        assert_eq!(background_id(&loads), Some(2));
    }

    #[test]
    fn release_while_in_flight_discards_result() {
        let source = Arc::new(GatedSource::new(&[4]));
        let mut loads =
            LoadCoordinator::new(source.clone(), LoaderWorkers::Pool { threads: 1 }).unwrap();

        let handle = loads.request_load(SlotKey::BACKGROUND, 4);
        loads.release(SlotKey::BACKGROUND);
        assert_eq!(loads.slot_status(SlotKey::BACKGROUND), LoadStatus::Unloaded);

        source.gates[&4].open();
        pump_until(&mut loads, |_, report| report.stale == 1);
        assert_eq!(loads.slot_status(SlotKey::BACKGROUND), LoadStatus::Unloaded);
        assert_eq!(loads.poll_status(handle), LoadStatus::Unloaded);
        assert!(!loads.has_pending());
    }

    #[test]
    fn missing_and_corrupt_assets_fail() {
        let source = MemorySource::new().with(ResourceCategory::Character, 3, b"junk".to_vec());
        let mut loads = LoadCoordinator::new(Arc::new(source), LoaderWorkers::Inline).unwrap();

        let missing = loads.request_load(SlotKey::BACKGROUND, 99);
        let corrupt = loads.request_load(SlotKey::character(0), 3);
        loads.pump();

        assert_eq!(loads.poll_status(missing), LoadStatus::Failed);
        assert_eq!(loads.poll_status(corrupt), LoadStatus::Failed);
        assert!(loads.last_error(SlotKey::character(0)).is_some());
        assert!(loads.resource(SlotKey::character(0)).is_none());
    }

    #[test]
    fn slot_index_past_handle_range_is_rejected() {
        let source = MemorySource::new()
            .with(ResourceCategory::Character, 1, model_bytes(1))
            .with(ResourceCategory::Character, 2, model_bytes(2));
        let mut loads = LoadCoordinator::new(Arc::new(source), LoaderWorkers::Inline).unwrap();

        let far = SlotKey::character(SlotKey::MAX_INDEX + 1);
        let near = SlotKey::character(0);
        let far_handle = loads.request_load(far, 2);
        let near_handle = loads.request_load(near, 1);
        assert!(far_handle.is_nil());
        assert_ne!(far_handle, near_handle);

        loads.pump();
        assert_eq!(loads.slot_status(far), LoadStatus::Unloaded);
        assert_eq!(loads.poll_status(far_handle), LoadStatus::Unloaded);
        assert_eq!(loads.slot_status(near), LoadStatus::Loaded);
        assert!(matches!(
            loads.resource(near),
            Some(LoadedResource::Character(model)) if model.id == 1
        ));
        assert!(!loads.has_pending());
    }

    #[test]
    fn slots_are_independent() {
        let source = MemorySource::new()
            .with(ResourceCategory::Background, 1, model_bytes(1))
            .with(ResourceCategory::Character, 1, model_bytes(1));
        let mut loads = LoadCoordinator::new(Arc::new(source), LoaderWorkers::Inline).unwrap();

        loads.request_load(SlotKey::BACKGROUND, 1);
        loads.request_load(SlotKey::character(0), 1);
        loads.pump();
        loads.release(SlotKey::character(0));

        assert_eq!(loads.slot_status(SlotKey::BACKGROUND), LoadStatus::Loaded);
        assert_eq!(loads.slot_status(SlotKey::character(0)), LoadStatus::Unloaded);
        assert!(matches!(
            loads.resource(SlotKey::BACKGROUND).map(LoadedResource::category),
            Some(ResourceCategory::Background)
        ));
    }
}
