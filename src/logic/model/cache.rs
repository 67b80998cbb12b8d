//! Model Cache - bounded LRU of loaded packs
//!
//! Each unit maps to a load-once slot: concurrent first requests for the same
//! unit deserialize the pack once, while loads of different units proceed in
//! parallel. Packs are never mutated after they are cached.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use super::pack::{load_pack, ModelPack};
use crate::error::ScoringResult;

type Slot = Arc<OnceCell<Arc<ModelPack>>>;

// ============================================================================
// PACK LOADER TRAIT
// ============================================================================

/// Source of model packs (disk, tests, ...)
pub trait PackLoader: Send + Sync {
    fn load(&self, unit_id: &str) -> ScoringResult<ModelPack>;
}

impl<F> PackLoader for F
where
    F: Fn(&str) -> ScoringResult<ModelPack> + Send + Sync,
{
    fn load(&self, unit_id: &str) -> ScoringResult<ModelPack> {
        self(unit_id)
    }
}

/// Loads `isoforest_<unit>.onnx` packs from a directory
#[derive(Debug, Clone)]
pub struct OnnxPackLoader {
    pub model_dir: PathBuf,
}

impl OnnxPackLoader {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self { model_dir: model_dir.into() }
    }
}

impl PackLoader for OnnxPackLoader {
    fn load(&self, unit_id: &str) -> ScoringResult<ModelPack> {
        load_pack(&self.model_dir, unit_id)
    }
}

// ============================================================================
// CACHE
// ============================================================================

pub struct ModelCache<L> {
    loader: L,
    slots: Mutex<LruCache<String, Slot>>,
    loads: AtomicU64,
}

impl<L: PackLoader> ModelCache<L> {
    pub fn new(loader: L, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            loader,
            slots: Mutex::new(LruCache::new(capacity)),
            loads: AtomicU64::new(0),
        }
    }

    /// Cached pack for `unit_id`, loading it on first use
    pub fn get(&self, unit_id: &str) -> ScoringResult<Arc<ModelPack>> {
        let slot = {
            let mut slots = self.slots.lock();
            match slots.get(unit_id) {
                Some(slot) => slot.clone(),
                None => {
                    let slot: Slot = Arc::new(OnceCell::new());
                    if let Some((evicted, _)) = slots.push(unit_id.to_string(), slot.clone()) {
                        if evicted != unit_id {
                            log::debug!("Model cache evicted '{}'", evicted);
                        }
                    }
                    slot
                }
            }
        };

        // Lock released: only callers waiting on this unit's slot block here
        let result = slot.get_or_try_init(|| {
            self.loads.fetch_add(1, Ordering::Relaxed);
            log::debug!("Model cache miss for '{}'", unit_id);
            self.loader.load(unit_id).map(Arc::new)
        });

        match result {
            Ok(pack) => Ok(pack.clone()),
            Err(e) => {
                // Drop the empty slot so the next call retries
                let mut slots = self.slots.lock();
                if let Some(current) = slots.peek(unit_id) {
                    if Arc::ptr_eq(current, &slot) && current.get().is_none() {
                        slots.pop(unit_id);
                    }
                }
                Err(e)
            }
        }
    }

    pub fn contains(&self, unit_id: &str) -> bool {
        self.slots
            .lock()
            .peek(unit_id)
            .map_or(false, |slot| slot.get().is_some())
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.lock().cap().get()
    }

    /// Number of loader invocations so far
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.slots.lock().clear();
        log::info!("Model cache cleared");
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }
}
