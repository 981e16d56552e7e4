//! A compiled and instantiated guest module.
//!
//! [`GuestInstance`] owns the wasmtime store, the instance and its memory
//! export. Memory access goes through [`InstanceMemory`], a short-lived
//! borrow of the store that implements [`GuestMemory`], so the arena,
//! handles and views work against a live guest exactly as they do
//! against a [`LinearMemory`](ferry_arena::LinearMemory).

use indexmap::IndexMap;
use wasmtime::{
    Engine, Func, Instance, Linker, Memory, Module, Store, StoreLimits, StoreLimitsBuilder,
};

use ferry_core::{pages_for, ArenaError, GuestError, GuestMemory, MemoryGeneration, PAGE_SIZE};

use crate::config::GuestConfig;

/// Per-store host state.
pub(crate) struct GuestState {
    limits: StoreLimits,
}

/// A live guest module with its linear memory.
pub struct GuestInstance {
    pub(crate) store: Store<GuestState>,
    instance: Instance,
    memory: Memory,
    exports: IndexMap<String, Func>,
    pub(crate) generation: MemoryGeneration,
    pub(crate) poisoned: Option<String>,
    config: GuestConfig,
}

impl GuestInstance {
    /// Compile and instantiate `module_bytes` (binary or WAT text).
    ///
    /// The module must import nothing and must export a memory under
    /// [`GuestConfig::memory_export`]. Exported functions are resolved
    /// lazily on first call.
    pub fn new(module_bytes: &[u8], config: GuestConfig) -> Result<Self, GuestError> {
        config.validate()?;
        let engine = Engine::default();
        let module = Module::new(&engine, module_bytes).map_err(|e| GuestError::Instantiation {
            reason: format!("{e:#}"),
        })?;

        let limits = StoreLimitsBuilder::new()
            .memory_size(usize::try_from(config.max_memory_bytes).unwrap_or(usize::MAX))
            .build();
        let mut store = Store::new(&engine, GuestState { limits });
        store.limiter(|state| &mut state.limits);

        let linker = Linker::new(&engine);
        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| GuestError::Instantiation {
                reason: format!("{e:#}"),
            })?;
        let memory = instance
            .get_memory(&mut store, &config.memory_export)
            .ok_or_else(|| GuestError::MissingExport {
                name: config.memory_export.clone(),
            })?;

        tracing::debug!(
            module_bytes = module_bytes.len(),
            memory_bytes = memory.data_size(&store),
            exports = module.exports().len(),
            "instantiated guest module"
        );

        Ok(Self {
            store,
            instance,
            memory,
            exports: IndexMap::new(),
            generation: MemoryGeneration::default(),
            poisoned: None,
            config,
        })
    }

    /// The configuration the instance was built with.
    pub fn config(&self) -> &GuestConfig {
        &self.config
    }

    /// Borrow the guest memory for arena, handle and view operations.
    ///
    /// Fails with [`GuestError::Poisoned`] once a call has trapped.
    pub fn memory(&mut self) -> Result<InstanceMemory<'_>, GuestError> {
        self.ensure_usable()?;
        Ok(InstanceMemory {
            store: &mut self.store,
            memory: self.memory,
            generation: &mut self.generation,
        })
    }

    /// Current memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.memory.data_size(&self.store)
    }

    /// Generation of the guest memory. Advances on every growth, whether
    /// the host or the guest grew it.
    pub fn memory_generation(&self) -> MemoryGeneration {
        self.generation
    }

    /// Whether an earlier fault has made the instance unusable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Whether the module exports a function named `name`.
    pub fn has_function(&mut self, name: &str) -> bool {
        self.exports.contains_key(name) || self.instance.get_func(&mut self.store, name).is_some()
    }

    /// Names of the exports resolved so far, in first-use order.
    pub fn resolved_exports(&self) -> impl Iterator<Item = &str> {
        self.exports.keys().map(String::as_str)
    }

    pub(crate) fn ensure_usable(&self) -> Result<(), GuestError> {
        match &self.poisoned {
            Some(export) => Err(GuestError::Poisoned {
                export: export.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Resolve an exported function, caching it by name.
    pub(crate) fn func(&mut self, name: &str) -> Result<Func, GuestError> {
        if let Some(func) = self.exports.get(name) {
            return Ok(*func);
        }
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| GuestError::MissingExport {
                name: name.to_string(),
            })?;
        self.exports.insert(name.to_string(), func);
        Ok(func)
    }

    /// Compare the memory size against `before` and advance the
    /// generation if the guest grew it.
    pub(crate) fn observe_growth(&mut self, export: &str, before: usize) -> bool {
        let after = self.memory_size();
        if after == before {
            return false;
        }
        self.generation = self.generation.next();
        tracing::warn!(
            export,
            before,
            after,
            generation = %self.generation,
            "guest grew its memory during a call; views must be re-derived"
        );
        true
    }
}

/// Mutable access to a guest's linear memory for the length of a borrow.
pub struct InstanceMemory<'a> {
    store: &'a mut Store<GuestState>,
    memory: Memory,
    generation: &'a mut MemoryGeneration,
}

impl InstanceMemory<'_> {
    /// Current size in pages.
    pub fn pages(&self) -> u64 {
        self.memory.size(&*self.store)
    }
}

impl GuestMemory for InstanceMemory<'_> {
    fn data(&self) -> &[u8] {
        self.memory.data(&*self.store)
    }

    fn data_mut(&mut self) -> &mut [u8] {
        self.memory.data_mut(&mut *self.store)
    }

    fn generation(&self) -> MemoryGeneration {
        *self.generation
    }

    fn grow_to(&mut self, min_bytes: usize) -> Result<usize, ArenaError> {
        let capacity = self.memory.data_size(&*self.store);
        if min_bytes <= capacity {
            return Ok(capacity);
        }
        let delta = pages_for(min_bytes) - capacity / PAGE_SIZE;
        self.memory
            .grow(&mut *self.store, delta as u64)
            .map_err(|e| ArenaError::GrowthFailure {
                requested: min_bytes,
                capacity,
                reason: format!("{e:#}"),
            })?;
        *self.generation = self.generation.next();
        Ok(self.memory.data_size(&*self.store))
    }
}
