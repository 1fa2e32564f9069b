use crate::core::{ErrorDetail, FreezeError, Result};
use crate::freeze::FreezableEntity;
use crate::persist::PersistEntity;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{Level, event};

/// Per-instance bypass switch.
///
/// The flag is a depth counter so nested scopes over the same instance
/// compose: the entity stays bypassed until the outermost scope exits.
/// Cloning an entity does not carry its bypass over; the clone starts with
/// an inactive flag.
#[derive(Default)]
pub struct BypassFlag {
    depth: Arc<AtomicUsize>,
}

impl BypassFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.depth.load(Ordering::SeqCst) > 0
    }

    fn share(&self) -> Arc<AtomicUsize> {
        self.depth.clone()
    }
}

impl Clone for BypassFlag {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl fmt::Debug for BypassFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BypassFlag")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Global bypass state of one logical request.
///
/// Clones share the same state. A new request obtains an independent
/// context through `PersistSession::fork`, so a global bypass never leaks
/// between concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct BypassContext {
    global: Arc<AtomicUsize>,
}

impl BypassContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_global_active(&self) -> bool {
        self.global.load(Ordering::SeqCst) > 0
    }

    /// Bypass is evaluated on the queried instance only: its own flag or the
    /// global flag. Entities reached through delegation are not consulted.
    pub fn is_bypassed(&self, entity: &dyn FreezableEntity) -> bool {
        self.is_global_active() || entity.bypass_flag().is_active()
    }

    /// Enters a bypass scope for `targets`, and for the whole context when
    /// `bypass_globally` is set or no target is given.
    ///
    /// Every target is validated before anything is entered; all
    /// non-freezable arguments are reported together.
    pub fn enter(
        &self,
        targets: &[&dyn PersistEntity],
        bypass_globally: bool,
    ) -> Result<BypassGuard> {
        let mut unsupported = Vec::new();
        let mut flags = Vec::with_capacity(targets.len());
        for target in targets {
            match target.as_freezable() {
                Some(entity) => flags.push(entity.bypass_flag().share()),
                None => unsupported.push(format!(
                    "Unsupported argument(s): {}. Bypass accepts freezable entities only.",
                    target.describe()
                )),
            }
        }
        if !unsupported.is_empty() {
            return Err(FreezeError::Configuration(ErrorDetail::List(unsupported)));
        }

        let global = (bypass_globally || targets.is_empty()).then(|| self.global.clone());
        if let Some(global) = &global {
            global.fetch_add(1, Ordering::SeqCst);
        }
        for flag in &flags {
            flag.fetch_add(1, Ordering::SeqCst);
        }

        event!(
            Level::DEBUG,
            global = global.is_some(),
            instances = flags.len(),
            "freeze bypass entered"
        );

        Ok(BypassGuard {
            global,
            instances: flags,
        })
    }

    /// Enters a global bypass scope.
    pub fn enter_global(&self) -> BypassGuard {
        self.global.fetch_add(1, Ordering::SeqCst);
        event!(Level::DEBUG, global = true, instances = 0, "freeze bypass entered");
        BypassGuard {
            global: Some(self.global.clone()),
            instances: Vec::new(),
        }
    }
}

/// Keeps a bypass scope open; every flag it raised is lowered on drop,
/// including during unwinding.
#[must_use = "the bypass ends as soon as the guard is dropped"]
pub struct BypassGuard {
    global: Option<Arc<AtomicUsize>>,
    instances: Vec<Arc<AtomicUsize>>,
}

impl BypassGuard {
    pub fn is_global(&self) -> bool {
        self.global.is_some()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }
}

impl fmt::Debug for BypassGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BypassGuard")
            .field("global", &self.is_global())
            .field("instances", &self.instance_count())
            .finish()
    }
}

fn release(depth: &AtomicUsize) {
    let _ = depth.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |value| {
        Some(value.saturating_sub(1))
    });
}

impl Drop for BypassGuard {
    fn drop(&mut self) {
        if let Some(global) = &self.global {
            release(global);
        }
        for flag in &self.instances {
            release(flag);
        }
        event!(Level::DEBUG, "freeze bypass released");
    }
}
