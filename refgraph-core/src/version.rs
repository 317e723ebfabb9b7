/*!
Format versions and the drivers that populate the bean registry for them.

A session owns one [`VersionRegistry`]. Switching the active version clears
the session's bean registry and lets the version's driver register its beans
again, so one engine can read and write several schema generations.
*/

use crate::registry::BeanRegistry;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Provider of the bean registrations for one format version.
pub trait VersionDriver {
    /// Identifier written into document headers, e.g. `"refgraph/1.0"`.
    fn version_id(&self) -> &str;

    /// Registers every bean this version knows about.
    fn register_beans(&self, registry: &mut BeanRegistry);
}

/// Version id → driver table with one level of id aliasing.
///
/// Ids are matched ignoring ASCII case, for drivers and aliases alike.
#[derive(Default, Clone)]
pub struct VersionRegistry {
    drivers: HashMap<String, Rc<dyn VersionDriver>>,
    aliases: HashMap<String, String>,
}

impl VersionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiates `D` and indexes it by the version id it reports.
    pub fn register_version<D>(&mut self)
    where
        D: VersionDriver + Default + 'static,
    {
        self.register_driver(D::default());
    }

    pub fn register_driver<D>(&mut self, driver: D)
    where
        D: VersionDriver + 'static,
    {
        debug!(version = driver.version_id(), "version driver registered");
        self.drivers.insert(key(driver.version_id()), Rc::new(driver));
    }

    /// Makes `old_id` resolve to the driver registered under `new_id`.
    pub fn map_version_id(&mut self, old_id: impl Into<String>, new_id: impl Into<String>) {
        let (old_id, new_id): (String, String) = (old_id.into(), new_id.into());
        self.aliases.insert(key(&old_id), key(&new_id));
    }

    /// Driver for `version_id`, following at most one alias.
    pub fn driver(&self, version_id: &str) -> Option<Rc<dyn VersionDriver>> {
        let requested = key(version_id);
        let id = self.aliases.get(&requested).unwrap_or(&requested);
        self.drivers.get(id).cloned()
    }

    pub fn contains(&self, version_id: &str) -> bool {
        self.driver(version_id).is_some()
    }

    /// Registered version ids, sorted.
    pub fn version_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .drivers
            .values()
            .map(|driver| driver.version_id())
            .collect();
        ids.sort_unstable();
        ids
    }
}

fn key(version_id: &str) -> String {
    version_id.to_ascii_lowercase()
}

impl fmt::Debug for VersionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionRegistry")
            .field("versions", &self.version_ids())
            .field("aliases", &self.aliases)
            .finish()
    }
}
