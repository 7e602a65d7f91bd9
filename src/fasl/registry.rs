// fasl-core
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;

use crate::errors::{lookup_error, ErrorLocation, Result};

/// Maps package names to the host's package objects, so `Symbol` opcodes
/// naming a package the decoder has not seen before resolve to something
/// the host recognizes, rather than the decoder inventing package identity
/// itself.
///
/// Modeled on the name-keyed codec registry pattern: a flat `HashMap` rather
/// than a trait-object registry, because package lookup has no behavior to
/// dispatch — only an object to hand back.
#[derive(Default)]
pub struct PackageRegistry<V> {
    packages: HashMap<String, V>,
}

impl<V: Clone> PackageRegistry<V> {
    pub fn new() -> Self {
        PackageRegistry { packages: HashMap::new() }
    }

    /// Replaces the registry's contents wholesale, as the host does once at
    /// startup (or per load unit, if packages are redefined between units).
    pub fn set_package_list(&mut self, packages: impl IntoIterator<Item = (String, V)>) {
        self.packages = packages.into_iter().collect();
    }

    pub fn register(&mut self, name: impl Into<String>, package: V) {
        self.packages.insert(name.into(), package);
    }

    pub fn find_package(&self, name: &str, at: ErrorLocation) -> Result<&V> {
        match self.packages.get(name) {
            Some(p) => Ok(p),
            None => lookup_error("unknown package", name, at),
        }
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
