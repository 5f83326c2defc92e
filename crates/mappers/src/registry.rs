//! The ordered table of mappers tried during dispatch.
//!
//! Mappers are registered explicitly in [`builtin_registrations`]. A
//! registry is built once, owned by the dispatcher and never changed
//! afterwards, so it can be shared between threads freely.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::MapperConfig;
use crate::error::{DispatchError, RegistrationError};
use crate::mapper::{Mapper, MapperKind};
use crate::plugins;

/// Constructor of one mapper.
pub type MapperFactory = fn(&MapperConfig) -> Result<Arc<dyn Mapper>, RegistrationError>;

/// One row of the registration table.
#[derive(Clone, Copy)]
pub struct Registration {
    pub name: &'static str,
    pub kind: MapperKind,
    pub factory: MapperFactory,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Every mapper shipped with the crate, in discovery order.
pub fn builtin_registrations() -> Vec<Registration> {
    vec![
        Registration {
            name: plugins::arome::NAME,
            kind: MapperKind::Specific,
            factory: plugins::arome::factory,
        },
        Registration {
            name: plugins::goes_abi::NAME,
            kind: MapperKind::Specific,
            factory: plugins::goes_abi::factory,
        },
        Registration {
            name: plugins::ncep_gfs::NAME,
            kind: MapperKind::Specific,
            factory: plugins::ncep_gfs::factory,
        },
        Registration {
            name: plugins::netcdf_cf::NAME,
            kind: MapperKind::Fallback,
            factory: plugins::netcdf_cf::factory,
        },
        Registration {
            name: plugins::generic::NAME,
            kind: MapperKind::Fallback,
            factory: plugins::generic::factory,
        },
    ]
}

/// A registered mapper.
#[derive(Clone)]
pub struct MapperDescriptor {
    pub name: &'static str,
    pub kind: MapperKind,
    /// Position in the registration table
    pub rank: usize,
    pub mapper: Arc<dyn Mapper>,
}

impl fmt::Debug for MapperDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("rank", &self.rank)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MapperRegistry {
    descriptors: Vec<MapperDescriptor>,
}

impl MapperRegistry {
    /// Build the registry from the built-in table.
    pub fn discover(config: &MapperConfig) -> Self {
        Self::from_registrations(builtin_registrations(), config)
    }

    /// Build a registry from an explicit table.
    ///
    /// Disabled entries, entries whose factory fails and duplicate names are
    /// skipped with a warning. Specific mappers come before fallback mappers;
    /// table order is kept within each kind.
    pub fn from_registrations(registrations: Vec<Registration>, config: &MapperConfig) -> Self {
        let mut descriptors: Vec<MapperDescriptor> = Vec::with_capacity(registrations.len());

        for (rank, reg) in registrations.into_iter().enumerate() {
            if config.is_disabled(reg.name) {
                warn!(mapper = reg.name, "Mapper disabled by configuration");
                continue;
            }
            if descriptors.iter().any(|d| d.name == reg.name) {
                warn!(mapper = reg.name, "Duplicate mapper registration skipped");
                continue;
            }
            match (reg.factory)(config) {
                Ok(mapper) => {
                    if mapper.name() != reg.name || mapper.kind() != reg.kind {
                        warn!(
                            mapper = reg.name,
                            reported_name = mapper.name(),
                            "Mapper does not match its registration, skipped"
                        );
                        continue;
                    }
                    descriptors.push(MapperDescriptor {
                        name: reg.name,
                        kind: reg.kind,
                        rank,
                        mapper,
                    });
                }
                Err(e) => {
                    warn!(mapper = reg.name, error = %e, "Failed to load mapper, skipped");
                }
            }
        }

        descriptors.sort_by_key(|d| d.kind);

        debug!(
            mappers = ?descriptors.iter().map(|d| d.name).collect::<Vec<_>>(),
            "Mapper registry ready"
        );
        Self { descriptors }
    }

    pub fn get_by_name(&self, name: &str) -> Result<&MapperDescriptor, DispatchError> {
        self.descriptors
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| DispatchError::UnknownMapper(name.to_string()))
    }

    /// Names in dispatch order.
    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MapperDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::{BuildOutcome, BuildResult, MapperContext};

    struct Stub(&'static str, MapperKind);

    impl Mapper for Stub {
        fn name(&self) -> &'static str {
            self.0
        }
        fn kind(&self) -> MapperKind {
            self.1
        }
        fn try_build(&self, _ctx: &MapperContext<'_>) -> BuildResult {
            Ok(BuildOutcome::rejected("stub"))
        }
    }

    fn specific_a(_: &MapperConfig) -> Result<Arc<dyn Mapper>, RegistrationError> {
        Ok(Arc::new(Stub("a", MapperKind::Specific)))
    }
    fn specific_b(_: &MapperConfig) -> Result<Arc<dyn Mapper>, RegistrationError> {
        Ok(Arc::new(Stub("b", MapperKind::Specific)))
    }
    fn fallback_z(_: &MapperConfig) -> Result<Arc<dyn Mapper>, RegistrationError> {
        Ok(Arc::new(Stub("z", MapperKind::Fallback)))
    }
    fn broken(_: &MapperConfig) -> Result<Arc<dyn Mapper>, RegistrationError> {
        Err(RegistrationError::Init {
            name: "broken".into(),
            reason: "missing lookup table".into(),
        })
    }

    fn reg(name: &'static str, kind: MapperKind, factory: MapperFactory) -> Registration {
        Registration {
            name,
            kind,
            factory,
        }
    }

    #[test]
    fn test_fallback_sorted_last_and_order_stable() {
        let registry = MapperRegistry::from_registrations(
            vec![
                reg("z", MapperKind::Fallback, fallback_z),
                reg("a", MapperKind::Specific, specific_a),
                reg("b", MapperKind::Specific, specific_b),
            ],
            &MapperConfig::default(),
        );
        assert_eq!(registry.names(), vec!["a", "b", "z"]);
        assert_eq!(registry.get_by_name("z").unwrap().rank, 0);
    }

    #[test]
    fn test_failing_factory_does_not_abort_discovery() {
        let registry = MapperRegistry::from_registrations(
            vec![
                reg("a", MapperKind::Specific, specific_a),
                reg("broken", MapperKind::Specific, broken),
                reg("z", MapperKind::Fallback, fallback_z),
            ],
            &MapperConfig::default(),
        );
        assert_eq!(registry.names(), vec!["a", "z"]);
    }

    #[test]
    fn test_duplicates_and_mismatches_skipped() {
        let registry = MapperRegistry::from_registrations(
            vec![
                reg("a", MapperKind::Specific, specific_a),
                reg("a", MapperKind::Specific, specific_a),
                reg("b", MapperKind::Specific, specific_a),
            ],
            &MapperConfig::default(),
        );
        assert_eq!(registry.names(), vec!["a"]);
    }

    #[test]
    fn test_builtin_order() {
        let registry = MapperRegistry::discover(&MapperConfig::default());
        assert_eq!(
            registry.names(),
            vec!["arome", "goes_abi", "ncep_gfs", "netcdf_cf", "generic"]
        );
        let kinds: Vec<MapperKind> = registry.iter().map(|d| d.kind).collect();
        let last_specific = kinds.iter().rposition(|k| *k == MapperKind::Specific).unwrap();
        let first_fallback = kinds.iter().position(|k| *k == MapperKind::Fallback).unwrap();
        assert!(last_specific < first_fallback);
    }

    #[test]
    fn test_disabled_mapper_is_absent() {
        let config = MapperConfig {
            disabled_mappers: vec!["generic".into()],
            ..Default::default()
        };
        let registry = MapperRegistry::discover(&config);
        assert_eq!(registry.len(), 4);
        assert!(matches!(
            registry.get_by_name("generic"),
            Err(DispatchError::UnknownMapper(name)) if name == "generic"
        ));
    }
}
