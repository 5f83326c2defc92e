//! Built-in mappers.
//!
//! Each module exposes its registry `NAME` and a `factory` used by
//! [`builtin_registrations`](crate::registry::builtin_registrations).

pub mod arome;
pub mod generic;
pub mod goes_abi;
pub mod ncep_gfs;
pub mod netcdf_cf;

pub use arome::AromeMapper;
pub use generic::GenericMapper;
pub use goes_abi::GoesAbiMapper;
pub use ncep_gfs::NcepGfsMapper;
pub use netcdf_cf::NetcdfCfMapper;
