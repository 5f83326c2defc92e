//! NetCDF driver (classic and NetCDF-4), built with the `netcdf` feature.
//!
//! Follows the GDAL netCDF conventions: global attributes land under
//! `NC_GLOBAL#`, variable attributes under `<var>#<attr>`, and every
//! variable with at least one dimension is listed as a sub-dataset.

use std::path::Path;
use std::sync::Once;

use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::AttributeValue;
use raster_common::{
    sub_dataset_name, BandDataType, BandSource, DriverKind, MetadataMap, RawMetadata, SubDataset,
    GLOBAL_PREFIX,
};
use tracing::debug;

use crate::backend::{cf_unpack, slice_band};
use crate::error::{IoError, IoResult};

/// Disable HDF5's automatic error printing to stderr.
///
/// Probing optional attributes makes the C library print diagnostics for
/// errors that are handled on the Rust side.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: null handlers are the documented way to turn printing off.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

fn open(path: &Path) -> IoResult<netcdf::File> {
    silence_hdf5_errors();
    netcdf::open(path).map_err(|e| IoError::NetCdf(format!("{}: {}", path.display(), e)))
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn attribute_string(value: AttributeValue) -> String {
    match value {
        AttributeValue::Str(s) => s,
        AttributeValue::Strs(v) => v.join(","),
        AttributeValue::Uchar(x) => x.to_string(),
        AttributeValue::Uchars(v) => join(&v),
        AttributeValue::Schar(x) => x.to_string(),
        AttributeValue::Schars(v) => join(&v),
        AttributeValue::Ushort(x) => x.to_string(),
        AttributeValue::Ushorts(v) => join(&v),
        AttributeValue::Short(x) => x.to_string(),
        AttributeValue::Shorts(v) => join(&v),
        AttributeValue::Uint(x) => x.to_string(),
        AttributeValue::Uints(v) => join(&v),
        AttributeValue::Int(x) => x.to_string(),
        AttributeValue::Ints(v) => join(&v),
        AttributeValue::Ulonglong(x) => x.to_string(),
        AttributeValue::Ulonglongs(v) => join(&v),
        AttributeValue::Longlong(x) => x.to_string(),
        AttributeValue::Longlongs(v) => join(&v),
        AttributeValue::Float(x) => x.to_string(),
        AttributeValue::Floats(v) => join(&v),
        AttributeValue::Double(x) => x.to_string(),
        AttributeValue::Doubles(v) => join(&v),
    }
}

fn band_data_type(vartype: NcVariableType) -> Option<BandDataType> {
    match vartype {
        NcVariableType::Int(IntType::I8) => Some(BandDataType::Int8),
        NcVariableType::Int(IntType::U8) => Some(BandDataType::UInt8),
        NcVariableType::Int(IntType::I16) => Some(BandDataType::Int16),
        NcVariableType::Int(IntType::U16) => Some(BandDataType::UInt16),
        NcVariableType::Int(IntType::I32) => Some(BandDataType::Int32),
        NcVariableType::Int(IntType::U32) => Some(BandDataType::UInt32),
        NcVariableType::Int(IntType::I64) => Some(BandDataType::Int64),
        NcVariableType::Int(IntType::U64) => Some(BandDataType::UInt64),
        NcVariableType::Float(FloatType::F32) => Some(BandDataType::Float32),
        NcVariableType::Float(FloatType::F64) => Some(BandDataType::Float64),
        _ => None,
    }
}

fn variable_attributes(var: &netcdf::Variable) -> MetadataMap {
    var.attributes()
        .filter_map(|attr| {
            let value = attr.value().ok()?;
            Some((attr.name().to_string(), attribute_string(value)))
        })
        .collect()
}

pub fn probe(path: &Path) -> IoResult<RawMetadata> {
    let file = open(path)?;
    let mut raw = RawMetadata::new(path, DriverKind::NetCdf);

    for attr in file.attributes() {
        if let Ok(value) = attr.value() {
            raw.metadata
                .insert(format!("{GLOBAL_PREFIX}{}", attr.name()), attribute_string(value));
        }
    }

    for var in file.variables() {
        let name = var.name();
        let attrs = variable_attributes(&var);
        for (key, value) in &attrs {
            raw.metadata.insert(format!("{name}#{key}"), value.clone());
        }

        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        if shape.is_empty() {
            continue;
        }
        let Some(data_type) = band_data_type(var.vartype()) else {
            debug!(variable = %name, "Skipping NetCDF variable with unsupported type");
            continue;
        };
        raw.sub_datasets.push(SubDataset {
            name: sub_dataset_name(DriverKind::NetCdf, path, &name),
            variable: name.clone(),
            shape,
            dimensions: var.dimensions().iter().map(|d| d.name()).collect(),
            data_type,
            metadata: attrs,
        });
    }

    debug!(
        path = %path.display(),
        sub_datasets = raw.sub_datasets.len(),
        "Probed NetCDF file"
    );
    Ok(raw)
}

fn read_all(path: &Path, variable: &str) -> IoResult<(Vec<f64>, Vec<usize>)> {
    let file = open(path)?;
    let var = file
        .variable(variable)
        .ok_or_else(|| IoError::VariableNotFound {
            path: path.to_path_buf(),
            variable: variable.to_string(),
        })?;
    let shape = var.dimensions().iter().map(|d| d.len()).collect();
    let mut values: Vec<f64> = var
        .get_values(..)
        .map_err(|e| IoError::NetCdf(format!("Failed to read {}: {}", variable, e)))?;
    cf_unpack(&mut values, &variable_attributes(&var));
    Ok((values, shape))
}

pub fn read_variable(path: &Path, variable: &str) -> IoResult<Vec<f64>> {
    read_all(path, variable).map(|(values, _)| values)
}

pub fn read_band(source: &BandSource) -> IoResult<Vec<f64>> {
    let variable = source.variable.as_deref().ok_or_else(|| {
        IoError::NetCdf("NetCDF bands must name a variable".to_string())
    })?;
    let (values, shape) = read_all(&source.path, variable)?;
    slice_band(values, &shape, source.index)
}
