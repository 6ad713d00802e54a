//! The assembled (time, band, y, x) dataset.

use chrono::{DateTime, Utc};
use num_traits::{Bounded, NumCast, ToPrimitive};
use serde::Serialize;
use tracing::info;

use catalog::{Provider, ResolvedBandSet, SatelliteProfile};
use sat_common::{AcquisitionError, AcquisitionResult, DataType, Epsg, GeoTransform};

use crate::grouping::MergedTimeStep;
use crate::spatial::SpatialPlan;

/// Typed pixel storage in (time, band, y, x) row-major order.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelBuffer {
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    Int16(Vec<i16>),
    Float32(Vec<f32>),
}

impl PixelBuffer {
    /// Cast `data` to `dtype`. Integer types round and saturate; NaN becomes `fill`.
    pub fn from_f32(dtype: DataType, data: &[f32], fill: f64) -> Self {
        match dtype {
            DataType::UInt8 => PixelBuffer::UInt8(cast_values(data, fill, true)),
            DataType::UInt16 => PixelBuffer::UInt16(cast_values(data, fill, true)),
            DataType::Int16 => PixelBuffer::Int16(cast_values(data, fill, true)),
            DataType::Float32 => PixelBuffer::Float32(cast_values(data, fill, false)),
        }
    }

    pub fn dtype(&self) -> DataType {
        match self {
            PixelBuffer::UInt8(_) => DataType::UInt8,
            PixelBuffer::UInt16(_) => DataType::UInt16,
            PixelBuffer::Int16(_) => DataType::Int16,
            PixelBuffer::Float32(_) => DataType::Float32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PixelBuffer::UInt8(v) => v.len(),
            PixelBuffer::UInt16(v) => v.len(),
            PixelBuffer::Int16(v) => v.len(),
            PixelBuffer::Float32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_f64(&self, index: usize) -> Option<f64> {
        match self {
            PixelBuffer::UInt8(v) => v.get(index).map(|x| *x as f64),
            PixelBuffer::UInt16(v) => v.get(index).map(|x| *x as f64),
            PixelBuffer::Int16(v) => v.get(index).map(|x| *x as f64),
            PixelBuffer::Float32(v) => v.get(index).map(|x| *x as f64),
        }
    }

    /// Copy of `len` values starting at `start`.
    pub fn slice(&self, start: usize, len: usize) -> PixelBuffer {
        let range = start..start + len;
        match self {
            PixelBuffer::UInt8(v) => PixelBuffer::UInt8(v[range].to_vec()),
            PixelBuffer::UInt16(v) => PixelBuffer::UInt16(v[range].to_vec()),
            PixelBuffer::Int16(v) => PixelBuffer::Int16(v[range].to_vec()),
            PixelBuffer::Float32(v) => PixelBuffer::Float32(v[range].to_vec()),
        }
    }

    /// Little-endian bytes of every value.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            PixelBuffer::UInt8(v) => v.clone(),
            PixelBuffer::UInt16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            PixelBuffer::Int16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            PixelBuffer::Float32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }
}

fn cast_values<T>(data: &[f32], fill: f64, integer: bool) -> Vec<T>
where
    T: NumCast + Bounded + ToPrimitive + Copy,
{
    let lo = T::min_value().to_f64().unwrap_or(f64::MIN);
    let hi = T::max_value().to_f64().unwrap_or(f64::MAX);
    let fill_value = T::from(fill.clamp(lo, hi)).unwrap_or_else(T::min_value);

    data.iter()
        .map(|&v| {
            if v.is_nan() {
                return fill_value;
            }
            let v = if integer { (v as f64).round() } else { v as f64 };
            T::from(v.clamp(lo, hi)).unwrap_or(fill_value)
        })
        .collect()
}

/// The final artifact of one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub satellite: String,
    /// Sorted (or provider-ordered) and duplicate free.
    pub times: Vec<DateTime<Utc>>,
    /// Band axis in request order.
    pub bands: ResolvedBandSet,
    /// Items composited into each time step.
    pub item_ids: Vec<Vec<String>>,
    pub providers: Vec<Vec<Provider>>,
    pub height: usize,
    pub width: usize,
    pub crs: Epsg,
    pub transform: GeoTransform,
    pub dtype: DataType,
    pub fill_value: f64,
    #[serde(skip)]
    pub data: PixelBuffer,
}

impl Dataset {
    /// (time, band, y, x)
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        (self.times.len(), self.bands.len(), self.height, self.width)
    }

    pub fn band_labels(&self) -> Vec<String> {
        self.bands.labels()
    }

    fn plane_len(&self) -> usize {
        self.height * self.width
    }

    /// One band of one time step as a (y, x) buffer.
    pub fn plane(&self, time: usize, band: usize) -> Option<PixelBuffer> {
        if time >= self.times.len() || band >= self.bands.len() {
            return None;
        }
        let start = (time * self.bands.len() + band) * self.plane_len();
        Some(self.data.slice(start, self.plane_len()))
    }

    /// Every band of one time step as a (band, y, x) buffer.
    pub fn time_step(&self, time: usize) -> Option<PixelBuffer> {
        if time >= self.times.len() {
            return None;
        }
        let step_len = self.bands.len() * self.plane_len();
        Some(self.data.slice(time * step_len, step_len))
    }

    pub fn value(&self, time: usize, band: usize, row: usize, col: usize) -> Option<f64> {
        if time >= self.times.len() || band >= self.bands.len() || row >= self.height || col >= self.width {
            return None;
        }
        let index = ((time * self.bands.len() + band) * self.height + row) * self.width + col;
        self.data.get_f64(index)
    }
}

/// Builds a [`Dataset`] from grouped time steps.
pub struct DatasetAssembler<'a> {
    profile: &'a SatelliteProfile,
    plan: &'a SpatialPlan,
    dtype: DataType,
    fill_value: f64,
}

impl<'a> DatasetAssembler<'a> {
    /// Assembler using the profile's dtype and the plan's fill value.
    pub fn new(profile: &'a SatelliteProfile, plan: &'a SpatialPlan) -> Self {
        Self {
            profile,
            plan,
            dtype: profile.dtype,
            fill_value: plan.fill,
        }
    }

    pub fn with_dtype(mut self, dtype: Option<DataType>) -> Self {
        if let Some(dtype) = dtype {
            self.dtype = dtype;
        }
        self
    }

    /// Arrange `steps` into (time, band, y, x), bands in `bands` order.
    ///
    /// A band absent from a step is filled with the fill value. Every
    /// present grid must match the plan's shape and CRS.
    pub fn assemble(
        &self,
        steps: Vec<MergedTimeStep>,
        bands: &ResolvedBandSet,
    ) -> AcquisitionResult<Dataset> {
        if steps.is_empty() {
            return Err(AcquisitionError::NoDataFound);
        }

        let (height, width) = self.plan.shape();
        let plane = height * width;
        let fill = self.fill_value as f32;

        let mut values: Vec<f32> = Vec::with_capacity(steps.len() * bands.len() * plane);
        let mut times = Vec::with_capacity(steps.len());
        let mut item_ids = Vec::with_capacity(steps.len());
        let mut providers = Vec::with_capacity(steps.len());

        for step in steps {
            for band in bands {
                match step.bands.get(&band.native) {
                    Some(grid) => {
                        if grid.shape() != (height, width) || grid.data.len() != plane {
                            return Err(AcquisitionError::InconsistentShape(format!(
                                "time step {} band {} is {}x{}, dataset is {}x{}",
                                step.datetime, band.requested, grid.height, grid.width, height, width
                            )));
                        }
                        if grid.crs != self.plan.crs {
                            return Err(AcquisitionError::InconsistentShape(format!(
                                "time step {} band {} is in {}, dataset is in {}",
                                step.datetime, band.requested, grid.crs, self.plan.crs
                            )));
                        }
                        values.extend_from_slice(&grid.data);
                    }
                    None => values.extend(std::iter::repeat(fill).take(plane)),
                }
            }
            times.push(step.datetime);
            item_ids.push(step.item_ids);
            providers.push(step.providers);
        }

        let data = PixelBuffer::from_f32(self.dtype, &values, self.fill_value);

        info!(
            satellite = %self.profile.id,
            times = times.len(),
            bands = bands.len(),
            height = height,
            width = width,
            dtype = %self.dtype,
            "Dataset assembled"
        );

        Ok(Dataset {
            satellite: self.profile.id.to_string(),
            times,
            bands: bands.clone(),
            item_ids,
            providers,
            height,
            width,
            crs: self.plan.crs,
            transform: self.plan.transform,
            dtype: self.dtype,
            fill_value: self.fill_value,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_cast_rounds_and_saturates() {
        let data = [1.4, 1.6, -3.0, 70000.0, f32::NAN];
        match PixelBuffer::from_f32(DataType::UInt16, &data, 0.0) {
            PixelBuffer::UInt16(v) => assert_eq!(v, vec![1, 2, 0, 65535, 0]),
            other => panic!("unexpected {:?}", other),
        }
        match PixelBuffer::from_f32(DataType::Int16, &data, -9999.0) {
            PixelBuffer::Int16(v) => assert_eq!(v, vec![1, 2, -3, 32767, -9999]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_float_cast_keeps_fraction() {
        match PixelBuffer::from_f32(DataType::Float32, &[0.25, f32::NAN], -32768.0) {
            PixelBuffer::Float32(v) => assert_eq!(v, vec![0.25, -32768.0]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_le_bytes() {
        let buffer = PixelBuffer::UInt16(vec![1, 256]);
        assert_eq!(buffer.to_le_bytes(), vec![1, 0, 0, 1]);
        assert_eq!(buffer.dtype(), DataType::UInt16);
        assert_eq!(buffer.slice(1, 1), PixelBuffer::UInt16(vec![256]));
    }
}
