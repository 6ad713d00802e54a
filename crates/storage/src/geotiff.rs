//! In-memory GeoTIFF encoding of dataset time steps.
//!
//! Writes a single strip, pixel-interleaved image with as many samples per
//! pixel as bands, keeping the dataset dtype. Georeferencing uses the
//! ModelPixelScale/ModelTiepoint/GeoKeyDirectory tags and the fill value is
//! recorded in the GDAL_NODATA tag.

use std::io::{Cursor, Write};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use acquisition::PixelBuffer;
use sat_common::{DataType, Epsg, GeoTransform};

use crate::error::{SaveError, SaveResult};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

const COMPRESSION_NONE: u16 = 1;
const COMPRESSION_DEFLATE: u16 = 8;

/// TIFF SampleFormat: 1 unsigned, 2 signed, 3 IEEE float.
fn sample_format(dtype: DataType) -> u16 {
    match dtype {
        DataType::UInt8 | DataType::UInt16 => 1,
        DataType::Int16 => 2,
        DataType::Float32 => 3,
    }
}

fn interleave<T: Copy>(planes: &[T], bands: usize, plane: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(planes.len());
    for pixel in 0..plane {
        for band in 0..bands {
            out.push(planes[band * plane + pixel]);
        }
    }
    out
}

/// Band-sequential (band, y, x) to pixel-interleaved (y, x, band).
fn to_chunky(planes: &PixelBuffer, bands: usize, plane: usize) -> PixelBuffer {
    match planes {
        PixelBuffer::UInt8(v) => PixelBuffer::UInt8(interleave(v, bands, plane)),
        PixelBuffer::UInt16(v) => PixelBuffer::UInt16(interleave(v, bands, plane)),
        PixelBuffer::Int16(v) => PixelBuffer::Int16(interleave(v, bands, plane)),
        PixelBuffer::Float32(v) => PixelBuffer::Float32(interleave(v, bands, plane)),
    }
}

/// Encodes georeferenced rasters for one CRS and grid.
#[derive(Debug, Clone)]
pub struct GeoTiffWriter {
    crs: Epsg,
    transform: GeoTransform,
    nodata: f64,
    compress: bool,
}

impl GeoTiffWriter {
    pub fn new(crs: Epsg, transform: GeoTransform, nodata: f64) -> Self {
        Self {
            crs,
            transform,
            nodata,
            compress: true,
        }
    }

    /// DEFLATE the pixel strip.
    pub fn compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    /// Encode band-sequential `planes` of `bands` x `height` x `width`.
    pub fn encode(
        &self,
        planes: &PixelBuffer,
        bands: usize,
        height: usize,
        width: usize,
    ) -> SaveResult<Vec<u8>> {
        if bands == 0 || height == 0 || width == 0 {
            return Err(SaveError::Encode(format!(
                "cannot write a {}x{}x{} raster",
                bands, height, width
            )));
        }
        if planes.len() != bands * height * width {
            return Err(SaveError::Encode(format!(
                "expected {} values for {} bands of {}x{}, got {}",
                bands * height * width,
                bands,
                height,
                width,
                planes.len()
            )));
        }

        let dtype = planes.dtype();
        let pixels = to_chunky(planes, bands, height * width).to_le_bytes();
        let strip = if self.compress {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&pixels)?;
            encoder.finish()?
        } else {
            pixels
        };

        let width = u32::try_from(width).map_err(|_| SaveError::Encode("width exceeds u32".into()))?;
        let height = u32::try_from(height).map_err(|_| SaveError::Encode("height exceeds u32".into()))?;
        let strip_len =
            u32::try_from(strip.len()).map_err(|_| SaveError::Encode("strip exceeds 4 GiB".into()))?;

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut cursor)?;
            let mut dir = encoder.new_directory()?;

            dir.write_tag(Tag::ImageWidth, width)?;
            dir.write_tag(Tag::ImageLength, height)?;
            let bits = vec![(dtype.size() * 8) as u16; bands];
            dir.write_tag(Tag::BitsPerSample, bits.as_slice())?;
            dir.write_tag(
                Tag::Compression,
                if self.compress {
                    COMPRESSION_DEFLATE
                } else {
                    COMPRESSION_NONE
                },
            )?;
            // BlackIsZero
            dir.write_tag(Tag::PhotometricInterpretation, 1u16)?;
            dir.write_tag(Tag::SamplesPerPixel, bands as u16)?;
            let formats = vec![sample_format(dtype); bands];
            dir.write_tag(Tag::SampleFormat, formats.as_slice())?;
            // Chunky
            dir.write_tag(Tag::PlanarConfiguration, 1u16)?;
            dir.write_tag(Tag::RowsPerStrip, height)?;
            if bands > 1 {
                let extra = vec![0u16; bands - 1];
                dir.write_tag(Tag::ExtraSamples, extra.as_slice())?;
            }

            self.write_geo_tags(&mut dir)?;

            let offset = dir.write_data(strip.as_slice())?;
            let offset = u32::try_from(offset)
                .map_err(|_| SaveError::Encode("strip offset exceeds u32".into()))?;
            dir.write_tag(Tag::StripOffsets, offset)?;
            dir.write_tag(Tag::StripByteCounts, strip_len)?;
            dir.finish()?;
        }

        Ok(cursor.into_inner())
    }

    fn write_geo_tags<W: Write + std::io::Seek, K: tiff::encoder::TiffKind>(
        &self,
        dir: &mut tiff::encoder::DirectoryEncoder<W, K>,
    ) -> SaveResult<()> {
        let t = &self.transform;
        let scale = [t.pixel_width, t.pixel_height.abs(), 0.0];
        dir.write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), scale.as_slice())?;

        let tiepoint = [0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0];
        dir.write_tag(Tag::Unknown(MODEL_TIEPOINT), tiepoint.as_slice())?;

        let keys = self.geo_keys()?;
        dir.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), keys.as_slice())?;

        let nodata = self.nodata.to_string();
        dir.write_tag(Tag::Unknown(GDAL_NODATA), nodata.as_str())?;
        Ok(())
    }

    /// GeoKeyDirectory: header then (key, location, count, value) entries.
    fn geo_keys(&self) -> SaveResult<Vec<u16>> {
        let code = u16::try_from(self.crs.code())
            .map_err(|_| SaveError::Encode(format!("{} does not fit a GeoKey", self.crs)))?;
        let geographic = self.crs.is_geographic();

        let mut keys = vec![1, 1, 0, 3];
        keys.extend_from_slice(&[
            GT_MODEL_TYPE_GEO_KEY,
            0,
            1,
            if geographic {
                MODEL_TYPE_GEOGRAPHIC
            } else {
                MODEL_TYPE_PROJECTED
            },
        ]);
        keys.extend_from_slice(&[GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);
        let crs_key = if geographic {
            GEOGRAPHIC_TYPE_GEO_KEY
        } else {
            PROJECTED_CS_TYPE_GEO_KEY
        };
        keys.extend_from_slice(&[crs_key, 0, 1, code]);
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::decoder::{Decoder, DecodingResult};

    fn writer() -> GeoTiffWriter {
        GeoTiffWriter::new(
            Epsg::utm(33, true),
            GeoTransform {
                origin_x: 347_050.0,
                origin_y: 6_172_770.0,
                pixel_width: 10.0,
                pixel_height: -10.0,
            },
            0.0,
        )
    }

    #[test]
    fn test_interleave_bands() {
        // two bands of 2 pixels
        assert_eq!(interleave(&[1, 2, 10, 20], 2, 2), vec![1, 10, 2, 20]);
    }

    #[test]
    fn test_single_band_round_trip_with_tags() {
        let planes = PixelBuffer::UInt16(vec![0, 1, 2, 300, 400, 500]);
        for compress in [false, true] {
            let bytes = writer().compression(compress).encode(&planes, 1, 2, 3).unwrap();

            let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
            assert_eq!(decoder.dimensions().unwrap(), (3, 2));
            match decoder.read_image().unwrap() {
                DecodingResult::U16(v) => assert_eq!(v, vec![0, 1, 2, 300, 400, 500]),
                _ => panic!("expected u16 samples"),
            }

            let scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE)).unwrap();
            assert_eq!(scale, vec![10.0, 10.0, 0.0]);
            let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT)).unwrap();
            assert_eq!(tiepoint[3..5], [347_050.0, 6_172_770.0]);
            let keys = decoder.get_tag_u16_vec(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY)).unwrap();
            assert_eq!(&keys[12..], &[PROJECTED_CS_TYPE_GEO_KEY, 0, 1, 32633]);
            let nodata = decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA)).unwrap();
            assert_eq!(nodata.trim_end_matches('\0'), "0");
        }
    }

    #[test]
    fn test_float_samples_keep_values() {
        let planes = PixelBuffer::Float32(vec![-32767.0, 12.5]);
        let bytes = GeoTiffWriter::new(Epsg::utm(32, true), writer().transform, -32767.0)
            .encode(&planes, 1, 1, 2)
            .unwrap();

        let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
        match decoder.read_image().unwrap() {
            DecodingResult::F32(v) => assert_eq!(v, vec![-32767.0, 12.5]),
            _ => panic!("expected f32 samples"),
        }
        let nodata = decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA)).unwrap();
        assert_eq!(nodata.trim_end_matches('\0'), "-32767");
    }

    #[test]
    fn test_multiband_is_written() {
        let planes = PixelBuffer::Int16(vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
        let bytes = writer().encode(&planes, 3, 2, 2).unwrap();
        assert_eq!(&bytes[..4], b"II*\0");
    }

    #[test]
    fn test_size_mismatch_is_rejected() {
        let planes = PixelBuffer::UInt8(vec![0; 5]);
        assert!(matches!(
            writer().encode(&planes, 1, 2, 3),
            Err(SaveError::Encode(_))
        ));
        assert!(writer().encode(&PixelBuffer::UInt8(vec![]), 0, 0, 0).is_err());
    }
}
