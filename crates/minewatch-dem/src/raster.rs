//! Single-band raster grid representation.

use crate::{DemError, Result};
use minewatch_geom::{AffineTransform, BoundingBox};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tiff::ColorType;

/// GeoTIFF `ModelPixelScaleTag`.
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
/// GeoTIFF `ModelTiepointTag`.
const TAG_MODEL_TIEPOINT: u16 = 33922;
/// GeoTIFF `ModelTransformationTag`.
const TAG_MODEL_TRANSFORMATION: u16 = 34264;
/// GDAL no-data tag, stored as ASCII.
const TAG_GDAL_NODATA: u16 = 42113;

/// A raster grid loaded from a GeoTIFF file or built in memory.
///
/// Values are stored in row-major order (row 0 first). The grid is
/// read-only once built; the sampler and volume code only borrow it.
#[derive(Debug, Clone)]
pub struct RasterGrid {
    /// Cell values in row-major order.
    data: Vec<f32>,
    /// Width of the grid in pixels.
    width: u32,
    /// Height of the grid in pixels.
    height: u32,
    /// Pixel to source-coordinate transform.
    transform: AffineTransform,
    /// No-data value (cells equal to this are treated as missing).
    no_data_value: Option<f32>,
}

impl RasterGrid {
    /// Build a grid from row-major data.
    pub fn new(width: u32, height: u32, data: Vec<f32>, transform: AffineTransform) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(DemError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(DemError::DataLengthMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            width,
            height,
            transform,
            no_data_value: None,
        })
    }

    /// Build a grid by evaluating `f(col, row)` for every cell.
    pub fn from_fn<F>(width: u32, height: u32, transform: AffineTransform, f: F) -> Result<Self>
    where
        F: Fn(u32, u32) -> f32,
    {
        let data = (0..height)
            .flat_map(|row| (0..width).map(move |col| (col, row)))
            .map(|(col, row)| f(col, row))
            .collect();
        Self::new(width, height, data, transform)
    }

    /// Set the no-data value.
    pub fn with_no_data(mut self, no_data: Option<f32>) -> Self {
        self.no_data_value = no_data;
        self
    }

    /// Load a single-band raster from a GeoTIFF file.
    ///
    /// The transform comes from `ModelTransformationTag` when present,
    /// otherwise from `ModelTiepointTag` + `ModelPixelScaleTag`.
    pub fn from_geotiff<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut decoder = Self::open_decoder(path)?;

        let (width, height) = decoder.dimensions()?;

        match decoder.colortype()? {
            ColorType::Gray(_) => {}
            other => {
                return Err(DemError::UnsupportedDataType(format!(
                    "{}: expected a single-band raster, found {:?}",
                    path.display(),
                    other
                )))
            }
        }

        let transform = Self::read_transform(&mut decoder, path)?;
        let data = Self::decode_band(&mut decoder)?;
        let no_data_value = Self::read_nodata_value(&mut decoder);

        Ok(Self::new(width, height, data, transform)?.with_no_data(no_data_value))
    }

    /// Read only the pixel dimensions of a TIFF file.
    ///
    /// Used for the reference image, whose pixel content is never consumed.
    pub fn read_dimensions<P: AsRef<Path>>(path: P) -> Result<(u32, u32)> {
        let mut decoder = Self::open_decoder(path.as_ref())?;
        Ok(decoder.dimensions()?)
    }

    fn open_decoder(path: &Path) -> Result<Decoder<std::fs::File>> {
        let file = std::fs::File::open(path)?;
        let decoder = Decoder::new(file)?;

        // Regional DEM exports can be large; allow up to 1 GB buffers
        let mut limits = Limits::default();
        limits.decoding_buffer_size = 1024 * 1024 * 1024;
        limits.intermediate_buffer_size = 1024 * 1024 * 1024;
        limits.ifd_value_size = 1024 * 1024 * 1024;

        Ok(decoder.with_limits(limits))
    }

    /// Read the affine transform from GeoTIFF tags.
    fn read_transform<R: std::io::Read + std::io::Seek>(
        decoder: &mut Decoder<R>,
        path: &Path,
    ) -> Result<AffineTransform> {
        if let Ok(m) = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TRANSFORMATION)) {
            if m.len() >= 8 {
                // Row-major 4x4: [a b 0 c; d e 0 f; ...]
                return Ok(AffineTransform::new(m[0], m[1], m[3], m[4], m[5], m[7]));
            }
        }

        let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT));
        let pixel_scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE));

        if let (Ok(tiepoint), Ok(scale)) = (tiepoint, pixel_scale) {
            if tiepoint.len() >= 6 && scale.len() >= 2 {
                // Tiepoint format: [i, j, k, x, y, z] ties pixel (i, j) to (x, y)
                let (i, j) = (tiepoint[0], tiepoint[1]);
                let (x, y) = (tiepoint[3], tiepoint[4]);
                let (scale_x, scale_y) = (scale[0], scale[1]);

                // Rows run south, so y decreases with row index
                return Ok(AffineTransform::new(
                    scale_x,
                    0.0,
                    x - i * scale_x,
                    0.0,
                    -scale_y,
                    y + j * scale_y,
                ));
            }
        }

        Err(DemError::InvalidGeoTiff(format!(
            "{}: no ModelTransformation or ModelTiepoint/ModelPixelScale tags",
            path.display()
        )))
    }

    /// Decode the band into `f32` values.
    fn decode_band<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<Vec<f32>> {
        let result = decoder.read_image()?;

        match result {
            DecodingResult::F32(data) => Ok(data),
            DecodingResult::F64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I16(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U16(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U8(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I8(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
        }
    }

    /// Try to read the no-data value from the GDAL_NODATA tag.
    fn read_nodata_value<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
        decoder
            .get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GDAL_NODATA))
            .ok()
            .and_then(|s| s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse().ok())
    }

    /// Get the dimensions of this grid in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get the pixel to source-coordinate transform.
    pub fn transform(&self) -> AffineTransform {
        self.transform
    }

    /// Get the no-data value, if any.
    pub fn no_data_value(&self) -> Option<f32> {
        self.no_data_value
    }

    /// Whether a raw value is the no-data marker (or NaN).
    pub fn is_no_data(&self, value: f32) -> bool {
        if value.is_nan() {
            return true;
        }
        match self.no_data_value {
            Some(nodata) => (value - nodata).abs() < 0.001,
            None => false,
        }
    }

    /// Get the value of a cell, or `None` when out of range or no-data.
    pub fn get(&self, col: u32, row: u32) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let value = self.data[row as usize * self.width as usize + col as usize];
        if self.is_no_data(value) {
            None
        } else {
            Some(value)
        }
    }

    /// Raw row-major data, no-data markers included.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Get the source-coordinate bounds of the grid's outer edges.
    pub fn bounds(&self) -> BoundingBox {
        let corners = [
            self.transform.apply(0.0, 0.0),
            self.transform.apply(self.width as f64, 0.0),
            self.transform.apply(0.0, self.height as f64),
            self.transform.apply(self.width as f64, self.height as f64),
        ];
        let mut bbox = BoundingBox {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for (x, y) in corners {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        bbox
    }

    /// Get the resolution in source units per pixel along columns and rows.
    pub fn resolution(&self) -> (f64, f64) {
        self.transform.cell_size()
    }
}
