use geo::AffineTransform;
use ndarray::{Array2, Array3, ArrayView3};
use std::path::Path;

use crate::{
    components::source::{GeoReference, RasterDataType, RasterSource, RasterWriter, WriteOptions},
    errors::{RasterPatchError, Result},
};

/// Implementations for gdal
pub mod gdal_backend {
    use super::*;
    use gdal::{
        cpl::CslStringList,
        raster::{Buffer, GdalType, ResampleAlg},
        Dataset as GdalDataset, DriverManager,
    };
    use log::{debug, info};
    use num::traits::AsPrimitive;
    use std::sync::Arc;

    fn affine_from_gdal(gdal_transform: [f64; 6]) -> AffineTransform {
        AffineTransform::new(
            gdal_transform[1],
            gdal_transform[2],
            gdal_transform[0],
            gdal_transform[4],
            gdal_transform[5],
            gdal_transform[3],
        )
    }

    fn gdal_from_affine(transform: &AffineTransform) -> [f64; 6] {
        [
            transform.xoff(),
            transform.a(),
            transform.b(),
            transform.yoff(),
            transform.d(),
            transform.e(),
        ]
    }

    /// Raster file read through gdal.
    ///
    /// Only the path and the dataset description are kept,
    /// every read reopens the dataset so the file can be shared across threads.
    #[derive(Debug)]
    pub struct GdalFile {
        path: Arc<Path>,
        shape: (usize, usize),
        num_bands: usize,
        resampling: ResampleAlg,
    }

    impl GdalFile {
        pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
            let dataset = GdalDataset::open(&path)?;
            let (width, height) = dataset.raster_size();
            let file = GdalFile {
                path: Arc::from(path.as_ref()),
                shape: (height, width),
                num_bands: dataset.raster_count(),
                resampling: ResampleAlg::NearestNeighbour,
            };
            info!("opened {file:?}");
            Ok(file)
        }

        pub fn with_resampling(mut self, resampling: ResampleAlg) -> Self {
            self.resampling = resampling;
            self
        }

        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl RasterSource for GdalFile {
        fn native_shape(&self) -> (usize, usize) {
            self.shape
        }

        fn num_bands(&self) -> usize {
            self.num_bands
        }

        fn resample(&self, band: usize, shape: (usize, usize)) -> Result<Array2<f64>> {
            if band >= self.num_bands {
                return Err(RasterPatchError::BandUnavailable(band.into()));
            }
            let dataset = GdalDataset::open(&self.path)?;
            let rasterband = dataset.rasterband(band + 1)?;
            let (height, width) = self.shape;
            debug!("resampling band {band} of {:?} to {shape:?}", self.path);
            let buffer = rasterband.read_as::<f64>(
                (0, 0),
                (width, height),
                (shape.1, shape.0),
                Some(self.resampling),
            )?;
            let (buffer_width, buffer_height) = buffer.shape();
            Ok(Array2::from_shape_vec(
                (buffer_height, buffer_width),
                buffer.data().to_vec(),
            )?)
        }

        fn georeference(&self) -> Result<GeoReference> {
            let dataset = GdalDataset::open(&self.path)?;
            Ok(GeoReference {
                transform: affine_from_gdal(dataset.geo_transform()?),
                projection: dataset.projection(),
            })
        }
    }

    #[derive(Debug, Default)]
    pub struct GdalWriter;

    impl GdalWriter {
        fn write_typed<T>(
            path: &Path,
            bands: ArrayView3<f64>,
            georeference: &GeoReference,
            options: &WriteOptions,
        ) -> Result<()>
        where
            T: GdalType + Copy + 'static,
            f64: AsPrimitive<T>,
        {
            let (num_bands, height, width) = bands.dim();
            let driver = DriverManager::get_driver_by_name("GTiff")?;
            let mut creation_options = CslStringList::new();
            if let Some(compression) = &options.compression {
                creation_options.set_name_value("COMPRESS", compression)?;
            }
            let mut dataset = driver.create_with_band_type_with_options::<T, _>(
                path,
                width,
                height,
                num_bands,
                &creation_options,
            )?;
            dataset.set_geo_transform(&gdal_from_affine(&georeference.transform))?;
            if !georeference.projection.is_empty() {
                dataset.set_projection(&georeference.projection)?;
            }
            for (index, band) in bands.outer_iter().enumerate() {
                let mut rasterband = dataset.rasterband(index + 1)?;
                rasterband.set_no_data_value(Some(options.nodata))?;
                let data: Vec<T> = band.iter().map(|value| value.as_()).collect();
                let mut buffer = Buffer::new((width, height), data);
                rasterband.write((0, 0), (width, height), &mut buffer)?;
            }
            info!("Saving image: {path:?}");
            Ok(())
        }
    }

    impl RasterWriter for GdalWriter {
        fn write_raster(
            &self,
            path: &Path,
            bands: ArrayView3<f64>,
            georeference: &GeoReference,
            options: &WriteOptions,
        ) -> Result<()> {
            match options.data_type {
                RasterDataType::UInt8 => Self::write_typed::<u8>(path, bands, georeference, options),
                RasterDataType::UInt16 => Self::write_typed::<u16>(path, bands, georeference, options),
                RasterDataType::Int16 => Self::write_typed::<i16>(path, bands, georeference, options),
                RasterDataType::Int32 => Self::write_typed::<i32>(path, bands, georeference, options),
                RasterDataType::Float32 => Self::write_typed::<f32>(path, bands, georeference, options),
                RasterDataType::Float64 => Self::write_typed::<f64>(path, bands, georeference, options),
            }
        }
    }

}

pub mod memory_backend {
    use super::*;
    use ndarray::Axis;

    /// Raster held as a (C, H, W) array.
    ///
    /// Resampling picks the nearest source pixel to each target pixel center.
    #[derive(Debug, Clone)]
    pub struct ArraySource {
        data: Array3<f64>,
        georeference: GeoReference,
    }

    impl ArraySource {
        pub fn new(data: Array3<f64>) -> Self {
            Self {
                data,
                georeference: GeoReference::default(),
            }
        }

        pub fn from_bands(bands: &[Array2<f64>]) -> Result<Self> {
            let views: Vec<_> = bands.iter().map(|band| band.view()).collect();
            Ok(Self::new(ndarray::stack(Axis(0), &views)?))
        }

        pub fn with_georeference(mut self, georeference: GeoReference) -> Self {
            self.georeference = georeference;
            self
        }
    }

    fn nearest(target: usize, target_len: usize, source_len: usize) -> usize {
        let position = ((target as f64 + 0.5) * source_len as f64 / target_len as f64) as usize;
        position.min(source_len - 1)
    }

    impl RasterSource for ArraySource {
        fn native_shape(&self) -> (usize, usize) {
            let (_, height, width) = self.data.dim();
            (height, width)
        }

        fn num_bands(&self) -> usize {
            self.data.len_of(Axis(0))
        }

        fn resample(&self, band: usize, shape: (usize, usize)) -> Result<Array2<f64>> {
            if band >= self.num_bands() {
                return Err(RasterPatchError::BandUnavailable(band.into()));
            }
            let source = self.data.index_axis(Axis(0), band);
            if shape == self.native_shape() {
                return Ok(source.to_owned());
            }
            let (height, width) = self.native_shape();
            Ok(Array2::from_shape_fn(shape, |(y, x)| {
                source[[nearest(y, shape.0, height), nearest(x, shape.1, width)]]
            }))
        }

        fn georeference(&self) -> Result<GeoReference> {
            Ok(self.georeference.clone())
        }
    }

}
