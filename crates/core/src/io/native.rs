//! Native GeoTIFF reading/writing (without GDAL dependency)
//!
//! Uses the `tiff` crate. Georeferencing is limited to what flood scenarios
//! need: pixel scale + tiepoint, the CRS from the GeoKey directory (an EPSG
//! code, or the model type plus Transverse Mercator parameters for
//! user-defined grids) and the GDAL nodata tag.

use crate::crs::{CrsKind, TransverseMercator, CRS};
use crate::error::{Error, Result};
use crate::raster::{CellValue, GeoTransform, Raster};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GEO_DOUBLE_PARAMS: u16 = 34736;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const PROJECTION_KEY: u16 = 3074;
const PROJ_COORD_TRANS_KEY: u16 = 3075;
const PROJ_LINEAR_UNITS_KEY: u16 = 3076;
const PROJ_NAT_ORIGIN_LONG_KEY: u16 = 3080;
const PROJ_NAT_ORIGIN_LAT_KEY: u16 = 3081;
const PROJ_FALSE_EASTING_KEY: u16 = 3082;
const PROJ_FALSE_NORTHING_KEY: u16 = 3083;
const PROJ_SCALE_AT_NAT_ORIGIN_KEY: u16 = 3092;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const USER_DEFINED: u16 = 32767;
const CT_TRANSVERSE_MERCATOR: u16 = 1;
const LINEAR_METRE: u16 = 9001;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Value written to the GDAL nodata tag, if any
    pub nodata: Option<f64>,
}

/// Read a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: CellValue,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T: CellValue>(data: &[u8]) -> Result<Raster<T>> {
    decode_geotiff(Cursor::new(data))
}

fn tiff_err(context: &str) -> impl Fn(tiff::TiffError) -> Error + '_ {
    move |e| Error::Tiff(format!("{context}: {e}"))
}

fn cast_all<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: CellValue,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: CellValue,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader).map_err(tiff_err("TIFF decode error"))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(tiff_err("Cannot read dimensions"))?;
    let rows = height as usize;
    let cols = width as usize;

    let data: Vec<T> = match decoder
        .read_image()
        .map_err(tiff_err("Cannot read image data"))?
    {
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::I8(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_crs(read_crs(&mut decoder));
    raster.set_nodata(
        decoder
            .get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA))
            .ok()
            .and_then(|s| s.trim_end_matches('\0').trim().parse::<f64>().ok())
            .and_then(num_traits::cast),
    );

    Ok(raster)
}

/// GeoTransform from ModelPixelScale + ModelTiepoint
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT)).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// CRS from the GeoKeyDirectory and its double-valued parameters
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder
        .get_tag_u16_vec(Tag::from_u16_exhaustive(GEO_KEY_DIRECTORY))
        .ok()?;
    if keys.len() < 4 {
        return None;
    }
    let doubles = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(GEO_DOUBLE_PARAMS))
        .unwrap_or_default();

    let num_keys = keys[3] as usize;
    let mut short = HashMap::new();
    let mut double = HashMap::new();
    for entry in keys[4..].chunks_exact(4).take(num_keys) {
        let (key_id, location, value) = (entry[0], entry[1], entry[3]);
        // location names the tag holding the value; 0 means inline
        match location {
            0 => {
                short.insert(key_id, value);
            }
            GEO_DOUBLE_PARAMS => {
                if let Some(&v) = doubles.get(value as usize) {
                    double.insert(key_id, v);
                }
            }
            _ => {}
        }
    }
    crs_from_keys(&short, &double)
}

/// A projected EPSG code wins, then the model type decides between a
/// user-defined projected grid and a geographic one.
fn crs_from_keys(short: &HashMap<u16, u16>, double: &HashMap<u16, f64>) -> Option<CRS> {
    let code = |key: u16| {
        short
            .get(&key)
            .copied()
            .filter(|&v| v != 0 && v != USER_DEFINED)
    };
    let model = short.get(&GT_MODEL_TYPE_KEY).copied();

    if let Some(code) = code(PROJECTED_CS_TYPE_KEY) {
        return Some(CRS::from_epsg(code.into()));
    }
    if model == Some(MODEL_TYPE_PROJECTED) {
        let metres = short
            .get(&PROJ_LINEAR_UNITS_KEY)
            .map_or(true, |&u| u == LINEAR_METRE);
        if metres && short.get(&PROJ_COORD_TRANS_KEY) == Some(&CT_TRANSVERSE_MERCATOR) {
            if let Some(tm) = transverse_mercator_from_keys(double) {
                return Some(CRS::from_proj(tm.to_proj_string()));
            }
        }
        return Some(CRS::user_defined(CrsKind::Projected));
    }
    if let Some(code) = code(GEOGRAPHIC_TYPE_KEY) {
        return Some(CRS::from_epsg(code.into()));
    }
    (model == Some(MODEL_TYPE_GEOGRAPHIC)).then(|| CRS::user_defined(CrsKind::Geographic))
}

fn transverse_mercator_from_keys(double: &HashMap<u16, f64>) -> Option<TransverseMercator> {
    let or = |key: u16, default: f64| double.get(&key).copied().unwrap_or(default);
    let tm = TransverseMercator {
        lon0: *double.get(&PROJ_NAT_ORIGIN_LONG_KEY)?,
        lat0: or(PROJ_NAT_ORIGIN_LAT_KEY, 0.0),
        k0: or(PROJ_SCALE_AT_NAT_ORIGIN_KEY, 1.0),
        false_easting: or(PROJ_FALSE_EASTING_KEY, 0.0),
        false_northing: or(PROJ_FALSE_NORTHING_KEY, 0.0),
    };
    let finite = [tm.lon0, tm.lat0, tm.k0, tm.false_easting, tm.false_northing]
        .iter()
        .all(|v| v.is_finite());
    finite.then_some(tm)
}

/// Write a Raster to a GeoTIFF file as 32-bit float
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: &GeoTiffOptions) -> Result<()>
where
    T: CellValue,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    encode_geotiff(raster, file, options)
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T: CellValue>(
    raster: &Raster<T>,
    options: &GeoTiffOptions,
) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), options)?;
    Ok(buf)
}

/// GeoKeyDirectory entries plus the GeoDoubleParams they point into
fn geo_keys(crs: Option<&CRS>) -> (Vec<u16>, Vec<f64>) {
    let kind = crs.and_then(|c| c.kind().ok());
    let epsg = crs
        .and_then(CRS::epsg)
        .and_then(|code| u16::try_from(code).ok());

    let model_type = match kind {
        Some(CrsKind::Geographic) => MODEL_TYPE_GEOGRAPHIC,
        Some(CrsKind::Projected) => MODEL_TYPE_PROJECTED,
        None => USER_DEFINED,
    };

    let mut entries: Vec<[u16; 4]> = vec![
        [GT_MODEL_TYPE_KEY, 0, 1, model_type],
        [GT_RASTER_TYPE_KEY, 0, 1, 1], // RasterPixelIsArea
    ];
    let mut doubles = Vec::new();
    match (kind, epsg) {
        (Some(CrsKind::Geographic), Some(code)) => entries.push([GEOGRAPHIC_TYPE_KEY, 0, 1, code]),
        (Some(CrsKind::Projected), Some(code)) => entries.push([PROJECTED_CS_TYPE_KEY, 0, 1, code]),
        (Some(CrsKind::Geographic), None) => {
            entries.push([GEOGRAPHIC_TYPE_KEY, 0, 1, USER_DEFINED]);
        }
        (Some(CrsKind::Projected), None) => {
            entries.push([PROJECTED_CS_TYPE_KEY, 0, 1, USER_DEFINED]);
            if let Some(tm) = crs.and_then(TransverseMercator::from_crs) {
                entries.push([PROJECTION_KEY, 0, 1, USER_DEFINED]);
                entries.push([PROJ_COORD_TRANS_KEY, 0, 1, CT_TRANSVERSE_MERCATOR]);
                entries.push([PROJ_LINEAR_UNITS_KEY, 0, 1, LINEAR_METRE]);
                for (key, value) in [
                    (PROJ_NAT_ORIGIN_LONG_KEY, tm.lon0),
                    (PROJ_NAT_ORIGIN_LAT_KEY, tm.lat0),
                    (PROJ_FALSE_EASTING_KEY, tm.false_easting),
                    (PROJ_FALSE_NORTHING_KEY, tm.false_northing),
                    (PROJ_SCALE_AT_NAT_ORIGIN_KEY, tm.k0),
                ] {
                    entries.push([key, GEO_DOUBLE_PARAMS, 1, doubles.len() as u16]);
                    doubles.push(value);
                }
            }
        }
        _ => {}
    }

    let mut keys = vec![1, 1, 0, entries.len() as u16];
    keys.extend(entries.iter().flatten());
    (keys, doubles)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: &GeoTiffOptions) -> Result<()>
where
    T: CellValue,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer).map_err(tiff_err("TIFF encoder error"))?;

    let (rows, cols) = raster.shape();
    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(tiff_err("Cannot create TIFF image"))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &scale[..])
        .map_err(tiff_err("Cannot write scale tag"))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT), &tiepoint[..])
        .map_err(tiff_err("Cannot write tiepoint tag"))?;

    let (keys, doubles) = geo_keys(raster.crs());
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), keys.as_slice())
        .map_err(tiff_err("Cannot write geokey tag"))?;
    if !doubles.is_empty() {
        image
            .encoder()
            .write_tag(Tag::Unknown(GEO_DOUBLE_PARAMS), doubles.as_slice())
            .map_err(tiff_err("Cannot write geokey parameters"))?;
    }

    if let Some(nodata) = options.nodata {
        let text = nodata.to_string();
        image
            .encoder()
            .write_tag(Tag::Unknown(GDAL_NODATA), text.as_str())
            .map_err(tiff_err("Cannot write nodata tag"))?;
    }

    image
        .write_data(&data)
        .map_err(tiff_err("Cannot write image data"))?;

    Ok(())
}
