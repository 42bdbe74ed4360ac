//! Minimal GeoTIFF I/O: single-band DEM in, byte risk raster out.
//!
//! Georeferencing uses ModelPixelScale + ModelTiepoint (north-up only), the
//! CRS an EPSG code from the GeoKey directory, no-data the GDAL ASCII tag.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use inundation_core::export::{risk_bytes, NODATA_BYTE};
use inundation_core::{ElevationGrid, GeoTransform, Grid, RiskGrid};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype::Gray8, TiffEncoder};
use tiff::tags::Tag;

const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
const GEO_KEY_DIRECTORY: Tag = Tag::GeoKeyDirectoryTag;
const GDAL_NODATA: Tag = Tag::GdalNodata;

const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;

pub fn read_dem(path: &Path) -> Result<ElevationGrid> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    decode_dem(BufReader::new(file)).with_context(|| format!("decoding {}", path.display()))
}

pub fn decode_dem<R: Read + Seek>(reader: R) -> Result<ElevationGrid> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;

    let data: Vec<f32> = match decoder.read_image()? {
        DecodingResult::F32(buf) => buf,
        DecodingResult::F64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(buf) => buf.into_iter().map(f32::from).collect(),
        _ => bail!("unsupported DEM sample format"),
    };

    let transform = read_transform(&mut decoder)?;
    let crs = read_epsg(&mut decoder).map(|code| format!("EPSG:{code}"));
    let nodata = decoder
        .get_tag_ascii_string(GDAL_NODATA)
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f32>().ok());

    let grid = Grid::from_vec(data, width as usize, height as usize, transform)?.with_crs(crs);
    Ok(ElevationGrid::new(grid, nodata))
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE).map_err(|_| anyhow!("no ModelPixelScale tag"))?;
    let tiepoint = decoder.get_tag_f64_vec(MODEL_TIEPOINT).map_err(|_| anyhow!("no ModelTiepoint tag"))?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        bail!("malformed georeferencing tags");
    }
    // tiepoint: [I, J, K, X, Y, Z]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_epsg<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<u16> {
    let keys = decoder.get_tag_u16_vec(GEO_KEY_DIRECTORY).ok()?;
    // Header of 4, then (key, location, count, value) entries; location 0 = inline.
    keys.get(4..)?
        .chunks_exact(4)
        .find(|k| (k[0] == GEOGRAPHIC_TYPE || k[0] == PROJECTED_CS_TYPE) && k[1] == 0)
        .map(|k| k[3])
}

fn epsg_code(crs: Option<&str>) -> Option<u16> {
    crs?.strip_prefix("EPSG:")?.parse().ok()
}

pub fn write_risk(grid: &RiskGrid, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    encode_risk(grid, BufWriter::new(file)).with_context(|| format!("writing {}", path.display()))
}

/// Byte raster (0–100, 255 = undetermined) with georeferencing tags.
pub fn encode_risk<W: Write + Seek>(grid: &RiskGrid, writer: W) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)?;
    let mut image = encoder.new_image::<Gray8>(grid.width as u32, grid.height as u32)?;

    let gt = grid.transform;
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image.encoder().write_tag(MODEL_PIXEL_SCALE, &scale[..])?;
    image.encoder().write_tag(MODEL_TIEPOINT, &tiepoint[..])?;

    // GTRasterType = PixelIsArea; model type and CRS key only when the code is known.
    let geokeys: Vec<u16> = match epsg_code(grid.crs.as_deref()) {
        Some(code) => {
            let (model, key) = if code == 4326 { (2, GEOGRAPHIC_TYPE) } else { (1, PROJECTED_CS_TYPE) };
            vec![1, 1, 0, 3, GT_MODEL_TYPE, 0, 1, model, GT_RASTER_TYPE, 0, 1, 1, key, 0, 1, code]
        }
        None => vec![1, 1, 0, 1, GT_RASTER_TYPE, 0, 1, 1],
    };
    image.encoder().write_tag(GEO_KEY_DIRECTORY, &geokeys[..])?;
    image.encoder().write_tag(GDAL_NODATA, NODATA_BYTE.to_string().as_str())?;

    image.write_data(&risk_bytes(grid))?;
    Ok(())
}
