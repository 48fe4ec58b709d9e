//! Raster and report I/O: TIFF decoding into grids, TIFF encoding of the
//! error map, and the per-tree averages text file.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::{debug, warn};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};

use crate::error::{EvalError, Result};
use crate::ground::GroundReport;
use crate::raster::{ColorRaster, Label, LabelRaster, Raster};

// ==========================================================================
// Decoding
// ==========================================================================

struct Decoded<T> {
    nrow: usize,
    ncol: usize,
    bands: usize,
    samples: Vec<T>,
}

fn missing(path: &Path, reason: impl ToString) -> EvalError {
    EvalError::MissingInput {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn decode(path: &Path) -> Result<(usize, usize, DecodingResult)> {
    let file = File::open(path).map_err(|e| missing(path, e))?;
    let mut decoder = Decoder::new(BufReader::new(file)).map_err(|e| missing(path, e))?;
    let (width, height) = decoder.dimensions().map_err(|e| missing(path, e))?;
    let result = decoder.read_image().map_err(|e| missing(path, e))?;
    Ok((height as usize, width as usize, result))
}

fn split_bands<T>(path: &Path, nrow: usize, ncol: usize, samples: Vec<T>) -> Result<Decoded<T>> {
    let total = nrow * ncol;
    if total == 0 || samples.len() % total != 0 {
        return Err(EvalError::UnsupportedFormat(format!(
            "{}: {} samples do not fit a {}x{} image",
            path.display(),
            samples.len(),
            ncol,
            nrow
        )));
    }
    Ok(Decoded {
        nrow,
        ncol,
        bands: samples.len() / total,
        samples,
    })
}

/// Load the first band of a TIFF as a floating point raster.
///
/// Used for the centre markers and both terrain rasters.
pub fn load_raster(path: &Path) -> Result<Raster> {
    let (nrow, ncol, result) = decode(path)?;
    let raw: Vec<f64> = match result {
        DecodingResult::F64(v) => v,
        DecodingResult::F32(v) => v.iter().map(|x| *x as f64).collect(),
        DecodingResult::U32(v) => v.iter().map(|x| *x as f64).collect(),
        DecodingResult::U16(v) => v.iter().map(|x| *x as f64).collect(),
        DecodingResult::U8(v) => v.iter().map(|x| *x as f64).collect(),
        DecodingResult::I32(v) => v.iter().map(|x| *x as f64).collect(),
        DecodingResult::I16(v) => v.iter().map(|x| *x as f64).collect(),
        DecodingResult::I8(v) => v.iter().map(|x| *x as f64).collect(),
        _ => {
            return Err(EvalError::UnsupportedFormat(format!(
                "{}: pixel type not supported for elevation data",
                path.display()
            )))
        }
    };
    let d = split_bands(path, nrow, ncol, raw)?;
    if d.bands > 1 {
        warn!(
            "{}: {} bands found, using band 0",
            path.display(),
            d.bands
        );
    }
    let data: Vec<f64> = if d.bands == 1 {
        d.samples
    } else {
        d.samples.iter().step_by(d.bands).copied().collect()
    };
    debug!("loaded {} ({} × {})", path.display(), d.ncol, d.nrow);
    Ok(Raster::from_vec(d.nrow, d.ncol, data))
}

/// Load a categorical TIFF. Up to three integer bands form the label; a
/// single-band image yields labels `[v, 0, 0]`.
pub fn load_label_raster(path: &Path) -> Result<LabelRaster> {
    let (nrow, ncol, result) = decode(path)?;
    let raw: Vec<u32> = match result {
        DecodingResult::U8(v) => v.iter().map(|x| *x as u32).collect(),
        DecodingResult::U16(v) => v.iter().map(|x| *x as u32).collect(),
        DecodingResult::U32(v) => v,
        _ => {
            return Err(EvalError::UnsupportedFormat(format!(
                "{}: labels must be unsigned integers",
                path.display()
            )))
        }
    };
    let d = split_bands(path, nrow, ncol, raw)?;
    let used = d.bands.min(3);
    let data: Vec<Label> = d
        .samples
        .chunks_exact(d.bands)
        .map(|px| {
            let mut label = [0u32; 3];
            label[..used].copy_from_slice(&px[..used]);
            label
        })
        .collect();
    debug!(
        "loaded {} ({} × {}, {} band(s))",
        path.display(),
        d.ncol,
        d.nrow,
        d.bands
    );
    Ok(LabelRaster::from_vec(d.nrow, d.ncol, data))
}

// ==========================================================================
// Encoding
// ==========================================================================

fn create(path: &Path) -> Result<TiffEncoder<BufWriter<File>>> {
    let file = File::create(path)?;
    Ok(TiffEncoder::new(BufWriter::new(file))?)
}

/// Write the error map as an 8-bit RGB TIFF.
pub fn write_color_raster(map: &ColorRaster, path: &Path) -> Result<()> {
    let flat: Vec<u8> = map.data.iter().flatten().copied().collect();
    create(path)?.write_image::<colortype::RGB8>(map.ncol as u32, map.nrow as u32, &flat)?;
    Ok(())
}

/// Write a single-band 32-bit float TIFF.
pub fn write_raster(raster: &Raster, path: &Path) -> Result<()> {
    let flat: Vec<f32> = raster.data.iter().map(|v| *v as f32).collect();
    create(path)?.write_image::<colortype::Gray32Float>(
        raster.ncol as u32,
        raster.nrow as u32,
        &flat,
    )?;
    Ok(())
}

/// Write a label raster as RGB, 8-bit when every channel fits.
pub fn write_label_raster(labels: &LabelRaster, path: &Path) -> Result<()> {
    let (w, h) = (labels.ncol as u32, labels.nrow as u32);
    let flat: Vec<u32> = labels.data.iter().flatten().copied().collect();
    let mut encoder = create(path)?;
    if flat.iter().all(|v| *v <= u8::MAX as u32) {
        let bytes: Vec<u8> = flat.iter().map(|v| *v as u8).collect();
        encoder.write_image::<colortype::RGB8>(w, h, &bytes)?;
    } else {
        encoder.write_image::<colortype::RGB32>(w, h, &flat)?;
    }
    Ok(())
}

/// One line per tree: estimated mean then true mean, 2 decimals,
/// space-separated.
pub fn write_averages(report: &GroundReport, path: &Path) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_path(path)?;
    for t in &report.trees {
        wtr.write_record([
            format!("{:.2}", t.estimated_mean),
            format!("{:.2}", t.true_mean),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
