use std::fs::{File, read_to_string};
use std::io::{BufWriter, Write};
use std::num::ParseFloatError;
use ndarray::Array2;
use serde::{Serialize, Deserialize};




// ============================================================================
#[derive(thiserror::Error, Debug)]
pub enum Error {

    #[cfg(feature = "serde_cbor")]
    #[error("{0}")]
    SerdeCbor(#[from] serde_cbor::Error),

    #[error("{0}")]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    ParseFloat(#[from] ParseFloatError),

    #[error("grid file {path} has {found} values, expected {expected}")]
    GridShape { path: String, expected: usize, found: usize },

    #[error("input file {0} given, but serde_cbor is not enabled")]
    SerdeCborNotEnabled(String),
}




// ============================================================================
#[cfg(feature = "serde_cbor")]
pub fn write_cbor<T: Serialize>(value: &T, path_str: &str) -> Result<(), Error> {
    log::info!("write {}", path_str);
    let file = File::create(path_str)?;
    let buffer = BufWriter::new(file);

    serde_cbor::to_writer(buffer, &value)?;
    Ok(())
}

#[cfg(not(feature = "serde_cbor"))]
pub fn write_cbor<T: Serialize>(_: &T, path_str: &str) -> Result<(), Error> {
    log::warn!("skip writing {} (serde_cbor is not enabled)", path_str);
    Ok(())
}

#[cfg(feature = "serde_cbor")]
pub fn read_cbor<T: for<'de> Deserialize<'de>>(path_str: &str) -> Result<T, Error> {
    let file = File::open(path_str)?;
    let buffer = std::io::BufReader::new(file);
    Ok(serde_cbor::from_reader(buffer)?)
}

#[cfg(not(feature = "serde_cbor"))]
pub fn read_cbor<T: for<'de> Deserialize<'de>>(path_str: &str) -> Result<T, Error> {
    Err(Error::SerdeCborNotEnabled(path_str.to_string()))
}




// ============================================================================
/**
 * Write a 2D array as whitespace-separated text, one array row per line.
 * Values use the shortest representation that parses back to the same
 * float, so [`read_grid_text`] reproduces the array exactly.
 */
pub fn write_grid_text(values: &Array2<f64>, path_str: &str) -> Result<(), Error> {
    log::info!("write {}", path_str);
    let mut buffer = BufWriter::new(File::create(path_str)?);

    for row in values.outer_iter() {
        let line: Vec<String> = row.iter().map(|x| format!("{:e}", x)).collect();
        writeln!(buffer, "{}", line.join(" "))?;
    }
    buffer.flush()?;
    Ok(())
}

/**
 * Read a grid written by [`write_grid_text`]. Line breaks are not enforced;
 * the whitespace-separated values are consumed in row-major order and must
 * number exactly `shape.0 * shape.1`.
 */
pub fn read_grid_text(path_str: &str, shape: (usize, usize)) -> Result<Array2<f64>, Error> {
    let values: Vec<f64> = read_to_string(path_str)?
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()?;

    let expected = shape.0 * shape.1;

    if values.len() != expected {
        return Err(Error::GridShape {
            path: path_str.to_string(),
            expected,
            found: values.len(),
        })
    }
    Array2::from_shape_vec(shape, values).map_err(|_| Error::GridShape {
        path: path_str.to_string(),
        expected,
        found: expected,
    })
}
