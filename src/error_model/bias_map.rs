//! Spatial bias grid.
//!
//! Text format:
//! ```text
//! # xmin=0, xmax=2, ymin=0, ymax=1, bias=0, dcorr=0, resolution=1
//! #
//! 1.0 2.0 3.0
//! 4.0 5.0 6.0
//! ```
//! The header has seven comma-separated `name=value` fields after a leading
//! marker character. Further comment or blank lines are skipped. Each data
//! row is one y step starting at `ymin`; each column one x step starting at
//! `xmin`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use tracing::info;

use crate::core::BiasMapError;

const HEADER_FIELDS: usize = 7;

/// Grid of bias values in picoseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct BiasMap {
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
    bias: f64,
    dcorr: f64,
    resolution: f64,
    xsize: usize,
    ysize: usize,
    cells: Vec<f64>,
}

impl BiasMap {
    /// Load a map from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BiasMapError> {
        let path = path.as_ref();
        let map = Self::from_reader(BufReader::new(File::open(path)?))?;
        info!(
            path = %path.display(),
            width = map.xsize,
            height = map.ysize,
            resolution = map.resolution,
            "loaded bias map"
        );
        Ok(map)
    }

    /// Parse a map from any buffered reader.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, BiasMapError> {
        let mut lines = reader.lines();
        let header = lines.next().ok_or(BiasMapError::MissingHeader)??;
        let fields = parse_header(&header)?;

        let [xmin, xmax, ymin, ymax, bias, dcorr, resolution] = fields;
        if !(resolution > 0.0) || !resolution.is_finite() {
            return Err(BiasMapError::InvalidResolution(resolution));
        }
        if !(xmax >= xmin) || !(ymax >= ymin) {
            return Err(BiasMapError::MalformedHeader(header));
        }
        // Spans are whole multiples of the resolution; round off float error.
        let xsize = ((xmax - xmin) / resolution).round() as usize + 1;
        let ysize = ((ymax - ymin) / resolution).round() as usize + 1;

        let mut cells = Vec::with_capacity(xsize * ysize);
        let mut rows = 0;
        for (idx, line) in lines.enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            // Header is line 1.
            let line_no = idx + 2;
            let start = cells.len();
            for value in trimmed.split_whitespace() {
                let cell = value.parse::<f64>().map_err(|_| BiasMapError::InvalidValue {
                    line: line_no,
                    value: value.to_string(),
                })?;
                cells.push(cell);
            }
            let width = cells.len() - start;
            if width != xsize {
                return Err(BiasMapError::RowWidth {
                    line: line_no,
                    expected: xsize,
                    actual: width,
                });
            }
            rows += 1;
        }
        if rows != ysize {
            return Err(BiasMapError::RowCount {
                expected: ysize,
                actual: rows,
            });
        }

        Ok(Self {
            xmin,
            xmax,
            ymin,
            ymax,
            bias,
            dcorr,
            resolution,
            xsize,
            ysize,
            cells,
        })
    }

    /// Bias at `(x, y)`, or 0 outside the grid.
    pub fn bias(&self, x: f64, y: f64) -> f64 {
        if x < self.xmin || y < self.ymin || x > self.xmax || y > self.ymax {
            return 0.0;
        }
        let col = (((x - self.xmin) / self.resolution) as usize).min(self.xsize - 1);
        let row = (((y - self.ymin) / self.resolution) as usize).min(self.ysize - 1);
        self.cells[row * self.xsize + col]
    }

    /// Grid width in cells.
    pub fn width(&self) -> usize {
        self.xsize
    }

    /// Grid height in cells.
    pub fn height(&self) -> usize {
        self.ysize
    }

    /// Cell edge length.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Bounds as `(xmin, xmax, ymin, ymax)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.xmin, self.xmax, self.ymin, self.ymax)
    }

    /// Mean bias the map was generated with.
    pub fn generated_bias(&self) -> f64 {
        self.bias
    }

    /// Correlation distance the map was generated with.
    pub fn correlation_distance(&self) -> f64 {
        self.dcorr
    }
}

impl FromStr for BiasMap {
    type Err = BiasMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_reader(s.as_bytes())
    }
}

fn parse_header(line: &str) -> Result<[f64; HEADER_FIELDS], BiasMapError> {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    let mut chars = compact.chars();
    if chars.next().is_none() {
        return Err(BiasMapError::MissingHeader);
    }
    let body = chars.as_str();

    let malformed = || BiasMapError::MalformedHeader(line.to_string());
    let parts: Vec<&str> = body.split(',').collect();
    if parts.len() != HEADER_FIELDS {
        return Err(malformed());
    }

    let mut fields = [0.0; HEADER_FIELDS];
    for (slot, part) in fields.iter_mut().zip(parts) {
        let value = part.split_once('=').map_or(part, |(_, v)| v);
        *slot = value.parse().map_err(|_| malformed())?;
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = "# xmin=0, xmax=2, ymin=0, ymax=1, bias=0, dcorr=0, resolution=1\n\
                         # \n\
                         1.0 2.0 3.0\n\
                         4.0 5.0 6.0\n";

    #[test]
    fn test_parse_small_map() {
        let map: BiasMap = SMALL.parse().unwrap();
        assert_eq!(map.width(), 3);
        assert_eq!(map.height(), 2);
        assert_eq!(map.bounds(), (0.0, 2.0, 0.0, 1.0));
    }

    #[test]
    fn test_lookup_cells() {
        let map: BiasMap = SMALL.parse().unwrap();
        assert_eq!(map.bias(0.0, 0.0), 1.0);
        assert_eq!(map.bias(1.5, 0.2), 2.0);
        assert_eq!(map.bias(0.0, 1.0), 4.0);
        assert_eq!(map.bias(2.0, 1.0), 6.0);
    }

    #[test]
    fn test_out_of_bounds_is_neutral() {
        let map: BiasMap = SMALL.parse().unwrap();
        assert_eq!(map.bias(3.0, 0.0), 0.0);
        assert_eq!(map.bias(-1.0, 0.0), 0.0);
        assert_eq!(map.bias(0.0, 2.0), 0.0);
        assert_eq!(map.bias(0.0, -1.0), 0.0);
    }

    #[test]
    fn test_fractional_resolution() {
        let text = "#xmin=-1,xmax=1,ymin=-1,ymax=1,bias=0,dcorr=0,resolution=0.5\n\
                    0 0 0 0 0\n\
                    0 0 0 0 0\n\
                    0 0 7 0 0\n\
                    0 0 0 0 0\n\
                    0 0 0 0 9\n";
        let map: BiasMap = text.parse().unwrap();
        assert_eq!(map.width(), 5);
        assert_eq!(map.bias(0.1, 0.1), 7.0);
        assert_eq!(map.bias(1.0, 1.0), 9.0);
    }

    #[test]
    fn test_inexact_resolution_span() {
        // 0.3 / 0.1 is just below 3 in floating point.
        let text = "#xmin=0,xmax=0.3,ymin=0,ymax=0.2,bias=0,dcorr=0,resolution=0.1\n\
                    1 2 3 4\n\
                    5 6 7 8\n\
                    9 10 11 12\n";
        let map: BiasMap = text.parse().unwrap();
        assert_eq!(map.width(), 4);
        assert_eq!(map.height(), 3);
        assert_eq!(map.bias(0.0, 0.0), 1.0);
        assert_eq!(map.bias(0.25, 0.0), 3.0);
        assert_eq!(map.bias(0.05, 0.15), 5.0);
    }

    #[test]
    fn test_row_width_mismatch() {
        let text = "#xmin=0,xmax=2,ymin=0,ymax=0,bias=0,dcorr=0,resolution=1\n1 2\n";
        assert!(matches!(
            text.parse::<BiasMap>(),
            Err(BiasMapError::RowWidth { line: 2, expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_row_count_mismatch() {
        let text = "#xmin=0,xmax=0,ymin=0,ymax=2,bias=0,dcorr=0,resolution=1\n1\n2\n";
        assert!(matches!(
            text.parse::<BiasMap>(),
            Err(BiasMapError::RowCount { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_bad_header_and_values() {
        assert!(matches!("".parse::<BiasMap>(), Err(BiasMapError::MissingHeader)));
        assert!(matches!(
            "#xmin=0,xmax=1\n".parse::<BiasMap>(),
            Err(BiasMapError::MalformedHeader(_))
        ));
        assert!(matches!(
            "#xmin=0,xmax=0,ymin=0,ymax=0,bias=0,dcorr=0,resolution=0\n1\n".parse::<BiasMap>(),
            Err(BiasMapError::InvalidResolution(_))
        ));
        assert!(matches!(
            "#xmin=0,xmax=0,ymin=0,ymax=0,bias=0,dcorr=0,resolution=1\nabc\n".parse::<BiasMap>(),
            Err(BiasMapError::InvalidValue { line: 2, .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            BiasMap::load("/nonexistent/bias.map"),
            Err(BiasMapError::Io(_))
        ));
    }
}
