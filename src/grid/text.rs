//! IGN national text grids (`GR3D` family, e.g. `gr3df97a.txt`).
//!
//! ```text
//! GR3D  002024 024 20370201
//! GR3D1   -5.5000   10.0000   41.0000   52.0000    .1000    .1000
//! GR3D2 INTERPOLATION BILINEAIRE
//! GR3D3 PREC CM 01:5 02:10 03:20 04:50 99>100
//! 00002   -5.500000000   41.000000000  -165.027  -67.100  315.813  99  -158.4
//! ```
//!
//! Node lines are `index lon lat v1 .. v_dim` followed by any number of
//! ignored fields. Nodes are placed by their coordinates, so the file order
//! does not matter.

use std::collections::HashMap;
use std::io::BufRead;

use ndarray::Array3;
use tracing::debug;

use crate::error::GridError;
use crate::grid::Grid;

/// Distance from a node, in cells, still accepted as that node.
const NODE_TOLERANCE: f64 = 1e-6;

/// Largest node count a `GR3D1` header may declare.
const MAX_NODES: usize = 1 << 28;

#[derive(Clone, Debug, PartialEq)]
struct Frame {
    west: f64,
    south: f64,
    dlon: f64,
    dlat: f64,
    cols: usize,
    rows: usize,
}

impl Frame {
    fn parse(fields: &[&str], line: usize) -> Result<Self, GridError> {
        if fields.len() < 7 {
            return Err(GridError::InvalidHeader(format!(
                "line {line}: GR3D1 needs six numbers"
            )));
        }
        let mut v = [0.0; 6];
        for (slot, field) in v.iter_mut().zip(&fields[1..7]) {
            *slot = number(field, line)?;
        }
        let [west, east, south, north, dlon, dlat] = v;
        let finite = v.iter().all(|x| x.is_finite());
        if !finite || dlon <= 0.0 || dlat <= 0.0 || east <= west || north <= south {
            return Err(GridError::InvalidHeader(format!("line {line}: bad frame {v:?}")));
        }
        let cols = ((east - west) / dlon).round() + 1.0;
        let rows = ((north - south) / dlat).round() + 1.0;
        if cols * rows > MAX_NODES as f64 {
            return Err(GridError::InvalidHeader(format!(
                "line {line}: {rows}x{cols} nodes exceeds {MAX_NODES}"
            )));
        }
        Ok(Self {
            west,
            south,
            dlon,
            dlat,
            cols: cols as usize,
            rows: rows as usize,
        })
    }

    /// `(row, col)` of the node at `(lon, lat)`.
    fn locate(&self, lon: f64, lat: f64) -> Option<(usize, usize)> {
        let fc = (lon - self.west) / self.dlon;
        let fr = (lat - self.south) / self.dlat;
        let (c, r) = (fc.round(), fr.round());
        if (fc - c).abs() > NODE_TOLERANCE || (fr - r).abs() > NODE_TOLERANCE {
            return None;
        }
        if c < 0.0 || r < 0.0 || c >= self.cols as f64 || r >= self.rows as f64 {
            return None;
        }
        Some((r as usize, c as usize))
    }
}

fn number(field: &str, line: usize) -> Result<f64, GridError> {
    field
        .parse::<f64>()
        .map_err(|_| GridError::Format(format!("line {line}: {field:?} is not a number")))
}

/// Read a grid carrying `dim` values per node.
pub fn read<R: BufRead>(name: &str, reader: R, dim: usize) -> Result<Grid, GridError> {
    if dim == 0 {
        return Err(GridError::InvalidHeader("text grid needs at least one value per node".into()));
    }

    let mut frame: Option<Frame> = None;
    // Node storage grows with the file, never with the declared frame.
    let mut slots: HashMap<(usize, usize), usize> = HashMap::new();
    let mut data: Vec<f64> = Vec::new();
    let mut title = String::new();

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        let Some(&first) = fields.first() else {
            continue;
        };

        match first {
            "GR3D" => title = fields[1..].join(" "),
            "GR3D1" => {
                if frame.is_some() {
                    return Err(GridError::InvalidHeader(format!(
                        "line {line_no}: second GR3D1 header"
                    )));
                }
                frame = Some(Frame::parse(&fields, line_no)?);
            }
            "GR3D2" | "GR3D3" => {}
            _ => {
                let Some(frame) = frame.as_ref() else {
                    return Err(GridError::InvalidHeader(format!(
                        "line {line_no}: node before the GR3D1 header"
                    )));
                };
                if fields.len() < 3 + dim {
                    return Err(GridError::Format(format!(
                        "line {line_no}: expected index, lon, lat and {dim} values"
                    )));
                }
                let lon = number(fields[1], line_no)?;
                let lat = number(fields[2], line_no)?;
                let node = frame.locate(lon, lat).ok_or_else(|| {
                    GridError::Format(format!("line {line_no}: ({lon}, {lat}) is not a grid node"))
                })?;
                if slots.insert(node, data.len()).is_some() {
                    return Err(GridError::Format(format!(
                        "line {line_no}: node ({lon}, {lat}) given twice"
                    )));
                }
                for field in &fields[3..3 + dim] {
                    data.push(number(field, line_no)?);
                }
            }
        }
    }

    let Some(frame) = frame else {
        return Err(GridError::Truncated("no GR3D1 header".into()));
    };
    if slots.len() != frame.rows * frame.cols {
        let missing = (0..frame.rows * frame.cols)
            .find(|k| !slots.contains_key(&(k / frame.cols, k % frame.cols)))
            .unwrap_or(0);
        let (row, col) = (missing / frame.cols, missing % frame.cols);
        return Err(GridError::Format(format!(
            "missing node at lon {}, lat {}",
            frame.west + col as f64 * frame.dlon,
            frame.south + row as f64 * frame.dlat
        )));
    }

    let values =
        Array3::from_shape_fn((frame.rows, frame.cols, dim), |(r, c, k)| data[slots[&(r, c)] + k]);
    debug!(grid = name, title = %title, "text grid parsed");
    Grid::new(name, frame.west, frame.south, frame.dlon, frame.dlat, values)
}

pub fn parse_str(name: &str, text: &str, dim: usize) -> Result<Grid, GridError> {
    read(name, text.as_bytes(), dim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const HEADER: &str = "\
GR3D  002024 024 20370201
GR3D1   -5.5000   -5.3000   41.0000   41.1000    .1000    .1000
GR3D2 INTERPOLATION BILINEAIRE
GR3D3 PREC CM 01:5 02:10 03:20 04:50 99>100
";

    fn node_line(index: usize, lon: f64, lat: f64) -> String {
        let (tx, ty, tz) = (-165.0 + lon, -67.0 + lat, 315.0 + lon * lat);
        format!("{index:05} {lon:14.9} {lat:14.9} {tx:9.3} {ty:8.3} {tz:8.3}  99  -158.4\n")
    }

    fn nodes(lon_major: bool) -> String {
        let mut text = HEADER.to_string();
        let mut index = 1;
        let lons = [-5.5, -5.4, -5.3];
        let lats = [41.0, 41.1];
        if lon_major {
            for &lon in &lons {
                for &lat in &lats {
                    text.push_str(&node_line(index, lon, lat));
                    index += 1;
                }
            }
        } else {
            for &lat in &lats {
                for &lon in &lons {
                    text.push_str(&node_line(index, lon, lat));
                    index += 1;
                }
            }
        }
        text
    }

    #[test]
    fn test_parse_both_orderings() {
        let a = parse_str("gr3d", &nodes(true), 3).unwrap();
        let b = parse_str("gr3d", &nodes(false), 3).unwrap();
        assert_eq!(a, b);
        assert_eq!((a.rows(), a.cols(), a.dim()), (2, 3, 3));
        assert_relative_eq!(a.x0(), -5.5);
        assert_relative_eq!(a.dy(), 0.1);

        let node = a.node(1, 2).unwrap();
        assert_relative_eq!(node[0], -165.0 - 5.3, epsilon = 1e-9);
        assert_relative_eq!(node[1], -67.0 + 41.1, epsilon = 1e-9);
        assert_relative_eq!(node[2], 315.0 - 5.3 * 41.1, epsilon = 1e-3);
    }

    #[test]
    fn test_interpolates_inside() {
        let grid = parse_str("gr3d", &nodes(true), 3).unwrap();
        let v = grid.interpolate(41.05, -5.45).unwrap();
        assert_relative_eq!(v[0], -165.0 - 5.45, epsilon = 1e-9);
        assert_relative_eq!(v[1], -67.0 + 41.05, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_node() {
        let text = nodes(false);
        let truncated: String = text.lines().take(9).map(|l| format!("{l}\n")).collect();
        let err = parse_str("gr3d", &truncated, 3).unwrap_err();
        assert!(matches!(err, GridError::Format(ref msg) if msg.contains("missing node")));
    }

    #[test]
    fn test_malformed_lines() {
        let off_node = format!("{HEADER}00001 -5.45 41.0 1 2 3\n");
        assert!(matches!(parse_str("g", &off_node, 3), Err(GridError::Format(_))));

        let short = format!("{HEADER}00001 -5.5 41.0 1 2\n");
        assert!(matches!(parse_str("g", &short, 3), Err(GridError::Format(_))));

        let garbage = format!("{HEADER}00001 -5.5 north 1 2 3\n");
        assert!(matches!(parse_str("g", &garbage, 3), Err(GridError::Format(_))));

        let duplicate = format!("{}{}", nodes(true), node_line(7, -5.5, 41.0));
        assert!(matches!(parse_str("g", &duplicate, 3), Err(GridError::Format(_))));

        assert!(matches!(
            parse_str("g", "00001 -5.5 41.0 1 2 3\n", 3),
            Err(GridError::InvalidHeader(_))
        ));
        assert!(matches!(parse_str("g", "GR3D title\n", 3), Err(GridError::Truncated(_))));
    }

    #[test]
    fn test_oversized_frame() {
        let huge = "GR3D1 -180.0 180.0 -90.0 90.0 1e-9 1e-9\n00001 0.0 0.0 1.0\n";
        assert!(matches!(parse_str("g", huge, 1), Err(GridError::InvalidHeader(_))));

        // A large declared frame with a single node reports the gap without
        // sizing storage from the header.
        let sparse = "GR3D1 0.0 9999.0 0.0 9999.0 1.0 1.0\n00001 0.0 0.0 1.0\n";
        let err = parse_str("g", sparse, 1).unwrap_err();
        assert!(matches!(err, GridError::Format(ref msg) if msg.contains("lon 1")));

        let twice = format!("{HEADER}GR3D1 0.0 1.0 0.0 1.0 1.0 1.0\n");
        assert!(matches!(parse_str("g", &twice, 3), Err(GridError::InvalidHeader(_))));
    }

    #[test]
    fn test_single_value_grid() {
        let text = "\
GR3D1 0.0 1.0 0.0 1.0 1.0 1.0
1 0.0 0.0 10.0
2 1.0 0.0 11.0
3 0.0 1.0 12.0
4 1.0 1.0 13.0
";
        let grid = parse_str("geoid", text, 1).unwrap();
        assert_relative_eq!(grid.interpolate(0.5, 0.5).unwrap()[0], 11.5);
    }
}
