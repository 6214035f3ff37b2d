//! NTv2 (`.gsb`) horizontal shift files.
//!
//! The file is a sequence of 16-byte records: an 8-byte ASCII key followed
//! by an 8-byte value. An 11-record overview header precedes each sub-grid's
//! own 11-record header and its `GS_COUNT` node records of four `f32`
//! (latitude shift, longitude shift, two accuracies) in seconds of arc.
//! Longitudes are positive west and nodes run from the south-east corner
//! westward, then northward. Only the first sub-grid is read.

use std::io::Read;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use ndarray::Array3;
use tracing::debug;

use crate::error::GridError;
use crate::grid::Grid;

const RECORD: usize = 16;
const OVERVIEW_RECORDS: usize = 11;
const SUBGRID_RECORDS: usize = 11;
const HEADERS_LEN: usize = (OVERVIEW_RECORDS + SUBGRID_RECORDS) * RECORD;
const SECONDS_PER_DEGREE: f64 = 3600.0;

fn key(bytes: &[u8], record: usize) -> String {
    let start = record * RECORD;
    String::from_utf8_lossy(&bytes[start..start + 8]).trim_end().to_string()
}

fn expect_key(bytes: &[u8], record: usize, expected: &str) -> Result<(), GridError> {
    let found = key(bytes, record);
    if found != expected {
        return Err(GridError::Format(format!(
            "record {record}: expected {expected}, found {found:?}"
        )));
    }
    Ok(())
}

struct SubGrid {
    south: f64,
    north: f64,
    east: f64,
    west: f64,
    lat_inc: f64,
    lon_inc: f64,
    count: usize,
}

fn parse_with<B: ByteOrder>(name: &str, bytes: &[u8]) -> Result<Grid, GridError> {
    let int = |record: usize| B::read_i32(&bytes[record * RECORD + 8..record * RECORD + 12]);
    let double = |record: usize| B::read_f64(&bytes[record * RECORD + 8..record * RECORD + 16]);
    let text = |record: usize| {
        String::from_utf8_lossy(&bytes[record * RECORD + 8..record * RECORD + 16])
            .trim()
            .to_string()
    };

    expect_key(bytes, 3, "GS_TYPE")?;
    let units = text(3);
    if units != "SECONDS" {
        return Err(GridError::Format(format!("unsupported GS_TYPE {units:?}")));
    }
    let subgrids = int(2);
    debug!(grid = name, subgrids, from = %text(5), to = %text(6), "NTv2 overview");

    let o = OVERVIEW_RECORDS;
    let keys = ["S_LAT", "N_LAT", "E_LONG", "W_LONG", "LAT_INC", "LONG_INC", "GS_COUNT"];
    for (offset, expected) in keys.iter().enumerate() {
        expect_key(bytes, o + 4 + offset, expected)?;
    }
    let count = usize::try_from(int(o + 10))
        .map_err(|_| GridError::InvalidHeader(format!("GS_COUNT {}", int(o + 10))))?;
    let sub = SubGrid {
        south: double(o + 4),
        north: double(o + 5),
        east: double(o + 6),
        west: double(o + 7),
        lat_inc: double(o + 8),
        lon_inc: double(o + 9),
        count,
    };
    if !(sub.lat_inc > 0.0 && sub.lon_inc > 0.0 && sub.north > sub.south && sub.west > sub.east) {
        return Err(GridError::InvalidHeader(format!(
            "sub-grid {}: S {} N {} E {} W {} step {} {}",
            key(bytes, o).trim(),
            sub.south,
            sub.north,
            sub.east,
            sub.west,
            sub.lat_inc,
            sub.lon_inc
        )));
    }

    let rows = ((sub.north - sub.south) / sub.lat_inc).round() as usize + 1;
    let cols = ((sub.west - sub.east) / sub.lon_inc).round() as usize + 1;
    if rows.checked_mul(cols) != Some(sub.count) {
        return Err(GridError::InvalidHeader(format!(
            "GS_COUNT {} does not match {rows}x{cols} nodes",
            sub.count
        )));
    }
    let needed = HEADERS_LEN + sub.count * RECORD;
    if bytes.len() < needed {
        return Err(GridError::Truncated(format!(
            "{} node bytes, {} needed",
            bytes.len() - HEADERS_LEN,
            needed - HEADERS_LEN
        )));
    }

    let nodes = &bytes[HEADERS_LEN..needed];
    let mut values = Array3::zeros((rows, cols, 2));
    for (k, node) in nodes.chunks_exact(RECORD).enumerate() {
        let row = k / cols;
        let col = cols - 1 - k % cols;
        let dlat = B::read_f32(&node[0..4]) as f64;
        let dlon_west = B::read_f32(&node[4..8]) as f64;
        values[(row, col, 0)] = dlat / SECONDS_PER_DEGREE;
        values[(row, col, 1)] = -dlon_west / SECONDS_PER_DEGREE;
    }

    Grid::new(
        name,
        -sub.west / SECONDS_PER_DEGREE,
        sub.south / SECONDS_PER_DEGREE,
        sub.lon_inc / SECONDS_PER_DEGREE,
        sub.lat_inc / SECONDS_PER_DEGREE,
        values,
    )
}

/// First sub-grid as a two-value grid of `(Δlat, Δlon)` in degrees, east
/// positive.
pub fn parse(name: &str, bytes: &[u8]) -> Result<Grid, GridError> {
    let found = &bytes[..bytes.len().min(8)];
    if found != &b"NUM_OREC"[..found.len()] {
        return Err(GridError::BadSignature {
            expected: "NUM_OREC".into(),
            found: String::from_utf8_lossy(found).into_owned(),
        });
    }
    if bytes.len() < HEADERS_LEN {
        return Err(GridError::Truncated(format!(
            "NTv2 headers need {HEADERS_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    if LittleEndian::read_i32(&bytes[8..12]) == OVERVIEW_RECORDS as i32 {
        parse_with::<LittleEndian>(name, bytes)
    } else if BigEndian::read_i32(&bytes[8..12]) == OVERVIEW_RECORDS as i32 {
        parse_with::<BigEndian>(name, bytes)
    } else {
        Err(GridError::InvalidHeader("NUM_OREC is not 11 in either byte order".into()))
    }
}

pub fn read<R: Read>(name: &str, mut reader: R) -> Result<Grid, GridError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    parse(name, &bytes)
}
