//! BLEGG: bit-packed second differences of a scaled integer grid.
//!
//! Layout (all integers big-endian):
//!
//! ```text
//! "BLEGG" | i32 group_size | i32 rows | i32 cols | i32 scale
//!         | f64 x0 | f64 y0 | f64 width | f64 height
//!         | i32 seed0 | i32 seed1 | block*
//! ```
//!
//! Node values are `round(v·scale)` visited boustrophedon (even rows left to
//! right, odd rows right to left). The first two are stored raw as seeds,
//! every following one as its second difference. Differences are packed in
//! blocks of `group_size`: one width byte `w`, then `w` bits per difference
//! in two's complement, padded to a byte. `w = 0` marks an all-zero block
//! without payload.

use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use ndarray::{Array2, Array3, ArrayView2};
use num_traits::NumCast;
use tracing::{debug, trace};

use crate::error::GridError;
use crate::grid::bits::{BitReader, BitWriter};
use crate::grid::Grid;

pub const SIGNATURE: &[u8; 5] = b"BLEGG";
pub const HEADER_LEN: usize = 61;

#[derive(Clone, Debug, PartialEq)]
pub struct BleggHeader {
    pub group_size: usize,
    pub rows: usize,
    pub cols: usize,
    pub scale: i32,
    pub x0: f64,
    pub y0: f64,
    /// Longitude distance from the first to the last column.
    pub width: f64,
    /// Latitude distance from the first to the last row.
    pub height: f64,
}

impl BleggHeader {
    fn validate(&self) -> Result<(), GridError> {
        if self.group_size == 0 || self.group_size > i32::MAX as usize {
            return Err(GridError::InvalidHeader(format!("group size {}", self.group_size)));
        }
        let limit = i32::MAX as usize;
        if self.rows < 2 || self.cols < 2 || self.rows > limit || self.cols > limit {
            return Err(GridError::InvalidHeader(format!(
                "grid shape {}x{}",
                self.rows, self.cols
            )));
        }
        if self.rows.checked_mul(self.cols).is_none() {
            return Err(GridError::InvalidHeader("grid too large".to_string()));
        }
        if self.scale <= 0 {
            return Err(GridError::InvalidHeader(format!("scale {}", self.scale)));
        }
        let geometry = [self.x0, self.y0, self.width, self.height];
        if !geometry.iter().all(|v| v.is_finite()) || self.width == 0.0 || self.height == 0.0 {
            return Err(GridError::InvalidHeader(format!("geometry {geometry:?}")));
        }
        Ok(())
    }
}

/// Smallest `k` with `2^k >= m`, for `m >= 1`.
fn ceil_log2(m: u64) -> u32 {
    64 - (m - 1).leading_zeros()
}

/// Bits needed for a block whose largest magnitude is `max_abs`.
pub fn block_width(max_abs: u64) -> u32 {
    if max_abs == 0 {
        0
    } else {
        ceil_log2(max_abs) + 2
    }
}

fn boustrophedon(values: &ArrayView2<'_, i32>) -> Vec<i64> {
    let (rows, cols) = values.dim();
    let mut out = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        if r % 2 == 0 {
            out.extend((0..cols).map(|c| values[(r, c)] as i64));
        } else {
            out.extend((0..cols).rev().map(|c| values[(r, c)] as i64));
        }
    }
    out
}

fn unfold(sequence: &[i32], rows: usize, cols: usize) -> Array2<i32> {
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let k = if r % 2 == 0 { c } else { cols - 1 - c };
        sequence[r * cols + k]
    })
}

/// Encode an integer grid.
pub fn encode(header: &BleggHeader, values: &ArrayView2<'_, i32>) -> Result<Vec<u8>, GridError> {
    header.validate()?;
    if values.dim() != (header.rows, header.cols) {
        return Err(GridError::Format(format!(
            "values are {:?}, header declares {}x{}",
            values.dim(),
            header.rows,
            header.cols
        )));
    }

    let sequence = boustrophedon(values);
    let mut out = Vec::with_capacity(HEADER_LEN + sequence.len());
    out.extend_from_slice(SIGNATURE);
    out.write_i32::<BigEndian>(header.group_size as i32)?;
    out.write_i32::<BigEndian>(header.rows as i32)?;
    out.write_i32::<BigEndian>(header.cols as i32)?;
    out.write_i32::<BigEndian>(header.scale)?;
    out.write_f64::<BigEndian>(header.x0)?;
    out.write_f64::<BigEndian>(header.y0)?;
    out.write_f64::<BigEndian>(header.width)?;
    out.write_f64::<BigEndian>(header.height)?;
    out.write_i32::<BigEndian>(sequence[0] as i32)?;
    out.write_i32::<BigEndian>(sequence[1] as i32)?;

    let diffs: Vec<i64> = sequence
        .windows(3)
        .map(|w| w[2] - 2 * w[1] + w[0])
        .collect();

    let mut writer = BitWriter::with_capacity(diffs.len());
    for (block, chunk) in diffs.chunks(header.group_size).enumerate() {
        let max_abs = chunk.iter().map(|d| d.unsigned_abs()).max().unwrap_or(0);
        let width = block_width(max_abs);
        trace!(block, width, count = chunk.len(), "BLEGG block");
        writer.write_bits(width as u64, 8)?;
        if width > 0 {
            for &d in chunk {
                writer.write_signed(d, width)?;
            }
        }
        writer.align();
    }
    out.extend(writer.finish());
    Ok(out)
}

fn read_header(bytes: &[u8]) -> Result<BleggHeader, GridError> {
    let found = &bytes[..bytes.len().min(SIGNATURE.len())];
    if found != &SIGNATURE[..found.len()] {
        return Err(GridError::BadSignature {
            expected: String::from_utf8_lossy(SIGNATURE).into_owned(),
            found: String::from_utf8_lossy(found).into_owned(),
        });
    }
    if bytes.len() < HEADER_LEN {
        return Err(GridError::Truncated(format!(
            "BLEGG header needs {HEADER_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    let dimension = |at: usize, what: &str| -> Result<usize, GridError> {
        let v = BigEndian::read_i32(&bytes[at..at + 4]);
        usize::try_from(v).map_err(|_| GridError::InvalidHeader(format!("{what} {v}")))
    };
    let header = BleggHeader {
        group_size: dimension(5, "group size")?,
        rows: dimension(9, "rows")?,
        cols: dimension(13, "cols")?,
        scale: BigEndian::read_i32(&bytes[17..21]),
        x0: BigEndian::read_f64(&bytes[21..29]),
        y0: BigEndian::read_f64(&bytes[29..37]),
        width: BigEndian::read_f64(&bytes[37..45]),
        height: BigEndian::read_f64(&bytes[45..53]),
    };
    header.validate()?;
    Ok(header)
}

/// Decode an integer grid.
pub fn decode(bytes: &[u8]) -> Result<(BleggHeader, Array2<i32>), GridError> {
    let header = read_header(bytes)?;
    let total = header.rows * header.cols;
    // Every block costs at least its width byte.
    let blocks_needed = (total - 2).div_ceil(header.group_size);
    let available = bytes.len() - HEADER_LEN;
    if blocks_needed > available {
        return Err(GridError::Truncated(format!(
            "{}x{} grid needs {blocks_needed} blocks, stream has {available} bytes",
            header.rows, header.cols
        )));
    }

    let mut sequence: Vec<i32> = Vec::with_capacity(total);
    sequence.push(BigEndian::read_i32(&bytes[53..57]));
    sequence.push(BigEndian::read_i32(&bytes[57..61]));

    let mut reader = BitReader::new(&bytes[HEADER_LEN..]);
    let mut blocks = 0usize;
    while sequence.len() < total {
        if reader.is_at_end() {
            return Err(GridError::Truncated(format!(
                "{} of {total} values decoded",
                sequence.len()
            )));
        }
        let width = reader.read_bits(8)? as u32;
        if width > 64 {
            return Err(GridError::Format(format!("block {blocks}: width {width}")));
        }
        let count = header.group_size.min(total - sequence.len());
        for _ in 0..count {
            let d = if width == 0 { 0 } else { reader.read_signed(width)? };
            let n = sequence.len();
            let prev = sequence[n - 1] as i64;
            let before = sequence[n - 2] as i64;
            let v = prev.wrapping_mul(2).wrapping_sub(before).wrapping_add(d);
            let v = i32::try_from(v)
                .map_err(|_| GridError::Format(format!("block {blocks}: value {v} overflows")))?;
            sequence.push(v);
        }
        reader.align();
        blocks += 1;
    }
    if !reader.is_at_end() {
        return Err(GridError::Format(format!(
            "{} trailing bytes after {blocks} blocks",
            bytes.len() - HEADER_LEN - reader.byte_position()
        )));
    }

    debug!(rows = header.rows, cols = header.cols, blocks, "BLEGG decoded");
    let values = unfold(&sequence, header.rows, header.cols);
    Ok((header, values))
}

/// Encode a one-value grid, quantised with its own scale.
pub fn encode_grid(grid: &Grid, group_size: usize) -> Result<Vec<u8>, GridError> {
    if grid.dim() != 1 {
        return Err(GridError::Format(format!(
            "BLEGG stores one value per node, {} has {}",
            grid.name(),
            grid.dim()
        )));
    }
    let scale = grid.scale();
    let int_scale: i32 = match NumCast::from(scale) {
        Some(s) if scale.fract() == 0.0 => s,
        _ => return Err(GridError::InvalidHeader(format!("scale {scale} is not an integer"))),
    };

    let view = grid.values();
    let mut ints = Array2::<i32>::zeros((grid.rows(), grid.cols()));
    for ((r, c), slot) in ints.indexed_iter_mut() {
        let value = view[(r, c, 0)];
        *slot = NumCast::from((value * scale).round())
            .ok_or(GridError::ValueOutOfRange { value, scale })?;
    }

    let header = BleggHeader {
        group_size,
        rows: grid.rows(),
        cols: grid.cols(),
        scale: int_scale,
        x0: grid.x0(),
        y0: grid.y0(),
        width: grid.x_last() - grid.x0(),
        height: grid.y_last() - grid.y0(),
    };
    encode(&header, &ints.view())
}

pub fn decode_grid(name: &str, bytes: &[u8]) -> Result<Grid, GridError> {
    let (header, ints) = decode(bytes)?;
    let scale = header.scale as f64;
    let dx = header.width / (header.cols - 1) as f64;
    let dy = header.height / (header.rows - 1) as f64;
    let values: Array3<f64> = ints.mapv(|v| v as f64 / scale).insert_axis(ndarray::Axis(2));
    Grid::new(name, header.x0, header.y0, dx, dy, values)?.with_scale(scale)
}

pub fn write<W: Write>(grid: &Grid, group_size: usize, mut writer: W) -> Result<(), GridError> {
    writer.write_all(&encode_grid(grid, group_size)?)?;
    Ok(())
}

pub fn read<R: Read>(name: &str, mut reader: R) -> Result<Grid, GridError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode_grid(name, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn header(group_size: usize, rows: usize, cols: usize) -> BleggHeader {
        BleggHeader {
            group_size,
            rows,
            cols,
            scale: 1000,
            x0: -5.5,
            y0: 41.0,
            width: 0.1 * (cols - 1) as f64,
            height: 0.1 * (rows - 1) as f64,
        }
    }

    /// Deterministic values mixing smooth trends, zero runs and jumps.
    fn sample_values(rows: usize, cols: usize, seed: u64) -> Array2<i32> {
        let mut state = seed;
        Array2::from_shape_fn((rows, cols), |(r, c)| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let noise = ((state >> 33) % 7) as i32 - 3;
            if r == 1 {
                0
            } else if (r + c) % 11 == 0 {
                -2_000_000_000 + c as i32
            } else {
                (r * 37 + c * 11) as i32 * 100 + noise
            }
        })
    }

    #[test]
    fn test_width_formula() {
        assert_eq!(block_width(0), 0);
        assert_eq!(block_width(1), 2);
        assert_eq!(block_width(2), 3);
        assert_eq!(block_width(3), 4);
        assert_eq!(block_width(4), 4);
        assert_eq!(block_width(5), 5);
        assert_eq!(block_width(1 << 33), 35);
    }

    #[test]
    fn test_known_bytes() {
        // Boustrophedon sequence 0, 0, 0, 5: seeds 0 and 0, differences 0 and 5.
        let values = ndarray::array![[0, 0], [5, 0]];
        let bytes = encode(&header(8, 2, 2), &values.view()).unwrap();
        assert_eq!(&bytes[..5], b"BLEGG");
        assert_eq!(&bytes[HEADER_LEN..], &[5, 0b0000_0001, 0b0100_0000]);

        // A linear sequence has only zero second differences.
        let values = ndarray::array![[0, 1], [3, 2]];
        let bytes = encode(&header(8, 2, 2), &values.view()).unwrap();
        assert_eq!(&bytes[HEADER_LEN..], &[0]);
    }

    #[test]
    fn test_round_trip_group_sizes_and_shapes() {
        for group in [8usize, 16, 32] {
            // Fewer differences than a group, exactly one group, a ragged tail.
            for (rows, cols) in [(2, 3), (2, group / 2 + 1), (2, group + 2), (5, 7), (9, 13)] {
                let values = sample_values(rows, cols, (group * rows * cols) as u64);
                let h = header(group, rows, cols);
                let bytes = encode(&h, &values.view()).unwrap();
                let (decoded_header, decoded) = decode(&bytes).unwrap();
                assert_eq!(decoded_header, h);
                assert_eq!(decoded, values, "group {group}, {rows}x{cols}");
            }
        }
    }

    #[test]
    fn test_extreme_values() {
        let values = ndarray::array![[i32::MAX, i32::MIN, i32::MAX], [i32::MIN, 0, i32::MAX]];
        let bytes = encode(&header(8, 2, 3), &values.view()).unwrap();
        assert_eq!(decode(&bytes).unwrap().1, values);
    }

    #[test]
    fn test_errors() {
        let values = sample_values(3, 4, 1);
        let bytes = encode(&header(8, 3, 4), &values.view()).unwrap();

        let mut bad = bytes.clone();
        bad[0] = b'X';
        assert!(matches!(decode(&bad), Err(GridError::BadSignature { .. })));
        assert!(matches!(decode(&bytes[..40]), Err(GridError::Truncated(_))));
        assert!(matches!(decode(&bytes[..bytes.len() - 1]), Err(GridError::Truncated(_))));

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert!(matches!(decode(&trailing), Err(GridError::Format(_))));

        let mut one_row = bytes.clone();
        one_row[9..13].copy_from_slice(&1i32.to_be_bytes());
        assert!(matches!(decode(&one_row), Err(GridError::InvalidHeader(_))));
    }

    #[test]
    fn test_declared_shape_larger_than_stream() {
        let values = sample_values(3, 4, 1);
        let bytes = encode(&header(8, 3, 4), &values.view()).unwrap();

        let mut huge = bytes[..HEADER_LEN].to_vec();
        BigEndian::write_i32(&mut huge[9..13], i32::MAX);
        BigEndian::write_i32(&mut huge[13..17], i32::MAX);
        assert!(matches!(decode(&huge), Err(GridError::Truncated(_))));

        // 100x100 at group size 8 needs 1250 blocks, far more than the payload.
        let mut tall = bytes.clone();
        BigEndian::write_i32(&mut tall[9..13], 100);
        BigEndian::write_i32(&mut tall[13..17], 100);
        assert!(matches!(decode(&tall), Err(GridError::Truncated(_))));
    }

    #[test]
    fn test_grid_round_trip() {
        let grid = Grid::from_vec(
            "geoid",
            -5.5,
            41.0,
            0.1,
            0.1,
            3,
            4,
            1,
            vec![44.123, 44.2, 44.31, 44.4, 45.0, 45.1, 45.2, 45.3, 46.0, 46.5, 46.25, 46.125],
        )
        .unwrap()
        .with_scale(1000.0)
        .unwrap();

        let mut buffer = Vec::new();
        write(&grid, 16, &mut buffer).unwrap();
        let decoded = read("geoid", buffer.as_slice()).unwrap();
        assert_eq!((decoded.rows(), decoded.cols()), (3, 4));
        assert_relative_eq!(decoded.dx(), 0.1, epsilon = 1e-12);
        assert_eq!(decoded.scale(), 1000.0);
        for (a, b) in decoded.values().iter().zip(grid.values().iter()) {
            assert_relative_eq!(*a, *b, epsilon = 5e-4);
        }
    }

    #[test]
    fn test_value_out_of_range() {
        let grid =
            Grid::from_vec("big", 0.0, 0.0, 1.0, 1.0, 2, 2, 1, vec![0.0, 3e9, 0.0, 0.0]).unwrap();
        assert!(matches!(
            encode_grid(&grid, 8),
            Err(GridError::ValueOutOfRange { .. })
        ));
        let fractional = grid.clone().with_scale(2.5).unwrap();
        assert!(matches!(encode_grid(&fractional, 8), Err(GridError::InvalidHeader(_))));
    }
}
