//! MSB-first bit packing for the compressed grid codec.

use crate::error::GridError;

fn mask(n: u32) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

pub struct BitWriter {
    buffer: Vec<u8>,
    current: u32,
    filled: u32,
}

impl BitWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
            current: 0,
            filled: 0,
        }
    }

    /// Append the low `n` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u64, n: u32) -> Result<(), GridError> {
        if n > 64 {
            return Err(GridError::Format(format!("cannot write {n} bits at once")));
        }
        let mut remaining = n;
        while remaining > 0 {
            let take = (8 - self.filled).min(remaining);
            let chunk = (value >> (remaining - take)) & mask(take);
            self.current = (self.current << take) | chunk as u32;
            self.filled += take;
            remaining -= take;
            if self.filled == 8 {
                self.buffer.push(self.current as u8);
                self.current = 0;
                self.filled = 0;
            }
        }
        Ok(())
    }

    /// Two's complement of `value` on `n` bits.
    pub fn write_signed(&mut self, value: i64, n: u32) -> Result<(), GridError> {
        self.write_bits(value as u64 & mask(n), n)
    }

    /// Pad with zero bits up to the next byte boundary.
    pub fn align(&mut self) {
        if self.filled > 0 {
            self.buffer.push((self.current << (8 - self.filled)) as u8);
            self.current = 0;
            self.filled = 0;
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.align();
        self.buffer
    }
}

pub struct BitReader<'a> {
    data: &'a [u8],
    /// Absolute bit offset into `data`.
    position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn read_bits(&mut self, n: u32) -> Result<u64, GridError> {
        if n > 64 {
            return Err(GridError::Format(format!("cannot read {n} bits at once")));
        }
        if self.position + n as usize > self.data.len() * 8 {
            return Err(GridError::Truncated(format!(
                "{n} bits requested at bit {} of {}",
                self.position,
                self.data.len() * 8
            )));
        }
        let mut result = 0u64;
        let mut remaining = n;
        while remaining > 0 {
            let byte = self.data[self.position / 8] as u64;
            let available = 8 - (self.position % 8) as u32;
            let take = available.min(remaining);
            let chunk = (byte >> (available - take)) & mask(take);
            result = (result << take) | chunk;
            self.position += take as usize;
            remaining -= take;
        }
        Ok(result)
    }

    /// Sign-extended `n`-bit two's complement value.
    pub fn read_signed(&mut self, n: u32) -> Result<i64, GridError> {
        let raw = self.read_bits(n)?;
        if n == 0 || n == 64 {
            return Ok(raw as i64);
        }
        if (raw >> (n - 1)) & 1 == 1 {
            Ok((raw | !mask(n)) as i64)
        } else {
            Ok(raw as i64)
        }
    }

    /// Skip to the next byte boundary.
    pub fn align(&mut self) {
        self.position = self.position.div_ceil(8) * 8;
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.data.len() * 8
    }

    pub fn byte_position(&self) -> usize {
        self.position.div_ceil(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_writer_cross_byte_boundary() {
        let mut writer = BitWriter::with_capacity(10);
        writer.write_bits(0b111111, 6).unwrap();
        writer.write_bits(0b10101010, 8).unwrap();
        let result = writer.finish();
        assert_eq!(result, vec![0b11111110, 0b10101000]);
    }

    #[test]
    fn test_bit_writer_large_values() {
        let mut writer = BitWriter::with_capacity(10);
        writer.write_bits(0x1234_5678_9abc, 48).unwrap();
        assert_eq!(writer.finish(), vec![0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc]);
    }

    #[test]
    fn test_zero_bits_and_invalid_size() {
        let mut writer = BitWriter::with_capacity(1);
        writer.write_bits(123, 0).unwrap();
        assert!(writer.write_bits(1, 65).is_err());
        assert_eq!(writer.finish(), Vec::<u8>::new());
    }

    #[test]
    fn test_signed_round_trip() {
        let values = [
            (-1i64, 2u32),
            (1, 2),
            (-2, 2),
            (-4, 3),
            (3, 3),
            (-(1 << 33), 35),
            (12345, 16),
        ];
        let mut writer = BitWriter::with_capacity(16);
        for &(v, n) in &values {
            writer.write_signed(v, n).unwrap();
        }
        let data = writer.finish();
        let mut reader = BitReader::new(&data);
        for &(v, n) in &values {
            assert_eq!(reader.read_signed(n).unwrap(), v, "{v} on {n} bits");
        }
    }

    #[test]
    fn test_alignment() {
        let mut writer = BitWriter::with_capacity(4);
        writer.write_bits(0b101, 3).unwrap();
        writer.align();
        writer.write_bits(0xff, 8).unwrap();
        let data = writer.finish();
        assert_eq!(data, vec![0b10100000, 0xff]);

        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
        reader.align();
        assert_eq!(reader.byte_position(), 1);
        assert_eq!(reader.read_bits(8).unwrap(), 0xff);
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_bit_reader_insufficient_data() {
        let data = vec![0xFF];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(8).unwrap(), 0xFF);
        assert!(matches!(reader.read_bits(1), Err(GridError::Truncated(_))));
    }
}
