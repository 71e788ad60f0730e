//! Bounds-checked little-endian cursor over a payload.
//!
//! Every read returns `None` instead of panicking when the payload runs out,
//! which lets decoders treat trailing sections as optional.

pub(crate) struct PayloadReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        PayloadReader { data, position: 0 }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn bytes(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.remaining() < n {
            return None;
        }
        let slice = &self.data[self.position..self.position + n];
        self.position += n;
        Some(slice)
    }

    pub fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        self.bytes(N)?.try_into().ok()
    }

    pub fn skip(&mut self, n: usize) -> Option<()> {
        self.bytes(n).map(|_| ())
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.position..];
        self.position = self.data.len();
        slice
    }

    pub fn u8(&mut self) -> Option<u8> {
        self.array::<1>().map(|[b]| b)
    }

    pub fn i8(&mut self) -> Option<i8> {
        self.u8().map(|b| b as i8)
    }

    pub fn u16_le(&mut self) -> Option<u16> {
        self.array().map(u16::from_le_bytes)
    }

    pub fn i16_le(&mut self) -> Option<i16> {
        self.array().map(i16::from_le_bytes)
    }

    pub fn u32_le(&mut self) -> Option<u32> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn i32_le(&mut self) -> Option<i32> {
        self.array().map(i32::from_le_bytes)
    }

    /// Text up to the first zero byte inside the next `n` bytes; all `n` are consumed.
    pub fn fixed_str(&mut self, n: usize) -> Option<String> {
        self.bytes(n).map(c_str)
    }
}

/// Decode bytes up to the first zero byte, or all of them if there is none.
pub(crate) fn c_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
