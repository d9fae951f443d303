// Serialized ATN container: header parsing, 16-bit word reader and writer.
//
// Layout (little-endian):
// - bytes 0..4: magic
// - bytes 4..8: payload length in 16-bit words
// - bytes 8..: payload words

use crate::{DecodeError, EncodeError, NONE_WORD};

/// Header magic (`"QATN"` read as a little-endian u32).
pub const MAGIC: u32 = 0x4E54_4151;

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Parsed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtnHeader {
    /// Number of 16-bit words following the header.
    pub payload_words: usize,
}

/// Parses and validates the 8-byte header. The payload must fill the rest of
/// `data` exactly.
pub fn parse_header(data: &[u8]) -> Result<AtnHeader, DecodeError> {
    if data.len() < HEADER_SIZE {
        return Err(DecodeError::TooShort {
            expected: HEADER_SIZE,
            actual: data.len(),
        });
    }

    let magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    if magic != MAGIC {
        return Err(DecodeError::InvalidMagic);
    }

    let payload_words = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
    let declared = payload_words * 2;
    let actual = data.len() - HEADER_SIZE;
    if declared != actual {
        return Err(DecodeError::LengthMismatch { declared, actual });
    }

    Ok(AtnHeader { payload_words })
}

/// Copy the payload into an aligned `Vec<u16>`; the source slice may sit at
/// any byte offset.
pub fn payload_words(data: &[u8], header: AtnHeader) -> Vec<u16> {
    let mut words = vec![0u16; header.payload_words];
    let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut words);
    dst.copy_from_slice(&data[HEADER_SIZE..HEADER_SIZE + header.payload_words * 2]);
    if cfg!(target_endian = "big") {
        for w in &mut words {
            *w = u16::from_le(*w);
        }
    }
    words
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Sequential reader over payload words.
pub struct WordReader<'a> {
    words: &'a [u16],
    pos: usize,
}

impl<'a> WordReader<'a> {
    pub fn new(words: &'a [u16]) -> Self {
        Self { words, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.words.len() - self.pos
    }

    pub fn read(&mut self) -> Result<u16, DecodeError> {
        let w = *self
            .words
            .get(self.pos)
            .ok_or(DecodeError::UnexpectedEnd { offset: self.pos })?;
        self.pos += 1;
        Ok(w)
    }

    pub fn read_usize(&mut self) -> Result<usize, DecodeError> {
        self.read().map(usize::from)
    }

    /// A word where [`NONE_WORD`] stands for "absent".
    pub fn read_opt(&mut self) -> Result<Option<usize>, DecodeError> {
        let w = self.read()?;
        Ok((w != NONE_WORD).then_some(w as usize))
    }

    /// Two words, low half first.
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let lo = self.read()? as u32;
        let hi = self.read()? as u32;
        Ok(lo | (hi << 16))
    }

    /// Eight words, least significant first.
    pub fn read_u128(&mut self) -> Result<u128, DecodeError> {
        let mut value = 0u128;
        for i in 0..8 {
            value |= (self.read()? as u128) << (16 * i);
        }
        Ok(value)
    }

    /// A length-prefixed UTF-16 string.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_usize()?;
        self.read_units(len)
    }

    /// A string whose length word may be [`NONE_WORD`].
    pub fn read_opt_string(&mut self) -> Result<Option<String>, DecodeError> {
        match self.read_opt()? {
            Some(len) => self.read_units(len).map(Some),
            None => Ok(None),
        }
    }

    fn read_units(&mut self, len: usize) -> Result<String, DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::UnexpectedEnd {
                offset: self.words.len(),
            });
        }
        let units = &self.words[self.pos..self.pos + len];
        self.pos += len;
        String::from_utf16(units).map_err(|_| {
            DecodeError::InvalidName(format!("invalid UTF-16 ending at word {}", self.pos))
        })
    }

    /// Error unless every word has been consumed.
    pub fn finish(&self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            words => Err(DecodeError::TrailingData { words }),
        }
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Payload builder; [`WordWriter::into_bytes`] prepends the header.
#[derive(Debug, Default)]
pub struct WordWriter {
    words: Vec<u16>,
}

impl WordWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn push(&mut self, w: u16) {
        self.words.push(w);
    }

    pub fn push_opt(&mut self, v: Option<usize>) {
        self.words.push(v.map_or(NONE_WORD, |v| v as u16));
    }

    pub fn push_u32(&mut self, v: u32) {
        self.words.push(v as u16);
        self.words.push((v >> 16) as u16);
    }

    pub fn push_u128(&mut self, v: u128) {
        for i in 0..8 {
            self.words.push((v >> (16 * i)) as u16);
        }
    }

    /// The length word must stay below [`NONE_WORD`].
    pub fn push_string(&mut self, s: &str) -> Result<(), EncodeError> {
        let units: Vec<u16> = s.encode_utf16().collect();
        let len = u16::try_from(units.len())
            .ok()
            .filter(|&n| n != NONE_WORD)
            .ok_or(EncodeError::StringTooLong(units.len()))?;
        self.words.push(len);
        self.words.extend_from_slice(&units);
        Ok(())
    }

    pub fn push_opt_string(&mut self, s: Option<&str>) -> Result<(), EncodeError> {
        match s {
            Some(s) => self.push_string(s),
            None => {
                self.words.push(NONE_WORD);
                Ok(())
            }
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.words.len() * 2);
        out.extend_from_slice(&MAGIC.to_le_bytes());
        out.extend_from_slice(&(self.words.len() as u32).to_le_bytes());
        for w in &self.words {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_blob(words: &[u16]) -> Vec<u8> {
        let mut w = WordWriter::new();
        for &x in words {
            w.push(x);
        }
        w.into_bytes()
    }

    #[test]
    fn parse_valid_header() {
        let data = make_blob(&[4, 1, 2]);
        let header = parse_header(&data).unwrap();
        assert_eq!(header.payload_words, 3);
        assert_eq!(payload_words(&data, header), vec![4, 1, 2]);
    }

    #[test]
    fn reject_too_short() {
        let err = parse_header(&[0u8; 5]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TooShort {
                expected: 8,
                actual: 5
            }
        );
    }

    #[test]
    fn reject_invalid_magic() {
        let mut data = make_blob(&[4]);
        data[0] ^= 0xFF;
        assert_eq!(parse_header(&data).unwrap_err(), DecodeError::InvalidMagic);
    }

    #[test]
    fn reject_length_mismatch() {
        let mut data = make_blob(&[4, 5]);
        data.push(0);
        assert_eq!(
            parse_header(&data).unwrap_err(),
            DecodeError::LengthMismatch {
                declared: 4,
                actual: 5
            }
        );
        data.truncate(data.len() - 3);
        assert!(matches!(
            parse_header(&data),
            Err(DecodeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn payload_from_unaligned_slice() {
        let data = make_blob(&[0xBEEF, 7]);
        let mut shifted = vec![0u8];
        shifted.extend_from_slice(&data);
        let slice = &shifted[1..];
        let header = parse_header(slice).unwrap();
        assert_eq!(payload_words(slice, header), vec![0xBEEF, 7]);
    }

    #[test]
    fn reader_values() {
        let mut w = WordWriter::new();
        w.push(3);
        w.push_opt(None);
        w.push_u32(0x0012_3456);
        w.push_u128(0x0102_0304_0506_0708_090A_0B0C_0D0E_0F10);
        w.push_string("a\u{1F600}").unwrap();
        w.push_opt_string(None).unwrap();
        w.push_opt_string(Some("x")).unwrap();
        let data = w.into_bytes();
        let words = payload_words(&data, parse_header(&data).unwrap());

        let mut r = WordReader::new(&words);
        assert_eq!(r.read().unwrap(), 3);
        assert_eq!(r.read_opt().unwrap(), None);
        assert_eq!(r.read_u32().unwrap(), 0x0012_3456);
        assert_eq!(
            r.read_u128().unwrap(),
            0x0102_0304_0506_0708_090A_0B0C_0D0E_0F10
        );
        assert_eq!(r.read_string().unwrap(), "a\u{1F600}");
        assert_eq!(r.read_opt_string().unwrap(), None);
        assert_eq!(r.read_opt_string().unwrap().as_deref(), Some("x"));
        assert!(r.finish().is_ok());
    }

    #[test]
    fn reader_reports_end_and_trailing() {
        let words = [1u16, 2];
        let mut r = WordReader::new(&words);
        r.read().unwrap();
        assert_eq!(r.finish(), Err(DecodeError::TrailingData { words: 1 }));
        r.read().unwrap();
        assert_eq!(r.read(), Err(DecodeError::UnexpectedEnd { offset: 2 }));
    }

    #[test]
    fn string_length_must_fit_a_word() {
        let mut w = WordWriter::new();
        let longest = "x".repeat(NONE_WORD as usize - 1);
        w.push_string(&longest).unwrap();
        assert_eq!(w.len(), NONE_WORD as usize);

        let mut w = WordWriter::new();
        let absent = "x".repeat(NONE_WORD as usize);
        assert_eq!(
            w.push_string(&absent),
            Err(EncodeError::StringTooLong(0xFFFF))
        );
        // Astral characters count twice.
        let wide = "\u{1F600}".repeat(40_000);
        assert_eq!(
            w.push_opt_string(Some(&wide)),
            Err(EncodeError::StringTooLong(80_000))
        );
        assert!(w.is_empty());
    }

    #[test]
    fn string_longer_than_payload() {
        let words = [10u16, 0x61];
        let mut r = WordReader::new(&words);
        assert!(matches!(
            r.read_string(),
            Err(DecodeError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn unpaired_surrogate_is_invalid_name() {
        let words = [1u16, 0xD800];
        let mut r = WordReader::new(&words);
        assert!(matches!(r.read_string(), Err(DecodeError::InvalidName(_))));
    }
}
