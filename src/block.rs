// Waveform block codec for the `:WAV:DATA?` response
//
// Definite-length IEEE 488.2 block: `#`, one digit D, D length digits,
// then 16-bit little-endian sample words. Only whitespace may follow the
// declared payload. `#0` blocks run to a single `\n` or `\r\n` terminator.

use log::debug;

use crate::error::DecodeError;

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Raw ADC codes, widened to 16 bits by the instrument (`:WAV:WIDT WORD`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSampleBlock {
    pub samples: Vec<i16>,
}

impl RawSampleBlock {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl From<Vec<i16>> for RawSampleBlock {
    fn from(samples: Vec<i16>) -> Self {
        RawSampleBlock { samples }
    }
}

/// Decode one waveform data block.
pub fn decode(buffer: &[u8]) -> Result<RawSampleBlock> {
    if buffer.is_empty() {
        return Err(DecodeError::Empty);
    }

    let count_byte = *buffer
        .get(1)
        .ok_or_else(|| DecodeError::MalformedHeader("missing digit count".to_string()))?;
    if !count_byte.is_ascii_digit() {
        return Err(DecodeError::MalformedHeader(format!(
            "digit count byte {:#04x} is not an ASCII digit",
            count_byte
        )));
    }
    let num_digits = (count_byte - b'0') as usize;
    let data_start = num_digits + 2;

    if buffer.len() < data_start {
        return Err(DecodeError::MalformedHeader(format!(
            "header declares {} length digits, buffer holds {} bytes",
            num_digits,
            buffer.len()
        )));
    }

    let payload = if num_digits == 0 {
        // Indefinite-length block, terminated by the message terminator.
        strip_terminator(&buffer[data_start..])
    } else {
        let digits = &buffer[2..data_start];
        let declared = std::str::from_utf8(digits)
            .ok()
            .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| {
                DecodeError::MalformedHeader(format!(
                    "invalid length field {:?}",
                    String::from_utf8_lossy(digits)
                ))
            })?;

        let available = buffer.len() - data_start;
        if declared > available {
            return Err(DecodeError::Truncated {
                declared,
                available,
            });
        }
        let end = data_start + declared;
        let extra = buffer[end..].iter().filter(|b| !b.is_ascii_whitespace()).count();
        if extra > 0 {
            return Err(DecodeError::TrailingData { declared, extra });
        }
        &buffer[data_start..end]
    };

    if payload.len() % 2 != 0 {
        return Err(DecodeError::OddPayload(payload.len()));
    }

    let samples: Vec<i16> = payload
        .chunks_exact(2)
        .map(|word| i16::from_le_bytes([word[0], word[1]]))
        .collect();
    debug!("Raw values array has {} points", samples.len());

    Ok(RawSampleBlock { samples })
}

/// Drop exactly one message terminator; earlier 0x0a/0x0d bytes are sample data.
fn strip_terminator(bytes: &[u8]) -> &[u8] {
    bytes
        .strip_suffix(b"\r\n")
        .or_else(|| bytes.strip_suffix(b"\n"))
        .unwrap_or(bytes)
}
