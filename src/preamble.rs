// Preamble codec for the `:WAV:PRE?` response
//
// The preamble is a fixed 346-byte parameter block behind an 11-byte
// transfer header. Every field is little-endian at a fixed offset.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use log::debug;
use serde::Serialize;

use crate::channel::Channel;
use crate::error::{DecodeError, Result};
use crate::timebase;

/// Bytes preceding the parameter block (`#9000000346` style header).
pub const HEADER_SKIP: usize = 11;
/// Length of the parameter block up to and including `source_channel`.
pub const BODY_LEN: usize = 346;
pub const MIN_PREAMBLE_LEN: usize = HEADER_SKIP + BODY_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    I16,
    I32,
    F32,
    F64,
}

/// A numeric type stored little-endian in the preamble.
pub trait LeValue: Copy {
    const WIDTH: usize;
    const ENCODING: Encoding;

    fn from_le_slice(bytes: &[u8]) -> Option<Self>;
}

macro_rules! le_value {
    ($t:ty, $enc:ident) => {
        impl LeValue for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();
            const ENCODING: Encoding = Encoding::$enc;

            fn from_le_slice(bytes: &[u8]) -> Option<Self> {
                bytes.try_into().ok().map(<$t>::from_le_bytes)
            }
        }
    };
}

le_value!(i16, I16);
le_value!(i32, I32);
le_value!(f32, F32);
le_value!(f64, F64);

/// Untyped description of one layout entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpan {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
    pub encoding: Encoding,
}

impl FieldSpan {
    pub fn end(&self) -> usize {
        self.offset + self.width
    }
}

/// A typed field at a fixed offset relative to the end of the header skip.
#[derive(Debug, Clone, Copy)]
pub struct Field<T> {
    pub name: &'static str,
    pub offset: usize,
    value: PhantomData<fn() -> T>,
}

impl<T: LeValue> Field<T> {
    pub const fn new(name: &'static str, offset: usize) -> Self {
        Field {
            name,
            offset,
            value: PhantomData,
        }
    }

    pub const fn span(&self) -> FieldSpan {
        FieldSpan {
            name: self.name,
            offset: self.offset,
            width: T::WIDTH,
            encoding: T::ENCODING,
        }
    }

    pub fn extract(&self, body: &[u8]) -> std::result::Result<T, DecodeError> {
        body.get(self.offset..self.offset + T::WIDTH)
            .and_then(T::from_le_slice)
            .ok_or(DecodeError::Field(self.name))
    }
}

/// Byte layout of the SDS800X HD preamble.
pub mod layout {
    use super::{Field, FieldSpan};

    pub const NUM_POINTS: Field<i32> = Field::new("num_points", 116);
    pub const FIRST_POINT: Field<i32> = Field::new("first_point", 132);
    pub const DATA_INTERVAL: Field<i32> = Field::new("data_interval", 136);
    pub const READ_FRAMES: Field<i32> = Field::new("read_frames", 144);
    pub const SUM_FRAMES: Field<i32> = Field::new("sum_frames", 148);
    pub const VERTICAL_GAIN: Field<f32> = Field::new("vertical_gain", 156);
    pub const VERTICAL_OFFSET: Field<f32> = Field::new("vertical_offset", 160);
    pub const CODE_PER_DIV: Field<f32> = Field::new("code_per_div", 164);
    pub const ADC_BIT: Field<i16> = Field::new("adc_bit", 172);
    pub const SEQUENCE_FRAME_IDX: Field<i16> = Field::new("sequence_frame_idx", 174);
    pub const HORIZONTAL_INTERVAL: Field<f32> = Field::new("horizontal_interval", 176);
    pub const HORIZONTAL_OFFSET: Field<f64> = Field::new("horizontal_offset", 180);
    pub const TIMEBASE_IDX: Field<i16> = Field::new("timebase_idx", 324);
    pub const VERTICAL_COUPLING_IDX: Field<i16> = Field::new("vertical_coupling_idx", 326);
    pub const PROBE_ATTENUATION: Field<f32> = Field::new("probe_attenuation", 328);
    // fixed_vertical_gain at 332 duplicates vertical_gain and is not decoded
    pub const BW_LIMIT: Field<i16> = Field::new("bw_limit", 334);
    pub const SOURCE_CHANNEL: Field<i16> = Field::new("source_channel", 344);

    pub const FIELDS: [FieldSpan; 17] = [
        NUM_POINTS.span(),
        FIRST_POINT.span(),
        DATA_INTERVAL.span(),
        READ_FRAMES.span(),
        SUM_FRAMES.span(),
        VERTICAL_GAIN.span(),
        VERTICAL_OFFSET.span(),
        CODE_PER_DIV.span(),
        ADC_BIT.span(),
        SEQUENCE_FRAME_IDX.span(),
        HORIZONTAL_INTERVAL.span(),
        HORIZONTAL_OFFSET.span(),
        TIMEBASE_IDX.span(),
        VERTICAL_COUPLING_IDX.span(),
        PROBE_ATTENUATION.span(),
        BW_LIMIT.span(),
        SOURCE_CHANNEL.span(),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Coupling {
    DC,
    AC,
    GND,
}

impl Coupling {
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::DC),
            1 => Some(Self::AC),
            2 => Some(Self::GND),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BandwidthLimit {
    Off,
    MHz20,
    MHz200,
}

impl BandwidthLimit {
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::MHz20),
            2 => Some(Self::MHz200),
            _ => None,
        }
    }
}

/// Acquisition parameters decoded from one preamble block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Preamble {
    pub num_points: i32,
    pub first_point: i32,
    pub data_interval: i32,
    pub read_frames: i32,
    pub sum_frames: i32,
    pub vertical_gain: f32,
    pub vertical_offset: f32,
    pub code_per_div: f32,
    pub adc_bit: i16,
    pub sequence_frame_idx: i16,
    pub horizontal_interval: f32,
    pub horizontal_offset: f64,
    pub timebase_idx: i16,
    pub vertical_coupling_idx: i16,
    pub probe_attenuation: f32,
    pub bw_limit: i16,
    pub source_channel: i16,
    /// Seconds per division, looked up from `timebase_idx`.
    pub timebase: f64,
    #[serde(rename = "source_channel_name")]
    pub source: Channel,
}

/// One entry of [`Preamble::as_map`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PreambleValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for PreambleValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{:e}", v),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i16> for PreambleValue {
    fn from(v: i16) -> Self {
        Self::Int(v.into())
    }
}

impl From<i32> for PreambleValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f32> for PreambleValue {
    fn from(v: f32) -> Self {
        Self::Float(v.into())
    }
}

impl From<f64> for PreambleValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl Preamble {
    /// Decode a raw `:WAV:PRE?` response.
    pub fn decode(buffer: &[u8]) -> Result<Self> {
        use layout::*;

        if buffer.len() < MIN_PREAMBLE_LEN {
            return Err(DecodeError::TooShort {
                needed: MIN_PREAMBLE_LEN,
                got: buffer.len(),
            }
            .into());
        }
        let body = &buffer[HEADER_SKIP..];

        debug!("Unpacking the preamble bitstream.");
        let timebase_idx = TIMEBASE_IDX.extract(body)?;
        let source_channel = SOURCE_CHANNEL.extract(body)?;

        let preamble = Preamble {
            num_points: NUM_POINTS.extract(body)?,
            first_point: FIRST_POINT.extract(body)?,
            data_interval: DATA_INTERVAL.extract(body)?,
            read_frames: READ_FRAMES.extract(body)?,
            sum_frames: SUM_FRAMES.extract(body)?,
            vertical_gain: VERTICAL_GAIN.extract(body)?,
            vertical_offset: VERTICAL_OFFSET.extract(body)?,
            code_per_div: CODE_PER_DIV.extract(body)?,
            adc_bit: ADC_BIT.extract(body)?,
            sequence_frame_idx: SEQUENCE_FRAME_IDX.extract(body)?,
            horizontal_interval: HORIZONTAL_INTERVAL.extract(body)?,
            horizontal_offset: HORIZONTAL_OFFSET.extract(body)?,
            timebase_idx,
            vertical_coupling_idx: VERTICAL_COUPLING_IDX.extract(body)?,
            probe_attenuation: PROBE_ATTENUATION.extract(body)?,
            bw_limit: BW_LIMIT.extract(body)?,
            source_channel,
            timebase: timebase::lookup(timebase_idx.into())?,
            source: Channel::from_index(source_channel.into())?,
        };

        debug!(
            "First point: {}, number of points: {}, data interval: {}, frames read: {}",
            preamble.first_point, preamble.num_points, preamble.data_interval, preamble.read_frames
        );
        Ok(preamble)
    }

    pub fn coupling(&self) -> Option<Coupling> {
        Coupling::from_code(self.vertical_coupling_idx)
    }

    pub fn bandwidth_limit(&self) -> Option<BandwidthLimit> {
        BandwidthLimit::from_code(self.bw_limit)
    }

    /// Field name to value view, including the derived timebase and channel name.
    pub fn as_map(&self) -> BTreeMap<&'static str, PreambleValue> {
        BTreeMap::from([
            ("num_points", self.num_points.into()),
            ("first_point", self.first_point.into()),
            ("data_interval", self.data_interval.into()),
            ("read_frames", self.read_frames.into()),
            ("sum_frames", self.sum_frames.into()),
            ("vertical_gain", self.vertical_gain.into()),
            ("vertical_offset", self.vertical_offset.into()),
            ("code_per_div", self.code_per_div.into()),
            ("adc_bit", self.adc_bit.into()),
            ("sequence_frame_idx", self.sequence_frame_idx.into()),
            ("horizontal_interval", self.horizontal_interval.into()),
            ("horizontal_offset", self.horizontal_offset.into()),
            ("timebase_idx", self.timebase_idx.into()),
            ("timebase", self.timebase.into()),
            ("vertical_coupling_idx", self.vertical_coupling_idx.into()),
            ("probe_attenuation", self.probe_attenuation.into()),
            ("bw_limit", self.bw_limit.into()),
            ("source_channel", self.source_channel.into()),
            (
                "source_channel_name",
                PreambleValue::Text(self.source.name().to_string()),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScopeError;

    fn put(buf: &mut [u8], offset: usize, bytes: &[u8]) {
        let start = HEADER_SKIP + offset;
        buf[start..start + bytes.len()].copy_from_slice(bytes);
    }

    fn create_test_preamble() -> Vec<u8> {
        let mut buf = vec![0u8; MIN_PREAMBLE_LEN];
        buf[..HEADER_SKIP].copy_from_slice(b"#9000000346");

        put(&mut buf, 116, &1000i32.to_le_bytes());
        put(&mut buf, 132, &0i32.to_le_bytes());
        put(&mut buf, 136, &1i32.to_le_bytes());
        put(&mut buf, 144, &1i32.to_le_bytes());
        put(&mut buf, 148, &1i32.to_le_bytes());
        put(&mut buf, 156, &0.5f32.to_le_bytes());
        put(&mut buf, 160, &(-0.25f32).to_le_bytes());
        put(&mut buf, 164, &30.0f32.to_le_bytes());
        put(&mut buf, 172, &12i16.to_le_bytes());
        put(&mut buf, 174, &1i16.to_le_bytes());
        put(&mut buf, 176, &1e-9f32.to_le_bytes());
        put(&mut buf, 180, &(-2.5e-7f64).to_le_bytes());
        put(&mut buf, 324, &11i16.to_le_bytes());
        put(&mut buf, 326, &1i16.to_le_bytes());
        put(&mut buf, 328, &10.0f32.to_le_bytes());
        put(&mut buf, 334, &2i16.to_le_bytes());
        put(&mut buf, 344, &5i16.to_le_bytes());

        buf
    }

    #[test]
    fn test_preamble_parsing() {
        let p = Preamble::decode(&create_test_preamble()).unwrap();

        assert_eq!(p.num_points, 1000);
        assert_eq!(p.first_point, 0);
        assert_eq!(p.data_interval, 1);
        assert_eq!(p.read_frames, 1);
        assert_eq!(p.sum_frames, 1);
        assert_eq!(p.vertical_gain, 0.5);
        assert_eq!(p.vertical_offset, -0.25);
        assert_eq!(p.code_per_div, 30.0);
        assert_eq!(p.adc_bit, 12);
        assert_eq!(p.sequence_frame_idx, 1);
        assert_eq!(p.horizontal_interval, 1e-9);
        assert_eq!(p.horizontal_offset, -2.5e-7);
        assert_eq!(p.timebase_idx, 11);
        assert_eq!(p.timebase, 1e-6);
        assert_eq!(p.coupling(), Some(Coupling::AC));
        assert_eq!(p.probe_attenuation, 10.0);
        assert_eq!(p.bandwidth_limit(), Some(BandwidthLimit::MHz200));
        assert_eq!(p.source_channel, 5);
        assert_eq!(p.source, Channel::F2);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let buf = create_test_preamble();
        assert_eq!(Preamble::decode(&buf).unwrap(), Preamble::decode(&buf).unwrap());
    }

    #[test]
    fn test_header_bytes_are_ignored() {
        let mut a = create_test_preamble();
        let b = a.clone();
        a[..HEADER_SKIP].copy_from_slice(&[0xff; HEADER_SKIP]);
        assert_eq!(Preamble::decode(&a).unwrap(), Preamble::decode(&b).unwrap());
    }

    #[test]
    fn test_minimum_length() {
        let zeros = vec![0u8; MIN_PREAMBLE_LEN];
        let p = Preamble::decode(&zeros).unwrap();
        assert_eq!(p.source, Channel::C1);
        assert_eq!(p.timebase, 200e-12);

        for len in [MIN_PREAMBLE_LEN - 1, 354, 0] {
            let result = Preamble::decode(&zeros[..len]);
            assert!(
                matches!(
                    result,
                    Err(ScopeError::Decode(DecodeError::TooShort { needed: 357, got }))
                        if got == len
                ),
                "length {} should be rejected",
                len
            );
        }
    }

    #[test]
    fn test_trailing_bytes_accepted() {
        let mut buf = create_test_preamble();
        buf.extend_from_slice(&[0u8; 64]);
        buf.extend_from_slice(b"\n");
        assert_eq!(Preamble::decode(&buf).unwrap().num_points, 1000);
    }

    #[test]
    fn test_timebase_out_of_range() {
        let mut buf = create_test_preamble();
        put(&mut buf, 324, &39i16.to_le_bytes());
        assert!(matches!(
            Preamble::decode(&buf),
            Err(ScopeError::IndexOutOfRange { table: "timebase", index: 39, .. })
        ));

        put(&mut buf, 324, &(-1i16).to_le_bytes());
        assert!(matches!(
            Preamble::decode(&buf),
            Err(ScopeError::IndexOutOfRange { table: "timebase", index: -1, .. })
        ));
    }

    #[test]
    fn test_source_channel_out_of_range() {
        let mut buf = create_test_preamble();
        put(&mut buf, 344, &8i16.to_le_bytes());
        assert!(matches!(
            Preamble::decode(&buf),
            Err(ScopeError::IndexOutOfRange { table: "channel", index: 8, .. })
        ));
    }

    #[test]
    fn test_layout_table() {
        let fields = &layout::FIELDS;
        assert_eq!(fields.iter().map(|f| f.end()).max(), Some(BODY_LEN));
        for pair in fields.windows(2) {
            assert!(pair[0].end() <= pair[1].offset, "{} overlaps {}", pair[0].name, pair[1].name);
        }
        let hoff = fields.iter().find(|f| f.name == "horizontal_offset").unwrap();
        assert_eq!((hoff.offset, hoff.width, hoff.encoding), (180, 8, Encoding::F64));
    }

    #[test]
    fn test_field_extract_out_of_bounds() {
        let body = [0u8; 10];
        assert_eq!(
            layout::NUM_POINTS.extract(&body),
            Err(DecodeError::Field("num_points"))
        );
    }

    #[test]
    fn test_as_map() {
        let p = Preamble::decode(&create_test_preamble()).unwrap();
        let map = p.as_map();

        assert_eq!(map.len(), 19);
        assert_eq!(map["num_points"], PreambleValue::Int(1000));
        assert_eq!(map["timebase"], PreambleValue::Float(1e-6));
        assert_eq!(map["source_channel_name"], PreambleValue::Text("F2".to_string()));

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["num_points"], 1000);
        assert_eq!(json["source_channel_name"], "F2");
    }

    #[test]
    fn test_unknown_codes() {
        let mut buf = create_test_preamble();
        put(&mut buf, 326, &7i16.to_le_bytes());
        put(&mut buf, 334, &(-3i16).to_le_bytes());
        let p = Preamble::decode(&buf).unwrap();
        assert_eq!(p.coupling(), None);
        assert_eq!(p.bandwidth_limit(), None);
    }
}
