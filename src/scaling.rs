// Scaling of raw sample codes into time and voltage

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::block::RawSampleBlock;
use crate::error::{Result, ScalingError};
use crate::preamble::Preamble;
use crate::timebase::HORIZONTAL_DIVISIONS;

/// What to do when the preamble's `num_points` disagrees with the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountPolicy {
    /// Fail with [`ScalingError::SampleCountMismatch`].
    #[default]
    Reject,
    /// Log a warning and build both axes from the decoded sample count.
    Reconcile,
}

/// Declared vs. decoded sample counts of a reconciled waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountMismatch {
    pub declared: i32,
    pub actual: usize,
}

/// Time and voltage axes of one acquisition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecodedWaveform {
    pub time: Vec<f64>,
    pub voltage: Vec<f64>,
    mismatch: Option<CountMismatch>,
}

impl DecodedWaveform {
    pub fn len(&self) -> usize {
        self.voltage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }

    /// `(time, voltage)` pairs in acquisition order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.time.iter().copied().zip(self.voltage.iter().copied())
    }

    /// Set when the waveform was produced under [`CountPolicy::Reconcile`]
    /// from a block whose length differed from the preamble.
    pub fn mismatch(&self) -> Option<CountMismatch> {
        self.mismatch
    }

    /// Write the waveform as `Time (s),Voltage (V)` rows.
    pub fn write_csv<P: AsRef<Path>>(&self, output_file: P) -> Result<()> {
        let file = File::create(output_file)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "Time (s),Voltage (V)")?;
        for (t, v) in self.points() {
            writeln!(writer, "{:e},{:e}", t, v)?;
        }

        writer.flush()?;
        Ok(())
    }
}

/// Scale a raw block with the parameters of `preamble`.
pub fn scale(
    preamble: &Preamble,
    raw: &RawSampleBlock,
    policy: CountPolicy,
) -> Result<DecodedWaveform> {
    if preamble.code_per_div == 0.0 {
        return Err(ScalingError::ZeroCodePerDiv.into());
    }
    if raw.is_empty() {
        return Err(ScalingError::EmptySamples.into());
    }

    let declared = preamble.num_points;
    let mut mismatch = None;
    let num_points = match usize::try_from(declared) {
        Ok(n) if n == raw.len() => n,
        _ => {
            let actual = raw.len();
            match policy {
                CountPolicy::Reject => {
                    return Err(ScalingError::SampleCountMismatch { declared, actual }.into());
                }
                CountPolicy::Reconcile => {
                    warn!(
                        "Preamble declares {} points but block holds {}; using {}",
                        declared, actual, actual
                    );
                    mismatch = Some(CountMismatch { declared, actual });
                    actual
                }
            }
        }
    };

    let gain = f64::from(preamble.vertical_gain) / f64::from(preamble.code_per_div);
    let offset = f64::from(preamble.vertical_offset);
    let voltage: Vec<f64> = raw
        .samples
        .iter()
        .map(|&code| f64::from(code) * gain - offset)
        .collect();

    let interval = f64::from(preamble.horizontal_interval);
    let start = preamble.horizontal_offset - 0.5 * HORIZONTAL_DIVISIONS * preamble.timebase;
    let time: Vec<f64> = (0..num_points).map(|i| start + i as f64 * interval).collect();

    debug!("Voltage and time array lengths: {}, {}", voltage.len(), time.len());
    Ok(DecodedWaveform {
        time,
        voltage,
        mismatch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::error::ScopeError;

    fn test_preamble(num_points: i32) -> Preamble {
        Preamble {
            num_points,
            first_point: 0,
            data_interval: 1,
            read_frames: 1,
            sum_frames: 1,
            vertical_gain: 1.0,
            vertical_offset: 0.5,
            code_per_div: 100.0,
            adc_bit: 12,
            sequence_frame_idx: 1,
            horizontal_interval: 2e-9,
            horizontal_offset: 0.0,
            timebase_idx: 11,
            vertical_coupling_idx: 0,
            probe_attenuation: 1.0,
            bw_limit: 0,
            source_channel: 0,
            timebase: 1e-6,
            source: Channel::C1,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-15_f64.max(b.abs() * 1e-6)
    }

    #[test]
    fn test_voltage_scaling() {
        let raw = RawSampleBlock::from(vec![200, 0, -100]);
        let wf = scale(&test_preamble(3), &raw, CountPolicy::Reject).unwrap();
        assert_eq!(wf.voltage, vec![1.5, -0.5, -1.5]);
    }

    #[test]
    fn test_time_axis() {
        let raw = RawSampleBlock::from(vec![0, 0, 0]);
        let wf = scale(&test_preamble(3), &raw, CountPolicy::Reject).unwrap();

        let interval = f64::from(2e-9f32);
        assert_eq!(wf.time.len(), 3);
        assert!(approx(wf.time[0], -5e-6));
        assert!(approx(wf.time[1], -5e-6 + interval));
        assert!(approx(wf.time[2], -5e-6 + 2.0 * interval));
        assert!(wf.mismatch().is_none());
    }

    #[test]
    fn test_horizontal_offset_shifts_axis() {
        let mut p = test_preamble(2);
        p.horizontal_offset = 1e-6;
        let wf = scale(&p, &RawSampleBlock::from(vec![0, 0]), CountPolicy::Reject).unwrap();
        assert!(approx(wf.time[0], -4e-6));
    }

    #[test]
    fn test_zero_code_per_div() {
        let mut p = test_preamble(1);
        p.code_per_div = 0.0;
        let result = scale(&p, &RawSampleBlock::from(vec![1]), CountPolicy::Reject);
        assert!(matches!(result, Err(ScopeError::Scaling(ScalingError::ZeroCodePerDiv))));
    }

    #[test]
    fn test_empty_samples() {
        let result = scale(&test_preamble(0), &RawSampleBlock::default(), CountPolicy::Reconcile);
        assert!(matches!(result, Err(ScopeError::Scaling(ScalingError::EmptySamples))));
    }

    #[test]
    fn test_mismatch_rejected() {
        let raw = RawSampleBlock::from(vec![1, 2, 3]);
        let result = scale(&test_preamble(5), &raw, CountPolicy::Reject);
        assert!(matches!(
            result,
            Err(ScopeError::Scaling(ScalingError::SampleCountMismatch { declared: 5, actual: 3 }))
        ));
    }

    #[test]
    fn test_mismatch_reconciled() {
        let raw = RawSampleBlock::from(vec![1, 2, 3]);
        let wf = scale(&test_preamble(5), &raw, CountPolicy::Reconcile).unwrap();
        assert_eq!(wf.len(), 3);
        assert_eq!(wf.time.len(), 3);
        assert_eq!(wf.mismatch(), Some(CountMismatch { declared: 5, actual: 3 }));
    }

    #[test]
    fn test_negative_declared_count() {
        let raw = RawSampleBlock::from(vec![1]);
        assert!(scale(&test_preamble(-1), &raw, CountPolicy::Reject).is_err());
        assert_eq!(scale(&test_preamble(-1), &raw, CountPolicy::Reconcile).unwrap().len(), 1);
    }

    #[test]
    fn test_points_pairs() {
        let raw = RawSampleBlock::from(vec![100, 200]);
        let wf = scale(&test_preamble(2), &raw, CountPolicy::Reject).unwrap();
        let points: Vec<(f64, f64)> = wf.points().collect();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].1, 0.5);
        assert_eq!(points[1].1, 1.5);
    }
}
