//! Diagnostic histograms accumulated over one traversal run.

use std::collections::BTreeMap;
use std::fmt;

/// Value-to-occurrence map with deterministic ascending rendering.
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    counts: BTreeMap<i64, u64>,
}

impl Histogram {
    /// Increments the count for `value`, creating the entry when absent.
    pub fn record(&mut self, value: i64) {
        *self.counts.entry(value).or_insert(0) += 1;
    }

    pub fn get(&self, value: i64) -> u64 {
        self.counts.get(&value).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Entries in ascending value order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, u64)> + '_ {
        self.counts.iter().map(|(&value, &count)| (value, count))
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, (value, count)) in self.iter().enumerate() {
            if position > 0 {
                write!(f, ",")?;
            }
            write!(f, " [{value}]={count}")?;
        }
        Ok(())
    }
}

/// Histograms and scalar tallies describing one run's structural findings.
///
/// Created once per run, fed only by the looper during traversal, rendered
/// once at end of run. Rendering never mutates the counters.
#[derive(Debug, Clone, Default)]
pub struct LoopCounters {
    /// Offset of the start-of-DIF marker per buffer; -1 when absent.
    pub dif_starter: Histogram,
    /// Byte value found at the frame-table terminator position.
    pub dif_ptr_value_at_returned_pos: Histogram,
    /// Bytes remaining in the buffer once the frame table is consumed.
    pub size_after_dif_ptr: Histogram,
    /// Bytes remaining after every structured section.
    pub size_after_all_data: Histogram,
    /// Count of non-zero bytes inside the trailing remainder.
    pub non_zero_values_at_end_of_data: Histogram,
    /// Buffers carrying a slow-control section.
    pub has_slow_control: u64,
    /// Slow-control sections that failed the framing check.
    pub has_bad_slow_control: u64,
}

impl fmt::Display for LoopCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BUFFER LOOP FINAL STATISTICS :")?;
        writeln!(f, "statistics for start of DIF header :")?;
        writeln!(f, "{}", self.dif_starter)?;
        writeln!(f, "statistics for value after DIF data are processed :")?;
        writeln!(f, "{}", self.dif_ptr_value_at_returned_pos)?;
        writeln!(
            f,
            "statistics for size remaining in buffer after end of DIF data :"
        )?;
        writeln!(f, "{}", self.size_after_dif_ptr)?;
        writeln!(
            f,
            "Number of slow control found {} out of which {} are bad",
            self.has_slow_control, self.has_bad_slow_control
        )?;
        writeln!(
            f,
            "statistics for size remaining after all of data have been processed :"
        )?;
        writeln!(f, "{}", self.size_after_all_data)?;
        writeln!(
            f,
            "statistics for number of non zero values in end of data buffer :"
        )?;
        writeln!(f, "{}", self.non_zero_values_at_end_of_data)
    }
}
