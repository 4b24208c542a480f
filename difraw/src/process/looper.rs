use std::fmt;
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{Level, debug, info, trace, warn};

use crate::log_or_bail;
use crate::process::navigate::RawBufferNavigator;
use crate::structs::buffer::Buffer;
use crate::structs::detector::DetectorId;
use crate::structs::dif::{DifPtr, END_OF_DIF, NUMBER_PAD};
use crate::utils::counters::LoopCounters;
use crate::utils::errors::LoopError;

/// Yields acquisition events and the raw DIF buffers inside them.
///
/// The iteration triplet is mandatory; the lifecycle notifications default to
/// no-ops so simple sources stay small. The buffer returned by
/// [`current_buffer`](Self::current_buffer) stays valid until the next
/// [`next_dif_buffer`](Self::next_dif_buffer) call.
pub trait EventSource {
    /// Advances to the next event. False once the source is exhausted.
    fn next_event(&mut self) -> bool;

    /// Advances to the next DIF buffer of the current event. False once the
    /// event holds no further buffers.
    fn next_dif_buffer(&mut self) -> bool;

    /// The buffer most recently yielded by
    /// [`next_dif_buffer`](Self::next_dif_buffer).
    fn current_buffer(&self) -> Buffer;

    fn start(&mut self) {}
    fn start_event(&mut self) {}
    fn start_dif(&mut self) {}
    fn end_dif(&mut self) {}
    fn start_frame(&mut self) {}
    fn end_frame(&mut self) {}
    fn start_pad(&mut self) {}
    fn end_pad(&mut self) {}
    fn end_event(&mut self) {}
    fn end(&mut self) {}
}

/// Consumes decoded units while mirroring the source lifecycle.
///
/// `process_*` calls arrive strictly inside the matching `start_*`/`end_*`
/// bracket of their nesting level.
pub trait EventDestination {
    fn process_dif(&mut self, dif: &DifPtr<'_>);
    fn process_frame(&mut self, dif: &DifPtr<'_>, frame: usize);
    fn process_pad_in_frame(&mut self, dif: &DifPtr<'_>, frame: usize, pad: usize);
    fn process_slow_control(&mut self, sc: Buffer);

    fn start(&mut self) {}
    fn start_event(&mut self) {}
    fn start_dif(&mut self) {}
    fn end_dif(&mut self) {}
    fn start_frame(&mut self) {}
    fn end_frame(&mut self) {}
    fn start_pad(&mut self) {}
    fn end_pad(&mut self) {}
    fn end_event(&mut self) {}
    fn end(&mut self) {}
}

/// Wall-clock statistics for one completed run.
#[derive(Debug, Clone, Copy)]
pub struct RunStats {
    pub events: u64,
    pub elapsed: Duration,
}

impl RunStats {
    /// Average time per processed event; `None` when no event was processed.
    pub fn per_event(&self) -> Option<Duration> {
        (self.events != 0).then(|| self.elapsed.div_f64(self.events as f64))
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.per_event() {
            Some(avg) => write!(
                f,
                "=== elapsed time {}ms ({:.3}ms/event over {} events) ===",
                self.elapsed.as_millis(),
                avg.as_secs_f64() * 1e3,
                self.events
            ),
            None => write!(
                f,
                "=== elapsed time {}ms (no events processed) ===",
                self.elapsed.as_millis()
            ),
        }
    }
}

/// Drives one full run across a source and a destination.
///
/// The traversal is a single forward pass: for each event the source yields,
/// every DIF buffer is bound to a [`RawBufferNavigator`], filtered by
/// detector id, decoded, and handed to the destination frame by frame and
/// pad by pad. Structural findings land in [`LoopCounters`].
///
/// Lifecycle symmetry is guaranteed: every `start_x` issued to a
/// collaborator is matched by exactly one `end_x` before control leaves that
/// nesting level, even when a buffer fails decoding midway.
pub struct BufferLooper<S, D> {
    source: S,
    destination: D,
    detector_ids: Vec<DetectorId>,
    counters: LoopCounters,
    fail_level: Option<Level>,
}

impl<S: EventSource, D: EventDestination> BufferLooper<S, D> {
    pub fn new(source: S, destination: D) -> Self {
        Self {
            source,
            destination,
            detector_ids: Vec::new(),
            counters: LoopCounters::default(),
            fail_level: None,
        }
    }

    /// Allow-list of detector ids the run will decode. Buffers from any
    /// other module are skipped before the DIF lifecycle begins.
    pub fn set_detector_ids(&mut self, ids: &[DetectorId]) {
        self.detector_ids = ids.to_vec();
    }

    /// Promotes logged anomalies at or above `level` to run failures.
    ///
    /// `None` (the default) keeps every anomaly as a log record. Passing
    /// `Some(Level::Info)` turns the internal consistency checks into hard
    /// errors, the behavior expected of a debugging run.
    pub fn set_fail_level(&mut self, level: Option<Level>) {
        self.fail_level = level;
    }

    pub fn counters(&self) -> &LoopCounters {
        &self.counters
    }

    /// Recovers the collaborators and the accumulated counters.
    pub fn into_parts(self) -> (S, D, LoopCounters) {
        (self.source, self.destination, self.counters)
    }

    /// Runs the full nested traversal.
    ///
    /// `nbr_events` caps the number of processed events; zero means
    /// unlimited, running until the source is exhausted.
    pub fn run(&mut self, nbr_events: u64) -> Result<RunStats> {
        let started = Instant::now();
        self.source.start();
        self.destination.start();

        let mut navigator = RawBufferNavigator::new();
        let mut processed = 0u64;
        loop {
            // Zero budget runs until exhaustion. The cap is checked before
            // pulling the next event so a capped run never consumes an
            // event it will not process.
            if nbr_events != 0 && processed == nbr_events {
                break;
            }
            if !self.source.next_event() {
                break;
            }
            self.source.start_event();
            self.destination.start_event();

            warn!("===*** Event number {processed} ***===");
            while self.source.next_dif_buffer() {
                self.process_dif_buffer(&mut navigator)?;
            }
            warn!("***=== Event number {processed} ===***");
            processed += 1;

            self.source.end_event();
            self.destination.end_event();
        }

        self.destination.end();
        self.source.end();

        let stats = RunStats {
            events: processed,
            elapsed: started.elapsed(),
        };
        info!("{stats}");
        Ok(stats)
    }

    fn process_dif_buffer(&mut self, navigator: &mut RawBufferNavigator) -> Result<()> {
        let buffer = self.source.current_buffer();
        navigator.set_buffer(buffer.clone());

        let dif_view = navigator.dif_buffer();
        if !buffer.same_backing(&dif_view) || buffer.end() != dif_view.end() {
            log_or_bail!(
                self,
                Level::Info,
                LoopError::DifEndMismatch {
                    raw_end: buffer.end(),
                    dif_end: dif_view.end(),
                }
            );
        }

        let raw_id = navigator.detector_id();
        let allowed = DetectorId::from_raw(raw_id)
            .is_some_and(|id| self.detector_ids.contains(&id));
        if !allowed {
            trace!("skipping DIF buffer from detector id {raw_id:#04x}");
            return Ok(());
        }

        self.source.start_dif();
        self.destination.start_dif();

        let idstart = navigator.start_of_dif();
        if idstart.is_none() {
            debug!("no start-of-DIF marker in {:02x?}", buffer.as_slice());
        }
        self.counters
            .dif_starter
            .record(idstart.map_or(-1, |start| start as i64));

        let Some(dif) = navigator.dif_ptr() else {
            log_or_bail!(
                self,
                Level::Error,
                LoopError::InvalidBuffer { len: buffer.len() }
            );
            self.source.end_dif();
            self.destination.end_dif();
            return Ok(());
        };

        let end_value = navigator.dif_buffer().as_slice()[dif.frame_table_end()];
        self.counters
            .dif_ptr_value_at_returned_pos
            .record(i64::from(end_value));
        if end_value != END_OF_DIF {
            log_or_bail!(
                self,
                Level::Info,
                LoopError::BadFrameTableEnd {
                    offset: dif.frame_table_end(),
                    value: end_value,
                }
            );
        }
        self.counters
            .size_after_dif_ptr
            .record(navigator.size_after_dif_ptr() as i64);

        self.destination.process_dif(&dif);
        for frame in 0..dif.number_of_frames() {
            self.source.start_frame();
            self.destination.start_frame();
            self.destination.process_frame(&dif, frame);
            for pad in 0..NUMBER_PAD {
                self.source.start_pad();
                self.destination.start_pad();
                self.destination.process_pad_in_frame(&dif, frame, pad);
                self.source.end_pad();
                self.destination.end_pad();
            }
            self.source.end_frame();
            self.destination.end_frame();
        }

        let mut process_sc = false;
        if navigator.has_slow_control_data() {
            self.counters.has_slow_control += 1;
            process_sc = true;
        }
        if navigator.bad_sc_data() {
            self.counters.has_bad_slow_control += 1;
            process_sc = false;
        }
        if process_sc {
            if let Some(sc) = navigator.sc_buffer() {
                self.destination.process_slow_control(sc);
            }
        }

        let eod = navigator.end_of_all_data();
        self.counters.size_after_all_data.record(eod.len() as i64);
        if !buffer.same_backing(&eod) || buffer.end() != eod.end() {
            log_or_bail!(
                self,
                Level::Info,
                LoopError::EndOfDataMismatch {
                    raw_end: buffer.end(),
                    eod_end: eod.end(),
                }
            );
        }
        if !eod.is_empty() {
            info!("{} bytes remain after end of data", eod.len());
        }
        let non_zero = eod.as_slice().iter().filter(|&&byte| byte != 0).count();
        self.counters
            .non_zero_values_at_end_of_data
            .record(non_zero as i64);

        self.source.end_dif();
        self.destination.end_dif();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::EXAMPLE_DATA;
    use crate::structs::dif::{DIF_HEADER_LEN, FRAME_SIZE, START_OF_DIF};

    /// Replays a fixed list of raw buffers, the same list for every event.
    struct ReplaySource {
        events: usize,
        buffers: Vec<Vec<u8>>,
        event: usize,
        buffer: usize,
        current: Buffer,
        starts: u64,
        ends: u64,
    }

    impl ReplaySource {
        fn new(events: usize, buffers: Vec<Vec<u8>>) -> Self {
            Self {
                events,
                buffers,
                event: 0,
                buffer: 0,
                current: Buffer::default(),
                starts: 0,
                ends: 0,
            }
        }
    }

    impl EventSource for ReplaySource {
        fn next_event(&mut self) -> bool {
            if self.event == self.events {
                return false;
            }
            self.event += 1;
            self.buffer = 0;
            true
        }

        fn next_dif_buffer(&mut self) -> bool {
            if self.buffer == self.buffers.len() {
                return false;
            }
            self.current = Buffer::from(self.buffers[self.buffer].clone());
            self.buffer += 1;
            true
        }

        fn current_buffer(&self) -> Buffer {
            self.current.clone()
        }

        fn start_dif(&mut self) {
            self.starts += 1;
        }

        fn end_dif(&mut self) {
            self.ends += 1;
        }
    }

    /// Counts every lifecycle and processing call it receives.
    #[derive(Default)]
    struct Recorder {
        start: u64,
        end: u64,
        start_event: u64,
        end_event: u64,
        start_dif: u64,
        end_dif: u64,
        start_frame: u64,
        end_frame: u64,
        start_pad: u64,
        end_pad: u64,
        difs: u64,
        frames: u64,
        pads: u64,
        slow_control: Vec<Vec<u8>>,
    }

    impl Recorder {
        fn assert_balanced(&self) {
            assert_eq!(self.start, self.end);
            assert_eq!(self.start_event, self.end_event);
            assert_eq!(self.start_dif, self.end_dif);
            assert_eq!(self.start_frame, self.end_frame);
            assert_eq!(self.start_pad, self.end_pad);
        }
    }

    impl EventDestination for Recorder {
        fn process_dif(&mut self, _dif: &DifPtr<'_>) {
            self.difs += 1;
        }

        fn process_frame(&mut self, _dif: &DifPtr<'_>, _frame: usize) {
            self.frames += 1;
        }

        fn process_pad_in_frame(&mut self, _dif: &DifPtr<'_>, _frame: usize, _pad: usize) {
            self.pads += 1;
        }

        fn process_slow_control(&mut self, sc: Buffer) {
            self.slow_control.push(sc.as_slice().to_vec());
        }

        fn start(&mut self) {
            self.start += 1;
        }
        fn end(&mut self) {
            self.end += 1;
        }
        fn start_event(&mut self) {
            self.start_event += 1;
        }
        fn end_event(&mut self) {
            self.end_event += 1;
        }
        fn start_dif(&mut self) {
            self.start_dif += 1;
        }
        fn end_dif(&mut self) {
            self.end_dif += 1;
        }
        fn start_frame(&mut self) {
            self.start_frame += 1;
        }
        fn end_frame(&mut self) {
            self.end_frame += 1;
        }
        fn start_pad(&mut self) {
            self.start_pad += 1;
        }
        fn end_pad(&mut self) {
            self.end_pad += 1;
        }
    }

    fn hcal_looper(
        events: usize,
        buffers: Vec<Vec<u8>>,
    ) -> BufferLooper<ReplaySource, Recorder> {
        let mut looper = BufferLooper::new(
            ReplaySource::new(events, buffers),
            Recorder::default(),
        );
        looper.set_detector_ids(&[DetectorId::Hcal]);
        looper
    }

    /// A valid two-frame HCAL buffer with a wrong frame-table terminator.
    fn bad_terminator_buffer() -> Vec<u8> {
        let mut data = vec![0xD4, 0, 0];
        data.push(START_OF_DIF);
        data.extend_from_slice(&[0; DIF_HEADER_LEN - 2]);
        data.push(2);
        data.extend_from_slice(&[0; 2 * FRAME_SIZE]);
        data.push(0x55);
        data
    }

    #[test]
    fn example_buffer_full_traversal() {
        let mut looper = hcal_looper(1, vec![EXAMPLE_DATA.to_vec()]);
        let stats = looper.run(0).unwrap();
        assert_eq!(stats.events, 1);

        let counters = looper.counters();
        assert_eq!(counters.dif_starter.get(94), 1);
        assert_eq!(counters.dif_ptr_value_at_returned_pos.get(0xA0), 1);
        assert_eq!(counters.size_after_dif_ptr.get(9), 1);
        assert_eq!(counters.size_after_all_data.get(2), 1);
        assert_eq!(counters.non_zero_values_at_end_of_data.get(0), 1);
        assert_eq!(counters.has_slow_control, 1);
        assert_eq!(counters.has_bad_slow_control, 0);

        let (source, recorder, _) = looper.into_parts();
        assert_eq!(recorder.difs, 1);
        assert_eq!(recorder.frames, 1);
        assert_eq!(recorder.pads, NUMBER_PAD as u64);
        assert_eq!(
            recorder.slow_control,
            vec![vec![0xB1, 0x01, 0xC2, 0x00, 0x7F, 0xA1]]
        );
        recorder.assert_balanced();
        assert_eq!(source.starts, source.ends);
    }

    #[test]
    fn buffer_without_marker_is_counted_and_abandoned() {
        let mut looper = hcal_looper(1, vec![vec![0xD4, 1, 2, 3, 4]]);
        looper.run(0).unwrap();

        let counters = looper.counters();
        assert_eq!(counters.dif_starter.get(-1), 1);
        assert!(counters.size_after_dif_ptr.is_empty());
        assert!(counters.size_after_all_data.is_empty());

        let (source, recorder, _) = looper.into_parts();
        assert_eq!(recorder.frames, 0);
        assert_eq!(recorder.pads, 0);
        // The bracket still closed on both collaborators.
        assert_eq!(recorder.start_dif, 1);
        assert_eq!(recorder.end_dif, 1);
        recorder.assert_balanced();
        assert_eq!(source.starts, 1);
        assert_eq!(source.ends, 1);
    }

    #[test]
    fn filtered_detector_triggers_no_dif_lifecycle() {
        let mut ecal = EXAMPLE_DATA.to_vec();
        ecal[0] = DetectorId::Ecal.raw();
        let unknown = vec![0x33, 4, 5, 6];

        let mut looper = hcal_looper(1, vec![ecal, unknown, EXAMPLE_DATA.to_vec()]);
        looper.run(0).unwrap();

        assert_eq!(looper.counters().dif_starter.get(94), 1);
        assert_eq!(looper.counters().dif_starter.len(), 1);

        let (source, recorder, _) = looper.into_parts();
        assert_eq!(recorder.start_dif, 1);
        assert_eq!(recorder.difs, 1);
        assert_eq!(source.starts, 1);
    }

    #[test]
    fn zero_cap_processes_every_event() {
        let mut looper = hcal_looper(5, vec![EXAMPLE_DATA.to_vec()]);
        let stats = looper.run(0).unwrap();
        assert_eq!(stats.events, 5);
        assert_eq!(looper.counters().dif_starter.get(94), 5);
    }

    #[test]
    fn event_cap_stops_the_run_early() {
        let mut looper = hcal_looper(5, vec![EXAMPLE_DATA.to_vec()]);
        let stats = looper.run(2).unwrap();
        assert_eq!(stats.events, 2);

        let (_, recorder, counters) = looper.into_parts();
        assert_eq!(counters.dif_starter.get(94), 2);
        assert_eq!(recorder.start_event, 2);
        recorder.assert_balanced();
    }

    #[test]
    fn symmetry_survives_mixed_valid_and_invalid_buffers() {
        let buffers = vec![
            EXAMPLE_DATA.to_vec(),
            vec![0xD4, 0, 0, 0],
            EXAMPLE_DATA.to_vec(),
        ];
        let mut looper = hcal_looper(3, buffers);
        looper.run(0).unwrap();

        let counters = looper.counters();
        assert_eq!(counters.dif_starter.get(94), 6);
        assert_eq!(counters.dif_starter.get(-1), 3);

        let (source, recorder, _) = looper.into_parts();
        assert_eq!(recorder.start_dif, 9);
        assert_eq!(recorder.frames, 6);
        recorder.assert_balanced();
        assert_eq!(source.starts, 9);
        assert_eq!(source.ends, 9);
    }

    #[test]
    fn wrong_terminator_is_tallied_but_not_fatal_by_default() {
        let mut looper = hcal_looper(1, vec![bad_terminator_buffer()]);
        looper.run(0).unwrap();

        let counters = looper.counters();
        assert_eq!(counters.dif_ptr_value_at_returned_pos.get(0x55), 1);

        let (_, recorder, _) = looper.into_parts();
        assert_eq!(recorder.frames, 2);
        recorder.assert_balanced();
    }

    #[test]
    fn fail_level_promotes_the_terminator_check() {
        let mut looper = hcal_looper(1, vec![bad_terminator_buffer()]);
        looper.set_fail_level(Some(Level::Info));
        assert!(looper.run(0).is_err());
    }

    #[test]
    fn fail_level_promotes_invalid_buffers() {
        let mut looper = hcal_looper(1, vec![vec![0xD4, 0, 0, 0]]);
        looper.run(0).unwrap();

        let mut looper = hcal_looper(1, vec![vec![0xD4, 0, 0, 0]]);
        looper.set_fail_level(Some(Level::Error));
        assert!(looper.run(0).is_err());
    }

    #[test]
    fn run_stats_guard_the_zero_event_average() {
        let stats = RunStats {
            events: 0,
            elapsed: Duration::from_millis(5),
        };
        assert!(stats.per_event().is_none());
        assert!(format!("{stats}").contains("no events processed"));

        let stats = RunStats {
            events: 4,
            elapsed: Duration::from_millis(10),
        };
        assert_eq!(stats.per_event(), Some(Duration::from_micros(2500)));
    }
}
