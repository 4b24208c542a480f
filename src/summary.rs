use indicatif::ProgressBar;
use log::debug;

use difraw::process::looper::EventDestination;
use difraw::structs::buffer::Buffer;
use difraw::structs::dif::DifPtr;

/// Tallies decoded units and drives the optional progress spinner.
#[derive(Default)]
pub struct SummaryDestination {
    pub events: u64,
    pub difs: u64,
    pub frames: u64,
    pub pads_over_threshold: u64,
    pub slow_control_bytes: u64,
    pb: Option<ProgressBar>,
}

impl SummaryDestination {
    pub fn with_progress(pb: ProgressBar) -> Self {
        Self {
            pb: Some(pb),
            ..Self::default()
        }
    }
}

impl EventDestination for SummaryDestination {
    fn start_event(&mut self) {
        self.events += 1;
        if let Some(pb) = &self.pb {
            pb.set_message(format!("event {}", self.events));
        }
    }

    fn process_dif(&mut self, dif: &DifPtr<'_>) {
        self.difs += 1;
        debug!(
            "DIF {} trigger {} / {} with {} frames",
            dif.dif_id(),
            dif.trigger_counter(),
            dif.global_trigger_counter(),
            dif.number_of_frames()
        );
    }

    fn process_frame(&mut self, _dif: &DifPtr<'_>, _frame: usize) {
        self.frames += 1;
    }

    fn process_pad_in_frame(&mut self, dif: &DifPtr<'_>, frame: usize, pad: usize) {
        if dif.pad_value(frame, pad) != 0 {
            self.pads_over_threshold += 1;
        }
    }

    fn process_slow_control(&mut self, sc: Buffer) {
        self.slow_control_bytes += sc.len() as u64;
    }

    fn end(&mut self) {
        if let Some(pb) = &self.pb {
            pb.finish_and_clear();
        }
    }
}
