use anyhow::Result;
use indicatif::MultiProgress;

use difraw::process::looper::EventSource;
use difraw::process::navigate::RawBufferNavigator;
use difraw::structs::detector::DetectorId;

use super::command::{Cli, InfoArgs};
use crate::replay::RawFileSource;

pub fn cmd_info(args: &InfoArgs, _cli: &Cli, _multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Inspecting DIF dump: {}", args.input.display());

    let mut source = RawFileSource::open(&args.input)?;
    if !source.next_event() || !source.next_dif_buffer() {
        println!("No DIF buffer found in the dump.");
        return Ok(());
    }

    let buffer = source.current_buffer();
    let mut navigator = RawBufferNavigator::new();
    navigator.set_buffer(buffer.clone());

    println!("Input                       {}", args.input.display());
    println!("Buffer size                 {} bytes", buffer.len());

    let raw_id = navigator.detector_id();
    match DetectorId::from_raw(raw_id) {
        Some(id) => println!("Detector                    {id} ({raw_id:#04x})"),
        None => println!("Detector                    unknown ({raw_id:#04x})"),
    }

    let Some(start) = navigator.start_of_dif() else {
        println!("Start of DIF                marker not found");
        return Ok(());
    };
    println!("Start of DIF                offset {start}");

    let Some(dif) = navigator.dif_ptr() else {
        println!("Frame table                 truncated (declared count does not fit)");
        return Ok(());
    };
    println!("DIF id                      {}", dif.dif_id());
    println!("Trigger counter             {}", dif.trigger_counter());
    println!("Global trigger counter      {}", dif.global_trigger_counter());
    println!("Absolute BCID               {}", dif.absolute_bcid());
    println!("Event BCID                  {}", dif.bcid());
    println!("Frames                      {}", dif.number_of_frames());
    for frame in 0..dif.number_of_frames() {
        let pads = dif.frame_pads(frame)?;
        let over_threshold = pads.iter().filter(|&&pad| pad != 0).count();
        println!(
            "  frame {:<3}                 ASIC {} BCID {} ({over_threshold} pads over threshold)",
            frame,
            dif.frame_asic_id(frame),
            dif.frame_bcid(frame),
        );
    }

    if navigator.has_slow_control_data() {
        if navigator.bad_sc_data() {
            println!("Slow control                present but unterminated");
        } else if let Some(sc) = navigator.sc_buffer() {
            println!("Slow control                {} bytes", sc.len());
        }
    } else {
        println!("Slow control                none");
    }

    let eod = navigator.end_of_all_data();
    let non_zero = eod.as_slice().iter().filter(|&&byte| byte != 0).count();
    println!(
        "Trailing bytes              {} ({non_zero} non-zero)",
        eod.len()
    );

    Ok(())
}
