use cambuf::{
    buf::{CameraBuf, PipelineOutput},
    device::open_v4l_subdev,
    exposure::Rect,
    metadata::FrameMetadata,
    publish::{FrameSink, MemorySink, StreamId},
    rawbuf::CpuContext,
    sensor::SensorInfo,
};
use clap::Parser;
use std::{
    error::Error,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};
use tracing::{debug, info, warn};
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod args;
use args::Args;

fn init_tracing(verbose: bool) {
    tracing_log::LogTracer::init().ok();
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(level)
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_journald::layer().ok())
        .init();
}

fn update_fps(prev: &mut Instant, history: &mut Vec<i64>, index: &mut usize) -> i64 {
    let now = Instant::now();

    let elapsed = now.duration_since(*prev);
    *prev = Instant::now();

    history[*index] = 1e9 as i64 / elapsed.as_nanos().max(1) as i64;
    *index = (*index + 1) % history.len();

    (history.iter().sum::<i64>() as f64 / history.len() as f64).round() as i64
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos() as u64
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.verbose);

    info!("cambuf capture pipeline");

    if let Some(prefix) = &args.subdev {
        match open_v4l_subdev(prefix, args.subdev_index) {
            Ok(_) => info!("opened v4l-subdev matching {prefix:?}"),
            Err(e) => warn!("v4l-subdev probe failed: {e}"),
        }
    }

    let width = args.camera_size[0];
    let height = args.camera_size[1];
    let mut sensor = SensorInfo {
        frame_width: width,
        frame_height: height,
        extra_height: args.extra_height,
        // 10-bit packed readout unless the driver reports its own stride
        frame_stride: if args.frame_stride > 0 {
            args.frame_stride
        } else {
            width * 5 / 4
        },
        hdr_offset: args.hdr_offset,
        out_stride: width,
        uv_offset: 0,
    };
    sensor.uv_offset = sensor.out_stride * sensor.out_height();

    let output = if args.raw {
        PipelineOutput::Raw
    } else {
        PipelineOutput::Processed
    };
    let stream = StreamId(args.stream);

    let mut buf = CameraBuf::new(
        Arc::new(CpuContext),
        &sensor,
        MemorySink::new(),
        output,
        args.buffers,
        stream,
    )?;

    // test pattern in every output buffer, one gray level per slot
    for slot in 0..args.buffers {
        if let Some(frame) = buf.sink_mut().buffer(stream, slot) {
            frame.data_mut().fill((64 + (slot % 6) * 32) as u8);
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let producer = buf.producer();
    let period = Duration::from_secs(1) / args.fps.max(1);
    let capture = {
        let running = running.clone();
        thread::spawn(move || {
            let mut frame_id: i64 = 0;
            while running.load(Ordering::Relaxed) {
                let slot = frame_id as usize % producer.slot_count();

                if let Some(raw) = producer.raw_buffer(slot) {
                    // stand-in for the ISP's DMA write
                    if let Err(e) = raw.write(0, &frame_id.to_le_bytes()) {
                        warn!("raw write failed: {e}");
                    }
                }

                let sof = now_ns();
                producer.stage(
                    slot,
                    FrameMetadata {
                        frame_id,
                        timestamp_sof: sof,
                        timestamp_eof: sof + 5_000_000,
                        timestamp_end_of_isp: sof + 7_000_000,
                        processing_time: 0.0,
                    },
                );
                producer.queue(slot);

                frame_id += 1;
                thread::sleep(period);
            }
        })
    };

    // center-weighted metering window
    let region = Rect {
        x: width as i32 / 4,
        y: sensor.out_height() as i32 / 4,
        width: width as i32 / 2,
        height: sensor.out_height() as i32 / 2,
    };

    let mut prev = Instant::now();
    let mut history = vec![0; 30];
    let mut index = 0;
    let mut acquired: u64 = 0;
    while args.frames == 0 || acquired < args.frames {
        if !buf.acquire() {
            thread::sleep(Duration::from_millis(1));
            continue;
        }
        acquired += 1;

        let fps = update_fps(&mut prev, &mut history, &mut index);
        let ev = buf.cur_exposure(&region, 2, 2).map(f64::from);
        let frame = buf.cur_frame();
        debug!(
            frame_id = frame.frame_id,
            slot = buf.cur_slot(),
            processing_time = frame.processing_time,
            exposure = ev,
            fps,
            "acquired frame"
        );

        if args.verbose {
            if let Ok(raw) = buf.raw_frame_image() {
                debug!("raw frame copy: {} bytes", raw.len());
            }
        }
    }

    running.store(false, Ordering::Relaxed);
    capture.join().map_err(|_| "capture thread panicked")?;
    info!("acquired {acquired} frames");

    Ok(())
}
