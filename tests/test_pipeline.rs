// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use cambuf::{
    buf::{CameraBuf, PipelineOutput},
    exposure::Rect,
    metadata::FrameMetadata,
    publish::{FrameExtra, FrameSink, MemoryFrame, MemorySink, OutputSpec, StreamId},
    rawbuf::CpuContext,
    sensor::SensorInfo,
};
use std::{
    error::Error,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

const STREAM: StreamId = StreamId(0);

fn sensor_1280() -> SensorInfo {
    SensorInfo {
        frame_width: 1280,
        frame_height: 960,
        extra_height: 0,
        frame_stride: 1600,
        hdr_offset: 0,
        out_stride: 1280,
        uv_offset: 1280 * 960,
    }
}

/// Sink wrapper recording every call the orchestrator makes, while
/// delegating buffer storage to `MemorySink`.
#[derive(Clone, Default)]
struct SinkLog {
    created: Arc<Mutex<Vec<(StreamId, usize, OutputSpec)>>>,
    sent: Arc<Mutex<Vec<(usize, FrameExtra)>>>,
}

struct RecordingSink {
    inner: MemorySink,
    log: SinkLog,
}

impl RecordingSink {
    fn new() -> (Self, SinkLog) {
        let log = SinkLog::default();
        (
            Self {
                inner: MemorySink::new(),
                log: log.clone(),
            },
            log,
        )
    }
}

impl FrameSink for RecordingSink {
    type Frame = MemoryFrame;

    fn create_buffers(
        &mut self,
        stream: StreamId,
        count: usize,
        spec: &OutputSpec,
    ) -> Result<(), Box<dyn Error>> {
        self.log.created.lock().unwrap().push((stream, count, *spec));
        self.inner.create_buffers(stream, count, spec)
    }

    fn buffer(&mut self, stream: StreamId, slot: usize) -> Option<&mut MemoryFrame> {
        self.inner.buffer(stream, slot)
    }

    fn send(
        &mut self,
        stream: StreamId,
        slot: usize,
        extra: &FrameExtra,
    ) -> Result<(), Box<dyn Error>> {
        self.log.sent.lock().unwrap().push((slot, *extra));
        self.inner.send(stream, slot, extra)
    }
}

fn camera_buf(sensor: &SensorInfo, slots: usize) -> (CameraBuf<RecordingSink>, SinkLog) {
    let (sink, log) = RecordingSink::new();
    let buf = CameraBuf::new(
        Arc::new(CpuContext),
        sensor,
        sink,
        PipelineOutput::Processed,
        slots,
        STREAM,
    )
    .unwrap();
    (buf, log)
}

fn meta(frame_id: i64) -> FrameMetadata {
    FrameMetadata {
        frame_id,
        timestamp_sof: 1_000_000_000,
        timestamp_eof: 1_010_000_000,
        timestamp_end_of_isp: 1_035_000_000,
        processing_time: 0.0,
    }
}

#[test]
fn init_requests_encoder_sized_pool() {
    let (_buf, log) = camera_buf(&sensor_1280(), 4);

    let created = log.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    let (stream, count, spec) = created[0];
    assert_eq!(stream, STREAM);
    assert_eq!(count, 4);
    assert_eq!(spec.width, 1280);
    assert_eq!(spec.height, 960);
    // 1280 <= 1344, so the narrow encoder multiplier applies
    assert_eq!(spec.size, 2900 * 1280);
    assert_eq!(spec.stride, 1280);
    assert_eq!(spec.uv_offset, 1280 * 960);
}

#[test]
fn init_with_hdr_sensor_halves_output_height() {
    let sensor = SensorInfo {
        frame_height: 968,
        hdr_offset: 8,
        ..sensor_1280()
    };
    let (_buf, log) = camera_buf(&sensor, 4);

    let created = log.created.lock().unwrap();
    assert_eq!(created[0].2.height, 480);
}

#[test]
fn acquire_on_empty_queue_returns_false() {
    let (mut buf, log) = camera_buf(&sensor_1280(), 4);

    assert!(!buf.acquire());
    assert!(!buf.acquire());
    assert!(log.sent.lock().unwrap().is_empty());
}

#[test]
fn acquire_rejects_unwritten_slot_without_publishing() {
    let (mut buf, log) = camera_buf(&sensor_1280(), 4);
    let producer = buf.producer();

    // queued without ever being staged
    producer.queue(2);
    assert!(!buf.acquire());
    assert!(log.sent.lock().unwrap().is_empty());

    // the slot was not requeued either
    assert!(!buf.acquire());
}

#[test]
fn acquire_publishes_staged_frame_with_metadata() {
    let (mut buf, log) = camera_buf(&sensor_1280(), 4);
    let producer = buf.producer();

    producer.stage(1, meta(42));
    producer.queue(1);

    assert!(buf.acquire());
    assert_eq!(buf.cur_slot(), 1);

    let frame = buf.cur_frame();
    assert_eq!(frame.frame_id, 42);
    // end-of-exposure to end-of-ISP, in seconds
    assert!((frame.processing_time - 0.025).abs() < 1e-12);

    let sent = log.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let (slot, extra) = sent[0];
    assert_eq!(slot, 1);
    assert_eq!(extra.frame_id, 42);
    assert_eq!(extra.timestamp_sof, 1_000_000_000);
    assert_eq!(extra.timestamp_eof, 1_010_000_000);
    drop(sent);

    // the published buffer carries the frame id
    assert_eq!(buf.sink_mut().buffer(STREAM, 1).unwrap().frame_id(), 42);
}

#[test]
fn processed_pipeline_has_no_raw_pool() {
    let (mut buf, _log) = camera_buf(&sensor_1280(), 4);
    let producer = buf.producer();

    assert!(producer.raw_buffer(0).is_none());

    producer.stage(0, meta(1));
    producer.queue(0);
    assert!(buf.acquire());
    assert!(buf.cur_raw().is_none());
    assert!(buf.raw_frame_image().is_err());
}

#[test]
fn metering_runs_on_the_acquired_buffer() {
    let (mut buf, _log) = camera_buf(&sensor_1280(), 4);

    buf.sink_mut().buffer(STREAM, 0).unwrap().data_mut().fill(130);

    let producer = buf.producer();
    producer.stage(0, meta(7));
    producer.queue(0);
    assert!(buf.acquire());

    let region = Rect {
        x: 0,
        y: 0,
        width: 1280,
        height: 960,
    };
    assert_eq!(buf.cur_exposure(&region, 2, 2), Some(130.0 / 256.0));
}

#[test]
fn queue_recirculates_slots() {
    let (mut buf, _log) = camera_buf(&sensor_1280(), 2);
    let producer = buf.producer();

    producer.stage(0, meta(1));
    producer.queue(0);
    assert!(buf.acquire());

    // consumer done with the slot; producer reuses it next cycle
    buf.queue(0);
    producer.stage(0, meta(2));
    assert!(buf.acquire());
    assert_eq!(buf.cur_frame().frame_id, 2);
}

#[test]
fn threaded_producer_consumer_delivers_every_frame_once() {
    const SLOTS: usize = 4;
    const FRAMES: i64 = 200;

    let (mut buf, log) = camera_buf(&sensor_1280(), SLOTS);
    let producer = buf.producer();
    let returns = cambuf::queue::SlotQueue::new(SLOTS);
    for slot in 0..SLOTS {
        returns.push(slot);
    }

    let return_tx = returns.clone();
    let capture = thread::spawn(move || {
        let mut frame_id: i64 = 0;
        while frame_id < FRAMES {
            let Some(slot) = return_tx.try_pop() else {
                thread::sleep(Duration::from_micros(50));
                continue;
            };
            producer.stage(slot, meta(frame_id));
            producer.queue(slot);
            frame_id += 1;
        }
    });

    let mut seen = Vec::new();
    while (seen.len() as i64) < FRAMES {
        if buf.acquire() {
            seen.push(buf.cur_frame().frame_id);
            returns.push(buf.cur_slot());
        } else {
            thread::sleep(Duration::from_micros(50));
        }
    }
    capture.join().unwrap();

    // every frame id observed exactly once, in capture order
    let expect: Vec<i64> = (0..FRAMES).collect();
    assert_eq!(seen, expect);
    assert_eq!(log.sent.lock().unwrap().len(), FRAMES as usize);
}
