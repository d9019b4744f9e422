// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! # Camera Frame Buffer Library
//!
//! This library manages the lifecycle of camera sensor frame buffers in a
//! real-time capture pipeline: fixed-size buffer pools sized from sensor
//! geometry, a producer/consumer slot hand-off between the capture path
//! and application consumers, per-frame timing metadata, zero-copy
//! publication through a pluggable sink, and auto-exposure metering over
//! the delivered luminance data.
//!
//! ## Features
//!
//! - **Buffer Pools**: One shared slot index space across metadata, raw
//!   sensor buffers (CMA DMA-heap backed), and the publishing service's
//!   output buffers; sized once at init from the sensor descriptor.
//! - **Slot Hand-off**: A bounded free-slot queue with a zero-wait pop is
//!   the only synchronization between the capture producer and the
//!   consumer.
//! - **AE Metering**: Median-based luminance histogram statistic, robust
//!   against outlier pixels.
//! - **Device Lookup**: V4L2 subdevice discovery by advertised name
//!   prefix.
//!
//! ## Example
//!
//! ```no_run
//! use cambuf::{
//!     buf::{CameraBuf, PipelineOutput},
//!     exposure::Rect,
//!     metadata::FrameMetadata,
//!     publish::{MemorySink, StreamId},
//!     rawbuf::CpuContext,
//!     sensor::SensorInfo,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sensor = SensorInfo {
//!     frame_width: 1280,
//!     frame_height: 960,
//!     extra_height: 0,
//!     frame_stride: 1600,
//!     hdr_offset: 0,
//!     out_stride: 1280,
//!     uv_offset: 1280 * 960,
//! };
//!
//! let mut buf = CameraBuf::new(
//!     Arc::new(CpuContext),
//!     &sensor,
//!     MemorySink::new(),
//!     PipelineOutput::Processed,
//!     4,
//!     StreamId(0),
//! )?;
//!
//! // capture side: record the frame's timing, then queue the slot
//! let producer = buf.producer();
//! producer.stage(0, FrameMetadata { frame_id: 1, ..Default::default() });
//! producer.queue(0);
//!
//! // consumer side: acquire publishes the frame, then meter exposure
//! if buf.acquire() {
//!     let region = Rect { x: 0, y: 0, width: 1280, height: 960 };
//!     let ev = buf.cur_exposure(&region, 2, 2);
//!     println!("frame {} ev {:?}", buf.cur_frame().frame_id, ev);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency
//!
//! The free-slot queue push/pop pair is the happens-before boundary: a
//! slot's metadata and buffer contents are written by the producer before
//! the push and read by the consumer after the pop. Exactly one consumer
//! owns a slot between its pop and the next queue of that slot.

pub mod buf;
pub mod device;
pub mod exposure;
pub mod metadata;
pub mod publish;
pub mod queue;
pub mod rawbuf;
pub mod sensor;
