// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Boundary to the inter-process video publishing service.
//!
//! The service owns the output-format buffers: the orchestrator asks it
//! to create a pool at init, borrows a buffer by stream and slot during
//! acquisition, and hands the buffer back to the service for distribution
//! via [`FrameSink::send`]. The wire format and transport behind `send`
//! belong entirely to the service.

use std::{collections::HashMap, error::Error};
use tracing::debug;

/// Identity of one published video stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StreamId(pub u32);

/// Geometry and sizing for one output buffer pool, computed by the
/// orchestrator from the sensor descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OutputSpec {
    pub width: u32,
    pub height: u32,
    /// Buffer size in bytes, dictated by the downstream encoder.
    pub size: usize,
    pub stride: u32,
    pub uv_offset: u32,
}

/// Side-channel frame metadata published together with the buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameExtra {
    pub frame_id: i64,
    pub timestamp_sof: u64,
    pub timestamp_eof: u64,
}

/// One output-format buffer lent out by the publishing service.
pub trait OutputFrame {
    /// Stamp the buffer with the frame it now carries.
    fn set_frame_id(&mut self, id: i64);

    /// Luminance plane of the buffer contents.
    fn luma(&self) -> &[u8];

    /// Row stride of the luminance plane in bytes.
    fn stride(&self) -> usize;
}

/// The publishing service as seen by the orchestrator.
pub trait FrameSink {
    type Frame: OutputFrame;

    /// Create the output buffer pool for `stream`: `count` buffers with
    /// the given geometry. Called once per stream at pipeline startup;
    /// failure aborts startup.
    fn create_buffers(
        &mut self,
        stream: StreamId,
        count: usize,
        spec: &OutputSpec,
    ) -> Result<(), Box<dyn Error>>;

    /// Borrow the output buffer for `slot`, or `None` if the stream or
    /// slot is unknown to the service.
    fn buffer(&mut self, stream: StreamId, slot: usize) -> Option<&mut Self::Frame>;

    /// Publish the buffer for `slot` to all subscribers of `stream`.
    ///
    /// This is the single point at which a frame becomes visible
    /// downstream.
    fn send(&mut self, stream: StreamId, slot: usize, extra: &FrameExtra)
        -> Result<(), Box<dyn Error>>;
}

/// In-process NV12 buffer holding only what the orchestrator touches.
pub struct MemoryFrame {
    data: Vec<u8>,
    stride: usize,
    frame_id: i64,
}

impl MemoryFrame {
    /// Mutable view of the buffer contents, for producers simulating the
    /// ISP output write.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn frame_id(&self) -> i64 {
        self.frame_id
    }
}

impl OutputFrame for MemoryFrame {
    fn set_frame_id(&mut self, id: i64) {
        self.frame_id = id;
    }

    fn luma(&self) -> &[u8] {
        &self.data
    }

    fn stride(&self) -> usize {
        self.stride
    }
}

/// In-process publishing service for tests and the demo pipeline.
///
/// Buffers live on the heap instead of shared memory and `send` only
/// counts and logs; everything the orchestrator observes through
/// [`FrameSink`] behaves like the real service.
#[derive(Default)]
pub struct MemorySink {
    pools: HashMap<StreamId, Vec<MemoryFrame>>,
    sent: u64,
    last_extra: Option<FrameExtra>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames published so far across all streams.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Metadata of the most recently published frame.
    pub fn last_extra(&self) -> Option<FrameExtra> {
        self.last_extra
    }
}

impl FrameSink for MemorySink {
    type Frame = MemoryFrame;

    fn create_buffers(
        &mut self,
        stream: StreamId,
        count: usize,
        spec: &OutputSpec,
    ) -> Result<(), Box<dyn Error>> {
        let pool = (0..count)
            .map(|_| MemoryFrame {
                data: vec![0; spec.size],
                stride: spec.stride as usize,
                frame_id: -1,
            })
            .collect();
        self.pools.insert(stream, pool);
        Ok(())
    }

    fn buffer(&mut self, stream: StreamId, slot: usize) -> Option<&mut MemoryFrame> {
        self.pools.get_mut(&stream)?.get_mut(slot)
    }

    fn send(
        &mut self,
        stream: StreamId,
        slot: usize,
        extra: &FrameExtra,
    ) -> Result<(), Box<dyn Error>> {
        self.sent += 1;
        self.last_extra = Some(*extra);
        debug!(
            stream = stream.0,
            slot,
            frame_id = extra.frame_id,
            "published frame"
        );
        Ok(())
    }
}
