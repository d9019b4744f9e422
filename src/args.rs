// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;

/// Command-line arguments for the capture pipeline demo.
///
/// The binary drives a simulated sensor/ISP producer against the real
/// buffer lifecycle, so the options cover sensor geometry, pool sizing,
/// and frame pacing. Arguments can be specified via command line or
/// environment variables.
///
/// # Example
///
/// ```bash
/// # Via command line
/// cambuf --camera-size 1280 960 --buffers 4 --raw
///
/// # Via environment variables
/// export CAMERA_SIZE="1280 960"
/// export BUFFERS=4
/// cambuf
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Sensor frame resolution in pixels (width height)
    #[arg(
        long,
        env = "CAMERA_SIZE",
        default_value = "1280 960",
        value_delimiter = ' ',
        num_args = 2
    )]
    pub camera_size: Vec<u32>,

    /// Extra readout rows past the active area
    #[arg(long, env = "EXTRA_HEIGHT", default_value = "16")]
    pub extra_height: u32,

    /// Raw readout stride in bytes per row (0 derives 10-bit packed)
    #[arg(long, env = "FRAME_STRIDE", default_value = "0")]
    pub frame_stride: u32,

    /// HDR interleave row offset (0 for single-exposure sensors)
    #[arg(long, env = "HDR_OFFSET", default_value = "0")]
    pub hdr_offset: u32,

    /// Number of buffer slots in each pool
    #[arg(long, env = "BUFFERS", default_value = "4")]
    pub buffers: usize,

    /// Capture rate in frames per second
    #[arg(long, env = "FPS", default_value = "20")]
    pub fps: u32,

    /// Emit unprocessed sensor data alongside the processed output
    #[arg(long, env = "RAW")]
    pub raw: bool,

    /// Published stream identity
    #[arg(long, env = "STREAM", default_value = "0")]
    pub stream: u32,

    /// V4L2 subdevice name prefix to probe before starting (optional)
    #[arg(long, env = "SUBDEV")]
    pub subdev: Option<String>,

    /// Zero-based index among subdevices matching the prefix
    #[arg(long, env = "SUBDEV_INDEX", default_value = "0")]
    pub subdev_index: usize,

    /// Number of frames to run, 0 for unlimited
    #[arg(long, env = "FRAMES", default_value = "0")]
    pub frames: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
