// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! V4L2 subdevice lookup by name prefix.
//!
//! Sensor drivers register subdevices under `/sys/class/video4linux`
//! with kernel-assigned numbering, so a pipeline locates its device by
//! matching the advertised name rather than hardcoding a node path.

use std::{
    fs::{self, File, OpenOptions},
    io,
    path::Path,
};

/// Open the `index`-th v4l-subdev whose advertised name starts with
/// `prefix`.
///
/// Subdevices are scanned in sysfs order; `index` is zero-based among
/// the matches. Returns `NotFound` once the sysfs sequence is exhausted
/// without enough matches, with no device state created.
pub fn open_v4l_subdev(prefix: &str, index: usize) -> io::Result<File> {
    open_subdev_in(
        Path::new("/sys/class/video4linux"),
        Path::new("/dev"),
        prefix,
        index,
    )
}

fn open_subdev_in(sysfs: &Path, dev: &Path, prefix: &str, mut index: usize) -> io::Result<File> {
    for n in 0.. {
        let name = match fs::read_to_string(sysfs.join(format!("v4l-subdev{n}/name"))) {
            Ok(name) => name,
            Err(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no v4l-subdev matching {prefix:?}"),
                ))
            }
        };
        if name.trim_end().starts_with(prefix) {
            if index == 0 {
                return OpenOptions::new()
                    .read(true)
                    .write(true)
                    .open(dev.join(format!("v4l-subdev{n}")));
            }
            index -= 1;
        }
    }
    unreachable!()
}
