// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Raw sensor frame buffers backed by CMA DMA-heap memory.
//!
//! Pipelines that emit unprocessed sensor data allocate one `RawBuffer`
//! per slot at startup. The buffer is mapped once for CPU access and
//! registered with the compute accelerator through [`ComputeContext`];
//! the mapping lives until the buffer is dropped.

use dma_buf::DmaBuf;
use dma_heap::{Heap, HeapKind};
use libc::{dup, mmap, munmap, MAP_FAILED, MAP_SHARED, PROT_READ, PROT_WRITE};
use std::{
    error::Error,
    ffi::c_void,
    io,
    os::fd::{AsFd, AsRawFd, BorrowedFd, FromRawFd, OwnedFd},
    ptr::null_mut,
    slice::from_raw_parts,
};
use tracing::warn;

/// Seam to the compute-accelerator context.
///
/// The accelerator layer registers DMA buffers into its own address space
/// at pipeline startup and releases them at teardown. Implementations are
/// expected to be cheap to call and must not retain the buffer beyond
/// `unmap`.
pub trait ComputeContext: Send + Sync {
    /// Map `buf` into the accelerator's address space.
    fn map(&self, buf: &RawBuffer) -> Result<(), Box<dyn Error>>;

    /// Release a mapping created by `map`.
    fn unmap(&self, buf: &RawBuffer);
}

/// No-op context for pipelines (and tests) without an accelerator.
pub struct CpuContext;

impl ComputeContext for CpuContext {
    fn map(&self, _buf: &RawBuffer) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn unmap(&self, _buf: &RawBuffer) {}
}

/// A fixed-length raw sensor frame buffer in CMA DMA memory.
///
/// The region is mapped shared for the buffer's whole lifetime; the ISP
/// writes it by DMA while the CPU reads it through the same mapping, so
/// reads are only coherent while the slot is consumer-owned per the
/// free-slot queue discipline.
pub struct RawBuffer {
    fd: OwnedFd,
    map: *mut u8,
    len: usize,
}

// The mapping is a plain shared memory region; cross-thread access is
// coordinated by slot ownership, not by this type.
unsafe impl Send for RawBuffer {}
unsafe impl Sync for RawBuffer {}

impl RawBuffer {
    /// Allocate a `len` byte buffer from the CMA DMA heap and map it.
    ///
    /// # Errors
    ///
    /// Fails if the DMA heap is unavailable, the allocation is rejected
    /// (out of CMA memory), or the mapping fails. Allocation failures are
    /// fatal to pipeline startup and are never retried here.
    pub fn allocate(len: usize) -> Result<Self, Box<dyn Error>> {
        let heap = Heap::new(HeapKind::Cma)?;
        let fd = heap.allocate(len)?;

        let map = unsafe {
            mmap(
                null_mut(),
                len,
                PROT_READ | PROT_WRITE,
                MAP_SHARED,
                fd.as_raw_fd(),
                0,
            )
        };
        if map == MAP_FAILED {
            return Err(Box::new(io::Error::last_os_error()));
        }

        Ok(Self {
            fd,
            map: map as *mut u8,
            len,
        })
    }

    pub fn fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// View the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        unsafe { from_raw_parts(self.map, self.len) }
    }

    /// Write `data` into the buffer at `offset`.
    ///
    /// Stands in for the ISP's DMA write on simulated pipelines. The
    /// caller must own the slot this buffer belongs to.
    pub fn write(&self, offset: usize, data: &[u8]) -> Result<(), Box<dyn Error>> {
        if offset + data.len() > self.len {
            return Err(Box::new(io::Error::new(
                io::ErrorKind::InvalidInput,
                "write past end of raw buffer",
            )));
        }
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.map.add(offset), data.len());
        }
        Ok(())
    }

    /// Produce an owned copy of the buffer contents.
    ///
    /// Goes through the dma-buf sync protocol so the copy is coherent
    /// with any device writes.
    pub fn snapshot(&self) -> Result<Vec<u8>, Box<dyn Error>> {
        let dma = unsafe { DmaBuf::from_raw_fd(dup(self.fd.as_raw_fd())) };
        let mem = dma.memory_map()?;
        Ok(mem.read(copy_frame, None::<()>)?)
    }
}

fn copy_frame(data: &[u8], _arg: Option<()>) -> Result<Vec<u8>, Box<dyn Error>> {
    Ok(data.to_vec())
}

impl Drop for RawBuffer {
    fn drop(&mut self) {
        if unsafe { munmap(self.map.cast::<c_void>(), self.len) } != 0 {
            warn!("unmap failed!");
        }
    }
}
