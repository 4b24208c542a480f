#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! Decoder and traversal engine for the raw byte records emitted by an
//! SDHCAL-style detector readout chain.
//!
//! ### Record Organization
//!
//! **External structure**: acquisition events containing one raw buffer per
//! detector-interface (DIF) module.
//! **Internal structure**: a transport header, a marker-delimited DIF section
//! with a frame table, an optional slow-control trailer, zero padding.
//!
//! ### Traversal
//!
//! The [`process::looper::BufferLooper`] drives a strict nested lifecycle
//! (run, event, DIF, frame, pad) over an [`process::looper::EventSource`] and
//! an [`process::looper::EventDestination`], filtering buffers by detector id
//! and feeding structural findings into [`utils::counters::LoopCounters`].
//!
//! ## Quick Start
//!
//! Steps for inspecting one raw buffer:
//!
//! 1. Wrap the bytes in a [`structs::buffer::Buffer`]
//! 2. Bind a [`process::navigate::RawBufferNavigator`] to it
//! 3. Read the frame table through [`structs::dif::DifPtr`]
//!
//! ```rust
//! use difraw::process::EXAMPLE_DATA;
//! use difraw::process::navigate::RawBufferNavigator;
//! use difraw::structs::buffer::Buffer;
//!
//! let mut navigator = RawBufferNavigator::new();
//! navigator.set_buffer(Buffer::from(EXAMPLE_DATA));
//!
//! assert_eq!(navigator.start_of_dif(), Some(94));
//! let dif = navigator.dif_ptr().expect("complete frame table");
//! assert_eq!(dif.number_of_frames(), 1);
//! ```

/// Processing machinery for raw readout buffers.
///
/// 1. **Navigation** ([`process::navigate`]): interprets one buffer as a
///    structured DIF record.
///
/// 2. **Traversal** ([`process::looper`]): drives a source/destination pair
///    through the nested event lifecycle while tallying statistics.
pub mod process;

/// Data structures representing readout record components.
///
/// - **Buffers** ([`structs::buffer`]): shared-storage byte views
/// - **Detector ids** ([`structs::detector`]): module allow-list filter
/// - **DIF sections** ([`structs::dif`]): layout constants and the frame
///   table view
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Counters** ([`utils::counters`]): diagnostic histograms
/// - **Error Handling** ([`utils::errors`]): error types and the failure
///   promotion macro
pub mod utils;
