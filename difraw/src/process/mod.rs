/// Raw-buffer interpretation.
///
/// Provides the [`RawBufferNavigator`](navigate::RawBufferNavigator) for
/// locating the start-of-DIF marker and exposing the structured sections of
/// one raw buffer.
pub mod navigate;

/// The generic traversal engine.
///
/// Provides the [`BufferLooper`](looper::BufferLooper) driving an
/// [`EventSource`](looper::EventSource) and an
/// [`EventDestination`](looper::EventDestination) through the nested
/// event/DIF/frame/pad lifecycle.
pub mod looper;

/// One complete raw DIF buffer: a 94-byte acquisition header (HCAL detector
/// id in the first byte), a single-frame DIF section, a 4-byte slow-control
/// payload and two trailing padding bytes.
pub const EXAMPLE_DATA: &[u8] = &[
    0xD4, 0x43, 0x41, 0x4C, 0x31, 0x00, 0x00, 0x17, 0x00, 0x00, 0x00, 0x2A, 0x00, 0x00, 0x0E, 0x10,
    0x00, 0x00, 0x00, 0x00, 0x01, 0x77, 0x00, 0x00, 0x03, 0x09, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00,
    0x5A, 0x5A, 0x5A, 0x5A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x08, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xDE, 0xAD, 0xCA, 0xFE, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xB0, 0x2A,
    0x00, 0x00, 0x01, 0x77, 0x00, 0x00, 0x03, 0x09, 0x00, 0x00, 0x00, 0x00, 0xBE, 0xEF, 0x00, 0x12,
    0x34, 0x01, 0x0B, 0x00, 0x12, 0x30, 0xC0, 0x00, 0x00, 0x03, 0x00, 0x00, 0x14, 0x00, 0x00, 0x00,
    0x00, 0x80, 0x00, 0x00, 0x00, 0x01, 0xA0, 0xB1, 0x01, 0xC2, 0x00, 0x7F, 0xA1, 0x00, 0x00,
];
