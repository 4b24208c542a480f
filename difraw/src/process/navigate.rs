use crate::structs::buffer::Buffer;
use crate::structs::dif::{DifPtr, END_OF_SC, START_OF_DIF, START_OF_SC};

/// Interprets one raw readout buffer as a structured DIF record.
///
/// Carries no state across buffers beyond the currently bound [`Buffer`];
/// binding scans once for the start-of-DIF marker and every structural query
/// derives from that cached offset.
///
/// # Example
///
/// ```rust
/// use difraw::process::EXAMPLE_DATA;
/// use difraw::process::navigate::RawBufferNavigator;
/// use difraw::structs::buffer::Buffer;
///
/// let mut navigator = RawBufferNavigator::new();
/// navigator.set_buffer(Buffer::from(EXAMPLE_DATA));
///
/// assert!(navigator.valid_buffer());
/// assert!(navigator.has_slow_control_data());
/// assert_eq!(navigator.end_of_all_data().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct RawBufferNavigator {
    buffer: Buffer,
    dif_start: Option<usize>,
}

impl RawBufferNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the navigator to `buffer` and rescans for the marker.
    pub fn set_buffer(&mut self, buffer: Buffer) {
        self.dif_start = find_start_of_dif(buffer.as_slice());
        self.buffer = buffer;
    }

    /// Raw detector id byte.
    ///
    /// An empty buffer reads as id 0, which matches no allow-list entry.
    pub fn detector_id(&self) -> u8 {
        self.buffer.as_slice().first().copied().unwrap_or(0)
    }

    /// Offset of the start-of-DIF marker, `None` when absent anywhere in the
    /// bound buffer.
    pub fn start_of_dif(&self) -> Option<usize> {
        self.dif_start
    }

    /// True when a [`DifPtr`] can be built: the marker was found and the
    /// declared frame table fits before the end of the buffer.
    pub fn valid_buffer(&self) -> bool {
        self.dif_ptr().is_some()
    }

    /// Frame-table view over the bound buffer.
    pub fn dif_ptr(&self) -> Option<DifPtr<'_>> {
        let start = self.dif_start?;
        DifPtr::parse(&self.buffer.as_slice()[start..])
    }

    /// View from the start-of-DIF marker to the end of the raw buffer; the
    /// whole buffer when no marker was found.
    pub fn dif_buffer(&self) -> Buffer {
        self.buffer
            .view(self.dif_start.unwrap_or(0)..self.buffer.len())
    }

    /// Bytes remaining in the buffer once the frame table is consumed,
    /// terminator included. Zero for an invalid buffer.
    pub fn size_after_dif_ptr(&self) -> usize {
        match (self.dif_start, self.dif_ptr()) {
            (Some(start), Some(dif)) => self.buffer.len() - start - dif.frame_table_end(),
            _ => 0,
        }
    }

    /// True when a slow-control marker directly follows the frame table.
    pub fn has_slow_control_data(&self) -> bool {
        self.sc_start().is_some()
    }

    /// True when a slow-control section starts but never terminates before
    /// the end of the buffer. Independent of presence: a buffer can have
    /// slow-control data and still fail this check.
    pub fn bad_sc_data(&self) -> bool {
        self.sc_start().is_some() && self.sc_end().is_none()
    }

    /// The slow-control section including both markers, when well formed.
    pub fn sc_buffer(&self) -> Option<Buffer> {
        let start = self.sc_start()?;
        let end = self.sc_end()?;
        Some(self.buffer.view(start..end + 1))
    }

    /// Remainder after every structured section has been consumed.
    ///
    /// Ideally empty; trailing content is a diagnostic signal, not an error.
    /// An unterminated slow-control section leaves nothing delimitable, so
    /// the remainder collapses to the empty suffix at the buffer end.
    pub fn end_of_all_data(&self) -> Buffer {
        let len = self.buffer.len();
        let Some(after_frames) = self.after_frame_table() else {
            return self.buffer.view(len..len);
        };
        let from = match (self.sc_start(), self.sc_end()) {
            (Some(_), Some(end)) => end + 1,
            (Some(_), None) => len,
            (None, _) => after_frames,
        };
        self.buffer.view(from..len)
    }

    /// Offset of the first byte past the end-of-DIF terminator.
    fn after_frame_table(&self) -> Option<usize> {
        let start = self.dif_start?;
        let dif = self.dif_ptr()?;
        Some(start + dif.frame_table_end() + 1)
    }

    fn sc_start(&self) -> Option<usize> {
        let after = self.after_frame_table()?;
        (self.buffer.as_slice().get(after).copied() == Some(START_OF_SC)).then_some(after)
    }

    fn sc_end(&self) -> Option<usize> {
        let start = self.sc_start()?;
        self.buffer.as_slice()[start + 1..]
            .iter()
            .position(|&b| b == END_OF_SC)
            .map(|found| start + 1 + found)
    }
}

/// First-match scan for the start-of-DIF marker.
///
/// The detector id byte is skipped so an id equal to the marker value cannot
/// shadow the real section start.
fn find_start_of_dif(data: &[u8]) -> Option<usize> {
    data.iter()
        .skip(1)
        .position(|&b| b == START_OF_DIF)
        .map(|found| found + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::EXAMPLE_DATA;
    use crate::structs::dif::{DIF_HEADER_LEN, END_OF_DIF, FRAME_SIZE};

    /// Builds a minimal raw buffer: `header_len` opaque bytes, a DIF section
    /// with `frames` empty frames, then `tail` verbatim.
    fn raw_buffer(header_len: usize, frames: u8, tail: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; header_len];
        data[0] = 0xD4;
        data.push(START_OF_DIF);
        data.extend_from_slice(&[0; DIF_HEADER_LEN - 2]);
        data.push(frames);
        data.extend_from_slice(&vec![0; frames as usize * FRAME_SIZE]);
        data.push(END_OF_DIF);
        data.extend_from_slice(tail);
        data
    }

    fn bound(data: &[u8]) -> RawBufferNavigator {
        let mut navigator = RawBufferNavigator::new();
        navigator.set_buffer(Buffer::from(data));
        navigator
    }

    #[test]
    fn marker_is_found_at_first_occurrence() {
        let navigator = bound(EXAMPLE_DATA);
        assert_eq!(navigator.start_of_dif(), Some(94));
        assert_eq!(navigator.detector_id(), 0xD4);

        let navigator = bound(&raw_buffer(7, 0, &[]));
        assert_eq!(navigator.start_of_dif(), Some(7));

        // Two markers: the scan stops at the first one.
        let mut data = raw_buffer(5, 0, &[]);
        data.extend_from_slice(&[START_OF_DIF, 0x00]);
        assert_eq!(bound(&data).start_of_dif(), Some(5));
    }

    #[test]
    fn missing_marker_invalidates_the_buffer() {
        let navigator = bound(&[0xD4, 0x01, 0x02, 0x03]);
        assert_eq!(navigator.start_of_dif(), None);
        assert!(!navigator.valid_buffer());
        assert!(navigator.dif_ptr().is_none());
        assert_eq!(navigator.size_after_dif_ptr(), 0);
        assert!(navigator.end_of_all_data().is_empty());
    }

    #[test]
    fn detector_id_equal_to_marker_is_not_the_section_start() {
        let mut data = raw_buffer(4, 0, &[]);
        data[0] = START_OF_DIF;
        assert_eq!(bound(&data).start_of_dif(), Some(4));
    }

    #[test]
    fn truncated_frame_table_is_invalid() {
        let data = raw_buffer(3, 2, &[]);
        assert!(bound(&data).valid_buffer());

        // Drop the terminator and the last frame byte.
        let navigator = bound(&data[..data.len() - 2]);
        assert_eq!(navigator.start_of_dif(), Some(3));
        assert!(!navigator.valid_buffer());
    }

    #[test]
    fn geometry_accessors_agree_with_the_raw_buffer() {
        let navigator = bound(EXAMPLE_DATA);
        let raw = Buffer::from(EXAMPLE_DATA);

        let dif_view = navigator.dif_buffer();
        assert_eq!(dif_view.len(), EXAMPLE_DATA.len() - 94);
        assert_eq!(dif_view.end(), raw.end());
        // 0xA0 + 6-byte slow control + 2 padding bytes.
        assert_eq!(navigator.size_after_dif_ptr(), 9);
    }

    #[test]
    fn slow_control_detection_and_framing() {
        let navigator = bound(EXAMPLE_DATA);
        assert!(navigator.has_slow_control_data());
        assert!(!navigator.bad_sc_data());
        let sc = navigator.sc_buffer().unwrap();
        assert_eq!(sc.as_slice(), &[0xB1, 0x01, 0xC2, 0x00, 0x7F, 0xA1]);

        // No trailer at all.
        let navigator = bound(&raw_buffer(3, 1, &[0, 0, 0]));
        assert!(!navigator.has_slow_control_data());
        assert!(!navigator.bad_sc_data());
        assert!(navigator.sc_buffer().is_none());

        // Start marker with no terminator: present and bad.
        let navigator = bound(&raw_buffer(3, 1, &[START_OF_SC, 0x42, 0x42]));
        assert!(navigator.has_slow_control_data());
        assert!(navigator.bad_sc_data());
        assert!(navigator.sc_buffer().is_none());
    }

    #[test]
    fn end_of_all_data_accounts_for_each_shape() {
        // Well-formed slow control, two padding bytes.
        let eod = bound(EXAMPLE_DATA).end_of_all_data();
        assert_eq!(eod.len(), 2);
        assert_eq!(eod.end(), EXAMPLE_DATA.len());

        // No slow control: remainder starts right after the terminator.
        let eod = bound(&raw_buffer(3, 1, &[0, 7, 0])).end_of_all_data();
        assert_eq!(eod.as_slice(), &[0, 7, 0]);

        // Unterminated slow control: nothing delimitable remains.
        let eod = bound(&raw_buffer(3, 1, &[START_OF_SC, 9, 9])).end_of_all_data();
        assert!(eod.is_empty());
    }
}
