/// Message text addressed in UTF-16 code units, the unit Telegram uses for
/// entity offsets and lengths.
pub struct Utf16Text {
    units: Vec<u16>,
}

impl Utf16Text {
    pub fn new(text: &str) -> Self {
        Self {
            units: text.encode_utf16().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Code units in `[start, end)`. Both bounds are clamped to the text and
    /// an inverted range yields an empty slice, so bad offsets never panic.
    pub fn slice(&self, start: usize, end: usize) -> &[u16] {
        let end = end.min(self.units.len());
        let start = start.min(end);
        &self.units[start..end]
    }

    /// Same as [`slice`](Self::slice), decoded back to a `String`
    pub fn substring(&self, start: usize, end: usize) -> String {
        decode(self.slice(start, end))
    }
}

/// Decode UTF-16 code units. A lone surrogate (a span boundary that cut a
/// surrogate pair in half) becomes U+FFFD.
pub fn decode(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_counts_surrogate_pairs_twice() {
        assert_eq!(Utf16Text::new("abc").len(), 3);
        assert_eq!(Utf16Text::new("😀").len(), 2);
        assert_eq!(Utf16Text::new("é").len(), 1);
    }

    #[test]
    fn test_substring_after_emoji() {
        let text = Utf16Text::new("😀 hi");
        assert_eq!(text.substring(3, 5), "hi");
        assert_eq!(text.substring(0, 2), "😀");
    }

    #[test]
    fn test_slice_clamps_out_of_range() {
        let text = Utf16Text::new("hello");
        assert_eq!(text.substring(3, 100), "lo");
        assert_eq!(text.substring(50, 100), "");
        assert_eq!(text.substring(4, 2), "");
    }

    #[test]
    fn test_split_surrogate_is_replaced() {
        let text = Utf16Text::new("😀");
        assert_eq!(text.substring(0, 1), "\u{FFFD}");
    }
}
