/// Emoji choices offered when creating or editing a tracker.
pub const EMOJI_PALETTE: [&str; 18] = [
    "🙂", "😻", "🐶", "🌺", "❤️", "😱", "😇", "😡", "🥶", "🤔", "🙌", "🍔", "🥦", "🏓", "🥇",
    "🎸", "🏝️", "😪",
];

/// Named color keys; the presentation layer maps them to concrete colors.
pub const COLOR_PALETTE: [&str; 18] = [
    "Color selection 1",
    "Color selection 2",
    "Color selection 3",
    "Color selection 4",
    "Color selection 5",
    "Color selection 6",
    "Color selection 7",
    "Color selection 8",
    "Color selection 9",
    "Color selection 10",
    "Color selection 11",
    "Color selection 12",
    "Color selection 13",
    "Color selection 14",
    "Color selection 15",
    "Color selection 16",
    "Color selection 17",
    "Color selection 18",
];

pub fn emoji_at(index: usize) -> Option<&'static str> {
    EMOJI_PALETTE.get(index).copied()
}

pub fn color_at(index: usize) -> Option<&'static str> {
    COLOR_PALETTE.get(index).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_bounds_checked() {
        assert_eq!(emoji_at(0), Some("🙂"));
        assert_eq!(color_at(17), Some("Color selection 18"));
        assert_eq!(color_at(18), None);
        assert_eq!(emoji_at(usize::MAX), None);
    }
}
