//! Fixed dimensions of the VGA text-mode buffer at `0xb8000`.

/// Number of character columns in text mode 3.
pub const BUFFER_WIDTH: usize = 80;
/// Number of character rows in text mode 3.
pub const BUFFER_HEIGHT: usize = 25;
