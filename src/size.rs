//! Terminal window size

use nix::libc;

/// Window size in characters and pixels, as reported by TIOCGWINSZ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    /// Number of rows (characters)
    pub rows: u16,
    /// Number of columns (characters)
    pub cols: u16,
    /// Width in pixels (often 0)
    pub pixel_width: u16,
    /// Height in pixels (often 0)
    pub pixel_height: u16,
}

impl WindowSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        }
    }

    /// True when either dimension is zero.
    ///
    /// A pseudoterminal nobody has resized yet reports 0x0.
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub fn to_winsize(&self) -> libc::winsize {
        libc::winsize {
            ws_row: self.rows,
            ws_col: self.cols,
            ws_xpixel: self.pixel_width,
            ws_ypixel: self.pixel_height,
        }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

impl From<libc::winsize> for WindowSize {
    fn from(ws: libc::winsize) -> Self {
        Self {
            rows: ws.ws_row,
            cols: ws.ws_col,
            pixel_width: ws.ws_xpixel,
            pixel_height: ws.ws_ypixel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_size_default() {
        let size = WindowSize::default();
        assert_eq!(size.cols, 80);
        assert_eq!(size.rows, 24);
        assert!(!size.is_empty());
    }

    #[test]
    fn test_window_size_is_empty() {
        assert!(WindowSize::new(0, 24).is_empty());
        assert!(WindowSize::new(80, 0).is_empty());
        assert!(!WindowSize::new(1, 1).is_empty());
    }

    #[test]
    fn test_winsize_conversion() {
        let size = WindowSize {
            rows: 43,
            cols: 132,
            pixel_width: 1056,
            pixel_height: 688,
        };
        let ws = size.to_winsize();
        assert_eq!(ws.ws_col, 132);
        assert_eq!(ws.ws_row, 43);
        assert_eq!(WindowSize::from(ws), size);
    }
}
