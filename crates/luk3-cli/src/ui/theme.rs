//! Colors and glyphs for console output, keyed by sync state.

use crossterm::style::Color;

/// Visual constants for console output.
#[derive(Debug, Clone, Default)]
pub struct Theme {
    pub colors: Palette,
    pub glyphs: Glyphs,
}

/// One color per kind of line the reporter prints.
#[derive(Debug, Clone)]
pub struct Palette {
    pub heading: Color,
    pub bundle: Color,
    pub version: Color,
    /// Paths, reasons and other detail lines.
    pub detail: Color,
    pub up_to_date: Color,
    pub planned: Color,
    pub failed: Color,
    pub warning: Color,
    pub busy: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            heading: Color::DarkGrey,
            bundle: Color::Cyan,
            version: Color::White,
            detail: Color::DarkGrey,
            up_to_date: Color::Green,
            planned: Color::Yellow,
            failed: Color::Red,
            warning: Color::Yellow,
            busy: Color::Blue,
        }
    }
}

/// Line prefixes.
#[derive(Debug, Clone)]
pub struct Glyphs {
    pub planned: &'static str,
    pub busy: &'static str,
    pub done: &'static str,
    pub failed: &'static str,
    pub warning: &'static str,
    pub note: &'static str,
}

impl Default for Glyphs {
    fn default() -> Self {
        Self {
            planned: "○",
            busy: "●",
            done: "✓",
            failed: "✗",
            warning: "!",
            note: "·",
        }
    }
}

/// Bytes as `B`, `KB`, `MB` or `GB` with one decimal above bytes.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// `1 file`, `2 files`
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_pick_the_largest_whole_unit() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn plural_only_for_counts_other_than_one() {
        assert_eq!(plural(0, "file"), "0 files");
        assert_eq!(plural(1, "bundle"), "1 bundle");
        assert_eq!(plural(12, "pak3t"), "12 pak3ts");
    }
}
