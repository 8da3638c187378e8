//! Terminal styling and number formatting.
//!
//! ANSI colors are used for status badges only and are disabled under the
//! `NO_COLOR` and `TERM=dumb` conventions.

/// ANSI escape codes for text styling and colors.
pub mod colors {
    /// Reset all styling.
    pub const RESET: &str = "\x1b[0m";

    /// Bold reverse green for OK badges.
    pub const TAG_OK: &str = "\x1b[1;7;32m";
    /// Bold reverse red for FAIL badges.
    pub const TAG_FAIL: &str = "\x1b[1;7;31m";
    /// Bold reverse yellow for STAIRS badges.
    pub const TAG_STAIRS: &str = "\x1b[1;7;33m";

    /// Bright bold white for headline figures.
    pub const WHITE_BOLD: &str = "\x1b[1;97m";
    /// Gray for coordinates and secondary details.
    pub const GRAY: &str = "\x1b[90m";
    /// Cyan for category labels.
    pub const CYAN: &str = "\x1b[36m";
}

/// Resolved color codes, either ANSI sequences or empty strings.
#[derive(Debug, Clone, Copy)]
pub struct ColorPalette {
    pub reset: &'static str,
    pub tag_ok: &'static str,
    pub tag_fail: &'static str,
    pub tag_stairs: &'static str,
    pub white_bold: &'static str,
    pub gray: &'static str,
    pub cyan: &'static str,
}

impl ColorPalette {
    #[must_use]
    pub const fn colored() -> Self {
        Self {
            reset: colors::RESET,
            tag_ok: colors::TAG_OK,
            tag_fail: colors::TAG_FAIL,
            tag_stairs: colors::TAG_STAIRS,
            white_bold: colors::WHITE_BOLD,
            gray: colors::GRAY,
            cyan: colors::CYAN,
        }
    }

    #[must_use]
    pub const fn plain() -> Self {
        Self {
            reset: "",
            tag_ok: "",
            tag_fail: "",
            tag_stairs: "",
            white_bold: "",
            gray: "",
            cyan: "",
        }
    }

    /// `colored()` if the terminal supports ANSI colors, otherwise `plain()`.
    #[must_use]
    pub fn detect() -> Self {
        if supports_color() {
            Self::colored()
        } else {
            Self::plain()
        }
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::detect()
    }
}

/// Check if the terminal supports ANSI color codes.
///
/// Respects `NO_COLOR` (https://no-color.org/) and `TERM=dumb`.
#[must_use]
pub fn supports_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if let Ok(term) = std::env::var("TERM") {
        if term.eq_ignore_ascii_case("dumb") {
            return false;
        }
    }
    true
}

/// Human-readable walking distance: metres below one kilometre.
///
/// ```
/// # use stepfree_cli::terminal::format_distance_km;
/// assert_eq!(format_distance_km(0.2204), "220 m");
/// assert_eq!(format_distance_km(1.25), "1.25 km");
/// ```
#[must_use]
pub fn format_distance_km(km: f64) -> String {
    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else {
        format!("{km:.2} km")
    }
}

/// Human-readable walking time.
///
/// ```
/// # use stepfree_cli::terminal::format_duration_min;
/// assert_eq!(format_duration_min(2.94), "2.9 min");
/// assert_eq!(format_duration_min(65.0), "1 h 05 min");
/// ```
#[must_use]
pub fn format_duration_min(minutes: f64) -> String {
    if minutes < 60.0 {
        return format!("{minutes:.1} min");
    }
    let total = minutes.round() as u64;
    format!("{} h {:02} min", total / 60, total % 60)
}
