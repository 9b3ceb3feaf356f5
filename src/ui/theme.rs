use ratatui::style::Color;

use crate::system::anomaly::AnomalyKind;

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    pub header_accent_bg: Color,
    pub header_accent_fg: Color,
    pub status_ok: Color,
    pub status_err: Color,
    pub status_warn: Color,
    pub statusbar_bg: Color,
    pub overlay_border: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub accent: Color,
    pub pill_key_bg: Color,
    pub pill_key_fg: Color,
    pub pill_desc_fg: Color,
    pub surface_bg: Color,
    pub gauge_filled: Color,
    pub gauge_unfilled: Color,
    pub sparkline_color: Color,
    pub table_header_fg: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub zombie_fg: Color,
    pub orphan_fg: Color,
    /// Idle, light, busy, saturated.
    pub heat_colors: [Color; 4],
}

impl Theme {
    pub fn from_config(theme_name: &str) -> Self {
        match theme_name.to_lowercase().as_str() {
            "light" => Self::light(),
            "mono" | "monochrome" => Self::mono(),
            _ => Self::dark(),
        }
    }

    pub fn dark() -> Self {
        Theme {
            name: "dark",
            header_accent_bg: Color::Green,
            header_accent_fg: Color::Black,
            status_ok: Color::Green,
            status_err: Color::Red,
            status_warn: Color::Yellow,
            statusbar_bg: Color::DarkGray,
            overlay_border: Color::DarkGray,
            text_primary: Color::White,
            text_secondary: Color::Gray,
            accent: Color::Green,
            pill_key_bg: Color::Yellow,
            pill_key_fg: Color::Black,
            pill_desc_fg: Color::White,
            surface_bg: Color::DarkGray,
            gauge_filled: Color::Rgb(103, 232, 249),
            gauge_unfilled: Color::DarkGray,
            sparkline_color: Color::Rgb(251, 146, 60),
            table_header_fg: Color::Rgb(103, 232, 249),
            selection_bg: Color::Rgb(55, 65, 81),
            selection_fg: Color::White,
            zombie_fg: Color::Rgb(239, 68, 68),
            orphan_fg: Color::Rgb(249, 115, 22),
            heat_colors: [
                Color::Gray,
                Color::Rgb(16, 185, 129),
                Color::Rgb(249, 115, 22),
                Color::Rgb(239, 68, 68),
            ],
        }
    }

    pub fn light() -> Self {
        Theme {
            name: "light",
            header_accent_bg: Color::Blue,
            header_accent_fg: Color::White,
            status_ok: Color::Rgb(0, 120, 0),
            status_err: Color::Red,
            status_warn: Color::Rgb(180, 110, 0),
            statusbar_bg: Color::Rgb(220, 220, 220),
            overlay_border: Color::Rgb(150, 150, 150),
            text_primary: Color::Black,
            text_secondary: Color::DarkGray,
            accent: Color::Blue,
            pill_key_bg: Color::Blue,
            pill_key_fg: Color::White,
            pill_desc_fg: Color::Black,
            surface_bg: Color::Rgb(200, 200, 200),
            gauge_filled: Color::Rgb(70, 130, 180),
            gauge_unfilled: Color::Rgb(200, 200, 200),
            sparkline_color: Color::Rgb(70, 130, 180),
            table_header_fg: Color::Blue,
            selection_bg: Color::Rgb(190, 210, 235),
            selection_fg: Color::Black,
            zombie_fg: Color::Rgb(200, 40, 40),
            orphan_fg: Color::Rgb(190, 100, 20),
            heat_colors: [
                Color::DarkGray,
                Color::Rgb(60, 150, 60),
                Color::Rgb(200, 140, 30),
                Color::Rgb(200, 60, 60),
            ],
        }
    }

    pub fn mono() -> Self {
        Theme {
            name: "mono",
            header_accent_bg: Color::White,
            header_accent_fg: Color::Black,
            status_ok: Color::White,
            status_err: Color::White,
            status_warn: Color::White,
            statusbar_bg: Color::Reset,
            overlay_border: Color::Gray,
            text_primary: Color::White,
            text_secondary: Color::Gray,
            accent: Color::White,
            pill_key_bg: Color::White,
            pill_key_fg: Color::Black,
            pill_desc_fg: Color::White,
            surface_bg: Color::Reset,
            gauge_filled: Color::White,
            gauge_unfilled: Color::DarkGray,
            sparkline_color: Color::White,
            table_header_fg: Color::White,
            selection_bg: Color::White,
            selection_fg: Color::Black,
            zombie_fg: Color::White,
            orphan_fg: Color::Gray,
            heat_colors: [Color::Gray, Color::White, Color::White, Color::White],
        }
    }

    /// Color for a utilization percentage (CPU or memory).
    pub fn heat_color(&self, percent: f64) -> Color {
        let index = match percent {
            p if p >= 75.0 => 3,
            p if p >= 25.0 => 2,
            p if p >= 1.0 => 1,
            _ => 0,
        };
        self.heat_colors[index]
    }

    pub fn anomaly_color(&self, kind: AnomalyKind) -> Color {
        match kind {
            AnomalyKind::Zombie => self.zombie_fg,
            AnomalyKind::Orphan => self.orphan_fg,
        }
    }
}
