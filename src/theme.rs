use eframe::egui::{self, Color32, CornerRadius, FontId, Frame, Margin, Stroke, TextStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Dark,
    Light,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub mode: ThemeMode,
    pub surface_0: Color32,
    pub surface_1: Color32,
    pub surface_2: Color32,
    pub accent_primary: Color32,
    pub success: Color32,
    pub danger: Color32,
    pub text_primary: Color32,
    pub text_muted: Color32,
    pub text_on_accent: Color32,
    pub border_subtle: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub const R12: u8 = 12;
    pub const R4: u8 = 4;
    pub const P12: f32 = 12.0;

    pub fn dark() -> Self {
        Self {
            mode: ThemeMode::Dark,
            surface_0: Color32::from_rgb(0x0F, 0x11, 0x15),
            surface_1: Color32::from_rgb(0x16, 0x1A, 0x20),
            surface_2: Color32::from_rgb(0x1C, 0x22, 0x2B),
            accent_primary: Color32::from_rgb(0x3B, 0x82, 0xF6),
            success: Color32::from_rgb(0x22, 0xC5, 0x5E),
            danger: Color32::from_rgb(0xEF, 0x44, 0x44),
            text_primary: Color32::from_rgb(0xE6, 0xED, 0xF3),
            text_muted: Color32::from_rgb(0x8B, 0x94, 0x9E),
            text_on_accent: Color32::from_rgb(0xF8, 0xFB, 0xFF),
            border_subtle: Color32::from_rgba_premultiplied(255, 255, 255, 13),
        }
    }

    pub fn light() -> Self {
        Self {
            mode: ThemeMode::Light,
            surface_0: Color32::from_rgb(0xF4, 0xF6, 0xF9),
            surface_1: Color32::from_rgb(0xFF, 0xFF, 0xFF),
            surface_2: Color32::from_rgb(0xEC, 0xEF, 0xF3),
            accent_primary: Color32::from_rgb(0x25, 0x63, 0xEB),
            success: Color32::from_rgb(0x16, 0xA3, 0x4A),
            danger: Color32::from_rgb(0xDC, 0x26, 0x26),
            text_primary: Color32::from_rgb(0x11, 0x18, 0x27),
            text_muted: Color32::from_rgb(0x6B, 0x72, 0x80),
            text_on_accent: Color32::from_rgb(0xFF, 0xFF, 0xFF),
            border_subtle: Color32::from_rgba_premultiplied(0, 0, 0, 20),
        }
    }

    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Dark => Self::dark(),
            ThemeMode::Light => Self::light(),
        }
    }

    pub fn apply_visuals(&self, ctx: &egui::Context) {
        let mut visuals = match self.mode {
            ThemeMode::Dark => egui::Visuals::dark(),
            ThemeMode::Light => egui::Visuals::light(),
        };
        visuals.panel_fill = self.surface_0;
        visuals.window_fill = self.surface_1;
        visuals.override_text_color = Some(self.text_primary);
        visuals.selection.bg_fill = self.accent_primary;
        visuals.hyperlink_color = self.accent_primary;
        visuals.window_corner_radius = CornerRadius::same(Self::R12);

        let mut style = (*ctx.style()).clone();
        style.visuals = visuals;
        style.spacing.item_spacing = egui::vec2(8.0, 8.0);
        style.spacing.button_padding = egui::vec2(12.0, 6.0);
        style.text_styles.insert(TextStyle::Heading, FontId::proportional(20.0));
        style.text_styles.insert(TextStyle::Body, FontId::proportional(14.0));
        style.text_styles.insert(TextStyle::Small, FontId::proportional(11.0));
        ctx.set_style(style);
    }

    pub fn card_frame(&self) -> Frame {
        Frame::new()
            .fill(self.surface_1)
            .inner_margin(Margin::same(24))
            .corner_radius(CornerRadius::same(Self::R12))
            .stroke(Stroke::new(1.0, self.border_subtle))
    }

    /// Own bubbles are accent-filled with a squared bottom-right corner;
    /// partner bubbles are neutral with a squared bottom-left corner.
    pub fn bubble_frame(&self, own: bool) -> Frame {
        let (fill, stroke, radius) = if own {
            (
                self.accent_primary,
                Stroke::NONE,
                CornerRadius {
                    nw: Self::R12,
                    ne: Self::R12,
                    sw: Self::R12,
                    se: Self::R4,
                },
            )
        } else {
            (
                self.surface_2,
                Stroke::new(1.0, self.border_subtle),
                CornerRadius {
                    nw: Self::R12,
                    ne: Self::R12,
                    sw: Self::R4,
                    se: Self::R12,
                },
            )
        };

        Frame::new()
            .fill(fill)
            .stroke(stroke)
            .corner_radius(radius)
            .inner_margin(Margin::symmetric(Self::P12 as i8, 8))
    }

    pub fn bubble_text_color(&self, own: bool) -> Color32 {
        if own {
            self.text_on_accent
        } else {
            self.text_primary
        }
    }

    pub fn composer_frame(&self) -> Frame {
        Frame::new()
            .fill(self.surface_1)
            .inner_margin(Margin::symmetric(Self::P12 as i8, 10))
            .stroke(Stroke::new(1.0, self.border_subtle))
    }
}
