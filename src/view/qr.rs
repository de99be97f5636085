//! QR code for the pairing URI, drawn with egui shapes.

use egui::{Color32, Rect, Sense, Ui};
use qrcode::{Color, QrCode};

const QUIET_ZONE: usize = 4;

/// Encoded QR modules, row-major, `true` = dark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrGrid {
    pub width: usize,
    pub modules: Vec<bool>,
}

impl QrGrid {
    pub fn encode(data: &str) -> Option<Self> {
        match QrCode::new(data.as_bytes()) {
            Ok(code) => Some(Self {
                width: code.width(),
                modules: code
                    .to_colors()
                    .into_iter()
                    .map(|c| c == Color::Dark)
                    .collect(),
            }),
            Err(e) => {
                log::warn!("Failed to encode QR code: {}", e);
                None
            }
        }
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.width + x]
    }
}

/// Draw the grid in a `size`×`size` square.
pub fn show(ui: &mut Ui, grid: &QrGrid, size: f32) {
    let (response, painter) = ui.allocate_painter(egui::vec2(size, size), Sense::hover());
    let rect = response.rect;
    painter.rect_filled(rect, 4.0, Color32::WHITE);

    let cells = grid.width + 2 * QUIET_ZONE;
    let module = size / cells as f32;

    for y in 0..grid.width {
        for x in 0..grid.width {
            if !grid.is_dark(x, y) {
                continue;
            }
            let min = rect.min
                + egui::vec2(
                    (x + QUIET_ZONE) as f32 * module,
                    (y + QUIET_ZONE) as f32 * module,
                );
            painter.rect_filled(
                Rect::from_min_size(min, egui::vec2(module, module)),
                0.0,
                Color32::BLACK,
            );
        }
    }
}
