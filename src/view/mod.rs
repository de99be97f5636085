//! UI view modules — pure rendering functions.
//!
//! Each submodule renders one part of the page. Views read from [`AppState`]
//! and send [`UiEvent`]s on user interaction. No async, no network, no
//! pairing logic.
//!
//! [`AppState`]: crate::state::AppState
//! [`UiEvent`]: crate::events::UiEvent

pub mod account;
pub mod connect;
pub mod qr;

/// Accent colour used for buttons and the logo.
pub const ACCENT: egui::Color32 = egui::Color32::from_rgb(0x53, 0xcb, 0xc9);

/// Error banner shown above the page content.
pub fn error_banner(ui: &mut egui::Ui, error: Option<&str>) {
    if let Some(err) = error {
        ui.colored_label(
            egui::Color32::RED,
            format!("There was an error: {}", err),
        );
        ui.add_space(10.0);
    }
}
