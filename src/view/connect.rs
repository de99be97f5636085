//! Connect screen — Connect button, then the pairing QR code.

use egui::Ui;
use tokio::sync::mpsc;

use crate::events::UiEvent;
use crate::state::AppState;

use super::{qr, ACCENT};

/// Render the connect screen.
pub fn show(ui: &mut Ui, state: &mut AppState, ui_tx: &mpsc::UnboundedSender<UiEvent>) {
    if !state.paired {
        let button = egui::Button::new(
            egui::RichText::new("Connect Wallet")
                .size(16.0)
                .color(egui::Color32::BLACK),
        )
        .fill(ACCENT)
        .min_size(egui::vec2(180.0, 44.0));

        if ui.add(button).clicked() {
            state.begin_connect();
            let _ = ui_tx.send(UiEvent::Connect);
        }
        return;
    }

    // Waiting for the wallet
    match (&state.pairing_qr, &state.pairing_uri) {
        (Some(grid), Some(uri)) => {
            ui.label("Scan with a WalletConnect-compatible wallet");
            ui.add_space(10.0);
            qr::show(ui, grid, 280.0);
            ui.add_space(10.0);
            if ui.button("📋 Copy to clipboard").clicked() {
                ui.ctx().copy_text(uri.clone());
            }
        }
        (None, Some(uri)) => {
            ui.label("Open this link with your wallet:");
            ui.label(egui::RichText::new(uri).monospace());
            if ui.button("📋 Copy to clipboard").clicked() {
                ui.ctx().copy_text(uri.clone());
            }
        }
        _ => {}
    }

    ui.add_space(10.0);
    ui.horizontal(|ui| {
        ui.spinner();
        let status = if state.bridge_connected {
            "Waiting for wallet..."
        } else {
            "Connecting to bridge..."
        };
        ui.label(egui::RichText::new(status).color(egui::Color32::GRAY));
    });

    ui.add_space(10.0);
    if ui.button("Cancel").clicked() {
        state.reset();
        let _ = ui_tx.send(UiEvent::Disconnect);
    }
}
