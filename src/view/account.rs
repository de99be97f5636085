//! Connected screen — account, chain, network and balance.

use egui::Ui;
use tokio::sync::mpsc;

use crate::events::UiEvent;
use crate::state::AppState;

use super::ACCENT;

/// Render the connected account.
pub fn show(ui: &mut Ui, state: &mut AppState, ui_tx: &mpsc::UnboundedSender<UiEvent>) {
    let session = &state.session;

    ui.group(|ui| {
        ui.set_max_width(520.0);
        data_row(ui, "Connected Account: ", session.account.as_deref().unwrap_or(""));
        data_row(
            ui,
            "Chain ID: ",
            &session.chain_id.map(|id| id.to_string()).unwrap_or_default(),
        );

        if session.supported {
            data_row(ui, "Network: ", session.network_name.as_deref().unwrap_or(""));
            data_row(
                ui,
                "Balance: ",
                &format!(
                    "{} {}",
                    session.balance.as_deref().unwrap_or(""),
                    session.token_symbol.as_deref().unwrap_or("")
                ),
            );
        }
    });

    ui.add_space(20.0);

    if state.session.supported {
        let send = egui::Button::new(egui::RichText::new("Send Transaction").size(16.0))
            .stroke(egui::Stroke::new(1.0, ACCENT))
            .min_size(egui::vec2(180.0, 40.0));
        if ui.add_enabled(!state.sending, send).clicked() {
            state.begin_send();
            let _ = ui_tx.send(UiEvent::SendTransaction);
        }
        if state.sending {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Confirm the transaction in your wallet");
            });
        }
        if let Some(ref hash) = state.last_tx_hash {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("Last transaction:").color(egui::Color32::GRAY));
                ui.label(egui::RichText::new(hash).monospace());
            });
        }
    } else {
        ui.label(
            egui::RichText::new(
                "Network not supported. Please disconnect, switch networks, and connect again.",
            )
            .strong(),
        );
    }

    ui.add_space(30.0);

    let disconnect = egui::Button::new(egui::RichText::new("Disconnect").size(16.0))
        .stroke(egui::Stroke::new(1.0, ACCENT))
        .min_size(egui::vec2(180.0, 40.0));
    if ui.add(disconnect).clicked() {
        state.reset();
        let _ = ui_tx.send(UiEvent::Disconnect);
    }
}

fn data_row(ui: &mut Ui, label: &str, value: &str) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(label).strong().size(15.0));
        ui.label(egui::RichText::new(value).size(15.0));
    });
}
