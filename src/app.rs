//! Application struct — the eframe::App implementation.
//!
//! Thin wrapper: drains service events, renders the single page.
//! No async, no network, no pairing logic.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::events::{ServiceEvent, UiEvent};
use crate::state::AppState;
use crate::view;

/// The demo application.
pub struct App {
    pub state: AppState,
    pub ui_tx: mpsc::UnboundedSender<UiEvent>,
    svc_rx: mpsc::UnboundedReceiver<ServiceEvent>,
    shutdown_token: CancellationToken,
}

impl App {
    /// Create a new App, spawning the background service task.
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config) -> Self {
        egui_extras::install_image_loaders(&cc.egui_ctx);

        let (ui_tx, ui_rx) = mpsc::unbounded_channel();
        let (svc_tx, svc_rx) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        // Spawn the single background service task
        tokio::spawn(crate::service::run(token.clone(), ui_rx, svc_tx, config));

        Self {
            state: AppState::default(),
            ui_tx,
            svc_rx,
            shutdown_token: token,
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        let _ = self.ui_tx.send(UiEvent::Shutdown);
        self.shutdown_token.cancel();
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Repaint regularly to pick up background service events
        ctx.request_repaint_after(std::time::Duration::from_millis(500));

        while let Ok(event) = self.svc_rx.try_recv() {
            self.state.apply(event);
            ctx.request_repaint();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(10.0);
            let logo_bytes = include_bytes!("../assets/logo.png");
            ui.add(
                egui::Image::from_bytes("bytes://logo.png", logo_bytes.as_slice()).max_width(48.0),
            );

            ui.vertical_centered(|ui| {
                ui.add_space(60.0);
                ui.heading(
                    egui::RichText::new("Moonbeam WalletConnect Demo App")
                        .size(28.0)
                        .strong(),
                );
                ui.add_space(20.0);

                view::error_banner(ui, self.state.error());

                if self.state.show_account() {
                    view::account::show(ui, &mut self.state, &self.ui_tx);
                } else {
                    view::connect::show(ui, &mut self.state, &self.ui_tx);
                }
            });
        });
    }
}
