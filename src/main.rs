use eframe::egui;

use moonbeam_wc_demo::app;
use moonbeam_wc_demo::config::Config;

fn main() -> Result<(), eframe::Error> {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let _guard = rt.enter();

    env_logger::init();

    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("⚠️ Using default config: {}", e);
        Config::default()
    });
    let icon = load_icon();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 640.0])
            .with_min_inner_size([480.0, 480.0])
            .with_icon(icon),
        ..Default::default()
    };

    let result = eframe::run_native(
        "Moonbeam WalletConnect Demo",
        options,
        Box::new(move |cc| Ok(Box::new(app::App::new(cc, config)))),
    );

    drop(_guard);
    rt.shutdown_timeout(std::time::Duration::from_secs(2));

    result
}

/// Load the logo PNG as an eframe window icon.
fn load_icon() -> egui::IconData {
    let png_data = include_bytes!("../assets/logo.png");
    let image = image::load_from_memory(png_data)
        .unwrap_or_else(|_| image::DynamicImage::new_rgba8(32, 32));
    let rgba = image.to_rgba8();
    let (w, h) = rgba.dimensions();
    egui::IconData {
        rgba: rgba.into_raw(),
        width: w,
        height: h,
    }
}
