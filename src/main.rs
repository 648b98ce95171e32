use eframe::egui::ViewportBuilder;
use music_widget::{
    app::WidgetApp,
    artwork::ArtworkLibrary,
    bridge::{AppleScriptBridge, DemoBridge, PlayerBridge},
    chime::Chime,
    config::{Backend, Config},
    controller::Controller,
    prefs::PrefsStore,
};

fn main() -> anyhow::Result<()> {
    let env = env_logger::Env::default().default_filter_or("music_widget=info");
    env_logger::Builder::from_env(env).init();

    let config = Config::load().unwrap_or_else(|err| {
        log::warn!("Falling back to default config: {err:#}");
        Config::default()
    });

    let bridge: Box<dyn PlayerBridge> = match config.bridge.backend {
        Backend::Music => Box::new(AppleScriptBridge::new(
            config.bridge.app_name.clone(),
            config.bridge.osascript.clone(),
        )),
        Backend::Demo => {
            log::info!("Using the demo player");
            Box::new(DemoBridge::new())
        }
    };

    let library = ArtworkLibrary::open_with_limit(
        config.artwork.library_dir(),
        config.artwork.max_entries(),
    );
    let controller = Controller::new(
        bridge,
        &config.timers,
        config.rating_warning.threshold(),
        library,
    );

    let mut prefs = PrefsStore::open_default();
    if let Err(err) = prefs.enable_watch() {
        log::warn!("Preferences will not reload live: {err:#}");
    }
    let chime = Chime::new(&config.rating_warning);

    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_title("Music Widget")
            .with_inner_size([config.window.width(), config.window.height()])
            .with_min_inner_size([240.0, 80.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Music Widget",
        native_options,
        Box::new(move |_cc| Ok(Box::new(WidgetApp::new(controller, prefs, chime)))),
    )
    .map_err(|err| anyhow::anyhow!("Failed to run the widget: {err}"))
}
