use gpui::*;
use gpui_component::{Root, Theme, ThemeMode};
use inkchat_llm::{GatewayConfig, create_session};

use inkchat::app::{APP_TITLE, ChatAppShell};

fn main() {
    tracing_subscriber::fmt::init();

    // The session is created before any window exists so a configuration problem
    // is already known when the first frame is drawn.
    let session = GatewayConfig::from_env().and_then(|config| create_session(&config));

    let app = Application::new().with_assets(gpui_component_assets::Assets);

    app.run(move |cx| {
        gpui_tokio_bridge::init(cx);
        gpui_component::init(cx);

        // E-ink panels only render the light palette well.
        Theme::change(ThemeMode::Light, None, cx);

        let options = WindowOptions {
            window_bounds: Some(WindowBounds::Windowed(Bounds::centered(
                None,
                size(px(600.), px(800.)),
                cx,
            ))),
            titlebar: Some(TitlebarOptions {
                title: Some(APP_TITLE.into()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let opened = cx.open_window(options, |window, cx| {
            let shell = cx.new(|cx| ChatAppShell::new(session, window, cx));
            cx.new(|cx| Root::new(shell, window, cx))
        });

        match opened {
            Ok(_) => cx.activate(true),
            Err(error) => {
                tracing::error!(error = %error, "failed to open main window");
                cx.quit();
            }
        }
    });
}
