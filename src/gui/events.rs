// Event handler functions (install modes, tools, mirrors, autostart, links)

use std::rc::Rc;

use gtk4::glib;
use gtk4::prelude::*;
use gtk4::{Button, CheckButton};

use welcome_center::events::Notice;
use welcome_center::installer::{self, InstallMode};
use welcome_center::launcher::{self, ExternalTool, LaunchOutcome};
use welcome_center::utils;

use super::app::UiContext;
use super::dialogs;

/// Copy the mode's Calamares config, then start the installer once the
/// worker reports back
pub fn setup_install_mode_event(ctx: &Rc<UiContext>, button: &Button, mode: InstallMode) {
    let ctx = Rc::clone(ctx);
    button.connect_clicked(move |_| {
        let runner = ctx.launcher.runner();
        if runner.is_locked() {
            tracing::error!(
                "Pacman lockfile found {}, is another pacman process running?",
                runner.lock_file().display()
            );
            dialogs::show_lock_warning(&ctx.window, runner.lock_file());
            return;
        }
        ctx.select_mode(mode);
        if let Err(e) = installer::prepare_in_background(mode, ctx.events.clone()) {
            tracing::error!("{}", e);
            ctx.offline_button.set_sensitive(true);
            ctx.online_button.set_sensitive(true);
            ctx.show_notice(Notice::failure(format!("Could not prepare {}", mode.label())));
        }
    });
}

/// Launch a tool, asking to install it first when it is missing
pub fn setup_tool_event(ctx: &Rc<UiContext>, button: &Button, tool: ExternalTool) {
    let ctx = Rc::clone(ctx);
    button.connect_clicked(move |_| {
        let runner = ctx.launcher.runner();
        if tool.is_present() || runner.is_locked() {
            // confirmation is never asked on these paths
            report_launch(&ctx, &tool, ctx.launcher.run_external_tool(&tool, |_| false));
            return;
        }
        let ctx = Rc::clone(&ctx);
        let tool = tool.clone();
        glib::spawn_future_local(async move {
            let consent = dialogs::confirm_install(&ctx.window, &tool).await;
            let outcome = ctx.launcher.run_external_tool(&tool, |_| consent);
            report_launch(&ctx, &tool, outcome);
        });
    });
}

fn report_launch(
    ctx: &Rc<UiContext>,
    tool: &ExternalTool,
    outcome: welcome_center::error::WelcomeResult<LaunchOutcome>,
) {
    match outcome {
        Ok(LaunchOutcome::Locked) => {
            dialogs::show_lock_warning(&ctx.window, ctx.launcher.runner().lock_file())
        }
        Ok(LaunchOutcome::Launched | LaunchOutcome::InstallStarted | LaunchOutcome::Declined) => {}
        Err(e) => {
            tracing::error!("{}", e);
            ctx.show_notice(Notice::failure(format!("Could not start {}", tool.display_name)));
        }
    }
}

pub fn setup_mirrors_event(ctx: &Rc<UiContext>) {
    let handler_ctx = Rc::clone(ctx);
    ctx.mirrors_button.connect_clicked(move |_| {
        let ctx = &handler_ctx;
        if ctx.mirrors.is_running() {
            return;
        }
        if let Err(e) = ctx.mirrors.run_in_background(ctx.events.clone()) {
            tracing::error!("{}", e);
            ctx.show_notice(Notice::failure("Could not start the mirror update"));
        }
    });
}

/// One settings write per toggle
pub fn setup_autostart_event(ctx: &Rc<UiContext>, check: &CheckButton) {
    let ctx = Rc::clone(ctx);
    check.connect_toggled(move |check| {
        let enabled = check.is_active();
        ctx.autostart.apply(enabled);
        ctx.settings.save(enabled);
    });
}

pub fn setup_social_links(buttons: Vec<(Button, &'static str)>) {
    for (button, url) in buttons {
        button.connect_clicked(move |_| launcher::open_url(url));
    }
}

/// Arandr drives X11 outputs and does nothing useful under Wayland
pub fn apply_session_restrictions(arandr_button: &Button) {
    let session = utils::session_type();
    tracing::info!("session type: {}", session.as_deref().unwrap_or("unknown"));
    if session.as_deref() == Some("wayland") {
        arandr_button.set_sensitive(false);
        arandr_button.set_tooltip_text(Some("Arandr requires an X11 session"));
    }
}
