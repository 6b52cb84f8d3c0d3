use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Context;
use gtk4::glib;
use gtk4::prelude::*;
use gtk4::{Application, ApplicationWindow, Box as GtkBox, Button, Label, Orientation};

use welcome_center::config;
use welcome_center::connectivity::{self, LinkChange};
use welcome_center::events::{EventSink, Notice, NoticeSlot, SlotAction, UiEvent};
use welcome_center::installer::{self, InstallMode};
use welcome_center::launcher::Launcher;
use welcome_center::mirrors::MirrorUpdater;
use welcome_center::packages::{self, PackageRunner, Pacman};
use welcome_center::settings::{AutostartEntry, SettingsStore};

use super::events as handlers;
use super::{dialogs, widgets};

/// Mutable view state, only touched on the main thread
#[derive(Debug)]
struct UiState {
    mirrors_busy: bool,
    notices: NoticeSlot,
}

/// Widgets and services shared by every handler
pub struct UiContext {
    pub window: ApplicationWindow,
    pub notice_label: Label,
    pub mirrors_button: Button,
    pub offline_button: Button,
    pub online_button: Button,
    pub events: Arc<dyn EventSink>,
    pub launcher: Launcher,
    pub mirrors: Arc<MirrorUpdater>,
    pub settings: SettingsStore,
    pub autostart: AutostartEntry,
    state: RefCell<UiState>,
}

impl UiContext {
    /// Apply one event from a worker
    pub fn apply(self: &Rc<Self>, event: UiEvent) {
        match event {
            UiEvent::Notice(notice) => self.show_notice(notice),
            UiEvent::Link(LinkChange::Lost) => {
                let action = self.state.borrow_mut().notices.link_lost();
                self.refresh_mirrors_button();
                self.perform(action);
            }
            UiEvent::Link(LinkChange::Restored) => {
                let action = self.state.borrow_mut().notices.link_restored();
                self.refresh_mirrors_button();
                self.perform(action);
            }
            UiEvent::MirrorsBusy(busy) => {
                self.state.borrow_mut().mirrors_busy = busy;
                self.refresh_mirrors_button();
            }
            UiEvent::InstallerPrepared { mode, ok } => self.installer_prepared(mode, ok),
        }
    }

    pub fn show_notice(self: &Rc<Self>, notice: Notice) {
        let generation = self.state.borrow_mut().notices.show();
        self.render_notice(&notice);
        if notice.sticky {
            return;
        }
        let weak = Rc::downgrade(self);
        glib::timeout_add_seconds_local_once(config::gui::NOTICE_CLEAR_SECS, move || {
            if let Some(ctx) = weak.upgrade() {
                let action = ctx.state.borrow_mut().notices.expired(generation);
                ctx.perform(action);
            }
        });
    }

    fn perform(&self, action: SlotAction) {
        match action {
            SlotAction::Show(notice) => self.render_notice(&notice),
            SlotAction::Clear => {
                self.notice_label.set_text("");
                self.notice_label.set_visible(false);
            }
            SlotAction::Keep => {}
        }
    }

    fn render_notice(&self, notice: &Notice) {
        self.notice_label.set_markup(&notice.markup());
        self.notice_label.set_visible(true);
    }

    fn refresh_mirrors_button(&self) {
        let state = self.state.borrow();
        self.mirrors_button
            .set_sensitive(state.notices.is_online() && !state.mirrors_busy);
    }

    /// Highlight the chosen mode and lock both buttons until the files are copied
    pub fn select_mode(&self, mode: InstallMode) {
        let (chosen, other) = match mode {
            InstallMode::Offline => (&self.offline_button, &self.online_button),
            InstallMode::Online => (&self.online_button, &self.offline_button),
        };
        chosen.add_css_class("mode-selected");
        chosen.set_label(mode.label());
        other.remove_css_class("mode-selected");
        self.offline_button.set_sensitive(false);
        self.online_button.set_sensitive(false);
    }

    fn installer_prepared(self: &Rc<Self>, mode: InstallMode, ok: bool) {
        self.offline_button.set_sensitive(true);
        self.online_button.set_sensitive(true);
        if !ok {
            return;
        }
        if installer::is_efi(Path::new("/")) {
            dialogs::show_bootloader_dialog(self, mode);
        } else if let Err(e) = installer::launch_installer() {
            tracing::error!("{}", e);
            self.show_notice(Notice::failure("Could not start the installer"));
        }
    }
}

fn offline_warning() -> Notice {
    Notice::warning("No internet!").with_detail(format!(
        "{} will not install any additional packages!",
        config::gui::DISTRO_NAME
    ))
}

pub fn run_gui() -> glib::ExitCode {
    let app = Application::builder()
        .application_id(config::gui::APP_ID)
        .build();

    app.connect_activate(|app| {
        if let Some(window) = app.active_window() {
            window.present();
            return;
        }
        if let Err(e) = build_main_window(app) {
            tracing::error!("failed to start: {:#}", e);
        }
    });

    app.run()
}

fn build_main_window(app: &Application) -> anyhow::Result<()> {
    widgets::load_css();

    let settings = SettingsStore::for_user();
    settings.ensure_initialized();
    let autostart_on = settings.load();

    // Workers talk to the UI only through this channel
    let (ui_tx, ui_rx) = async_channel::unbounded::<UiEvent>();
    let events: Arc<dyn EventSink> = Arc::new(ui_tx.clone());

    let (record_tx, record_rx) = std::sync::mpsc::channel();
    let runner = Arc::new(PackageRunner::new(
        Arc::new(Pacman),
        config::pacman::LOCK_FILE,
        record_tx,
        Arc::clone(&events),
    ));
    packages::spawn_post_install_worker(record_rx, Arc::clone(&events))
        .context("starting post-install worker")?;

    let window = ApplicationWindow::builder()
        .application(app)
        .title(config::gui::WINDOW_TITLE)
        .default_width(config::gui::DEFAULT_WIDTH)
        .default_height(config::gui::DEFAULT_HEIGHT)
        .resizable(true)
        .build();

    let vbox = GtkBox::new(Orientation::Vertical, config::gui::SECTION_SPACING);
    vbox.set_margin_top(config::gui::MARGIN);
    vbox.set_margin_bottom(config::gui::MARGIN);
    vbox.set_margin_start(config::gui::MARGIN);
    vbox.set_margin_end(config::gui::MARGIN);

    vbox.append(&widgets::create_header());
    vbox.append(&widgets::create_separator());

    let (install_box, offline_button, online_button) = widgets::create_install_buttons();
    vbox.append(&install_box);

    let (tools_box, gparted_button, arandr_button, mirrors_button) = widgets::create_tool_buttons();
    vbox.append(&tools_box);

    let notice_label = widgets::create_notice_label();
    notice_label.set_vexpand(true);
    vbox.append(&notice_label);

    vbox.append(&widgets::create_separator());
    let autostart_check = widgets::create_autostart_check(autostart_on);
    vbox.append(&autostart_check);
    let (links_box, link_buttons) = widgets::create_social_links();
    vbox.append(&links_box);

    let ctx = Rc::new(UiContext {
        window: window.clone(),
        notice_label,
        mirrors_button,
        offline_button,
        online_button,
        events: Arc::clone(&events),
        launcher: Launcher::new(runner),
        mirrors: Arc::new(MirrorUpdater::default()),
        settings,
        autostart: AutostartEntry::for_user(),
        state: RefCell::new(UiState {
            mirrors_busy: false,
            notices: NoticeSlot::new(offline_warning()),
        }),
    });

    // Drain worker events on the main context
    {
        let ctx = Rc::clone(&ctx);
        glib::spawn_future_local(async move {
            while let Ok(event) = ui_rx.recv().await {
                ctx.apply(event);
            }
        });
    }

    handlers::setup_install_mode_event(&ctx, &ctx.offline_button, InstallMode::Offline);
    handlers::setup_install_mode_event(&ctx, &ctx.online_button, InstallMode::Online);
    handlers::setup_tool_event(&ctx, &gparted_button, welcome_center::launcher::ExternalTool::gparted());
    handlers::setup_tool_event(&ctx, &arandr_button, welcome_center::launcher::ExternalTool::arandr());
    handlers::setup_mirrors_event(&ctx);
    handlers::setup_autostart_event(&ctx, &autostart_check);
    handlers::setup_social_links(link_buttons);
    handlers::apply_session_restrictions(&arandr_button);

    connectivity::spawn_monitor(ui_tx).context("starting connectivity monitor")?;

    window.set_child(Some(&vbox));
    window.present();
    Ok(())
}
