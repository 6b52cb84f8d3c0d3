// Widget creation functions (header, install modes, tools, links, notice label)

use gtk4::prelude::*;
use gtk4::{Align, Box as GtkBox, Button, CheckButton, CssProvider, Label, Orientation};

use welcome_center::config::gui;

const CSS: &str = "
.notice {
    background-color: @theme_base_color;
    border: 1px solid @borders;
    padding: 10px;
    font-size: 16px;
}
.mode-button {
    padding: 12px 24px;
}
.mode-selected {
    font-weight: bold;
    background: @theme_selected_bg_color;
    color: @theme_selected_fg_color;
}
.link-button {
    padding: 4px 12px;
}
";

/// Install the application stylesheet on the default display
pub fn load_css() {
    let provider = CssProvider::new();
    provider.load_from_data(CSS);
    match gtk4::gdk::Display::default() {
        Some(display) => gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            gtk4::STYLE_PROVIDER_PRIORITY_APPLICATION,
        ),
        None => tracing::error!("Error loading CSS: no default display"),
    }
}

/// Create the welcome header
pub fn create_header() -> GtkBox {
    let header = GtkBox::new(Orientation::Vertical, 4);
    let title = Label::new(None);
    title.set_markup(&format!(
        "<span size='xx-large' weight='bold'>Welcome to {}</span>",
        gui::DISTRO_NAME
    ));
    let subtitle = Label::new(Some(
        "Install the system, refresh your mirrors or grab a few tools to get started.",
    ));
    subtitle.set_wrap(true);
    header.append(&title);
    header.append(&subtitle);
    header
}

fn create_mode_button(label: &str, tooltip: &str) -> Button {
    let button = Button::with_label(label);
    button.add_css_class("mode-button");
    button.set_hexpand(true);
    button.set_tooltip_text(Some(tooltip));
    button
}

/// Create the installer buttons (offline, online)
pub fn create_install_buttons() -> (GtkBox, Button, Button) {
    let hbox = GtkBox::new(Orientation::Horizontal, gui::WIDGET_SPACING);
    hbox.set_homogeneous(true);
    let offline = create_mode_button(
        "Easy Installation",
        "Install what is on the live media, no internet needed",
    );
    let online = create_mode_button(
        "Advanced Installation",
        "Update the system while installing, needs internet",
    );
    hbox.append(&offline);
    hbox.append(&online);
    (hbox, offline, online)
}

/// Create the tools row (GParted, Arandr, mirror update)
pub fn create_tool_buttons() -> (GtkBox, Button, Button, Button) {
    let hbox = GtkBox::new(Orientation::Horizontal, gui::WIDGET_SPACING);
    hbox.set_homogeneous(true);
    let gparted = Button::with_label("GParted");
    gparted.set_tooltip_text(Some("Partition disks before installing"));
    let arandr = Button::with_label("Arandr");
    arandr.set_tooltip_text(Some("Set up screen layout and resolution"));
    let mirrors = Button::with_label("Update Mirrors");
    mirrors.set_tooltip_text(Some("Rank pacman mirrors by speed"));
    hbox.append(&gparted);
    hbox.append(&arandr);
    hbox.append(&mirrors);
    (hbox, gparted, arandr, mirrors)
}

/// Create autostart toggle
pub fn create_autostart_check(active: bool) -> CheckButton {
    CheckButton::builder()
        .label("Show this window at login")
        .active(active)
        .halign(Align::Start)
        .build()
}

/// Create social link buttons, paired with their URLs
pub fn create_social_links() -> (GtkBox, Vec<(Button, &'static str)>) {
    let hbox = GtkBox::new(Orientation::Horizontal, gui::WIDGET_SPACING);
    hbox.set_halign(Align::Center);
    let mut buttons = Vec::with_capacity(gui::SOCIAL_LINKS.len());
    for (label, url) in gui::SOCIAL_LINKS {
        let button = Button::with_label(label);
        button.add_css_class("flat");
        button.add_css_class("link-button");
        button.set_tooltip_text(Some(url));
        hbox.append(&button);
        buttons.push((button, *url));
    }
    (hbox, buttons)
}

/// Create the status label, hidden until something is reported
pub fn create_notice_label() -> Label {
    let label = Label::new(None);
    label.add_css_class("notice");
    label.set_wrap(true);
    label.set_justify(gtk4::Justification::Center);
    label.set_visible(false);
    label
}

/// Create separator widget
pub fn create_separator() -> gtk4::Separator {
    let sep = gtk4::Separator::new(Orientation::Horizontal);
    sep.set_hexpand(true);
    sep
}
