// Dialog creation functions (lock warning, install confirmation, bootloader choice)

use std::path::Path;
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{ApplicationWindow, ButtonsType, MessageDialog, MessageType, ResponseType};

use welcome_center::config::gui;
use welcome_center::events::Notice;
use welcome_center::installer::{self, Bootloader, InstallMode};
use welcome_center::launcher::ExternalTool;

use super::app::UiContext;

const GRUB_RESPONSE: ResponseType = ResponseType::Other(1);
const SYSTEMD_BOOT_RESPONSE: ResponseType = ResponseType::Other(2);

/// Warn that pacman is busy; the user has to acknowledge it
pub fn show_lock_warning(parent: &ApplicationWindow, lock_file: &Path) {
    let dialog = MessageDialog::builder()
        .transient_for(parent)
        .modal(true)
        .title("Warning")
        .message_type(MessageType::Warning)
        .buttons(ButtonsType::Ok)
        .text(format!(
            "Pacman lockfile found {}, is another pacman process running?",
            lock_file.display()
        ))
        .build();
    dialog.set_default_response(ResponseType::Ok);
    dialog.connect_response(|dialog, _| dialog.close());
    dialog.show();
}

/// Ask whether a missing tool should be installed
pub async fn confirm_install(parent: &ApplicationWindow, tool: &ExternalTool) -> bool {
    let dialog = MessageDialog::builder()
        .transient_for(parent)
        .modal(true)
        .title("Warning")
        .message_type(MessageType::Warning)
        .buttons(ButtonsType::None)
        .text(format!("{} was not found", tool.package))
        .secondary_text(format!("Let {} Welcome install it?", gui::DISTRO_NAME))
        .build();
    dialog.add_button("Yes", ResponseType::Yes);
    dialog.add_button("No", ResponseType::No);
    dialog.set_default_response(ResponseType::No);

    let response = dialog.run_future().await;
    dialog.close();
    response == ResponseType::Yes
}

/// Offer GRUB or systemd-boot before starting the installer on EFI machines
pub fn show_bootloader_dialog(ctx: &Rc<UiContext>, mode: InstallMode) {
    let dialog = MessageDialog::builder()
        .transient_for(&ctx.window)
        .modal(true)
        .title("Choose Bootloader")
        .message_type(MessageType::Question)
        .buttons(ButtonsType::None)
        .text("Choose Bootloader")
        .secondary_text(format!(
            "{} selected. Which bootloader should be installed?",
            mode.label()
        ))
        .build();
    dialog.add_button("GRUB", GRUB_RESPONSE);
    dialog.add_button("systemd-boot", SYSTEMD_BOOT_RESPONSE);
    dialog.add_button("Cancel", ResponseType::Cancel);
    dialog.set_default_response(GRUB_RESPONSE);

    let ctx = Rc::clone(ctx);
    dialog.connect_response(move |dialog, resp| {
        dialog.close();
        let bootloader = if resp == GRUB_RESPONSE {
            Bootloader::Grub
        } else if resp == SYSTEMD_BOOT_RESPONSE {
            Bootloader::SystemdBoot
        } else {
            tracing::info!("bootloader selection cancelled");
            return;
        };
        tracing::info!("{} with {}", mode.label(), bootloader.label());
        if let Err(e) = installer::choose_bootloader_and_launch(bootloader, ctx.events.clone()) {
            tracing::error!("{}", e);
            ctx.show_notice(Notice::failure("Could not start the installer"));
        }
    });
    dialog.show();
}
