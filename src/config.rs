//! Configuration constants for the welcome center

/// Settings and autostart locations (relative to the user's config dir)
pub mod settings {
    /// Directory under `$XDG_CONFIG_HOME`
    pub const APP_DIR: &str = "welcome-center";

    /// Settings file name
    pub const FILE_NAME: &str = "settings.conf";

    /// Key of the only setting
    pub const AUTOSTART_KEY: &str = "autostart";

    /// Value used when the file or key is missing
    pub const AUTOSTART_DEFAULT: bool = true;

    /// Installed desktop entry, copied into the autostart dir when enabled
    pub const DESKTOP_ENTRY: &str = "/usr/share/applications/welcome-center.desktop";

    /// Autostart directory name under `$XDG_CONFIG_HOME`
    pub const AUTOSTART_DIR: &str = "autostart";
}

/// Connectivity probe configuration
pub mod network {
    /// Host probed for reachability
    pub const PROBE_HOST: &str = "www.google.com";

    /// Plain TCP port probed
    pub const PROBE_PORT: u16 = 80;

    /// Connect timeout in seconds
    pub const PROBE_TIMEOUT_SECS: u64 = 2;

    /// Delay between probes in seconds
    pub const PROBE_PERIOD_SECS: u64 = 3;
}

/// Package manager configuration
pub mod pacman {
    /// Lock file held while pacman is running
    pub const LOCK_FILE: &str = "/var/lib/pacman/db.lck";

    /// Package manager binary
    pub const BINARY: &str = "pacman";

    /// Privilege escalation helper
    pub const ELEVATE: &str = "pkexec";
}

/// Calamares installer configuration
pub mod calamares {
    /// Installer launcher (polkit wrapper)
    pub const LAUNCHER: &str = "/usr/bin/calamares_polkit";

    /// Flag passed to the launcher
    pub const LAUNCHER_FLAG: &str = "-d";

    /// Active settings file
    pub const SETTINGS_TARGET: &str = "etc/calamares/settings.conf";

    /// Active packages module config
    pub const PACKAGES_TARGET: &str = "etc/calamares/modules/packages.conf";

    /// Active bootloader module config
    pub const BOOTLOADER_TARGET: &str = "etc/calamares/modules/bootloader.conf";

    /// Offline mode sources
    pub const OFFLINE_SETTINGS: &str = "etc/calamares/settings-beginner.conf";
    pub const OFFLINE_PACKAGES: &str = "etc/calamares/modules/packages-no-system-update.conf";

    /// Online mode sources
    pub const ONLINE_SETTINGS: &str = "etc/calamares/settings-advanced.conf";
    pub const ONLINE_PACKAGES: &str = "etc/calamares/modules/packages-system-update.conf";

    /// Present only when booted in UEFI mode
    pub const EFI_MARKER: &str = "sys/firmware/efi/fw_platform_size";
}

/// Mirrorlist update configuration
pub mod mirrors {
    /// Mirror ranking tool
    pub const RATE_MIRRORS: &str = "rate-mirrors";

    /// Package providing the tool
    pub const RATE_MIRRORS_PACKAGE: &str = "rate-mirrors";

    /// Concurrent probes used by rate-mirrors
    pub const CONCURRENCY: &str = "40";

    /// (rate-mirrors target, mirrorlist path, display name)
    pub const TARGETS: &[(&str, &str, &str)] = &[
        ("arch", "/etc/pacman.d/mirrorlist", "Arch"),
        ("chaotic-aur", "/etc/pacman.d/chaotic-mirrorlist", "Chaotic AUR"),
    ];
}

/// Privileged helper binary
pub mod helper {
    /// Binary name, looked up next to the running executable first
    pub const BINARY_NAME: &str = "welcome_helper";

    /// Installed location
    pub const INSTALLED_PATH: &str = "/usr/lib/welcome-center/welcome_helper";
}

/// External GUI tools offered by the welcome center
pub mod tools {
    /// (package, binary path, display name)
    pub const GPARTED: (&str, &str, &str) = ("gparted", "/usr/bin/gparted", "GParted");
    pub const ARANDR: (&str, &str, &str) = ("arandr", "/usr/bin/arandr", "Arandr");
}

/// GUI configuration
pub mod gui {
    /// Application ID
    pub const APP_ID: &str = "org.snigdhaos.WelcomeCenter";

    /// Window title
    pub const WINDOW_TITLE: &str = "Snigdha OS Welcome";

    /// Distribution name used in dialogs
    pub const DISTRO_NAME: &str = "Snigdha OS";

    /// Default window dimensions
    pub const DEFAULT_WIDTH: i32 = 860;
    pub const DEFAULT_HEIGHT: i32 = 450;

    /// Widget spacing
    pub const WIDGET_SPACING: i32 = 8;
    pub const SECTION_SPACING: i32 = 12;
    pub const MARGIN: i32 = 16;

    /// Seconds before a transient notice is cleared
    pub const NOTICE_CLEAR_SECS: u32 = 6;

    /// Social links shown at the bottom of the window (label, url)
    pub const SOCIAL_LINKS: &[(&str, &str)] = &[
        ("Website", "https://snigdhaos.org"),
        ("GitHub", "https://github.com/Snigdha-OS"),
        ("Discord", "https://discord.gg/snigdhaos"),
        ("Telegram", "https://t.me/snigdhaos"),
    ];
}
