use welcome_center::installer::{self, Bootloader, InstallMode};

use std::env;
use std::path::Path;

fn usage() -> ! {
    eprintln!("Usage: welcome_helper calamares-mode <offline|online>");
    eprintln!("       welcome_helper bootloader <grub|systemd-boot>");
    std::process::exit(1);
}

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        usage();
    }
    let root = Path::new("/");

    // Runs as root through pkexec
    let result = match args[1].as_str() {
        "calamares-mode" => args[2]
            .parse::<InstallMode>()
            .and_then(|mode| installer::apply_mode_files(mode, root)),
        "bootloader" => args[2]
            .parse::<Bootloader>()
            .and_then(|bootloader| installer::apply_bootloader(bootloader, root)),
        _ => usage(),
    };
    if let Err(e) = result {
        eprintln!("welcome_helper: {}", e);
        std::process::exit(1);
    }
}
