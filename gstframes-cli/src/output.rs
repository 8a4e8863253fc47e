//! Styled terminal output for command results.
//!
//! Results go to stdout; everything diagnostic goes through `log` to stderr.

use console::style;
use gstframes_core::Caps;
use std::fmt::Display;
use std::time::Duration;

/// Print a heading with styling and clear separation
pub fn print_heading(text: &str) {
    let line = style("=".repeat(50)).blue().bright();
    println!("{}", line);
    println!("{}", style(format!(" {} ", text)).bold().white().bright());
    println!("{}", line);
}

/// Print a section heading (smaller than main heading)
pub fn print_section(text: &str) {
    println!("\n{}", style(format!(" {} ", text)).bold().white());
    println!("{}", style("-".repeat(40)).blue());
}

/// Print an info line with label and value, with the label colored
pub fn print_info<T: Display>(label: &str, value: T) {
    println!("{}: {}", style(label).cyan().bright(), value);
}

pub fn print_success(message: &str) {
    println!("{} {}", style("✓").green().bold(), style(message).green());
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), message);
}

/// Print every field of a caps record.
pub fn print_caps(caps: &Caps) {
    print_info("Stage", &caps.name);
    if !caps.instance.is_empty() {
        print_info("Instance", &caps.instance);
    }
    if !caps.media_type.is_empty() {
        print_info("Media type", &caps.media_type);
    }
    print_info("Size", format!("{}x{}", caps.width, caps.height));
    print_info("Format", if caps.pixel_format.is_empty() { "?" } else { caps.pixel_format.as_str() });
    match caps.framerate {
        Some(rate) => match rate.as_f64() {
            Some(fps) => print_info("Framerate", format!("{rate} ({fps:.2} fps)")),
            None => print_info("Framerate", format!("{rate} (variable)")),
        },
        None => print_info("Framerate", "?"),
    }
    if let Ok(size) = caps.frame_size() {
        print_info("Frame size", format_bytes(size as u64));
    }
}

/// Formats a byte count with binary units, e.g. "225.00 KiB".
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let b = bytes as f64;
    if b >= GIB {
        format!("{:.2} GiB", b / GIB)
    } else if b >= MIB {
        format!("{:.2} MiB", b / MIB)
    } else if b >= KIB {
        format!("{:.2} KiB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}

/// Formats a duration as "HH:MM:SS.mmm".
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        total / 3600,
        (total % 3600) / 60,
        total % 60,
        duration.subsec_millis()
    )
}
