use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(icon: &str, text: &str) {
    println!("{} {}", icon, text.style(theme().header));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn));
}

pub fn info(label: &str, value: &str) {
    println!("{} {}: {}", Icons::INFO, label.style(theme().attribute), value);
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header));
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted).to_string()
}

pub fn timing(elapsed: std::time::Duration) {
    println!("{} {}", Icons::CLOCK, muted(&format!("{:.6}s", elapsed.as_secs_f64())));
}

/// `class #id`, styled
pub fn resource_title(class: &str, id: u64) -> String {
    format!("{} {}", class.style(theme().class), format!("#{}", id).style(theme().id))
}
