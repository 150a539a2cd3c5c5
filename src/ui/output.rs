use crate::ui::theme::{theme, Role};
use crate::ui::Icons;

fn paint(text: &str, role: Role) -> String {
    theme().paint(text, role)
}

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, paint(text, Role::Heading));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, paint(label, Role::Label), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, paint(label, Role::Passed));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, paint(label, Role::Failed));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, paint(label, Role::Warning));
}

pub fn info(label: &str, value: &str) {
    status(Icons::INFO, label, value);
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", paint(title, Role::Heading));
}

pub fn muted(text: &str) -> String {
    paint(text, Role::Muted)
}

/// An identifier, styled for lists of benchmarks, controls or tables
pub fn id(text: &str) -> String {
    paint(text, Role::Id)
}

pub fn list_item(text: &str) {
    println!("  • {}", text);
}

/// One excluded cross-reference: `owner -> target (reason)`
pub fn dropped(owner: &str, target: &str, reason: &str) {
    eprintln!(
        "  {} {} {} {}",
        id(owner),
        muted("->"),
        id(target),
        muted(&format!("({})", reason))
    );
}

pub fn timing(elapsed: &str) {
    println!("{} {}", Icons::CLOCK, muted(elapsed));
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", paint(label, Role::Label), value);
}
