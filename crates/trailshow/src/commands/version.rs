use colored::Colorize;

pub fn run() {
    println!(
        "{} {}",
        "trailshow".bold(),
        env!("CARGO_PKG_VERSION").cyan()
    );
    println!("{}", env!("CARGO_PKG_DESCRIPTION").dimmed());
}
