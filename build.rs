fn main() {
    // Embed the build timestamp for the startup banner
    let stamp = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();
    println!("cargo:rustc-env=ALTAZKIT_BUILD_DATE={stamp}");
}
