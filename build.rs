use std::fs;

fn main() {
    // Validate the default profile at compile time
    let profile_path = "src/default_profile.toml";
    println!("cargo:rerun-if-changed={}", profile_path);

    let content = fs::read_to_string(profile_path).expect("Failed to read default_profile.toml");

    if let Err(e) = content.parse::<toml::Table>() {
        panic!("Invalid default_profile.toml: {}", e);
    }
}
