fn main() {
    // CARGO_CFG_TARGET_OS names the target platform; #[cfg()] in a build
    // script would name the host
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os == "windows" {
        // libgit2-sys needs the security and registry functions of advapi32
        println!("cargo:rustc-link-lib=advapi32");

        // The subcommand enum with its flattened argument structs overflows
        // the 1 MB default stack while parsing in debug builds
        let target_env = std::env::var("CARGO_CFG_TARGET_ENV").unwrap_or_default();
        if target_env == "msvc" {
            println!("cargo:rustc-link-arg=/STACK:8388608");
        } else {
            println!("cargo:rustc-link-arg=-Wl,--stack-reserve=8388608");
        }
    }
}
