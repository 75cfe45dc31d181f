//! Platform tuples (`<os>_<arch>`) as used in registry indexes and
//! installed manifests.

/// Map a raw OS name to its registry spelling. Unknown names map to `unknown`.
pub fn normalize_os(os: &str) -> &'static str {
    match os.to_ascii_lowercase().as_str() {
        "darwin" | "macos" | "macosx" => "macosx",
        "windows" | "win" => "win",
        "linux" => "linux",
        "freebsd" => "freebsd",
        "openbsd" => "openbsd",
        _ => "unknown",
    }
}

/// Map a raw architecture name to its registry spelling. Unknown names map to `unknown`.
pub fn normalize_arch(arch: &str) -> &'static str {
    match arch.to_ascii_lowercase().as_str() {
        "386" | "x86" | "i386" | "i686" => "x86",
        "amd64" | "x86_64" => "amd64",
        "arm64" | "aarch64" => "arm64",
        "ppc" | "ppc64" | "ppc64le" | "powerpc" | "powerpc64" => "powerpc",
        _ => "unknown",
    }
}

pub fn platform_tuple(os: &str, arch: &str) -> String {
    format!("{}_{}", normalize_os(os), normalize_arch(arch))
}

/// Platform tuple of the running process
pub fn current_platform() -> String {
    platform_tuple(std::env::consts::OS, std::env::consts::ARCH)
}
