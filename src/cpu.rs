use std::sync::OnceLock;

/// The instruction-set extensions available to this process.
/// Detected once, on first use; immutable thereafter. Dispatch sites read
/// this record and always keep a scalar path.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    pub simd128: bool,
    pub simd256: bool,
}

static CAPABILITIES: OnceLock<Capabilities> = OnceLock::new();

pub fn capabilities() -> Capabilities {
    *CAPABILITIES.get_or_init(detect)
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn detect() -> Capabilities {
    Capabilities {
        simd128: std::arch::is_x86_feature_detected!("sse2"),
        simd256: std::arch::is_x86_feature_detected!("avx2"),
    }
}

#[cfg(target_arch = "aarch64")]
fn detect() -> Capabilities {
    Capabilities {
        simd128: std::arch::is_aarch64_feature_detected!("neon"),
        simd256: false,
    }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
fn detect() -> Capabilities {
    Capabilities::default()
}
