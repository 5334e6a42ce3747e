//! Host information printed alongside benchmark results.

use serde::{Deserialize, Serialize};

use crate::kernels::LaneBackend;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub logical_cpus: usize,
    /// SIMD extensions reported by the running CPU.
    pub simd_features: Vec<String>,
    /// Backend the lane-grouped kernels will use for the configured lane width.
    pub lane_backend: LaneBackend,
    pub crate_version: String,
}

impl SystemInfo {
    pub fn collect(lane_width: usize) -> Self {
        SystemInfo {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            logical_cpus: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            simd_features: detect_simd_features(),
            lane_backend: LaneBackend::detect(lane_width),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn detect_simd_features() -> Vec<String> {
    let mut features = Vec::new();
    if std::arch::is_x86_feature_detected!("sse4.1") {
        features.push("sse4.1".to_string());
    }
    if std::arch::is_x86_feature_detected!("avx") {
        features.push("avx".to_string());
    }
    if std::arch::is_x86_feature_detected!("avx2") {
        features.push("avx2".to_string());
    }
    if std::arch::is_x86_feature_detected!("fma") {
        features.push("fma".to_string());
    }
    if std::arch::is_x86_feature_detected!("avx512f") {
        features.push("avx512f".to_string());
    }
    features
}

#[cfg(target_arch = "aarch64")]
fn detect_simd_features() -> Vec<String> {
    let mut features = Vec::new();
    if std::arch::is_aarch64_feature_detected!("neon") {
        features.push("neon".to_string());
    }
    features
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
fn detect_simd_features() -> Vec<String> {
    Vec::new()
}
