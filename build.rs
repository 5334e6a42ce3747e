use std::env;
use std::process::Command;

// CPU features the lane-grouped kernels can use
#[derive(PartialEq, Eq, Debug)]
struct CpuFeature {
    name: &'static str,
    cfg_flag: &'static str,
    target_arch: &'static str,
    detected: bool,
}

impl CpuFeature {
    fn features() -> Vec<CpuFeature> {
        vec![CpuFeature {
            name: "avx",
            cfg_flag: "avx",
            target_arch: "x86_64",
            detected: false,
        }]
    }
}

trait CpuFeatureDetector {
    fn detect_features(&self, features: &mut [CpuFeature]);
    fn is_applicable(&self) -> bool;
}

// Reads the `flags` line of /proc/cpuinfo
struct LinuxDetector;
impl CpuFeatureDetector for LinuxDetector {
    fn detect_features(&self, features: &mut [CpuFeature]) {
        let Ok(cpuinfo) = std::fs::read_to_string("/proc/cpuinfo") else {
            return;
        };
        let Some(flags) = cpuinfo
            .lines()
            .find(|line| line.starts_with("flags"))
            .and_then(|line| line.split_once(':'))
            .map(|(_, flags)| flags.to_lowercase())
        else {
            return;
        };

        for feature in features.iter_mut() {
            feature.detected = flags.split_whitespace().any(|flag| flag == feature.name);
        }
    }

    fn is_applicable(&self) -> bool {
        cfg!(target_os = "linux")
    }
}

struct MacOSDetector;
impl CpuFeatureDetector for MacOSDetector {
    fn detect_features(&self, features: &mut [CpuFeature]) {
        let Ok(output) = Command::new("sysctl").args(["-a"]).output() else {
            return;
        };
        let contents = String::from_utf8_lossy(&output.stdout).to_lowercase();

        for feature in features.iter_mut() {
            if feature.name == "avx" {
                feature.detected = contents.contains("hw.optional.avx1_0: 1");
            }
        }
    }

    fn is_applicable(&self) -> bool {
        cfg!(target_os = "macos")
    }
}

struct PlatformDetector;
impl PlatformDetector {
    fn cpu_features_detectors() -> Vec<Box<dyn CpuFeatureDetector>> {
        vec![Box::new(LinuxDetector), Box::new(MacOSDetector)]
    }

    fn detect_cpu_features(features: &mut [CpuFeature]) {
        if let Some(detector) = Self::cpu_features_detectors()
            .into_iter()
            .find(|d| d.is_applicable())
        {
            detector.detect_features(features);
        }
    }

    fn apply(features: &[CpuFeature], target_arch: &str) {
        for feature in features {
            println!("cargo::rustc-check-cfg=cfg({})", feature.cfg_flag);
            if feature.detected && feature.target_arch == target_arch {
                println!("cargo:rustc-cfg={}", feature.cfg_flag);
            }
        }
    }
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let mut features = CpuFeature::features();

    // Only run CPU detection for native builds; the kernels still check
    // the running CPU before taking a SIMD path.
    let host = env::var("HOST").unwrap_or_default();
    let target = env::var("TARGET").unwrap_or_default();
    if host == target {
        PlatformDetector::detect_cpu_features(&mut features);
    }

    let target_arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap_or_default();
    PlatformDetector::apply(&features, &target_arch);
}
