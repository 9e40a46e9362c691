//! Accelerator detection for the generation backend.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Compute device the model runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accelerator {
    /// NVIDIA GPU via CUDA.
    Cuda,
    /// Apple Silicon GPU via Metal Performance Shaders.
    Mps,
    /// No accelerator; CPU-only inference.
    Cpu,
}

impl Accelerator {
    /// Whether half precision is worth enabling on this device.
    pub fn supports_half_precision(&self) -> bool {
        !matches!(self, Self::Cpu)
    }
}

impl std::fmt::Display for Accelerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cuda => write!(f, "cuda"),
            Self::Mps => write!(f, "mps"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

/// Discovered hardware capabilities of the current device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    /// Total system RAM in bytes.
    pub total_ram_bytes: u64,
    /// Number of CPU cores.
    pub cpu_cores: usize,
    /// Selected accelerator.
    pub accelerator: Accelerator,
}

impl DeviceCapabilities {
    /// Discover hardware capabilities of the current system.
    pub fn discover() -> Self {
        let accelerator = Self::pick_accelerator(Self::detect_cuda(), Self::detect_mps());
        match accelerator {
            Accelerator::Cuda => info!("GPU detected, using CUDA"),
            Accelerator::Mps => info!("MPS is available, it has been enabled"),
            Accelerator::Cpu => info!("No GPU detected, falling back to CPU-only"),
        }

        Self {
            total_ram_bytes: Self::get_total_ram(),
            cpu_cores: num_cpus(),
            accelerator,
        }
    }

    /// CUDA wins over MPS; CPU is the fallback.
    fn pick_accelerator(has_cuda: bool, has_mps: bool) -> Accelerator {
        if has_cuda {
            Accelerator::Cuda
        } else if has_mps {
            Accelerator::Mps
        } else {
            Accelerator::Cpu
        }
    }

    fn get_total_ram() -> u64 {
        #[cfg(target_os = "linux")]
        {
            use std::fs;
            if let Ok(meminfo) = fs::read_to_string("/proc/meminfo") {
                for line in meminfo.lines() {
                    if line.starts_with("MemTotal:") {
                        if let Some(kb_str) = line.split_whitespace().nth(1) {
                            if let Ok(kb) = kb_str.parse::<u64>() {
                                return kb * 1024;
                            }
                        }
                    }
                }
            }
            0
        }
        #[cfg(target_os = "macos")]
        {
            use std::process::Command;
            if let Ok(output) = Command::new("sysctl").arg("-n").arg("hw.memsize").output() {
                if let Ok(s) = String::from_utf8(output.stdout) {
                    if let Ok(bytes) = s.trim().parse::<u64>() {
                        return bytes;
                    }
                }
            }
            0
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            0
        }
    }

    fn detect_cuda() -> bool {
        #[cfg(target_os = "linux")]
        {
            use std::fs;
            fs::metadata("/dev/nvidia0").is_ok() || fs::metadata("/dev/nvhost-gpu").is_ok()
        }
        #[cfg(not(target_os = "linux"))]
        {
            false
        }
    }

    fn detect_mps() -> bool {
        cfg!(all(target_os = "macos", target_arch = "aarch64"))
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
