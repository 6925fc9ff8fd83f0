use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::Device;
use once_cell::sync::OnceCell;

use crate::error::Result;

static ACCELERATOR: OnceCell<Device> = OnceCell::new();

/// Picks the compute device: CUDA, then Metal, then CPU.
///
/// The accelerator probe runs once per process; later calls reuse its
/// answer. `cpu` bypasses the probe entirely.
pub fn select_device(cpu: bool) -> Result<Device> {
    if cpu {
        return Ok(Device::Cpu);
    }
    let device = ACCELERATOR.get_or_try_init(probe)?;
    Ok(device.clone())
}

fn probe() -> Result<Device> {
    if cuda_is_available() {
        log::info!("Running on CUDA device 0");
        Ok(Device::new_cuda(0)?)
    } else if metal_is_available() {
        log::info!("Running on Metal device 0");
        Ok(Device::new_metal(0)?)
    } else {
        #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
        {
            log::info!("Running on CPU, to run on GPU(metal), build with `--features metal`");
        }
        #[cfg(not(all(target_os = "macos", target_arch = "aarch64")))]
        {
            log::info!("Running on CPU, to run on GPU, build with `--features cuda`");
        }
        Ok(Device::Cpu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forced_cpu() {
        assert!(select_device(true).unwrap().is_cpu());
    }

    #[test]
    fn test_probe_is_stable() {
        let first = select_device(false).unwrap();
        let second = select_device(false).unwrap();
        assert!(first.same_device(&second));
    }
}
