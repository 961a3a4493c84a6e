use candle_core::Device;

/// Pick the compute device. GPUs are only tried when `prefer_gpu` is set and
/// the crate was built with the matching feature.
pub fn select_device(prefer_gpu: bool) -> Device {
    if prefer_gpu {
        #[cfg(feature = "cuda")]
        {
            match Device::new_cuda(0) {
                Ok(dev) => { tracing::info!("embedding device: CUDA"); return dev; }
                Err(e) => tracing::warn!(error = %e, "CUDA unavailable"),
            }
        }
        #[cfg(feature = "metal")]
        {
            match Device::new_metal(0) {
                Ok(dev) => { tracing::info!("embedding device: Metal"); return dev; }
                Err(e) => tracing::warn!(error = %e, "Metal unavailable"),
            }
        }
    }
    tracing::info!("embedding device: CPU");
    Device::Cpu
}
