/// Host constants needed to turn raw procfs counters into human units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostConstants {
    pub ticks_per_second: u64,
    pub page_size_bytes: u64,
    pub online_cpus: u32,
}

pub trait PlatformExtensions {
    fn clock_ticks_per_second() -> Option<u64>;
    fn page_size() -> Option<u64>;
    fn online_cpus() -> Option<u32>;
}

#[cfg(not(target_os = "linux"))]
mod fallback;
#[cfg(target_os = "linux")]
mod linux;

#[cfg(not(target_os = "linux"))]
use fallback as platform_impl;
#[cfg(target_os = "linux")]
use linux as platform_impl;

const DEFAULT_TICKS_PER_SECOND: u64 = 100;
const DEFAULT_PAGE_SIZE: u64 = 4096;

pub fn host_constants() -> HostConstants {
    HostConstants {
        ticks_per_second: platform_impl::Platform::clock_ticks_per_second()
            .unwrap_or(DEFAULT_TICKS_PER_SECOND),
        page_size_bytes: platform_impl::Platform::page_size().unwrap_or(DEFAULT_PAGE_SIZE),
        online_cpus: platform_impl::Platform::online_cpus().unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get() as u32)
                .unwrap_or(1)
        }),
    }
}
